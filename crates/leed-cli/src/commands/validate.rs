use crate::cli::ValidateArgs;
use crate::config::{AppConfig, CliOverrides, InputFile};
use crate::error::Result;
use leedpp::core::constants::hartree_to_ev;
use leedpp::engine::beams::{generate, output_beams};
use tracing::info;

pub fn run(args: ValidateArgs) -> Result<()> {
    info!("Validating input file {:?}", &args.input);
    let app = InputFile::from_file(&args.input)?.merge_with_cli(CliOverrides::default())?;
    let phase_dir = super::run::phase_directory(&args.input, args.phase_dir.as_deref());
    let summary = summarize(&app, &phase_dir)?;

    println!("✓ {} is valid.", args.input.display());
    print!("{summary}");
    Ok(())
}

/// Loads the surface and describes what a run of this input would compute.
fn summarize(app: &AppConfig, phase_dir: &std::path::Path) -> Result<String> {
    let model = app.structure.load_surface(phase_dir)?;
    let beams = generate(&model, &app.engine);
    let output = output_beams(&beams, &app.engine);
    let energies = app.engine.energies.energies();
    info!(
        bulk_layers = model.bulk.layers.len(),
        overlayer_layers = model.overlayer.layers.len(),
        scattering_types = model.phase_shifts.len(),
        "Input file is valid."
    );

    let mut out = format!(
        "  {} bulk layer(s), {} overlayer layer(s), {} scattering type(s)\n",
        model.bulk.layers.len(),
        model.overlayer.layers.len(),
        model.phase_shifts.len()
    );
    if let (Some(first), Some(last)) = (energies.first(), energies.last()) {
        out.push_str(&format!(
            "  {} energies from {:.1} to {:.1} eV, {} output beam(s)\n",
            energies.len(),
            hartree_to_ev(*first),
            hartree_to_ev(*last),
            output.len()
        ));
    }
    Ok(out)
}
