use crate::cli::RunArgs;
use crate::config::{CliOverrides, InputFile};
use crate::error::Result;
use crate::utils::progress::CliProgressHandler;
use leedpp::core::io::intensities::IvCurveFile;
use leedpp::core::io::traits::TableFile;
use leedpp::engine::progress::ProgressReporter;
use leedpp::workflows;
use std::path::Path;
use tracing::{info, warn};

pub fn run(args: RunArgs) -> Result<()> {
    info!("Loading input file {:?}", &args.input);
    let app = InputFile::from_file(&args.input)?.merge_with_cli(CliOverrides::from(&args))?;

    let phase_dir = phase_directory(&args.input, args.phase_dir.as_deref());
    info!("Reading phase shifts from {:?}", &phase_dir);
    let model = app.structure.load_surface(&phase_dir)?;

    let progress_handler = CliProgressHandler::new();
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    println!("Starting IV curve calculation...");
    info!("Invoking the core IV-curve workflow...");
    let curves = workflows::iv_curves::run(&model, &app.engine, &reporter)?;

    info!(
        energies = curves.table.energies.len(),
        beams = curves.beams.len(),
        "Workflow finished."
    );
    if !curves.skipped.is_empty() {
        warn!(skipped = curves.skipped.len(), "Some energies failed and were skipped.");
        println!(
            "Warning: {} energy point(s) failed and were left out of the table.",
            curves.skipped.len()
        );
    }

    IvCurveFile::write_to_path(&curves.table, &args.output)?;
    println!(
        "✓ IV curves for {} beam(s) at {} energies written to: {}",
        curves.beams.len(),
        curves.table.energies.len(),
        args.output.display()
    );
    Ok(())
}

/// The explicit phase directory, or the directory holding the input file.
pub fn phase_directory(input: &Path, explicit: Option<&Path>) -> std::path::PathBuf {
    match explicit {
        Some(dir) => dir.to_path_buf(),
        None => input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    }
}
