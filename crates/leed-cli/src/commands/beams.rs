use crate::cli::BeamsArgs;
use crate::config::{CliOverrides, InputFile};
use crate::error::Result;
use leedpp::core::io::intensities::write_beam_list;
use leedpp::engine::beams::{generate, output_beams};
use std::fs::File;
use std::io::{self, BufWriter};
use tracing::info;

pub fn run(args: BeamsArgs) -> Result<()> {
    let app = InputFile::from_file(&args.input)?.merge_with_cli(CliOverrides::from(&args))?;
    let phase_dir = super::run::phase_directory(&args.input, args.phase_dir.as_deref());
    let model = app.structure.load_surface(&phase_dir)?;

    let beams = generate(&model, &app.engine);
    let output = output_beams(&beams, &app.engine);
    info!(
        generated = beams.len(),
        output = output.len(),
        sets = beams.num_sets,
        "Beam list ready."
    );

    match &args.output {
        Some(path) => {
            let mut writer = BufWriter::new(File::create(path)?);
            write_beam_list(&output.beams, &mut writer)?;
            println!("✓ {} output beam(s) written to: {}", output.len(), path.display());
        }
        None => write_beam_list(&output.beams, &mut io::stdout().lock())?,
    }
    Ok(())
}
