use crate::cli::RfactorArgs;
use crate::error::{CliError, Result};
use leedpp::core::constants::{ev_to_hartree, hartree_to_ev};
use leedpp::core::io::intensities::IvCurveFile;
use leedpp::core::io::traits::TableFile;
use leedpp::engine::config::EnergyRange;
use leedpp::workflows::rfactor::{self, RFactorOptions, RFactorReport};
use tracing::info;

pub fn run(args: RfactorArgs) -> Result<()> {
    let options = options_from_args(&args)?;
    info!("Reading computed curves from {:?}", &args.theory);
    let theory = IvCurveFile::read_from_path(&args.theory)?;
    info!("Reading measured curves from {:?}", &args.experiment);
    let experiment = IvCurveFile::read_from_path(&args.experiment)?;

    let report = rfactor::run(&theory, &experiment, &options)?;
    print!("{}", render_report(&report));
    Ok(())
}

fn options_from_args(args: &RfactorArgs) -> Result<RFactorOptions> {
    if args.shift_step <= 0.0 {
        return Err(CliError::Config(format!(
            "--shift-step must be positive (got {})",
            args.shift_step
        )));
    }
    Ok(RFactorOptions {
        width: ev_to_hartree(args.width),
        shifts: EnergyRange {
            start: ev_to_hartree(args.shift_min),
            end: ev_to_hartree(args.shift_max),
            step: ev_to_hartree(args.shift_step),
        },
        normalize: !args.no_normalize,
    })
}

fn render_report(report: &RFactorReport) -> String {
    let mut out = format!(
        "Optimal shift: {:+.2} eV\nR factor (MSE): {:.6e}\n\n{:<16} {:>8} {:>14}\n",
        hartree_to_ev(report.shift),
        report.average,
        "beam",
        "points",
        "r-factor"
    );
    for beam in &report.beams {
        out.push_str(&format!(
            "({:>6.3},{:>6.3})  {:>8} {:>14.6e}\n",
            beam.beam.0, beam.beam.1, beam.points, beam.r_factor
        ));
    }
    out
}
