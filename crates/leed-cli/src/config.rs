mod defaults;

use crate::cli::{BeamsArgs, RunArgs};
use crate::error::{CliError, Result};
use defaults::DefaultsConfig;
use leedpp::core::constants::ev_to_hartree;
use leedpp::core::io::structure::StructureDocument;
use leedpp::engine::config::{
    DoublingConfig, EnergyRange, EngineConfig, EngineConfigBuilder, FailurePolicy, Incidence,
    ScatteringOrder,
};
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialEnergyRange {
    initial: Option<f64>,
    #[serde(rename = "final")]
    final_energy: Option<f64>,
    step: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialIncidence {
    polar: Option<f64>,
    azimuth: Option<f64>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct PartialDoublingConfig {
    tolerance: Option<f64>,
    #[serde(rename = "max-doublings")]
    max_doublings: Option<usize>,
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
enum PartialOrder {
    Full,
    Single,
}

impl From<PartialOrder> for ScatteringOrder {
    fn from(p: PartialOrder) -> Self {
        match p {
            PartialOrder::Full => ScatteringOrder::Full,
            PartialOrder::Single => ScatteringOrder::Single,
        }
    }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "kebab-case")]
enum PartialFailurePolicy {
    Abort,
    Skip,
}

impl From<PartialFailurePolicy> for FailurePolicy {
    fn from(p: PartialFailurePolicy) -> Self {
        match p {
            PartialFailurePolicy::Abort => FailurePolicy::Abort,
            PartialFailurePolicy::Skip => FailurePolicy::Skip,
        }
    }
}

/// Calculation parameters as written in the input file: energies in eV,
/// angles in degrees.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PartialRunConfig {
    energies: Option<PartialEnergyRange>,
    incidence: Option<PartialIncidence>,
    #[serde(rename = "l-max")]
    l_max: Option<usize>,
    epsilon: Option<f64>,
    doubling: Option<PartialDoublingConfig>,
    order: Option<PartialOrder>,
    #[serde(rename = "failure-policy")]
    failure_policy: Option<PartialFailurePolicy>,
}

/// A complete input file.
///
/// ```toml
/// [structure]
/// # see `StructureDocument`
///
/// [parameters]
/// energies = { initial = 40.0, final = 200.0, step = 4.0 }
/// incidence = { polar = 0.0, azimuth = 0.0 }
/// l-max = 8
/// ```
#[derive(Deserialize, Debug, Clone)]
#[serde(deny_unknown_fields)]
pub struct InputFile {
    pub structure: StructureDocument,
    #[serde(default)]
    pub parameters: PartialRunConfig,
}

/// Command-line values that take precedence over the input file.
#[derive(Debug, Default, Clone, Copy)]
pub struct CliOverrides<'a> {
    pub set_values: &'a [String],
    pub single_scattering: bool,
    pub skip_failures: bool,
}

impl<'a> From<&'a RunArgs> for CliOverrides<'a> {
    fn from(args: &'a RunArgs) -> Self {
        Self {
            set_values: &args.set_values,
            single_scattering: args.single_scattering,
            skip_failures: args.skip_failures,
        }
    }
}

impl<'a> From<&'a BeamsArgs> for CliOverrides<'a> {
    fn from(args: &'a BeamsArgs) -> Self {
        Self {
            set_values: &args.set_values,
            ..Self::default()
        }
    }
}

/// The merged configuration of one run.
pub struct AppConfig {
    pub structure: StructureDocument,
    pub engine: EngineConfig,
}

impl InputFile {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading input file: {:?}", path);
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }

    pub fn merge_with_cli(mut self, overrides: CliOverrides) -> Result<AppConfig> {
        self.parameters.apply_set_values(overrides.set_values)?;
        let defaults = DefaultsConfig::default();
        let p = self.parameters;

        let energies = p.energies.unwrap_or_default();
        let initial = energies.initial.ok_or_else(|| {
            CliError::Config("`parameters.energies.initial` is required.".to_string())
        })?;
        let final_energy = energies.final_energy.ok_or_else(|| {
            CliError::Config("`parameters.energies.final` is required.".to_string())
        })?;
        let step = energies.step.unwrap_or(defaults.energy_step);

        let incidence = p.incidence.unwrap_or_default();
        let doubling = p.doubling.unwrap_or_default();

        let order = if overrides.single_scattering {
            ScatteringOrder::Single
        } else {
            p.order.map(Into::into).unwrap_or_default()
        };
        let failure_policy = if overrides.skip_failures {
            FailurePolicy::Skip
        } else {
            p.failure_policy.map(Into::into).unwrap_or_default()
        };

        let engine = EngineConfigBuilder::new()
            .energies(EnergyRange {
                start: ev_to_hartree(initial),
                end: ev_to_hartree(final_energy),
                step: ev_to_hartree(step),
            })
            .incidence(Incidence {
                polar: incidence.polar.unwrap_or(defaults.polar).to_radians(),
                azimuth: incidence.azimuth.unwrap_or(defaults.azimuth).to_radians(),
            })
            .l_max(p.l_max.unwrap_or(defaults.l_max))
            .epsilon(p.epsilon.unwrap_or(defaults.epsilon))
            .doubling(DoublingConfig {
                tolerance: doubling.tolerance.unwrap_or(defaults.doubling_tolerance),
                max_doublings: doubling.max_doublings.unwrap_or(defaults.max_doublings),
            })
            .order(order)
            .failure_policy(failure_policy)
            .build()
            .map_err(|e| CliError::Config(e.to_string()))?;

        Ok(AppConfig {
            structure: self.structure,
            engine,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value)))
}

impl PartialRunConfig {
    fn apply_set_values(&mut self, set_values: &[String]) -> Result<()> {
        for kv_pair in set_values {
            let Some((key, value_str)) = kv_pair.split_once('=') else {
                return Err(CliError::Config(format!(
                    "Invalid --set format: '{}'. Expected KEY=VALUE.",
                    kv_pair
                )));
            };

            match key {
                "parameters.energies.initial" => {
                    self.energies.get_or_insert_with(Default::default).initial =
                        Some(parse_value(key, value_str, "float")?);
                }
                "parameters.energies.final" => {
                    self.energies.get_or_insert_with(Default::default).final_energy =
                        Some(parse_value(key, value_str, "float")?);
                }
                "parameters.energies.step" => {
                    self.energies.get_or_insert_with(Default::default).step =
                        Some(parse_value(key, value_str, "float")?);
                }
                "parameters.incidence.polar" => {
                    self.incidence.get_or_insert_with(Default::default).polar =
                        Some(parse_value(key, value_str, "float")?);
                }
                "parameters.incidence.azimuth" => {
                    self.incidence.get_or_insert_with(Default::default).azimuth =
                        Some(parse_value(key, value_str, "float")?);
                }
                "parameters.l-max" => {
                    self.l_max = Some(parse_value(key, value_str, "integer")?);
                }
                "parameters.epsilon" => {
                    self.epsilon = Some(parse_value(key, value_str, "float")?);
                }
                "parameters.doubling.tolerance" => {
                    self.doubling.get_or_insert_with(Default::default).tolerance =
                        Some(parse_value(key, value_str, "float")?);
                }
                "parameters.doubling.max-doublings" => {
                    self.doubling.get_or_insert_with(Default::default).max_doublings =
                        Some(parse_value(key, value_str, "integer")?);
                }
                "parameters.order" => {
                    self.order = Some(match value_str {
                        "full" => PartialOrder::Full,
                        "single" => PartialOrder::Single,
                        _ => {
                            return Err(CliError::Config(format!(
                                "Invalid value for {}: '{}' (expected 'full' or 'single')",
                                key, value_str
                            )));
                        }
                    });
                }
                "parameters.failure-policy" => {
                    self.failure_policy = Some(match value_str {
                        "abort" => PartialFailurePolicy::Abort,
                        "skip" => PartialFailurePolicy::Skip,
                        _ => {
                            return Err(CliError::Config(format!(
                                "Invalid value for {}: '{}' (expected 'abort' or 'skip')",
                                key, value_str
                            )));
                        }
                    });
                }
                _ => {
                    return Err(CliError::Config(format!(
                        "Unsupported configuration key for --set: '{}'",
                        key
                    )));
                }
            }
        }
        Ok(())
    }
}
