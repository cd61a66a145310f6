use leedpp::engine::config::{DoublingConfig, EngineConfigBuilder};

/// Values used when neither the input file nor the command line sets them.
/// Energies in eV, angles in degrees.
pub struct DefaultsConfig {
    pub energy_step: f64,
    pub polar: f64,
    pub azimuth: f64,
    pub l_max: usize,
    pub epsilon: f64,
    pub doubling_tolerance: f64,
    pub max_doublings: usize,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        let doubling = DoublingConfig::default();
        Self {
            energy_step: 2.0,
            polar: 0.0,
            azimuth: 0.0,
            l_max: EngineConfigBuilder::DEFAULT_L_MAX,
            epsilon: EngineConfigBuilder::DEFAULT_EPSILON,
            doubling_tolerance: doubling.tolerance,
            max_doublings: doubling.max_doublings,
        }
    }
}
