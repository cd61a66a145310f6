use crate::core::constants::{E_TOLERANCE, LD_MAX_DOUBLINGS, LD_TOLERANCE};
use std::f64::consts::FRAC_PI_2;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("Invalid value for '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

/// Incident energies in Hartree: `start`, `start + step`, ... up to `end`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyRange {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl EnergyRange {
    /// The energy list. The last point is included when it lies within
    /// [`E_TOLERANCE`] of `end`.
    pub fn energies(&self) -> Vec<f64> {
        if self.step <= 0.0 {
            return vec![self.start];
        }
        let count = ((self.end - self.start + E_TOLERANCE) / self.step).floor();
        let count = if count < 0.0 { 0 } else { count as usize };
        (0..=count)
            .map(|i| self.start + i as f64 * self.step)
            .collect()
    }
}

/// Direction of the incident beam, in radians. The polar angle is measured
/// from the surface normal.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Incidence {
    pub polar: f64,
    pub azimuth: f64,
}

/// Convergence controls for the periodic bulk doubling.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoublingConfig {
    /// Largest allowed element-wise change of the reflection matrix between
    /// two doublings.
    pub tolerance: f64,
    /// Maximum number of doublings (the stack reaches `2^n` periods).
    pub max_doublings: usize,
}

impl Default for DoublingConfig {
    fn default() -> Self {
        Self {
            tolerance: LD_TOLERANCE,
            max_doublings: LD_MAX_DOUBLINGS,
        }
    }
}

/// Multiple-scattering order used inside and between layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScatteringOrder {
    /// Full dynamical theory.
    #[default]
    Full,
    /// Kinematic limit: every electron scatters at most once.
    Single,
}

/// What to do when one energy point fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Abort the whole run on the first failing energy.
    #[default]
    Abort,
    /// Skip the failing energy, record it, and continue.
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub energies: EnergyRange,
    pub incidence: Incidence,
    /// Global angular-momentum cutoff.
    pub l_max: usize,
    /// Accuracy target for beam selection, lattice-sum radii and `l` cutoffs.
    pub epsilon: f64,
    pub doubling: DoublingConfig,
    pub order: ScatteringOrder,
    pub failure_policy: FailurePolicy,
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    energies: Option<EnergyRange>,
    incidence: Option<Incidence>,
    l_max: Option<usize>,
    epsilon: Option<f64>,
    doubling: Option<DoublingConfig>,
    order: Option<ScatteringOrder>,
    failure_policy: Option<FailurePolicy>,
}

impl EngineConfigBuilder {
    pub const DEFAULT_L_MAX: usize = 8;
    pub const DEFAULT_EPSILON: f64 = 1e-2;
    pub const MAX_L_MAX: usize = 30;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn energies(mut self, range: EnergyRange) -> Self {
        self.energies = Some(range);
        self
    }
    pub fn incidence(mut self, incidence: Incidence) -> Self {
        self.incidence = Some(incidence);
        self
    }
    pub fn l_max(mut self, l_max: usize) -> Self {
        self.l_max = Some(l_max);
        self
    }
    pub fn epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = Some(epsilon);
        self
    }
    pub fn doubling(mut self, doubling: DoublingConfig) -> Self {
        self.doubling = Some(doubling);
        self
    }
    pub fn order(mut self, order: ScatteringOrder) -> Self {
        self.order = Some(order);
        self
    }
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = Some(policy);
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let energies = self
            .energies
            .ok_or(ConfigError::MissingParameter("energies"))?;
        if energies.start <= 0.0 {
            return Err(invalid("energies", "the initial energy must be positive"));
        }
        if energies.end < energies.start {
            return Err(invalid("energies", "the final energy is below the initial energy"));
        }
        if energies.step <= 0.0 && energies.end > energies.start + E_TOLERANCE {
            return Err(invalid("energies", "the energy step must be positive"));
        }

        let incidence = self.incidence.unwrap_or_default();
        if !(0.0..FRAC_PI_2).contains(&incidence.polar) {
            return Err(invalid("incidence", "the polar angle must lie in [0°, 90°)"));
        }

        let l_max = self.l_max.unwrap_or(Self::DEFAULT_L_MAX);
        if l_max > Self::MAX_L_MAX {
            return Err(invalid(
                "l_max",
                format!("{l_max} exceeds the supported maximum of {}", Self::MAX_L_MAX),
            ));
        }

        let epsilon = self.epsilon.unwrap_or(Self::DEFAULT_EPSILON);
        if !(epsilon > 0.0 && epsilon < 1.0) {
            return Err(invalid("epsilon", "must lie strictly between 0 and 1"));
        }

        let doubling = self.doubling.unwrap_or_default();
        if doubling.tolerance <= 0.0 || doubling.max_doublings == 0 {
            return Err(invalid(
                "doubling",
                "tolerance must be positive and at least one doubling allowed",
            ));
        }

        Ok(EngineConfig {
            energies,
            incidence,
            l_max,
            epsilon,
            doubling,
            order: self.order.unwrap_or_default(),
            failure_policy: self.failure_policy.unwrap_or_default(),
        })
    }
}

fn invalid(name: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidParameter {
        name,
        reason: reason.into(),
    }
}
