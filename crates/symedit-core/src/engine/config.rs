use thiserror::Error;

pub const DEFAULT_INVARIANCE_TOLERANCE: f64 = 1.96e-6;
pub const DEFAULT_CONSTRAINT_TOLERANCE: f64 = 1e-10;
pub const DEFAULT_ROUND_TRIP_TOLERANCE: f64 = 1e-8;
pub const DEFAULT_PATHWAY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid value for '{name}': {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub invariance_tolerance: f64,
    pub constraint_tolerance: f64,
    pub round_trip_tolerance: f64,
    pub pathway_tolerance: f64,
    pub allow_projection: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            invariance_tolerance: DEFAULT_INVARIANCE_TOLERANCE,
            constraint_tolerance: DEFAULT_CONSTRAINT_TOLERANCE,
            round_trip_tolerance: DEFAULT_ROUND_TRIP_TOLERANCE,
            pathway_tolerance: DEFAULT_PATHWAY_TOLERANCE,
            allow_projection: true,
        }
    }
}

#[derive(Default)]
pub struct EngineConfigBuilder {
    invariance_tolerance: Option<f64>,
    constraint_tolerance: Option<f64>,
    round_trip_tolerance: Option<f64>,
    pathway_tolerance: Option<f64>,
    allow_projection: Option<bool>,
}

impl EngineConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invariance_tolerance(mut self, value: f64) -> Self {
        self.invariance_tolerance = Some(value);
        self
    }
    pub fn constraint_tolerance(mut self, value: f64) -> Self {
        self.constraint_tolerance = Some(value);
        self
    }
    pub fn round_trip_tolerance(mut self, value: f64) -> Self {
        self.round_trip_tolerance = Some(value);
        self
    }
    pub fn pathway_tolerance(mut self, value: f64) -> Self {
        self.pathway_tolerance = Some(value);
        self
    }
    pub fn allow_projection(mut self, allow: bool) -> Self {
        self.allow_projection = Some(allow);
        self
    }

    pub fn build(self) -> Result<EngineConfig, ConfigError> {
        let defaults = EngineConfig::default();
        Ok(EngineConfig {
            invariance_tolerance: validated(
                "invariance_tolerance",
                self.invariance_tolerance,
                defaults.invariance_tolerance,
            )?,
            constraint_tolerance: validated(
                "constraint_tolerance",
                self.constraint_tolerance,
                defaults.constraint_tolerance,
            )?,
            round_trip_tolerance: validated(
                "round_trip_tolerance",
                self.round_trip_tolerance,
                defaults.round_trip_tolerance,
            )?,
            pathway_tolerance: validated(
                "pathway_tolerance",
                self.pathway_tolerance,
                defaults.pathway_tolerance,
            )?,
            allow_projection: self.allow_projection.unwrap_or(defaults.allow_projection),
        })
    }
}

fn validated(name: &'static str, value: Option<f64>, default: f64) -> Result<f64, ConfigError> {
    let value = value.unwrap_or(default);
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::InvalidValue {
            name,
            reason: format!("expected a finite positive number, got {}", value),
        });
    }
    Ok(value)
}
