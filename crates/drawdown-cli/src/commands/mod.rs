pub mod carriers;
pub mod config;
pub mod plan;
pub mod run;

use clap::Args;
use drawdown_core::RateInputs;

/// Removal inputs; any flag left out falls back to the `inputs` config section.
#[derive(Args, Debug, Clone, Default)]
pub struct InputArgs {
    /// Volume delivered per minute
    #[arg(long)]
    pub flow_rate: Option<f64>,
    /// Mass per unit volume
    #[arg(long)]
    pub concentration: Option<f64>,
    /// Mass before removal
    #[arg(long)]
    pub start_mass: Option<f64>,
    /// Mass to stop at
    #[arg(long)]
    pub target_mass: Option<f64>,
}

impl InputArgs {
    pub fn resolve(&self, defaults: RateInputs) -> RateInputs {
        RateInputs {
            flow_rate: self.flow_rate.unwrap_or(defaults.flow_rate),
            concentration: self.concentration.unwrap_or(defaults.concentration),
            start_mass: self.start_mass.unwrap_or(defaults.start_mass),
            target_mass: self.target_mass.unwrap_or(defaults.target_mass),
        }
    }
}
