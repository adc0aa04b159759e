use clap::Args;
use drawdown_core::{Config, RateError, RateResult};

use super::InputArgs;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub inputs: InputArgs,
    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load_or_default();
    let inputs = args.inputs.resolve(config.inputs);
    inputs.validate()?;

    let result = RateResult::from_inputs(&inputs);
    let outcome = result.target_duration();

    if args.json {
        let json = serde_json::json!({
            "inputs": inputs,
            "mass_removal_rate": result.mass_removal_rate,
            "mass_to_remove": result.mass_to_remove,
            "target_duration_secs": result.target_duration_secs,
            "error": outcome.as_ref().err().map(|e| e.to_string()),
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("Mass removal rate: {:.2} per min", result.mass_removal_rate);
        println!("Mass to remove:    {:.2}", result.mass_to_remove);
        if let Ok(secs) = outcome {
            println!("Target duration:   {secs:.2} s");
        }
    }

    // An impossible plan is a failure; an incomplete one is not.
    match outcome {
        Err(e @ RateError::InvalidRange { .. }) => Err(e.into()),
        Err(e) if !args.json => {
            println!("{e}");
            Ok(())
        }
        _ => Ok(()),
    }
}
