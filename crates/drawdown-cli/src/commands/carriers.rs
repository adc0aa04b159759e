use drawdown_core::Carrier;

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    for carrier in Carrier::ALL {
        println!("{:<12} {}", carrier.name(), carrier.gateway_domain());
    }
    Ok(())
}
