//! The `status` and `config` commands.

use civic::{Governance, GovernanceConfig};

/// Prints governance state as JSON.
pub fn show_status(config: GovernanceConfig) -> Result<(), Box<dyn std::error::Error>> {
    let governance = Governance::from_config(config);
    println!("{}", serde_json::to_string_pretty(&governance.status())?);
    Ok(())
}

/// Prints the effective configuration as TOML.
pub fn show_config(config: &GovernanceConfig) -> Result<(), Box<dyn std::error::Error>> {
    print!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
