//! `devices` subcommand: list connected Luxafor devices.

use std::path::Path;

use super::{DevicesOutput, Result, enumerate_devices, load_config, print_json};

pub(super) fn cmd_devices(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let devices = enumerate_devices(&config.selector());

    if json {
        return print_json(&DevicesOutput {
            count: devices.len(),
            devices,
        });
    }

    if devices.is_empty() {
        println!("No Luxafor devices found.");
        return Ok(());
    }

    println!(
        "Found {} Luxafor device{}:",
        devices.len(),
        if devices.len() == 1 { "" } else { "s" }
    );
    println!();

    for (i, dev) in devices.iter().enumerate() {
        println!("  [{}] {}", i + 1, dev.path);
        if let Some(ref product) = dev.product {
            println!("      Product: {product}");
        }
        if let Some(ref serial) = dev.serial {
            println!("      Serial:  {serial}");
        }
    }

    Ok(())
}
