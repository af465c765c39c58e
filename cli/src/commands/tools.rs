//! Tools listing command

use anyhow::Result;
use appgen_core::ToolRegistry;
use colored::Colorize;
use tracing::info;

/// Show the tool manifest offered to the model
pub async fn tools_command() -> Result<()> {
    info!("Listing available tools");

    let registry = ToolRegistry::default();

    println!("🛠️  Available Tools\n");

    for definition in registry.describe_all() {
        println!("📦 {}", definition.signature().bold());
        println!("   {}", definition.description);
        for param in &definition.parameters {
            let required = if param.required { "required" } else { "optional" };
            println!(
                "     - {} ({}, {}): {}",
                param.name.cyan(),
                param.param_type.as_str(),
                required,
                param.description
            );
        }
        println!();
    }

    Ok(())
}
