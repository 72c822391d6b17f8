//! Component command implementation.

use crate::cli::ComponentCommands;
use crate::config;
use crate::error::Result;

/// Execute a component subcommand.
///
/// # Errors
///
/// Returns an error if the component already exists (add) or the query
/// fails.
pub fn execute(command: &ComponentCommands, json: bool, cli: &config::CliOverrides) -> Result<()> {
    let (mut storage, _layer, _paths) = config::open_storage(cli)?;

    match command {
        ComponentCommands::Add { name } => {
            let component = storage.add_component(name)?;
            if json {
                return super::print_json(&component);
            }
            println!("Added component {}", component.name);
        }
        ComponentCommands::List => {
            let components = storage.list_components()?;
            if json {
                return super::print_json(&components);
            }
            if components.is_empty() {
                println!("No components.");
            }
            for component in &components {
                println!("{}", component.name);
            }
        }
    }
    Ok(())
}
