//! Init command implementation.

use crate::config::{CONFIG_FILENAME, DEFAULT_DB_FILENAME, WORKSPACE_DIR_NAME, config_template};
use crate::error::{Result, SplitError};
use crate::storage::SqliteStorage;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const GITIGNORE: &str = "# Database
*.db
*.db-shm
*.db-wal
";

#[derive(Serialize)]
struct InitOutput {
    workspace: PathBuf,
    database: PathBuf,
}

/// Execute the init command.
///
/// # Errors
///
/// Returns `AlreadyInitialized` if a database exists and `force` is not
/// set, or an error if the directory or database cannot be created.
pub fn execute(force: bool, json: bool, root_dir: Option<&Path>) -> Result<()> {
    let base_dir = root_dir.unwrap_or_else(|| Path::new("."));
    let workspace = base_dir.join(WORKSPACE_DIR_NAME);
    let db_path = workspace.join(DEFAULT_DB_FILENAME);

    if workspace.exists() {
        if db_path.exists() {
            if !force {
                return Err(SplitError::AlreadyInitialized { path: db_path });
            }
            for suffix in ["", "-wal", "-shm"] {
                let path = PathBuf::from(format!("{}{suffix}", db_path.display()));
                if path.exists() {
                    fs::remove_file(&path)?;
                }
            }
            info!(path = %db_path.display(), "Removed existing database");
        }
    } else {
        fs::create_dir_all(&workspace)?;
    }

    // Opening applies the schema.
    SqliteStorage::open(&db_path)?;

    let config_path = workspace.join(CONFIG_FILENAME);
    if !config_path.exists() {
        fs::write(config_path, config_template())?;
    }

    let gitignore_path = workspace.join(".gitignore");
    if !gitignore_path.exists() {
        fs::write(gitignore_path, GITIGNORE)?;
    }

    if json {
        return super::print_json(&InitOutput {
            workspace,
            database: db_path,
        });
    }

    println!("Initialized splitticket workspace in {WORKSPACE_DIR_NAME}/");
    Ok(())
}
