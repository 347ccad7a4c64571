use std::path::PathBuf;

use crate::cli::commands::InitArgs;
use crate::store::{JsonStore, json_store::BOARD_DIR};

/// Initialize a board in the current directory (or the given one): a
/// `tablero/` directory holding the default config and an empty record
/// set.
pub fn cmd_init(args: InitArgs, dir: Option<&str>) -> Result<(), Box<dyn std::error::Error>> {
    let root: PathBuf = match dir {
        Some(d) => std::fs::canonicalize(d)
            .map_err(|e| format!("cannot resolve path '{}': {}", d, e))?,
        None => std::env::current_dir()?,
    };

    let board_dir = root.join(BOARD_DIR);
    if board_dir.exists() && !args.force {
        return Err(format!(
            "{} already exists (use --force to reinitialize)",
            board_dir.display()
        )
        .into());
    }

    let name = match args.name {
        Some(name) => name,
        None => root
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("tablero")
            .to_string(),
    };

    JsonStore::init(&root, &name)?;
    println!("initialized board '{}' in {}", name, board_dir.display());
    Ok(())
}
