use std::path::PathBuf;

use crate::cli::db_path;
use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{load_settings, save_settings, shellexpand_path};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let mut settings = load_settings();
    if let Some(dir) = data_dir {
        settings.data_dir = shellexpand_path(&dir);
    }
    save_settings(&settings)?;

    let resolved = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&resolved)?;
    std::fs::create_dir_all(settings.exports_dir())?;

    let conn = get_connection(&db_path(&settings))?;
    init_db(&conn)?;

    tracing::info!(data_dir = %resolved.display(), "database initialized");
    println!("Initialized docket at {}", resolved.display());
    Ok(())
}
