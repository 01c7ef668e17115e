pub mod genesis;
pub mod params;
pub mod query;
pub mod simulate;

use distr_core::SledStore;
use std::path::{Path, PathBuf};

pub type CliResult = Result<(), Box<dyn std::error::Error>>;

/// `--db` / DISTR_DB_PATH, else ~/.distr/data.
pub fn resolve_db_path(db: Option<PathBuf>) -> PathBuf {
    db.unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".distr")
            .join("data")
    })
}

/// Open an existing store; refuses to silently create an empty one.
pub fn open_existing_store(db: &Path) -> Result<SledStore, Box<dyn std::error::Error>> {
    if !db.exists() {
        return Err(format!("No reward store at {}", db.display()).into());
    }
    Ok(SledStore::open(db)?)
}
