//! `import` subcommand: loads a JSON block dump into the chain index.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use chainsight_explorer::storage::{import_blocks, read_dump, ChainStore};

use crate::cli::ImportArgs;

/// Opens (or creates) the chain index under `data_dir`.
pub fn open_store(data_dir: &Path) -> Result<ChainStore> {
    let db_path = data_dir.join("db");
    std::fs::create_dir_all(&db_path)
        .with_context(|| format!("failed to create database directory: {}", db_path.display()))?;
    let store = ChainStore::open(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))?;
    tracing::info!(path = %db_path.display(), "chain index opened");
    Ok(store)
}

/// Reads `args.file` and stores every block in it.
pub fn run_import(args: &ImportArgs) -> Result<usize> {
    let store = open_store(&args.data_dir)?;
    let file = File::open(&args.file)
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let blocks = read_dump(BufReader::new(file))
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    let count = import_blocks(&store, blocks).context("failed to store blocks")?;
    store.flush().context("failed to flush chain index")?;
    Ok(count)
}
