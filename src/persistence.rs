// File: src/persistence.rs
use crate::error::Result;
use crate::oracle::NeighbourTable;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::info;

/// Writes the neighbour table next to `path` and renames it into place,
/// so an interrupted run never leaves a truncated cache behind.
pub fn save_neighbour_cache(table: &NeighbourTable, path: &Path) -> Result<()> {
    let parent_dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(&temp_file);
        bincode::serialize_into(&mut writer, table)?;
        writer.flush()?;
    }
    temp_file.persist(path).map_err(io::Error::from)?;
    info!(path = %path.display(), words = table.len(), "neighbour cache saved");
    Ok(())
}

pub fn load_neighbour_cache(path: &Path) -> Result<NeighbourTable> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let table: NeighbourTable = bincode::deserialize_from(reader)?;
    info!(path = %path.display(), words = table.len(), "neighbour cache loaded");
    Ok(table)
}
