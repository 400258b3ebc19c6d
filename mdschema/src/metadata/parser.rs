use super::types::MetadataDocument;
use crate::error::{MdSchemaError, Result};
use std::path::{Path, PathBuf};

/// Parse a metadata JSON file into a MetadataDocument
pub fn parse_metadata(path: &Path) -> Result<MetadataDocument> {
    let content = std::fs::read_to_string(path)?;
    parse_metadata_str(&content, &path.display().to_string())
}

/// Parse a metadata JSON string; `source` labels the document in errors.
pub fn parse_metadata_str(content: &str, source: &str) -> Result<MetadataDocument> {
    let mut document: MetadataDocument = serde_json::from_str(content)?;
    document.source = source.to_string();
    Ok(document)
}

/// List the `*.json` files directly inside `folder`, sorted by path.
pub fn discover_metadata_files(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(MdSchemaError::Config(format!(
            "Metadata folder does not exist: {}",
            folder.display()
        )));
    }

    let pattern = folder.join("*.json");
    let pattern = pattern.to_string_lossy();
    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .map_err(|e| MdSchemaError::Config(format!("Glob error: {e}")))?
        .filter_map(|r| r.ok())
        .filter(|p| p.is_file())
        .collect();
    files.sort();
    Ok(files)
}
