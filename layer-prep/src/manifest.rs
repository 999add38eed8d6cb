//! Manifeste des tables produites (`manifest.json`)

use std::path::Path;

use anyhow::{Context, Result};
use esri_json::GeometryKind;
use serde::{Deserialize, Serialize};

use crate::schema::{ColumnSpec, TableSpec};

/// Entrée du manifeste : un fichier source traité avec succès
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    /// Nom du fichier source
    pub file: String,
    pub table: String,
    pub geom: GeometryKind,
    pub columns: Vec<ColumnSpec>,
}

impl ManifestEntry {
    pub fn new(file: &str, spec: &TableSpec) -> Self {
        Self {
            file: file.to_string(),
            table: spec.name.clone(),
            geom: spec.geometry_kind,
            columns: spec.columns.clone(),
        }
    }
}

/// Écrit le manifeste en JSON indenté
pub fn save_manifest(entries: &[ManifestEntry], path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

/// Relit un manifeste existant
pub fn load_manifest(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    serde_json::from_str(&content).context("Failed to parse manifest JSON")
}
