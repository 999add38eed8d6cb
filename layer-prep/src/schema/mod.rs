//! Schéma inféré d'un fichier : colonnes, types et famille de géométrie

mod infer;
mod scan;

pub use infer::{classify, trim_ascii_whitespace, TypeEvidence, ValueKind};
pub use scan::{scan_file, scan_reader, ScanContext, ScanStats, ScannedTable};

use std::fmt;

use esri_json::GeometryKind;
use serde::{Deserialize, Serialize};

/// Type SQL d'une colonne d'attribut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Numeric,
    Boolean,
}

impl ColumnType {
    /// Type PostgreSQL correspondant
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// Colonne figée : nom canonique, clé source d'origine, type inféré
///
/// Sérialisée telle qu'attendue dans le manifeste (`name`, `source`, `type`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub source: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

/// Schéma figé d'une table, produit par la passe de scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub name: String,
    /// Triées par nom canonique
    pub columns: Vec<ColumnSpec>,
    pub geometry_kind: GeometryKind,
}

impl TableSpec {
    /// Noms des colonnes d'attributs dans l'ordre du schéma
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Colonnes chargées par COPY : attributs puis les deux colonnes géométriques
    pub fn copy_columns(&self) -> Vec<&str> {
        self.column_names()
            .chain(["geom_geojson", "geom_esri"])
            .collect()
    }
}
