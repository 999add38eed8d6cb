//! Configuration du système
//!
//! Fichier JSON optionnel, surchargé par l'environnement (`.env` inclus) puis
//! par les options de la ligne de commande.

use serde::{Deserialize, Serialize};
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::export::SqlOptions;
use crate::layers::LayerDescriptor;

/// Variable d'environnement : schéma PostgreSQL cible
pub const ENV_SCHEMA: &str = "LAYER_PREP_SCHEMA";
/// Variable d'environnement : SRID de la colonne géométrique
pub const ENV_SRID: &str = "LAYER_PREP_SRID";

/// Configuration principale
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Schéma PostgreSQL cible
    pub schema: String,

    /// SRID appliqué aux géométries chargées
    pub srid: u32,

    /// Recréer les tables à chaque chargement
    pub drop_tables: bool,

    /// Extensions des fichiers d'entrée acceptées (sans le point)
    pub extensions: Vec<String>,

    /// Descripteurs de couches déclarés
    pub layers: Vec<LayerDescriptor>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            srid: 4326,
            drop_tables: false,
            extensions: vec!["jsonl".to_string(), "ndjson".to_string()],
            layers: Vec::new(),
        }
    }
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Fichier si donné, valeurs par défaut sinon ; puis surcharges d'environnement
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Applique les surcharges `LAYER_PREP_*`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(schema) = lookup(ENV_SCHEMA).filter(|s| !s.trim().is_empty()) {
            self.schema = schema.trim().to_string();
        }
        if let Some(srid) = lookup(ENV_SRID).filter(|s| !s.trim().is_empty()) {
            self.srid = srid
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_SRID, srid))?;
        }
        Ok(())
    }

    /// Vérifie que la configuration est utilisable pour générer du SQL
    pub fn validate(&self) -> Result<()> {
        if !is_plain_identifier(&self.schema) {
            bail!(
                "Invalid schema name: {} (expected lower-case letters, digits and underscores)",
                self.schema
            );
        }
        if self.srid == 0 {
            bail!("Invalid SRID: 0");
        }
        if self.extensions.is_empty() {
            bail!("At least one input extension is required");
        }
        Ok(())
    }

    /// Vrai si le nom de fichier porte une des extensions acceptées
    pub fn accepts(&self, file_name: &str) -> bool {
        self.matching_extension(file_name).is_some()
    }

    /// Extension acceptée portée par le nom de fichier (comparaison sans casse)
    pub fn matching_extension(&self, file_name: &str) -> Option<&str> {
        let (_, ext) = file_name.rsplit_once('.')?;
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.'))
            .find(|e| e.eq_ignore_ascii_case(ext))
    }

    pub fn sql_options(&self) -> SqlOptions {
        SqlOptions {
            schema: self.schema.clone(),
            srid: self.srid,
            drop_tables: self.drop_tables,
        }
    }
}

/// Identifiant SQL utilisable sans guillemets
fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
