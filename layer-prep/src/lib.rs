//! # layer-prep
//!
//! Préparation d'exports JSON Esri ligne par ligne (`.jsonl`) pour PostGIS.
//!
//! ## Features
//!
//! - Normalisation des clés d'attributs en noms de colonnes sûrs
//! - Inférence de schéma (text / numeric / boolean) en un passage
//! - CSV typés avec géométrie GeoJSON (Web Mercator reprojeté en WGS84)
//! - `schema.sql`, `load.sql` et `manifest.json` déterministes
//! - Export GeoJSON standalone et génération de `layers.json`
//!
//! ## Usage CLI
//!
//! ```bash
//! # Préparation (commande par défaut)
//! layer-prep --input data/raw --output data/prepared
//!
//! # Export GeoJSON (sans base de données)
//! layer-prep geojson --input data/raw --output ./geojson/
//!
//! # Descripteurs de couches
//! layer-prep layers --manifest data/prepared/manifest.json
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod layers;
pub mod manifest;
pub mod naming;
pub mod pipeline;
pub mod report;
pub mod schema;

pub use config::Config;
pub use error::PipelineError;
pub use manifest::ManifestEntry;
pub use pipeline::{prepare, PrepareOptions};
pub use report::{RunReport, RunStatus};
pub use schema::{ColumnSpec, ColumnType, TableSpec};
