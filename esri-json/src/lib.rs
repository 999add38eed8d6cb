//! # esri-json
//!
//! Lecture de features Esri JSON ligne par ligne (exports ArcGIS REST) et
//! conversion de leur géométrie vers une représentation GeoJSON portable.
//!
//! ## Features
//!
//! - Lecture en streaming (`RecordReader`), lignes mal formées signalées sans arrêt
//! - Conversion `x/y`, `points`, `paths`, `rings` vers Point, MultiPoint,
//!   LineString, MultiLineString, Polygon
//! - Détection des coordonnées Web Mercator (|x| ou |y| > 180) et inversion
//!   vers longitude/latitude
//! - Décodage des cellules géométriques côté consommateur, avec les mêmes règles
//! - Types `geo` et `geojson` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use esri_json::{to_portable, RecordReader};
//! use std::path::Path;
//!
//! for record in RecordReader::open(Path::new("parcels.jsonl"))? {
//!     let record = record?;
//!     if let Some(geom) = record.geometry.as_ref().and_then(to_portable) {
//!         println!("{}", geom.to_json_string()?);
//!     }
//! }
//! ```

pub mod convert;
pub mod decode;
pub mod error;
pub mod mercator;
pub mod reader;
mod tree;
pub mod types;

pub use convert::{esri_to_portable, to_portable};
pub use decode::{decode_value, read_geometry};
pub use error::EsriError;
pub use mercator::{reproject_if_mercator, web_mercator_to_lon_lat};
pub use reader::RecordReader;
pub use types::{GeometryKind, Position, PortableGeometry, SourceRecord};
