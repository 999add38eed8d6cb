//! Modules d'export (CSV, SQL, GeoJSON)

pub mod csv;
pub mod geojson;
pub mod sql;

pub use self::csv::{materialize_file, MaterializeStats};
pub use self::sql::SqlOptions;
