//! Conversion géométrie Esri -> géométrie portable (GeoJSON)
//!
//! Le type Esri est implicite : il se déduit des champs présents
//! (`x`/`y`, `points`, `paths`, `rings`).

use serde_json::Value;

use crate::mercator;
use crate::types::{Position, PortableGeometry};

/// Convertit une géométrie Esri en géométrie portable, sans reprojection
///
/// Retourne `None` pour une entrée nulle, non-objet, vide ou de forme
/// inconnue. Une seule position mal formée invalide toute la géométrie.
pub fn esri_to_portable(value: &Value) -> Option<PortableGeometry> {
    let obj = value.as_object()?;

    if let (Some(x), Some(y)) = (
        obj.get("x").and_then(Value::as_f64),
        obj.get("y").and_then(Value::as_f64),
    ) {
        return Some(PortableGeometry::Point(Position::new(x, y)));
    }

    // Le premier tableau présent décide de la forme, même vide
    if let Some(points) = obj.get("points").and_then(Value::as_array) {
        return non_empty(points).and_then(positions).map(PortableGeometry::MultiPoint);
    }

    if let Some(paths) = obj.get("paths").and_then(Value::as_array) {
        let paths = non_empty(paths)?;
        let mut lines = paths
            .iter()
            .map(|p| p.as_array().and_then(|p| positions(p)))
            .collect::<Option<Vec<_>>>()?;
        if lines.len() == 1 {
            return lines.pop().map(PortableGeometry::LineString);
        }
        return Some(PortableGeometry::MultiLineString(lines));
    }

    if let Some(rings) = obj.get("rings").and_then(Value::as_array) {
        return non_empty(rings)?
            .iter()
            .map(|r| r.as_array().and_then(|r| positions(r)))
            .collect::<Option<Vec<_>>>()
            .map(PortableGeometry::Polygon);
    }

    None
}

/// Convertit puis reprojette si la géométrie semble en Web Mercator
pub fn to_portable(value: &Value) -> Option<PortableGeometry> {
    let mut geometry = esri_to_portable(value)?;
    mercator::reproject_if_mercator(&mut geometry);
    Some(geometry)
}

fn non_empty(values: &[Value]) -> Option<&[Value]> {
    (!values.is_empty()).then_some(values)
}

fn positions(values: &[Value]) -> Option<Vec<Position>> {
    values.iter().map(position).collect()
}

fn position(value: &Value) -> Option<Position> {
    let ordinates = value
        .as_array()?
        .iter()
        .map(Value::as_f64)
        .collect::<Option<Vec<f64>>>()?;
    Position::from_ordinates(ordinates)
}
