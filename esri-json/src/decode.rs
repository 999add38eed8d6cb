//! Lecture des géométries côté consommateur
//!
//! Une cellule de géométrie peut contenir du GeoJSON (texte ou objet) ou une
//! géométrie Esri. Les mêmes règles de conversion et de détection Web
//! Mercator que l'import s'appliquent.

use serde_json::Value;

use crate::convert::esri_to_portable;
use crate::mercator;
use crate::types::PortableGeometry;

/// Décode une valeur de cellule en géométrie portable, sans reprojection
///
/// - texte commençant par `{` ou `[` : décodé comme JSON puis traité comme objet
/// - objet avec `type` et `coordinates` : GeoJSON
/// - autre objet : géométrie Esri
pub fn decode_value(value: &Value) -> Option<PortableGeometry> {
    match value {
        Value::String(text) => {
            let trimmed = text.trim();
            if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
                return None;
            }
            let parsed: Value = serde_json::from_str(trimmed).ok()?;
            if parsed.is_string() {
                return None;
            }
            decode_value(&parsed)
        }
        Value::Object(obj) if obj.contains_key("type") && obj.contains_key("coordinates") => {
            serde_json::from_value(value.clone()).ok()
        }
        Value::Object(_) => esri_to_portable(value),
        _ => None,
    }
}

/// Décode puis ramène en longitude/latitude si besoin (géométrie affichable)
pub fn read_geometry(value: &Value) -> Option<PortableGeometry> {
    let mut geometry = decode_value(value)?;
    mercator::reproject_if_mercator(&mut geometry);
    Some(geometry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;
    use serde_json::json;

    #[test]
    fn test_geojson_text() {
        let v = json!(r#"{"type":"Point","coordinates":[100.0,45.0]}"#);
        assert_eq!(
            decode_value(&v),
            Some(PortableGeometry::Point(Position::new(100.0, 45.0)))
        );
    }

    #[test]
    fn test_geojson_object() {
        let v = json!({"type": "LineString", "coordinates": [[0, 0], [1, 1]]});
        assert_eq!(decode_value(&v).unwrap().type_name(), "LineString");
    }

    #[test]
    fn test_esri_object_and_esri_text() {
        let obj = json!({"rings": [[[0, 0], [1, 0], [1, 1], [0, 0]]]});
        assert_eq!(decode_value(&obj).unwrap().type_name(), "Polygon");

        let text = json!(r#"{"paths":[[[0,0],[2,2]]]}"#);
        assert_eq!(decode_value(&text).unwrap().type_name(), "LineString");
    }

    #[test]
    fn test_rejects_unsupported() {
        assert!(decode_value(&json!("")).is_none());
        assert!(decode_value(&json!("POINT(1 2)")).is_none());
        assert!(decode_value(&json!("{broken")).is_none());
        assert!(decode_value(&json!(42)).is_none());
        assert!(decode_value(&json!({"type": "MultiPolygon", "coordinates": [[[[0, 0]]]]})).is_none());
        assert!(decode_value(&json!({"type": "Point", "coordinates": [1]})).is_none());
    }

    #[test]
    fn test_read_geometry_reprojects_like_import() {
        let esri = json!({"x": -8_616_290.0, "y": 4_470_921.0});
        let from_text = json!(r#"{"type":"Point","coordinates":[-8616290.0,4470921.0]}"#);

        let a = read_geometry(&esri).unwrap();
        let b = read_geometry(&from_text).unwrap();
        assert_eq!(a, b);
        assert_eq!(a, crate::convert::to_portable(&esri).unwrap());
    }
}
