//! Détection et inversion de la projection Web Mercator (EPSG:3857)
//!
//! Aussi connue sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Les services ArcGIS exportent souvent en mètres 3857 sans le déclarer :
//! une ordonnée dont la valeur absolue dépasse 180 ne peut pas être un degré,
//! la géométrie est alors ramenée en longitude/latitude.
//!
//! Le seuil et la formule doivent rester identiques entre l'import et la
//! lecture des géométries côté client.

use crate::types::PortableGeometry;

/// Rayon de la sphère Web Mercator (demi-grand axe WGS84) en mètres
pub const EARTH_RADIUS: f64 = 6378137.0;

/// Au-delà de cette valeur absolue, une ordonnée est considérée en mètres
pub const WEB_MERCATOR_THRESHOLD: f64 = 180.0;

/// Convertit Web Mercator (mètres) vers longitude/latitude (degrés)
pub fn web_mercator_to_lon_lat(x: f64, y: f64) -> (f64, f64) {
    // Longitude = x / R
    let lon = (x / EARTH_RADIUS).to_degrees();

    // Latitude = 2 * atan(exp(y/R)) - π/2
    let lat = (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();

    (lon, lat)
}

/// Vrai si la géométrie a au moins une ordonnée hors de [-180, 180]
pub fn is_likely_web_mercator(geometry: &PortableGeometry) -> bool {
    geometry.max_abs_ordinate() > WEB_MERCATOR_THRESHOLD
}

/// Reprojette en place si la géométrie semble en Web Mercator
///
/// Retourne `true` si une reprojection a été appliquée.
pub fn reproject_if_mercator(geometry: &mut PortableGeometry) -> bool {
    if !is_likely_web_mercator(geometry) {
        return false;
    }
    geometry.map_xy(web_mercator_to_lon_lat);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Position;

    fn lon_lat_to_web_mercator(lon: f64, lat: f64) -> (f64, f64) {
        let x = EARTH_RADIUS * lon.to_radians();
        let y = EARTH_RADIUS * (std::f64::consts::FRAC_PI_4 + lat.to_radians() / 2.0).tan().ln();
        (x, y)
    }

    #[test]
    fn test_petersburg_from_web_mercator() {
        // Petersburg, VA: -77.4019°E, 37.2279°N
        let (lon, lat) = web_mercator_to_lon_lat(-8_616_290.0, 4_470_921.0);
        assert!((lon - (-77.4019)).abs() < 0.001, "lon={}", lon);
        assert!((lat - 37.2279).abs() < 0.001, "lat={}", lat);
    }

    #[test]
    fn test_roundtrip() {
        let (x, y) = lon_lat_to_web_mercator(2.35, 48.85);
        let (lon, lat) = web_mercator_to_lon_lat(x, y);

        assert!((lon - 2.35).abs() < 1e-9, "lon={}", lon);
        assert!((lat - 48.85).abs() < 1e-9, "lat={}", lat);
    }

    #[test]
    fn test_origin_maps_to_origin() {
        let (lon, lat) = web_mercator_to_lon_lat(0.0, 0.0);
        assert!(lon.abs() < 1e-12 && lat.abs() < 1e-12, "({}, {})", lon, lat);
    }

    #[test]
    fn test_threshold_is_strict() {
        let mut at_limit = PortableGeometry::Point(Position::new(180.0, -90.0));
        assert!(!reproject_if_mercator(&mut at_limit));
        assert_eq!(at_limit, PortableGeometry::Point(Position::new(180.0, -90.0)));

        let mut above = PortableGeometry::Point(Position::new(180.5, 0.0));
        assert!(reproject_if_mercator(&mut above));
    }

    #[test]
    fn test_one_large_ordinate_reprojects_everything() {
        let mut line = PortableGeometry::LineString(vec![
            Position::new(10.0, 10.0),
            Position::new(-8_615_000.0, 4_700_000.0),
        ]);
        assert!(reproject_if_mercator(&mut line));

        let PortableGeometry::LineString(positions) = line else {
            panic!("variant changed");
        };
        // Même les petites valeurs sont traitées comme des mètres
        assert!(positions[0].x().abs() < 0.001);
        assert!((positions[1].x() - (-77.3899)).abs() < 0.001);
        assert!((positions[1].y() - 38.8485).abs() < 0.001);
    }
}
