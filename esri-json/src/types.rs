//! Types de données pour le crate esri-json

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::tree::CoordinateTree;

/// Un enregistrement d'une ligne JSONL : attributs libres + géométrie Esri optionnelle
#[derive(Debug, Clone, Default)]
pub struct SourceRecord {
    /// Attributs (clé -> valeur), dans l'ordre d'apparition de la ligne
    pub attributes: Map<String, Value>,

    /// Géométrie Esri brute (absente si `null` ou manquante)
    pub geometry: Option<Value>,
}

/// Une position `[x, y, ...]` (au moins deux ordonnées)
///
/// Les ordonnées supplémentaires (z, m) sont conservées telles quelles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Position(Vec<f64>);

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self(vec![x, y])
    }

    /// Construit une position depuis ses ordonnées (None si moins de deux)
    pub fn from_ordinates(ordinates: Vec<f64>) -> Option<Self> {
        (ordinates.len() >= 2).then_some(Self(ordinates))
    }

    pub fn x(&self) -> f64 {
        self.0[0]
    }

    pub fn y(&self) -> f64 {
        self.0[1]
    }

    /// Toutes les ordonnées, x et y inclus
    pub fn ordinates(&self) -> &[f64] {
        &self.0
    }

    /// Remplace x et y en laissant les autres ordonnées intactes
    pub fn set_xy(&mut self, x: f64, y: f64) {
        self.0[0] = x;
        self.0[1] = y;
    }

    fn same_xy(&self, other: &Position) -> bool {
        self.x() == other.x() && self.y() == other.y()
    }
}

impl TryFrom<Vec<f64>> for Position {
    type Error = String;

    fn try_from(ordinates: Vec<f64>) -> Result<Self, Self::Error> {
        let len = ordinates.len();
        Self::from_ordinates(ordinates)
            .ok_or_else(|| format!("position needs at least 2 ordinates, got {}", len))
    }
}

impl From<Position> for Vec<f64> {
    fn from(position: Position) -> Self {
        position.0
    }
}

/// Géométrie portable (GeoJSON) produite depuis la géométrie Esri
///
/// Sérialisée en `{"type": "...", "coordinates": ...}`. La profondeur
/// d'imbrication des coordonnées est imposée par le variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum PortableGeometry {
    Point(Position),
    MultiPoint(Vec<Position>),
    LineString(Vec<Position>),
    MultiLineString(Vec<Vec<Position>>),
    /// Anneaux transmis tels quels : ni fermeture ni correction d'orientation
    Polygon(Vec<Vec<Position>>),
}

impl PortableGeometry {
    /// Nom du type GeoJSON
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::MultiPoint(_) => "MultiPoint",
            Self::LineString(_) => "LineString",
            Self::MultiLineString(_) => "MultiLineString",
            Self::Polygon(_) => "Polygon",
        }
    }

    /// Famille de géométrie (point / line / polygon)
    pub fn kind(&self) -> GeometryKind {
        match self {
            Self::Point(_) | Self::MultiPoint(_) => GeometryKind::Point,
            Self::LineString(_) | Self::MultiLineString(_) => GeometryKind::Line,
            Self::Polygon(_) => GeometryKind::Polygon,
        }
    }

    /// Plus grande valeur absolue de x ou y sur toutes les positions
    pub fn max_abs_ordinate(&self) -> f64 {
        let mut max = 0.0_f64;
        let mut visit = |p: &Position| {
            max = max.max(p.x().abs()).max(p.y().abs());
        };
        match self {
            Self::Point(p) => p.for_each_position(&mut visit),
            Self::MultiPoint(ps) | Self::LineString(ps) => ps.for_each_position(&mut visit),
            Self::MultiLineString(ls) | Self::Polygon(ls) => ls.for_each_position(&mut visit),
        }
        max
    }

    /// Applique une transformation (x, y) -> (x', y') à chaque position
    pub fn map_xy<F>(&mut self, f: F)
    where
        F: Fn(f64, f64) -> (f64, f64),
    {
        let mut apply = |p: &mut Position| {
            let (x, y) = f(p.x(), p.y());
            p.set_xy(x, y);
        };
        match self {
            Self::Point(p) => p.map_positions(&mut apply),
            Self::MultiPoint(ps) | Self::LineString(ps) => ps.map_positions(&mut apply),
            Self::MultiLineString(ls) | Self::Polygon(ls) => ls.map_positions(&mut apply),
        }
    }

    /// Vrai si PostGIS risque de refuser la géométrie
    /// (ligne < 2 points, anneau < 4 points ou non fermé)
    pub fn is_degenerate(&self) -> bool {
        fn ring_ok(ring: &[Position]) -> bool {
            if ring.len() < 4 {
                return false;
            }
            match (ring.first(), ring.last()) {
                (Some(a), Some(b)) => a.same_xy(b),
                _ => false,
            }
        }

        match self {
            Self::Point(_) | Self::MultiPoint(_) => false,
            Self::LineString(ls) => ls.len() < 2,
            Self::MultiLineString(lines) => lines.iter().any(|ls| ls.len() < 2),
            Self::Polygon(rings) => !rings.iter().all(|r| ring_ok(r)),
        }
    }

    /// Sérialisation JSON compacte (format de la colonne `geom_geojson`)
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Conversion vers `geo` (les anneaux sont fermés par `geo`)
    ///
    /// Le premier anneau d'un polygone est l'extérieur, les suivants les trous.
    pub fn to_geo(&self) -> geo::Geometry<f64> {
        use geo::{Coord, LineString, MultiLineString, MultiPoint, Point, Polygon};

        let coord = |p: &Position| Coord { x: p.x(), y: p.y() };
        let line = |ps: &[Position]| LineString::new(ps.iter().map(coord).collect());

        match self {
            Self::Point(p) => geo::Geometry::Point(Point::from(coord(p))),
            Self::MultiPoint(ps) => geo::Geometry::MultiPoint(MultiPoint::new(
                ps.iter().map(|p| Point::from(coord(p))).collect(),
            )),
            Self::LineString(ps) => geo::Geometry::LineString(line(ps.as_slice())),
            Self::MultiLineString(lines) => geo::Geometry::MultiLineString(MultiLineString::new(
                lines.iter().map(|ls| line(ls.as_slice())).collect(),
            )),
            Self::Polygon(rings) => {
                let mut rings = rings.iter().map(|r| line(r.as_slice()));
                let exterior = rings.next().unwrap_or_else(|| LineString::new(Vec::new()));
                geo::Geometry::Polygon(Polygon::new(exterior, rings.collect()))
            }
        }
    }
}

impl From<&PortableGeometry> for geojson::Geometry {
    fn from(geometry: &PortableGeometry) -> Self {
        let pos = |p: &Position| p.ordinates().to_vec();
        let line = |ps: &Vec<Position>| ps.iter().map(pos).collect::<Vec<_>>();

        let value = match geometry {
            PortableGeometry::Point(p) => geojson::Value::Point(pos(p)),
            PortableGeometry::MultiPoint(ps) => geojson::Value::MultiPoint(line(ps)),
            PortableGeometry::LineString(ps) => geojson::Value::LineString(line(ps)),
            PortableGeometry::MultiLineString(ls) => {
                geojson::Value::MultiLineString(ls.iter().map(line).collect())
            }
            PortableGeometry::Polygon(rings) => {
                geojson::Value::Polygon(rings.iter().map(line).collect())
            }
        };
        geojson::Geometry::new(value)
    }
}

/// Famille de géométrie détectée pour un fichier
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryKind {
    Point,
    Line,
    Polygon,
    #[default]
    Unknown,
}

impl GeometryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for GeometryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
