//! Matérialisation CSV d'un fichier selon son schéma figé
//!
//! Deuxième passe en streaming : une ligne CSV par enregistrement valide,
//! colonnes dans l'ordre du schéma puis `geom_geojson` et `geom_esri`.

use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use esri_json::{esri_to_portable, reproject_if_mercator, RecordReader, SourceRecord};
use geo::BoundingRect;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::schema::{trim_ascii_whitespace, ColumnType, TableSpec};

/// Emprise des géométries écrites (après reprojection)
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    fn include(&mut self, rect: geo::Rect<f64>) {
        self.min_x = self.min_x.min(rect.min().x);
        self.min_y = self.min_y.min(rect.min().y);
        self.max_x = self.max_x.max(rect.max().x);
        self.max_y = self.max_y.max(rect.max().y);
    }
}

impl From<geo::Rect<f64>> for Extent {
    fn from(rect: geo::Rect<f64>) -> Self {
        Self {
            min_x: rect.min().x,
            min_y: rect.min().y,
            max_x: rect.max().x,
            max_y: rect.max().y,
        }
    }
}

/// Statistiques de la passe d'écriture
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MaterializeStats {
    pub rows: u64,
    /// Géométries converties
    pub geometries: u64,
    /// Enregistrements sans géométrie (absente ou null)
    pub missing_geometries: u64,
    /// Géométries présentes mais de forme non reconnue
    pub unrecognized_geometries: u64,
    /// Géométries ramenées de Web Mercator en longitude/latitude
    pub reprojected_geometries: u64,
    /// Géométries converties que PostGIS risque de refuser
    pub degenerate_geometries: u64,
    pub extent: Option<Extent>,
}

impl MaterializeStats {
    fn include_extent(&mut self, rect: geo::Rect<f64>) {
        match self.extent.as_mut() {
            Some(extent) => extent.include(rect),
            None => self.extent = Some(rect.into()),
        }
    }
}

/// Ajoute un champ CSV, entre guillemets seulement s'il contient `,` `"` `\n` ou `\r`
pub fn push_csv_field(buf: &mut String, value: &str) {
    if !value.contains(&[',', '"', '\n', '\r'][..]) {
        buf.push_str(value);
        return;
    }
    buf.push('"');
    for c in value.chars() {
        if c == '"' {
            buf.push_str("\"\"");
        } else {
            buf.push(c);
        }
    }
    buf.push('"');
}

/// Texte d'une cellule d'attribut
///
/// null, absente ou blanche : vide. Les valeurs structurées sont écrites en
/// JSON compact, les scalaires tels quels.
pub fn cell_value(value: Option<&Value>) -> Result<Cow<'_, str>> {
    Ok(match value {
        None | Some(Value::Null) => Cow::Borrowed(""),
        Some(Value::String(s)) if trim_ascii_whitespace(s).is_empty() => Cow::Borrowed(""),
        Some(Value::String(s)) => Cow::Borrowed(s.as_str()),
        Some(Value::Bool(true)) => Cow::Borrowed("true"),
        Some(Value::Bool(false)) => Cow::Borrowed("false"),
        Some(Value::Number(n)) => Cow::Owned(n.to_string()),
        Some(v @ (Value::Array(_) | Value::Object(_))) => Cow::Owned(serde_json::to_string(v)?),
    })
}

/// En-tête CSV de la table
pub fn header_line(spec: &TableSpec) -> String {
    let mut line = spec.copy_columns().join(",");
    line.push('\n');
    line
}

/// Encode un enregistrement en une ligne CSV (terminée par `\n`) dans `buf`
fn encode_row(
    buf: &mut String,
    spec: &TableSpec,
    record: &SourceRecord,
    stats: &mut MaterializeStats,
) -> Result<()> {
    for column in &spec.columns {
        let value = cell_value(record.attributes.get(&column.source))?;
        let value = match column.column_type {
            ColumnType::Text => value.as_ref(),
            ColumnType::Numeric | ColumnType::Boolean => trim_ascii_whitespace(&value),
        };
        push_csv_field(buf, value);
        buf.push(',');
    }

    match record.geometry.as_ref() {
        None => {
            stats.missing_geometries += 1;
            buf.push(',');
        }
        Some(raw) => {
            match esri_to_portable(raw) {
                Some(mut geometry) => {
                    stats.geometries += 1;
                    if reproject_if_mercator(&mut geometry) {
                        stats.reprojected_geometries += 1;
                    }
                    if geometry.is_degenerate() {
                        stats.degenerate_geometries += 1;
                        trace!(geometry = geometry.type_name(), "Degenerate geometry");
                    }
                    if let Some(rect) = geometry.to_geo().bounding_rect() {
                        stats.include_extent(rect);
                    }
                    push_csv_field(buf, &geometry.to_json_string()?);
                }
                None => stats.unrecognized_geometries += 1,
            }
            buf.push(',');
            push_csv_field(buf, &serde_json::to_string(raw)?);
        }
    }
    buf.push('\n');
    Ok(())
}

/// Écrit le CSV d'un flux JSONL selon un schéma figé
pub fn materialize<R: BufRead, W: Write>(
    spec: &TableSpec,
    reader: R,
    writer: &mut W,
) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();
    let mut line = String::with_capacity(4096);

    writer.write_all(header_line(spec).as_bytes())?;

    for result in RecordReader::new(reader) {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_malformed_line() => {
                debug!(table = spec.name.as_str(), error = %e, "Skipping malformed line");
                continue;
            }
            Err(e) => return Err(e).context("Read failed during materialization"),
        };

        line.clear();
        encode_row(&mut line, spec, &record, &mut stats)?;
        writer.write_all(line.as_bytes())?;
        stats.rows += 1;
    }

    writer.flush()?;
    Ok(stats)
}

/// Écrit `output` depuis le fichier JSONL `input`
///
/// En cas d'échec le fichier partiel est supprimé.
pub fn materialize_file(spec: &TableSpec, input: &Path, output: &Path) -> Result<MaterializeStats> {
    let source = File::open(input).with_context(|| format!("Cannot open {}", input.display()))?;
    let target =
        File::create(output).with_context(|| format!("Failed to create file: {}", output.display()))?;

    let mut writer = BufWriter::with_capacity(64 * 1024, target);
    let result = materialize(spec, BufReader::with_capacity(64 * 1024, source), &mut writer);
    drop(writer);

    if result.is_err() {
        std::fs::remove_file(output).ok();
    }
    result.with_context(|| format!("Failed to write {}", output.display()))
}
