//! Export GeoJSON (streaming)
//!
//! Une FeatureCollection par fichier source, avec les mêmes règles de
//! nommage et de conversion que le CSV : propriétés sous leur nom canonique,
//! géométrie en longitude/latitude.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use esri_json::{to_portable, RecordReader, SourceRecord};
use geojson::{feature::Id, Feature, JsonObject};
use serde_json::Value;
use tracing::debug;

use crate::schema::{trim_ascii_whitespace, TableSpec};

/// Exporte un flux JSONL en FeatureCollection, retourne le nombre de features
pub fn export_to_geojson<R: BufRead, W: Write>(
    spec: &TableSpec,
    reader: R,
    writer: &mut W,
) -> Result<u64> {
    write!(writer, r#"{{"type":"FeatureCollection","name":"{}","features":["#, spec.name)?;

    let mut count = 0u64;
    for result in RecordReader::new(reader) {
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_malformed_line() => {
                debug!(table = spec.name.as_str(), error = %e, "Skipping malformed line");
                continue;
            }
            Err(e) => return Err(e).context("Read failed during GeoJSON export"),
        };

        if count > 0 {
            write!(writer, ",")?;
        }
        count += 1;
        let feature = build_feature(spec, &record, count);
        serde_json::to_writer(&mut *writer, &feature)?;
    }

    write!(writer, "]}}")?;
    writer.flush()?;

    Ok(count)
}

/// Construit une feature : propriétés renommées, valeurs blanches à null
fn build_feature(spec: &TableSpec, record: &SourceRecord, ordinal: u64) -> Feature {
    let mut properties = JsonObject::new();
    for column in &spec.columns {
        let value = match record.attributes.get(&column.source) {
            None | Some(Value::Null) => Value::Null,
            Some(Value::String(s)) if trim_ascii_whitespace(s).is_empty() => Value::Null,
            Some(v) => v.clone(),
        };
        properties.insert(column.name.clone(), value);
    }

    Feature {
        bbox: None,
        geometry: record
            .geometry
            .as_ref()
            .and_then(to_portable)
            .map(|g| geojson::Geometry::from(&g)),
        id: Some(Id::Number(ordinal.into())),
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Exporte le fichier `input` vers `output`
pub fn export_file(spec: &TableSpec, input: &Path, output: &Path) -> Result<u64> {
    let source = File::open(input).with_context(|| format!("Cannot open {}", input.display()))?;
    let target =
        File::create(output).with_context(|| format!("Failed to create file: {}", output.display()))?;

    let mut writer = BufWriter::new(target);
    let result = export_to_geojson(spec, BufReader::new(source), &mut writer);
    drop(writer);

    if result.is_err() {
        std::fs::remove_file(output).ok();
    }
    result.with_context(|| format!("Failed to write {}", output.display()))
}
