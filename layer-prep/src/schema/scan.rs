//! Passe de scan : découverte des colonnes et inférence des types
//!
//! Le contexte de scan est propre à un fichier et n'est jamais partagé :
//! deux fichiers traités en parallèle ont chacun le leur.

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use anyhow::{Context, Result};
use esri_json::{esri_to_portable, GeometryKind, RecordReader, SourceRecord};
use serde::Serialize;
use tracing::{debug, warn};

use super::infer::{classify, TypeEvidence};
use super::{ColumnSpec, TableSpec};
use crate::naming::{normalize_key, NameAllocator};

/// Compteurs de lignes de la passe de scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub lines: u64,
    pub records: u64,
    pub blank_lines: u64,
    pub malformed_lines: u64,
}

#[derive(Debug)]
struct ColumnState {
    source: String,
    name: String,
    evidence: TypeEvidence,
}

/// État du scan d'un fichier
#[derive(Debug)]
pub struct ScanContext {
    names: NameAllocator,
    columns: Vec<ColumnState>,
    by_source: HashMap<String, usize>,
    geometry_kind: Option<GeometryKind>,
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ScanContext {
    pub fn new() -> Self {
        Self {
            names: NameAllocator::for_columns(),
            columns: Vec::new(),
            by_source: HashMap::new(),
            geometry_kind: None,
        }
    }

    fn column_index(&mut self, source: &str) -> usize {
        if let Some(&idx) = self.by_source.get(source) {
            return idx;
        }
        let name = self.names.allocate(&normalize_key(source));
        self.columns.push(ColumnState {
            source: source.to_string(),
            name,
            evidence: TypeEvidence::default(),
        });
        let idx = self.columns.len() - 1;
        self.by_source.insert(source.to_string(), idx);
        idx
    }

    /// Intègre un enregistrement : colonnes, indices de type, famille de géométrie
    pub fn observe(&mut self, record: &SourceRecord) {
        for (key, value) in &record.attributes {
            let idx = self.column_index(key);
            self.columns[idx].evidence.record(classify(value));
        }

        if self.geometry_kind.is_none() {
            self.geometry_kind = record
                .geometry
                .as_ref()
                .and_then(esri_to_portable)
                .map(|g| g.kind());
        }
    }

    /// Colonnes résolues en text faute de mieux (nombres et booléens mélangés)
    pub fn mixed_columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.evidence.is_mixed_scalar())
            .map(|c| c.name.as_str())
            .collect()
    }

    /// Fige le schéma : types résolus, colonnes triées par nom canonique
    pub fn freeze(self, table: &str) -> TableSpec {
        let mut columns: Vec<ColumnSpec> = self
            .columns
            .into_iter()
            .map(|c| ColumnSpec {
                column_type: c.evidence.resolve(),
                name: c.name,
                source: c.source,
            })
            .collect();
        columns.sort_by(|a, b| a.name.cmp(&b.name));

        TableSpec {
            name: table.to_string(),
            columns,
            geometry_kind: self.geometry_kind.unwrap_or_default(),
        }
    }
}

/// Résultat de la passe de scan d'un fichier
#[derive(Debug, Clone)]
pub struct ScannedTable {
    pub spec: TableSpec,
    pub stats: ScanStats,
    /// Colonnes dont les indices mélangeaient nombres et booléens
    pub mixed_columns: Vec<String>,
}

/// Scanne un flux JSONL
pub fn scan_reader<R: BufRead>(table: &str, reader: R) -> Result<ScannedTable> {
    let mut records = RecordReader::new(reader);
    let mut ctx = ScanContext::new();

    for result in records.by_ref() {
        match result {
            Ok(record) => ctx.observe(&record),
            Err(e) if e.is_malformed_line() => {
                debug!(table = table, error = %e, "Skipping malformed line");
            }
            Err(e) => return Err(e).context("Read failed during scan"),
        }
    }

    let stats = ScanStats {
        lines: records.lines_read(),
        records: records.records(),
        blank_lines: records.blank_lines(),
        malformed_lines: records.malformed_lines(),
    };

    let mixed_columns: Vec<String> = ctx.mixed_columns().into_iter().map(String::from).collect();
    for column in &mixed_columns {
        warn!(
            table = table,
            column = column.as_str(),
            "Column mixes numbers and booleans, falling back to text"
        );
    }

    Ok(ScannedTable {
        spec: ctx.freeze(table),
        stats,
        mixed_columns,
    })
}

/// Alimente un hasher blake3 avec tout ce qui est lu
struct ChecksumReader<R> {
    inner: R,
    hasher: blake3::Hasher,
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// Scanne un fichier JSONL et retourne son checksum blake3 (hex)
///
/// Le checksum est calculé pendant la lecture du scan, qui va jusqu'à la fin
/// du fichier.
pub fn scan_file(table: &str, path: &Path) -> Result<(ScannedTable, String)> {
    let file = File::open(path).with_context(|| format!("Cannot open {}", path.display()))?;
    let mut reader = ChecksumReader {
        inner: file,
        hasher: blake3::Hasher::new(),
    };
    let scanned = scan_reader(table, BufReader::with_capacity(64 * 1024, &mut reader))
        .with_context(|| format!("Failed to scan {}", path.display()))?;
    Ok((scanned, reader.hasher.finalize().to_hex().to_string()))
}
