//! Lecture en streaming des fichiers JSONL
//!
//! Une ligne est lue, décodée puis rendue avant la lecture de la suivante :
//! la mémoire reste bornée par la taille d'une ligne.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{EsriError, Result};
use crate::types::SourceRecord;

impl SourceRecord {
    /// Décode une ligne `{"attributes": {...}, "geometry": {...}}`
    ///
    /// Un membre `attributes` absent ou non-objet donne des attributs vides.
    pub fn from_line(line: &str, line_no: u64) -> Result<Self> {
        let value: Value = serde_json::from_str(line).map_err(|source| EsriError::Json {
            line: line_no,
            source,
        })?;
        let Value::Object(mut obj) = value else {
            return Err(EsriError::NotAnObject { line: line_no });
        };

        let attributes = match obj.remove("attributes") {
            Some(Value::Object(attrs)) => attrs,
            _ => Map::new(),
        };
        let geometry = obj.remove("geometry").filter(|g| !g.is_null());

        Ok(Self {
            attributes,
            geometry,
        })
    }
}

/// Itérateur sur les enregistrements d'un flux JSONL
///
/// Les lignes vides sont ignorées. Une ligne mal formée produit une erreur
/// pour laquelle [`EsriError::is_malformed_line`] est vrai : l'appelant peut
/// la compter et continuer.
pub struct RecordReader<R> {
    inner: R,
    buf: Vec<u8>,
    line_no: u64,
    blank_lines: u64,
    malformed_lines: u64,
    records: u64,
}

impl RecordReader<BufReader<File>> {
    /// Ouvre un fichier JSONL
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(BufReader::with_capacity(64 * 1024, file)))
    }
}

impl<R: BufRead> RecordReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::with_capacity(4096),
            line_no: 0,
            blank_lines: 0,
            malformed_lines: 0,
            records: 0,
        }
    }

    /// Nombre de lignes lues jusqu'ici
    pub fn lines_read(&self) -> u64 {
        self.line_no
    }

    pub fn blank_lines(&self) -> u64 {
        self.blank_lines
    }

    pub fn malformed_lines(&self) -> u64 {
        self.malformed_lines
    }

    /// Nombre d'enregistrements décodés avec succès
    pub fn records(&self) -> u64 {
        self.records
    }

    fn decode_current(&mut self) -> Option<Result<SourceRecord>> {
        let line_no = self.line_no;
        let text = match std::str::from_utf8(&self.buf) {
            Ok(text) => text.trim(),
            Err(_) => return Some(Err(EsriError::InvalidUtf8 { line: line_no })),
        };
        if text.is_empty() {
            self.blank_lines += 1;
            return None;
        }
        Some(SourceRecord::from_line(text, line_no))
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<SourceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            match self.inner.read_until(b'\n', &mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => return Some(Err(EsriError::Io(e))),
            }
            self.line_no += 1;

            let Some(result) = self.decode_current() else {
                continue;
            };
            match &result {
                Ok(_) => self.records += 1,
                Err(e) => {
                    self.malformed_lines += 1;
                    trace!(line = self.line_no, error = %e, "Malformed line");
                }
            }
            return Some(result);
        }
    }
}
