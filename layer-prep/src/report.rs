//! Rapport d'exécution avec graceful degradation
//!
//! Ce module collecte les résultats fichier par fichier (statistiques,
//! erreurs et warnings), les affiche et les persiste en `report.json`.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use serde::Serialize;

use crate::export::MaterializeStats;
use crate::schema::ScanStats;

/// Statut global de l'exécution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Tous les fichiers traités sans erreur
    Success,
    /// Certains fichiers en échec, les autres sont exploitables
    PartialSuccess,
    /// Aucun fichier exploitable
    Failed,
}

/// Statut d'un fichier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FileStatus {
    Done,
    Failed,
}

/// Erreur d'un fichier ignoré
///
/// Les erreurs fatales (entrée absente, sortie non inscriptible) ne passent
/// pas par le rapport : elles interrompent l'exécution avant toute sortie.
#[derive(Debug, Clone, Serialize)]
pub struct RunError {
    pub file: String,
    pub message: String,
}

/// Warning: fichier traité avec dégradation
#[derive(Debug, Clone, Serialize)]
pub struct RunWarning {
    pub file: String,
    pub message: String,
}

/// Résultat du traitement d'un fichier
#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub file: String,
    pub table: String,
    pub status: FileStatus,
    /// Checksum blake3 du fichier source
    pub checksum: Option<String>,
    pub duration_secs: f64,
    pub scan: ScanStats,
    pub output: Option<MaterializeStats>,
    /// Colonnes résolues en text faute de mieux (nombres et booléens mélangés)
    pub mixed_columns: Vec<String>,
    pub error: Option<String>,
}

impl FileReport {
    /// Rapport d'un fichier en échec
    pub fn failed(file: &str, table: &str, message: String) -> Self {
        Self {
            file: file.to_string(),
            table: table.to_string(),
            status: FileStatus::Failed,
            checksum: None,
            duration_secs: 0.0,
            scan: ScanStats::default(),
            output: None,
            mixed_columns: Vec::new(),
            error: Some(message),
        }
    }

    pub fn is_done(&self) -> bool {
        self.status == FileStatus::Done
    }
}

/// Rapport complet d'une exécution
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input_dir: String,
    pub output_dir: String,
    /// Durée totale
    pub duration_secs: f64,
    pub status: RunStatus,

    // Compteurs globaux
    pub files_processed: usize,
    pub files_failed: usize,
    pub records: u64,
    pub rows_written: u64,
    pub malformed_lines: u64,
    pub reprojected_geometries: u64,

    /// Détail par fichier, dans l'ordre d'entrée
    pub files: Vec<FileReport>,

    pub errors: Vec<RunError>,
    pub warnings: Vec<RunWarning>,
}

impl RunReport {
    pub fn new(input_dir: &Path, output_dir: &Path) -> Self {
        Self {
            input_dir: input_dir.display().to_string(),
            output_dir: output_dir.display().to_string(),
            duration_secs: 0.0,
            status: RunStatus::Success,
            files_processed: 0,
            files_failed: 0,
            records: 0,
            rows_written: 0,
            malformed_lines: 0,
            reprojected_geometries: 0,
            files: Vec::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Enregistre le résultat d'un fichier (succès ou échec)
    pub fn record_file(&mut self, report: FileReport) {
        self.files_processed += 1;

        if !report.is_done() {
            self.files_failed += 1;
            self.errors.push(RunError {
                file: report.file.clone(),
                message: report.error.clone().unwrap_or_else(|| "failed".to_string()),
            });
            self.files.push(report);
            return;
        }

        self.records += report.scan.records;
        self.malformed_lines += report.scan.malformed_lines;

        if report.scan.malformed_lines > 0 {
            self.record_warning(
                &report.file,
                format!("{} malformed line(s) skipped", report.scan.malformed_lines),
            );
        }
        for column in &report.mixed_columns {
            self.record_warning(
                &report.file,
                format!("column {} mixes numbers and booleans, typed as text", column),
            );
        }
        if let Some(output) = &report.output {
            self.rows_written += output.rows;
            self.reprojected_geometries += output.reprojected_geometries;
            if output.degenerate_geometries > 0 {
                self.record_warning(
                    &report.file,
                    format!(
                        "{} degenerate geometr(y/ies), PostGIS will store null",
                        output.degenerate_geometries
                    ),
                );
            }
            if output.unrecognized_geometries > 0 {
                self.record_warning(
                    &report.file,
                    format!("{} unrecognized geometr(y/ies)", output.unrecognized_geometries),
                );
            }
        }

        self.files.push(report);
    }

    pub fn record_warning(&mut self, file: &str, message: String) {
        self.warnings.push(RunWarning {
            file: file.to_string(),
            message,
        });
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final basé sur les erreurs
    pub fn finalize(&mut self) {
        let has_errors = !self.errors.is_empty();
        let has_success = self.files.iter().any(FileReport::is_done);

        self.status = if has_errors && has_success {
            RunStatus::PartialSuccess
        } else if has_errors {
            RunStatus::Failed
        } else {
            RunStatus::Success
        };
    }

    /// Vrai si au moins un fichier a échoué
    pub fn has_failures(&self) -> bool {
        self.files_failed > 0
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!("LAYER PREP REPORT");
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!("Input: {}", self.input_dir);
        println!("Output: {}", self.output_dir);

        println!("\n--- SUMMARY ---");
        println!(
            "Files: {} processed, {} failed",
            self.files_processed, self.files_failed
        );
        println!(
            "Records: {} read, {} rows written, {} malformed lines, {} reprojected geometries",
            self.records, self.rows_written, self.malformed_lines, self.reprojected_geometries
        );

        if !self.files.is_empty() {
            println!("\n--- BY FILE ---");
            for f in &self.files {
                match (&f.status, &f.output) {
                    (FileStatus::Done, Some(out)) => println!(
                        "  {} -> {}: {} rows, {} geometries",
                        f.file, f.table, out.rows, out.geometries
                    ),
                    _ => println!("  {} -> {}: {:?}", f.file, f.table, f.status),
                }
            }
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  [{}] {}", w.file, w.message);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        if !self.errors.is_empty() {
            println!("\n--- ERRORS ({}) ---", self.errors.len());
            for e in self.errors.iter().take(20) {
                println!("  [{}] {}", e.file, e.message);
            }
            if self.errors.len() > 20 {
                println!("  ... and {} more", self.errors.len() - 20);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} file(s): {} rows written, {} failed, {} warnings",
            self.files_processed,
            self.rows_written,
            self.files_failed,
            self.warnings.len()
        )
    }
}
