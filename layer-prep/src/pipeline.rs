//! Orchestration d'une exécution : découverte des fichiers, scan,
//! matérialisation et écriture des artefacts communs
//!
//! Chaque fichier est traité indépendamment (scan puis CSV). Le traitement
//! peut être parallèle ; les résultats sont toujours repris dans l'ordre des
//! fichiers d'entrée, ce qui rend les artefacts déterministes.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use rayon::prelude::*;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::PipelineError;
use crate::export::{self, sql, MaterializeStats};
use crate::manifest::{save_manifest, ManifestEntry};
use crate::naming::{normalize_table_name, NameAllocator};
use crate::report::{FileReport, FileStatus, RunReport};
use crate::schema::{scan_file, TableSpec};

pub const SCHEMA_FILE: &str = "schema.sql";
pub const LOAD_FILE: &str = "load.sql";
pub const MANIFEST_FILE: &str = "manifest.json";
pub const REPORT_FILE: &str = "report.json";

/// Un fichier d'entrée et la table qui lui est attribuée
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub file_name: String,
    pub table: String,
}

/// Paramètres d'une exécution
#[derive(Debug, Clone)]
pub struct PrepareOptions {
    pub input: PathBuf,
    pub output: PathBuf,
    pub config: Config,
    /// Nombre de fichiers traités en parallèle (1 = séquentiel)
    pub jobs: usize,
}

/// Liste les fichiers d'entrée acceptés, triés par nom
///
/// Erreurs fatales : dossier absent, aucun fichier accepté.
pub fn collect_inputs(dir: &Path, config: &Config) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(PipelineError::InputDirMissing(dir.to_path_buf()).into());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Cannot read {}", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let accepted = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => config.accepts(name),
            None => {
                warn!(path = %path.display(), "Skipping file with non UTF-8 name");
                false
            }
        };
        if accepted {
            files.push(path);
        }
    }

    if files.is_empty() {
        let extensions = config
            .extensions
            .iter()
            .map(|e| format!(".{}", e.trim_start_matches('.')))
            .collect::<Vec<_>>()
            .join(", ");
        return Err(PipelineError::NoInputFiles {
            dir: dir.to_path_buf(),
            extensions,
        }
        .into());
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

/// Attribue un nom de table unique à chaque fichier, dans l'ordre d'entrée
pub fn assign_tables(files: Vec<PathBuf>, config: &Config) -> Vec<InputFile> {
    let mut tables = NameAllocator::for_tables();

    files
        .into_iter()
        .map(|path| {
            let file_name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();
            let stem = match config.matching_extension(&file_name) {
                Some(ext) => &file_name[..file_name.len() - ext.len() - 1],
                None => file_name.as_str(),
            };
            let base = normalize_table_name(stem);
            let table = tables.allocate(&base);
            if table != base {
                warn!(file = file_name.as_str(), table = table.as_str(), "Table name already used, renamed");
            }
            InputFile {
                path,
                file_name,
                table,
            }
        })
        .collect()
}

struct FileOutcome {
    report: FileReport,
    spec: Option<TableSpec>,
    csv_path: PathBuf,
}

fn csv_path(output: &Path, table: &str) -> PathBuf {
    output.join(format!("{}.csv", table))
}

/// Scan puis CSV d'un fichier ; toute erreur est capturée dans le rapport
fn process_file(input: &InputFile, output: &Path) -> FileOutcome {
    let started = Instant::now();
    let csv_path = csv_path(output, &input.table);

    let result = (|| -> Result<(TableSpec, FileReport)> {
        info!(file = input.file_name.as_str(), table = input.table.as_str(), "Scanning");
        let (scanned, checksum) = scan_file(&input.table, &input.path)?;

        info!(
            file = input.file_name.as_str(),
            columns = scanned.spec.columns.len(),
            geom = %scanned.spec.geometry_kind,
            "Writing CSV"
        );
        let stats: MaterializeStats = export::materialize_file(&scanned.spec, &input.path, &csv_path)?;
        if stats.degenerate_geometries > 0 {
            warn!(
                file = input.file_name.as_str(),
                count = stats.degenerate_geometries,
                "Degenerate geometries will be stored as null"
            );
        }

        let report = FileReport {
            file: input.file_name.clone(),
            table: input.table.clone(),
            status: FileStatus::Done,
            checksum: Some(checksum),
            duration_secs: started.elapsed().as_secs_f64(),
            scan: scanned.stats,
            output: Some(stats),
            mixed_columns: scanned.mixed_columns,
            error: None,
        };
        Ok((scanned.spec, report))
    })();

    match result {
        Ok((spec, report)) => {
            info!(
                file = input.file_name.as_str(),
                rows = report.output.as_ref().map_or(0, |o| o.rows),
                "Done"
            );
            FileOutcome {
                report,
                spec: Some(spec),
                csv_path,
            }
        }
        Err(e) => {
            warn!("Failed to process {}: {:#}", input.path.display(), e);
            FileOutcome {
                report: FileReport::failed(&input.file_name, &input.table, format!("{:#}", e)),
                spec: None,
                csv_path,
            }
        }
    }
}

/// Applique `f` à chaque fichier, en parallèle si `jobs > 1`, résultats dans l'ordre d'entrée
fn for_each_input<T, F>(inputs: &[InputFile], jobs: usize, f: F) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(&InputFile) -> T + Sync + Send,
{
    if jobs <= 1 || inputs.len() <= 1 {
        return Ok(inputs.iter().map(f).collect());
    }
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .context("Failed to build thread pool")?;
    Ok(pool.install(|| inputs.par_iter().map(f).collect()))
}

fn create_output_dir(output: &Path) -> Result<()> {
    std::fs::create_dir_all(output).map_err(|source| PipelineError::OutputNotWritable {
        path: output.to_path_buf(),
        source,
    })?;
    Ok(())
}

/// Chemin écrit dans `load.sql` (séparateurs `/`)
fn load_path(path: &Path) -> String {
    path.display().to_string().replace('\\', "/")
}

/// Exécute la préparation complète d'un dossier
///
/// Retourne le rapport ; les échecs par fichier n'interrompent pas les
/// autres et n'alimentent ni les scripts SQL ni le manifeste.
pub fn prepare(opts: &PrepareOptions) -> Result<RunReport> {
    let started = Instant::now();
    opts.config.validate()?;

    let files = collect_inputs(&opts.input, &opts.config)?;
    create_output_dir(&opts.output)?;

    let inputs = assign_tables(files, &opts.config);
    info!(
        files = inputs.len(),
        jobs = opts.jobs,
        output = %opts.output.display(),
        "Preparing"
    );

    let outcomes = for_each_input(&inputs, opts.jobs, |input| process_file(input, &opts.output))?;

    let mut report = RunReport::new(&opts.input, &opts.output);
    let mut done: Vec<(String, TableSpec, String)> = Vec::new();
    for outcome in outcomes {
        if let Some(spec) = outcome.spec {
            done.push((outcome.report.file.clone(), spec, load_path(&outcome.csv_path)));
        }
        report.record_file(outcome.report);
    }

    let sql_opts = opts.config.sql_options();
    let schema_sql = sql::schema_script(done.iter().map(|(_, spec, _)| spec), &sql_opts);
    let load_sql = sql::load_script(
        done.iter().map(|(_, spec, path)| (spec, path.as_str())),
        &sql_opts,
    );
    let manifest: Vec<ManifestEntry> = done
        .iter()
        .map(|(file, spec, _)| ManifestEntry::new(file, spec))
        .collect();

    let schema_path = opts.output.join(SCHEMA_FILE);
    std::fs::write(&schema_path, schema_sql)
        .with_context(|| format!("Failed to write {}", schema_path.display()))?;
    let load_sql_path = opts.output.join(LOAD_FILE);
    std::fs::write(&load_sql_path, load_sql)
        .with_context(|| format!("Failed to write {}", load_sql_path.display()))?;
    save_manifest(&manifest, &opts.output.join(MANIFEST_FILE))?;

    report.set_duration(started.elapsed());
    report.finalize();
    report
        .save_to_file(&opts.output.join(REPORT_FILE))
        .context("Failed to write run report")?;

    info!("{}", report.summary());
    Ok(report)
}

/// Résultat d'un export GeoJSON
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeojsonSummary {
    pub files: usize,
    pub failed: usize,
    pub features: u64,
}

/// Exporte chaque fichier d'un dossier en `<table>.geojson`
pub fn export_geojson(input: &Path, output: &Path, config: &Config, jobs: usize) -> Result<GeojsonSummary> {
    let files = collect_inputs(input, config)?;
    create_output_dir(output)?;
    let inputs = assign_tables(files, config);

    info!("Found {} files to export", inputs.len());

    let failed = AtomicUsize::new(0);
    let features = AtomicU64::new(0);

    for_each_input(&inputs, jobs, |file| {
        let target = output.join(format!("{}.geojson", file.table));
        let result = scan_file(&file.table, &file.path)
            .and_then(|(scanned, _)| export::geojson::export_file(&scanned.spec, &file.path, &target));
        match result {
            Ok(count) => {
                features.fetch_add(count, Ordering::Relaxed);
                info!("Exported {} features to {}", count, target.display());
            }
            Err(e) => {
                warn!("Failed to export {}: {:#}", file.path.display(), e);
                failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    })?;

    Ok(GeojsonSummary {
        files: inputs.len(),
        failed: failed.load(Ordering::Relaxed),
        features: features.load(Ordering::Relaxed),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("layer_prep_pipeline_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&dir).ok();
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_collect_inputs_filters_and_sorts() {
        let dir = temp_dir("collect");
        for name in ["b.jsonl", "a.NDJSON", "notes.txt", "c.json"] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        std::fs::create_dir_all(dir.join("sub.jsonl")).unwrap();

        let files = collect_inputs(&dir, &Config::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.NDJSON", "b.jsonl"]);

        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_collect_inputs_fatal_errors() {
        let missing = std::env::temp_dir().join("layer_prep_does_not_exist_42");
        let err = collect_inputs(&missing, &Config::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::InputDirMissing(_))
        ));

        let dir = temp_dir("empty");
        let err = collect_inputs(&dir, &Config::default()).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::NoInputFiles { .. })
        ));
        assert!(err.to_string().contains(".jsonl, .ndjson"));
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_no_input_files_names_configured_extensions() {
        let dir = temp_dir("custom_ext");
        std::fs::write(dir.join("a.jsonl"), "").unwrap();
        let config = Config {
            extensions: vec![".json".into(), "geojsonl".into()],
            ..Default::default()
        };

        let err = collect_inputs(&dir, &config).unwrap_err();
        let message = err.to_string();
        assert!(message.contains(".json, .geojsonl"), "{}", message);
        assert!(!message.contains(".jsonl,"), "{}", message);
        std::fs::remove_dir_all(dir).ok();
    }

    #[test]
    fn test_assign_tables_dedup() {
        let files = vec![
            PathBuf::from("in/01_Parcels.jsonl"),
            PathBuf::from("in/02_parcels.ndjson"),
            PathBuf::from("in/roads.jsonl"),
        ];
        let inputs = assign_tables(files, &Config::default());
        let tables: Vec<_> = inputs.iter().map(|i| i.table.as_str()).collect();
        assert_eq!(tables, vec!["parcels", "parcels_1", "roads"]);
        assert_eq!(inputs[0].file_name, "01_Parcels.jsonl");
    }

    #[test]
    fn test_assign_tables_custom_extension() {
        let config = Config {
            extensions: vec!["json".into()],
            ..Default::default()
        };
        let inputs = assign_tables(vec![PathBuf::from("Zoning.JSON")], &config);
        assert_eq!(inputs[0].table, "zoning");
    }
}
