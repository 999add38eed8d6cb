//! Tests d'intégration : préparation complète d'un dossier d'exports

use std::path::{Path, PathBuf};

use layer_prep::config::Config;
use layer_prep::layers::{build_layers, FallbackResolver, LayerDescriptor};
use layer_prep::manifest::load_manifest;
use layer_prep::pipeline::{self, PrepareOptions, LOAD_FILE, MANIFEST_FILE, REPORT_FILE, SCHEMA_FILE};
use layer_prep::{ColumnType, PipelineError, RunStatus};

const OWNERS: &str = concat!(
    r#"{"attributes":{"Owner Name":"Smith","Acres":"1.5"},"geometry":{"x":100,"y":45}}"#,
    "\n",
    r#"{"attributes":{"Owner Name":"Doe","Acres":"2"},"geometry":{"x":110,"y":50}}"#,
    "\n",
);

const PARCELS: &str = concat!(
    r#"{"attributes":{"PIN":"0012","Zoning":"R-1","GIS_Acres":0.5},"geometry":{"rings":[[[-8616290,4470921],[-8616200,4470921],[-8616200,4471000],[-8616290,4470921]]],"spatialReference":{"wkid":102100}}}"#,
    "\n",
    "\n",
    r#"{"attributes":{"PIN":"0013","Zoning":"B-2"#,
    "\n",
    r#"{"attributes":{"PIN":"0014","Zoning":"R-1, \"Residential\"","GIS_Acres":null}}"#,
    "\n",
);

struct Workspace {
    root: PathBuf,
}

impl Workspace {
    fn new(name: &str) -> Self {
        let root = std::env::temp_dir().join(format!("layer_prep_it_{}_{}", name, std::process::id()));
        std::fs::remove_dir_all(&root).ok();
        std::fs::create_dir_all(root.join("raw")).unwrap();
        Self { root }
    }

    fn input(&self) -> PathBuf {
        self.root.join("raw")
    }

    fn output(&self) -> PathBuf {
        self.root.join("prepared")
    }

    fn write_input(&self, name: &str, content: &str) {
        std::fs::write(self.input().join(name), content).unwrap();
    }

    fn options(&self, jobs: usize) -> PrepareOptions {
        PrepareOptions {
            input: self.input(),
            output: self.output(),
            config: Config::default(),
            jobs,
        }
    }

    fn read_output(&self, name: &str) -> String {
        std::fs::read_to_string(self.output().join(name)).unwrap()
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.root).ok();
    }
}

fn snapshot(dir: &Path, names: &[&str]) -> Vec<String> {
    names
        .iter()
        .map(|n| std::fs::read_to_string(dir.join(n)).unwrap())
        .collect()
}

#[test]
fn test_prepare_owner_points() {
    let ws = Workspace::new("owners");
    ws.write_input("owners.jsonl", OWNERS);

    let report = pipeline::prepare(&ws.options(1)).unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.rows_written, 2);

    let csv = ws.read_output("owners.csv");
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "acres,owner_name,geom_geojson,geom_esri");
    assert_eq!(
        lines[1],
        r#"1.5,Smith,"{""type"":""Point"",""coordinates"":[100.0,45.0]}","{""x"":100,""y"":45}""#
    );
    assert!(lines[2].starts_with("2,Doe,"));
    assert_eq!(lines.len(), 3);

    let manifest = load_manifest(&ws.output().join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].file, "owners.jsonl");
    assert_eq!(manifest[0].table, "owners");
    let columns: Vec<_> = manifest[0]
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.column_type))
        .collect();
    assert_eq!(
        columns,
        vec![("acres", ColumnType::Numeric), ("owner_name", ColumnType::Text)]
    );

    let raw: serde_json::Value = serde_json::from_str(&ws.read_output(MANIFEST_FILE)).unwrap();
    assert_eq!(raw[0]["geom"], "point");
    assert_eq!(raw[0]["columns"][0]["type"], "numeric");

    let schema = ws.read_output(SCHEMA_FILE);
    assert!(schema.contains("create table if not exists public.owners ("));
    assert!(schema.contains("acres numeric"));
    assert!(schema.contains("owner_name text"));

    let load = ws.read_output(LOAD_FILE);
    assert!(load.starts_with("\\copy public.owners (acres, owner_name, geom_geojson, geom_esri) from '"));
    assert!(load.contains("owners.csv' with (format csv, header true);"));
}

#[test]
fn test_prepare_reprojects_and_skips_bad_lines() {
    let ws = Workspace::new("parcels");
    ws.write_input("01_Parcels.jsonl", PARCELS);

    let report = pipeline::prepare(&ws.options(1)).unwrap();
    assert_eq!(report.status, RunStatus::Success);
    assert_eq!(report.malformed_lines, 1);
    assert_eq!(report.reprojected_geometries, 1);
    assert!(report.warnings.iter().any(|w| w.file == "01_Parcels.jsonl"));

    let file = &report.files[0];
    assert_eq!(file.table, "parcels");
    assert_eq!(file.scan.blank_lines, 1);
    let output = file.output.as_ref().unwrap();
    assert_eq!(output.rows, 2);
    assert_eq!(output.missing_geometries, 1);
    let extent = output.extent.as_ref().unwrap();
    assert!((extent.min_x - (-77.40)).abs() < 0.01);
    assert!((extent.min_y - 37.23).abs() < 0.01);

    let manifest = load_manifest(&ws.output().join(MANIFEST_FILE)).unwrap();
    let types: Vec<_> = manifest[0]
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.source.as_str(), c.column_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("gis_acres", "GIS_Acres", ColumnType::Numeric),
            ("pin", "PIN", ColumnType::Numeric),
            ("zoning", "Zoning", ColumnType::Text),
        ]
    );

    let csv = ws.read_output("parcels.csv");
    let last = csv.lines().last().unwrap();
    assert_eq!(last, r#",0014,"R-1, ""Residential""",,"#);
}

#[test]
fn test_prepare_is_deterministic() {
    let ws = Workspace::new("determinism");
    ws.write_input("owners.jsonl", OWNERS);
    ws.write_input("parcels.jsonl", PARCELS);
    ws.write_input("01_owners.ndjson", OWNERS);

    let names = [
        SCHEMA_FILE,
        LOAD_FILE,
        MANIFEST_FILE,
        "owners.csv",
        "parcels.csv",
        "owners_1.csv",
    ];

    pipeline::prepare(&ws.options(1)).unwrap();
    let first = snapshot(&ws.output(), &names);

    pipeline::prepare(&ws.options(4)).unwrap();
    let second = snapshot(&ws.output(), &names);

    assert_eq!(first, second);

    // 01_owners.ndjson trié avant owners.jsonl : il garde le nom de base
    let manifest = load_manifest(&ws.output().join(MANIFEST_FILE)).unwrap();
    let tables: Vec<_> = manifest
        .iter()
        .map(|e| (e.file.as_str(), e.table.as_str()))
        .collect();
    assert_eq!(
        tables,
        vec![
            ("01_owners.ndjson", "owners"),
            ("owners.jsonl", "owners_1"),
            ("parcels.jsonl", "parcels"),
        ]
    );
}

#[test]
fn test_prepare_fatal_errors_write_nothing() {
    let ws = Workspace::new("fatal");

    let err = pipeline::prepare(&ws.options(1)).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::NoInputFiles { .. })
    ));
    assert!(!ws.output().exists());

    let mut opts = ws.options(1);
    opts.input = ws.root.join("missing");
    let err = pipeline::prepare(&opts).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::InputDirMissing(_))
    ));
    assert!(!ws.output().exists());

    ws.write_input("owners.jsonl", OWNERS);
    let mut opts = ws.options(1);
    opts.config.schema = "Bad Schema".to_string();
    assert!(pipeline::prepare(&opts).is_err());
    assert!(!ws.output().exists());
}

#[test]
fn test_prepare_file_failure_is_isolated() {
    let ws = Workspace::new("partial");
    ws.write_input("owners.jsonl", OWNERS);
    ws.write_input("parcels.jsonl", PARCELS);

    // Un dossier à la place du CSV attendu fait échouer ce seul fichier
    std::fs::create_dir_all(ws.output().join("owners.csv")).unwrap();

    let report = pipeline::prepare(&ws.options(2)).unwrap();
    assert_eq!(report.status, RunStatus::PartialSuccess);
    assert!(report.has_failures());
    assert_eq!(report.files_failed, 1);
    assert!(report.files[0].error.is_some());
    assert!(report.files[1].is_done());

    let manifest = load_manifest(&ws.output().join(MANIFEST_FILE)).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest[0].table, "parcels");

    let schema = ws.read_output(SCHEMA_FILE);
    assert!(!schema.contains("public.owners"));
    assert!(ws.read_output(REPORT_FILE).contains("PartialSuccess"));
}

#[test]
fn test_layers_from_prepared_manifest() {
    let ws = Workspace::new("layers");
    ws.write_input("parcels.jsonl", PARCELS);
    pipeline::prepare(&ws.options(1)).unwrap();

    let manifest = load_manifest(&ws.output().join(MANIFEST_FILE)).unwrap();
    let declared = vec![LayerDescriptor {
        table: "parcels".into(),
        acres_column: Some("GIS_ACRES".into()),
        ..Default::default()
    }];
    let resolver = FallbackResolver::standard().unwrap();
    let layers = build_layers(&manifest, &declared, &resolver);

    assert_eq!(layers.len(), 1);
    let layer = &layers[0];
    assert_eq!(layer.acres_column.as_deref(), Some("gis_acres"));
    assert_eq!(layer.zoning_column.as_deref(), Some("zoning"));
    assert_eq!(layer.geometry_column.as_deref(), Some("geom_geojson"));
    assert_eq!(layer.search_columns.as_deref(), Some(&["pin".to_string()][..]));
}

#[test]
fn test_geojson_export() {
    let ws = Workspace::new("geojson");
    ws.write_input("owners.jsonl", OWNERS);

    let summary = pipeline::export_geojson(&ws.input(), &ws.output(), &Config::default(), 1).unwrap();
    assert_eq!(summary.files, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.features, 2);

    let json: serde_json::Value = serde_json::from_str(&ws.read_output("owners.geojson")).unwrap();
    assert_eq!(json["type"], "FeatureCollection");
    assert_eq!(json["features"][1]["properties"]["owner_name"], "Doe");
    assert_eq!(json["features"][0]["geometry"]["type"], "Point");
}

#[test]
fn test_prepare_output_path_is_a_file() {
    let ws = Workspace::new("output_file");
    ws.write_input("owners.jsonl", OWNERS);
    std::fs::write(ws.output(), "not a directory").unwrap();

    let err = pipeline::prepare(&ws.options(1)).unwrap_err();
    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::OutputNotWritable { path, .. }) => assert_eq!(path, &ws.output()),
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(err.to_string().contains("output directory not writable"));
    assert_eq!(std::fs::read_to_string(ws.output()).unwrap(), "not a directory");

    let err = pipeline::export_geojson(&ws.input(), &ws.output().join("geojson"), &Config::default(), 1)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::OutputNotWritable { .. })
    ));
}

#[test]
fn test_prepare_table_names_avoid_companion_relations() {
    let ws = Workspace::new("companions");
    ws.write_input("parcels.jsonl", OWNERS);
    ws.write_input("parcels_view.jsonl", OWNERS);

    let report = pipeline::prepare(&ws.options(1)).unwrap();
    let tables: Vec<_> = report.files.iter().map(|f| f.table.as_str()).collect();
    assert_eq!(tables, vec!["parcels", "parcels_view_1"]);

    let schema = ws.read_output(SCHEMA_FILE);
    assert!(schema.contains("create view public.parcels_view as"));
    assert!(schema.contains("create table if not exists public.parcels_view_1 ("));
    assert!(!schema.contains("public.parcels_view ("));
}
