//! Benchmarks pour la lecture et la conversion Esri JSON

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;

use esri_json::{to_portable, RecordReader};

/// Génère un flux JSONL de polygones en Web Mercator
fn synthetic_jsonl(records: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..records {
        let x = -8_616_000.0 + i as f64;
        let y = 4_470_000.0 + i as f64;
        out.push_str(&format!(
            r#"{{"attributes":{{"OBJECTID":{i},"Owner Name":"Owner {i}","GIS_Acres":"{acres}"}},"geometry":{{"rings":[[[{x},{y}],[{x1},{y}],[{x1},{y1}],[{x},{y}]]],"spatialReference":{{"wkid":102100}}}}}}"#,
            i = i,
            acres = i as f64 / 10.0,
            x = x,
            y = y,
            x1 = x + 25.0,
            y1 = y + 25.0,
        ));
        out.push('\n');
    }
    out.into_bytes()
}

fn bench_read_and_convert(c: &mut Criterion) {
    let mut group = c.benchmark_group("read_and_convert");

    for records in [1_000usize, 10_000] {
        let data = synthetic_jsonl(records);
        group.throughput(Throughput::Bytes(data.len() as u64));

        group.bench_with_input(BenchmarkId::from_parameter(records), &data, |b, data| {
            b.iter(|| {
                let mut converted = 0usize;
                for record in RecordReader::new(Cursor::new(black_box(data.as_slice()))) {
                    let Ok(record) = record else { continue };
                    if record.geometry.as_ref().and_then(to_portable).is_some() {
                        converted += 1;
                    }
                }
                black_box(converted)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_read_and_convert);
criterion_main!(benches);
