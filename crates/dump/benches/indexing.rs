use criterion::{Criterion, criterion_group, criterion_main};
use heap_dump::parser::{DEFAULT_BATCH_SIZE, DumpParser};
use tempfile::TempDir;
use testing::dumps::DumpBuilder;

fn bench_indexing(c: &mut Criterion) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let dump_path = temp_dir.path().join("bench.heap");

    let mut builder = DumpBuilder::new().root();
    for i in 0..10_000u64 {
        builder = builder
            .string(&format!("0x{i:012x}"), "benchmark string payload")
            .class(&format!("0x{:012x}", i + 0x1_0000_0000), &format!("Bench::Class{i}"));
    }
    builder.write(&dump_path);

    let mut parser = DumpParser::new();
    c.bench_function("build_index_20k_records", |b| {
        b.iter(|| {
            parser
                .build_index(&dump_path, DEFAULT_BATCH_SIZE)
                .expect("Failed to build index")
        })
    });
}

criterion_group!(benches, bench_indexing);
criterion_main!(benches);
