//! Settings benchmarks
//!
//! - Parsing a full settings document
//! - Building runtimes and compiler options from it

use criterion::{Criterion, criterion_group, criterion_main};
use reinhardt_ui::Settings;
use std::hint::black_box;

const DOCUMENT: &str = r#"
[reactive]
mode = "production"
async_flush = true
max_update_count = 100

[compiler]
whitespace = "condense"
delimiters = ["${", "}"]
output_source_range = false
"#;

fn benchmark_settings(c: &mut Criterion) {
	c.bench_function("settings_from_toml", |b| {
		b.iter(|| black_box(Settings::from_toml_str(black_box(DOCUMENT))));
	});

	let settings = Settings::from_toml_str(DOCUMENT).expect("settings");
	c.bench_function("settings_runtime", |b| {
		b.iter(|| black_box(settings.runtime()));
	});
	c.bench_function("settings_compiler_options", |b| {
		b.iter(|| black_box(settings.compiler_options()));
	});
}

criterion_group!(benches, benchmark_settings);
criterion_main!(benches);
