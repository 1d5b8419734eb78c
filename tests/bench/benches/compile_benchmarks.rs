//! Template compiler benchmarks
//!
//! - Tokenizing and parsing alone
//! - Full compilation with and without static analysis
//! - Cached and uncached compile-to-function

use criterion::{Criterion, criterion_group, criterion_main};
use reinhardt_compiler::html::{HtmlOptions, tokenize};
use reinhardt_compiler::{CompilerConfig, CompilerOptions, SourceFactory, TemplateCompiler, compile};
use std::hint::black_box;

const TEMPLATE: &str = r#"<div id="app" :class="{ active: isActive }">
	<header><h1>Inventory</h1><p>Static subtitle</p></header>
	<ul>
		<li v-for="(item, index) in items" :key="item.id" @click="select(item)">
			{{ index }}: {{ item.name }}
			<span v-if="item.count > 10">plenty</span>
			<span v-else-if="item.count > 0">few</span>
			<span v-else>none</span>
		</li>
	</ul>
	<input v-model.trim="query" placeholder="Search">
	<my-footer v-slot="{ year }">&copy; {{ year }}</my-footer>
</div>"#;

fn benchmark_tokenize(c: &mut Criterion) {
	c.bench_function("tokenize_template", |b| {
		b.iter(|| black_box(tokenize(black_box(TEMPLATE), HtmlOptions::default())));
	});
}

fn benchmark_compile(c: &mut Criterion) {
	let options = CompilerOptions::web();
	c.bench_function("compile_optimized", |b| {
		b.iter(|| black_box(compile(black_box(TEMPLATE), &options)));
	});

	let unoptimized = CompilerOptions::web().with_config(CompilerConfig {
		optimize: false,
		..CompilerConfig::default()
	});
	c.bench_function("compile_unoptimized", |b| {
		b.iter(|| black_box(compile(black_box(TEMPLATE), &unoptimized)));
	});
}

fn benchmark_compile_to_functions(c: &mut Criterion) {
	let compiler = TemplateCompiler::new(CompilerOptions::web(), SourceFactory);
	compiler.compile_to_functions(TEMPLATE);
	c.bench_function("compile_to_functions_cached", |b| {
		b.iter(|| black_box(compiler.compile_to_functions(black_box(TEMPLATE))));
	});

	c.bench_function("compile_to_functions_cold", |b| {
		b.iter(|| {
			let compiler = TemplateCompiler::new(CompilerOptions::web(), SourceFactory);
			black_box(compiler.compile_to_functions(black_box(TEMPLATE)))
		});
	});
}

criterion_group!(
	benches,
	benchmark_tokenize,
	benchmark_compile,
	benchmark_compile_to_functions
);
criterion_main!(benches);
