/// Benchmarks for structural analysis and hunk splitting
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use gitdive::diff::{FileFilter, HunkSplitter, StructuralDiffAnalyzer};
use gitdive::logging::TracingLogger;

/// Synthetic diff touching `files` files, each with a few declarations
fn synthetic_diff(files: usize) -> String {
    let mut diff = String::new();
    for i in 0..files {
        diff.push_str(&format!(
            r#"diff --git a/src/module_{i}.rs b/src/module_{i}.rs
index 1111111..2222222 100644
--- a/src/module_{i}.rs
+++ b/src/module_{i}.rs
@@ -1,3 +1,4 @@
-pub fn function_{i}(x: i32) -> i32 {{
+pub fn function_{i}(x: i64) -> i64 {{
+pub struct Data{i} {{
-    x * 2
+    x * 3
@@ -20 +21 @@
-fn helper_{i}() {{
"#
        ));
    }
    diff
}

fn benchmark_analysis(c: &mut Criterion) {
    let analyzer = StructuralDiffAnalyzer::new(FileFilter::default(), TracingLogger::shared("bench"));
    let mut group = c.benchmark_group("structural_analysis");

    for files in [10, 100, 1000] {
        let diff = synthetic_diff(files);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", files)),
            &diff,
            |b, diff| b.iter(|| analyzer.analyze(black_box(diff))),
        );
    }

    group.finish();
}

fn benchmark_splitting(c: &mut Criterion) {
    let splitter = HunkSplitter::default();
    let mut group = c.benchmark_group("hunk_splitting");

    for files in [10, 100, 1000] {
        let diff = synthetic_diff(files);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}_files", files)),
            &diff,
            |b, diff| b.iter(|| splitter.split(black_box(diff))),
        );
    }

    group.finish();
}

criterion_group!(benches, benchmark_analysis, benchmark_splitting);
criterion_main!(benches);
