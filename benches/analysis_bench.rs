// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Benchmarks for the analysis core

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use seitti::{classify_reflection, scan_reflections, JsTaintAnalyzer, ScanPatterns, PROBE_ALPHABET};

fn sample_body() -> String {
    let mut body = String::from("<html><head><title>Search</title></head><body>");
    for i in 0..50 {
        body.push_str(&format!("<div class=\"row\" id=\"row{}\">filler text</div>", i));
    }
    body.push_str("<script>var q = 'zz9probe'; render(q);</script>");
    body.push_str("<div>zz9probe</div></body></html>");
    body
}

fn sample_js() -> String {
    let mut js = String::from("var q = location.search;\n");
    for i in 0..30 {
        js.push_str(&format!("function helper{}(a, b) {{ return a + b; }}\n", i));
    }
    js.push_str("function render(value) { document.getElementById('out').innerHTML = value; }\n");
    js.push_str("render(q);\n");
    js
}

fn bench_classifier(c: &mut Criterion) {
    let body = sample_body();
    c.bench_function("classify_reflection", |b| {
        b.iter(|| classify_reflection(black_box(&body), black_box("zz9probe"), None))
    });

    c.bench_function("scan_reflections", |b| {
        b.iter(|| scan_reflections(black_box(&body), black_box("zz9probe"), &PROBE_ALPHABET))
    });
}

fn bench_taint_walker(c: &mut Criterion) {
    let patterns = ScanPatterns::new().expect("tables compile");
    let js = sample_js();
    c.bench_function("analyze_js", |b| {
        b.iter(|| {
            let analyzer = JsTaintAnalyzer::new(&patterns);
            analyzer.analyze(black_box(&js))
        })
    });
}

criterion_group!(benches, bench_classifier, bench_taint_walker);
criterion_main!(benches);
