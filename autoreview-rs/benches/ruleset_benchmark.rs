use autoreview_rs::{parser, ring, HashRing};
use criterion::{criterion_group, criterion_main, Criterion};

const SOURCE: &str = "\
*       @global-owner1 @global-owner2
*.js    @js-owner
*.go    docs@example.com
/build/logs/ @doctocat
docs/*  docs@example.com
apps/   @octocat
/docs/  @doctocat
# gerrit-codeowners.reviewer-count: 3
";

const TEST_PATHS: &[&str] = &[
    "README.md",
    "apps/main.js",
    "apps/main.go",
    "internal/apps/main.js",
    "build/logs/out.json",
    "docs/guide/deep/nested/page.md",
];

fn ruleset_benchmark(c: &mut Criterion) {
    c.bench_function("parsing", |b| b.iter(|| parser::parse(SOURCE)));

    let config = parser::parse(SOURCE);
    c.bench_function("matching", |b| {
        b.iter(|| {
            for path in TEST_PATHS {
                config.owners_for(path);
            }
        })
    });

    let ring = HashRing::from_elements(ring::md5_hex, (0..20).map(|i| format!("node-{i}")));
    c.bench_function("selection", |b| {
        b.iter(|| ring.get_nodes("I46d7836449e4b866f98bd66e0bf4cf3cb16e71a4", 2))
    });
}

criterion_group!(benches, ruleset_benchmark);
criterion_main!(benches);
