use aecr::prelude::*;
use aecr::test_utilities::{random_graph, random_product, random_text};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const NUM_GENES: usize = 10_000;
const NUM_STRINGS: usize = 100_000;

fn bench_string_matching(c: &mut Criterion) {
    // create the benchmark group
    let mut group = c.benchmark_group("string_matching");

    // create the test data
    let candidates: Vec<String> = (0..NUM_STRINGS)
        .map(|i| {
            if i % 2 == 0 {
                random_product()
            } else {
                random_text(40)
            }
        })
        .collect();

    let contains = StringConstraint::contains("kinase");
    group.bench_function("contains", |b| {
        b.iter(|| {
            candidates
                .iter()
                .filter(|c| matches_string(black_box(c), &contains))
                .count()
        });
    });

    let whole_word = StringConstraint::contains("KINASE")
        .case_insensitive(true)
        .whole_word(true);
    group.bench_function("whole_word_insensitive", |b| {
        b.iter(|| {
            candidates
                .iter()
                .filter(|c| matches_string(black_box(c), &whole_word))
                .count()
        });
    });
    group.finish();
}

fn bench_cdsets(c: &mut Criterion) {
    let mut group = c.benchmark_group("cdsets");

    let graph = random_graph(NUM_GENES).unwrap();

    // configure the sample size for the group
    group.sample_size(10);

    group.bench_function("build_cdsets", |b| {
        b.iter(|| build_cdsets(black_box(&graph), &Scope::all()).len());
    });

    group.bench_function("apply_protein_name", |b| {
        b.iter(|| {
            let mut graph = graph.clone();
            let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));
            let request = AecrRequest::new(Action::apply(
                "cgp.protein-name".parse().unwrap(),
                ApplyValue::new("hypothetical protein"),
            ));
            engine.run(&mut graph, &request).unwrap().value().changed
        });
    });
    group.finish();
}

criterion_group!(benches, bench_string_matching, bench_cdsets);
criterion_main!(benches);
