//! End-to-end AECR scenarios through the public API

use aecr::{
    model::{CdRegion, GeneRef, RnaKind, RnaRef},
    prelude::*,
    test_utilities::{graph_test_case_01, graph_with_genes, random_graph, CASE_01_SEQ},
};
use std::cell::{Cell, RefCell};

fn field(s: &str) -> FieldRef {
    s.parse().unwrap()
}

fn descriptions(graph: &AnnotationGraph) -> Vec<Option<String>> {
    graph
        .features()
        .filter_map(|f| f.gene_data())
        .map(|g| g.desc.clone())
        .collect()
}

#[test]
fn test_string_constraint_scenario() {
    let starts = StringConstraint::new("NC_", MatchLocation::StartsWith);
    assert!(matches_string("NC_001", &starts));
    assert!(!matches_string("NC_001", &starts.clone().negated(true)));
}

#[test]
fn test_location_constraint_scenario() {
    let mut graph = AnnotationGraph::new();
    graph.add_sequence("chr1", SequenceKind::Nucleotide, 1000);
    let inside = graph
        .add_feature(
            "chr1",
            SeqInterval::new(120, 180, Strand::Plus),
            FeatureData::Cds(CdRegion::default()),
        )
        .unwrap();
    let straddling = graph
        .add_feature(
            "chr1",
            SeqInterval::new(90, 150, Strand::Plus),
            FeatureData::Cds(CdRegion::default()),
        )
        .unwrap();
    let filter = FilterSet::new().with_location(LocationConstraint::new(
        LocationRelation::Contained,
        100,
        200,
    ));
    assert!(filter.accepts(&graph, &Target::Object(ObjectId::Feature(inside))));
    assert!(!filter.accepts(&graph, &Target::Object(ObjectId::Feature(straddling))));
}

#[test]
fn test_append_scenario() {
    let mut graph = graph_with_genes(&["A", "A"]);
    let samples = RefCell::new(Vec::new());
    let mut engine = AecrEngine::new(|sample: &GetSample| {
        samples.borrow_mut().push(sample.clone());
        ExistingTextPolicy::Append(Delimiter::Semicolon)
    });
    let request = AecrRequest::new(Action::apply(field("gene.description"), ApplyValue::new("B")));
    engine.run(&mut graph, &request).unwrap();
    drop(engine);

    assert_eq!(
        descriptions(&graph),
        vec![Some("A; B".to_string()), Some("A; B".to_string())]
    );
    let samples = samples.into_inner();
    assert_eq!(samples.len(), 1);
    assert!(samples[0].all_same);
    assert_eq!(samples[0].num_found, 2);
}

#[test]
fn test_cdset_scenario_distinct_genes() {
    let mut graph = AnnotationGraph::new();
    graph.add_sequence("chr1", SequenceKind::Nucleotide, 2000);
    let gene = |locus: &str| {
        FeatureData::Gene(GeneRef {
            locus: Some(locus.to_string()),
            ..Default::default()
        })
    };
    graph
        .add_feature("chr1", SeqInterval::new(0, 1000, Strand::Plus), gene("outer"))
        .unwrap();
    graph
        .add_feature("chr1", SeqInterval::new(100, 400, Strand::Plus), gene("inner"))
        .unwrap();
    let mrna = graph
        .add_feature(
            "chr1",
            SeqInterval::new(50, 900, Strand::Plus),
            FeatureData::Rna(RnaRef::new(RnaKind::Mrna)),
        )
        .unwrap();
    let cds = graph
        .add_feature(
            "chr1",
            SeqInterval::new(150, 350, Strand::Plus),
            FeatureData::Cds(CdRegion::default()),
        )
        .unwrap();

    let sets = build_cdsets(&graph, &Scope::all());
    let with_cds = sets.iter().position(|s| s.contains(cds)).unwrap();
    let with_mrna = sets.iter().position(|s| s.contains(mrna)).unwrap();
    assert_ne!(with_cds, with_mrna);
}

#[test]
fn test_swap_scenario() {
    let mut graph = graph_with_genes(&["2"]);
    let locus = field("gene.locus");
    let target = Target::Object(ObjectId::Feature(FeatureId(0)));
    locus
        .accessor()
        .set(&mut graph, &target, &ApplyValue::new("1"), None)
        .unwrap();

    let calls = Cell::new(0);
    let mut engine = AecrEngine::new(|_: &GetSample| {
        calls.set(calls.get() + 1);
        ExistingTextPolicy::Cancel
    });
    let spec = ConvertFieldSpec::new(locus.clone(), field("gene.description"), ConvertMode::Swap);
    engine
        .run(&mut graph, &AecrRequest::new(Action::Convert(spec)))
        .unwrap();

    assert_eq!(locus.accessor().get(&graph, &target, None).as_deref(), Some("2"));
    assert_eq!(
        field("gene.description")
            .accessor()
            .get(&graph, &target, None)
            .as_deref(),
        Some("1")
    );
    assert_eq!(calls.get(), 0);
}

#[test]
fn test_remove_all_notes() {
    let mut graph = graph_test_case_01();
    let mut engine = AecrEngine::new(CancelOnConflict);
    let request = AecrRequest::new(Action::remove(field("source.all-notes")))
        .with_scope(Scope::all().retain_seqnames(&[CASE_01_SEQ.to_string()]));
    let output = engine.run(&mut graph, &request).unwrap();
    assert_eq!(output.value().changed, 1);

    let biosource = graph
        .descriptors()
        .find_map(|d| d.biosource())
        .unwrap();
    assert!(biosource.subtypes.is_empty());
    assert_eq!(biosource.org.mods.len(), 1);
}

#[test]
fn test_cgp_edit_reaches_every_cluster_member() {
    let mut graph = graph_test_case_01();
    let mut engine = AecrEngine::new(CancelOnConflict);
    let request = AecrRequest::new(Action::edit(
        field("cgp.gene-locus"),
        ApplyValue::edit("abc", "def"),
    ));
    let output = engine.run(&mut graph, &request).unwrap();
    assert_eq!(output.value().changed, 2);
    let loci: Vec<String> = graph
        .features()
        .filter(|f| f.is_gene())
        .filter_map(|f| f.gene_data().and_then(|g| g.locus.clone()))
        .collect();
    assert!(loci.contains(&"defA".to_string()));
    assert!(loci.contains(&"defB".to_string()));
}

#[test]
fn test_random_graph_rename_products() {
    let mut graph = random_graph(200).unwrap();
    let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));
    let request = AecrRequest::new(Action::apply(
        field("protein.name"),
        ApplyValue::new("hypothetical protein"),
    ))
    .with_filter(FilterSet::new().with_location(
        LocationConstraint::default().on_strand(StrandFilter::Minus),
    ));
    let output = engine.run(&mut graph, &request).unwrap();

    let minus_cds = graph
        .features()
        .filter(|f| f.is_cds() && f.location.strand == Strand::Minus)
        .count();
    assert_eq!(output.value().targets, minus_cds);
    assert_eq!(output.value().skipped, 0);
}

#[test]
fn test_cancel_then_batch_keeps_earlier_changes() {
    let mut graph = graph_test_case_01();
    let mut engine = AecrEngine::new(CancelOnConflict);
    let requests = vec![
        AecrRequest::new(Action::apply(field("gene.maploc"), ApplyValue::new("1q21"))),
        AecrRequest::new(Action::apply(field("gene.locus"), ApplyValue::new("x"))),
    ];
    let result = engine.run_batch(&mut graph, &requests);
    assert!(matches!(result, Err(AecrError::UserCancelled)));
    assert!(graph
        .features()
        .filter(|f| f.is_gene())
        .all(|f| f.gene_data().and_then(|g| g.maploc.as_deref()) == Some("1q21")));
}
