//! Runs the `aecr` binary over the test graph

use aecr::{
    prelude::*,
    test_utilities::{aecr_binary_path, graph_test_case_01, read_graph_file, temp_graph_file},
};
use std::process::Command;
use tempfile::NamedTempFile;

fn gene_field(graph: &AnnotationGraph, locus: &str, field: &str) -> Option<String> {
    let gene = graph
        .features()
        .find(|f| f.is_gene() && f.gene_data().and_then(|g| g.locus.as_deref()) == Some(locus))?;
    let field: FieldRef = field.parse().ok()?;
    field
        .accessor()
        .get(graph, &Target::Object(ObjectId::Feature(gene.id)), None)
}

#[test]
fn test_cli_apply_with_filter() {
    let input = temp_graph_file(&graph_test_case_01()).unwrap();
    let output = NamedTempFile::new().unwrap();

    let aecr_output = Command::new(aecr_binary_path())
        .arg("apply")
        .arg("gene.description")
        .arg("ABC transporter")
        .arg(input.path())
        .arg("--match")
        .arg("abc")
        .arg("--match-at")
        .arg("starts-with")
        .arg("--output")
        .arg(output.path())
        .output()
        .expect("aecr apply failed");
    assert!(aecr_output.status.success(), "{:?}", aecr_output);

    let graph = read_graph_file(output.path()).unwrap();
    assert_eq!(
        gene_field(&graph, "abcA", "gene.description").as_deref(),
        Some("ABC transporter")
    );
    assert_eq!(
        gene_field(&graph, "abcB", "gene.description").as_deref(),
        Some("ABC transporter")
    );
    assert_eq!(gene_field(&graph, "pseuC", "gene.description"), None);
}

#[test]
fn test_cli_cancels_on_existing_text() {
    let input = temp_graph_file(&graph_test_case_01()).unwrap();

    let aecr_output = Command::new(aecr_binary_path())
        .arg("apply")
        .arg("gene.locus-tag")
        .arg("T_9999")
        .arg(input.path())
        .output()
        .expect("aecr apply failed");
    assert!(!aecr_output.status.success());
    assert!(aecr_output.stdout.is_empty());
    let stderr = String::from_utf8_lossy(&aecr_output.stderr);
    assert!(stderr.contains("cancelled"), "{}", stderr);
}

#[test]
fn test_cli_append_to_stdout() {
    let input = temp_graph_file(&graph_test_case_01()).unwrap();

    let aecr_output = Command::new(aecr_binary_path())
        .arg("apply")
        .arg("gene.locus-tag")
        .arg("old")
        .arg(input.path())
        .arg("--seq")
        .arg("NC_001")
        .arg("--strand")
        .arg("minus")
        .arg("--existing")
        .arg("append")
        .arg("--delimiter")
        .arg("comma")
        .output()
        .expect("aecr apply failed");
    assert!(aecr_output.status.success(), "{:?}", aecr_output);

    let graph: AnnotationGraph = serde_json::from_slice(&aecr_output.stdout).unwrap();
    assert_eq!(
        gene_field(&graph, "abcB", "gene.locus-tag").as_deref(),
        Some("T_0002, old")
    );
    assert_eq!(
        gene_field(&graph, "abcA", "gene.locus-tag").as_deref(),
        Some("T_0001")
    );
}

#[test]
fn test_cli_parse_and_swap() {
    let input = temp_graph_file(&graph_test_case_01()).unwrap();
    let parsed = NamedTempFile::new().unwrap();

    let aecr_output = Command::new(aecr_binary_path())
        .arg("parse")
        .arg("source.note-subsrc")
        .arg("source.collection-date")
        .arg(input.path())
        .arg("--left")
        .arg("collected ")
        .arg("--output")
        .arg(parsed.path())
        .output()
        .expect("aecr parse failed");
    assert!(aecr_output.status.success(), "{:?}", aecr_output);

    let swapped = NamedTempFile::new().unwrap();
    let aecr_output = Command::new(aecr_binary_path())
        .arg("swap")
        .arg("gene.locus")
        .arg("gene.locus-tag")
        .arg(parsed.path())
        .arg("--within")
        .arg("0..250")
        .arg("--output")
        .arg(swapped.path())
        .output()
        .expect("aecr swap failed");
    assert!(aecr_output.status.success(), "{:?}", aecr_output);

    let graph = read_graph_file(swapped.path()).unwrap();
    assert_eq!(
        gene_field(&graph, "T_0001", "gene.locus-tag").as_deref(),
        Some("abcA")
    );
    let source = graph
        .descriptors()
        .find(|d| d.biosource().is_some())
        .unwrap();
    let date: FieldRef = "source.collection-date".parse().unwrap();
    assert_eq!(
        date.accessor()
            .get(&graph, &Target::Object(ObjectId::Descriptor(source.id)), None)
            .as_deref(),
        Some("2019")
    );
}

#[test]
fn test_cli_rejects_bad_field() {
    let input = temp_graph_file(&graph_test_case_01()).unwrap();
    let aecr_output = Command::new(aecr_binary_path())
        .arg("remove")
        .arg("gene.no-such-field")
        .arg(input.path())
        .output()
        .expect("aecr remove failed");
    assert!(!aecr_output.status.success());
}
