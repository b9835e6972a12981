//! Command functions for the `aecr` command line tool.
//!
//! Each reads an annotation graph from a JSON file, runs one or more AECR
//! requests against it and writes the graph back out, to standard output if
//! no output file is given. The graph is written even when nothing changed,
//! so commands can be chained in a pipeline.

use std::{
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{
    conflict::CancelOnConflict,
    dispatch::{ActionSummary, AecrEngine, AecrRequest},
    error::AecrError,
    graph::AnnotationGraph,
    reporting::{CommandOutput, Report},
};

/// Read an annotation graph from a JSON file.
pub fn read_graph(path: impl AsRef<Path>) -> Result<AnnotationGraph, AecrError> {
    let file = File::open(path.as_ref())?;
    let graph: AnnotationGraph = serde_json::from_reader(BufReader::new(file))?;
    info!(
        "read {} feature(s) from {}",
        graph.num_features(),
        path.as_ref().display()
    );
    Ok(graph)
}

/// Write an annotation graph as JSON to `output`, or standard output.
pub fn write_graph(graph: &AnnotationGraph, output: Option<&PathBuf>) -> Result<(), AecrError> {
    let mut writer: Box<dyn Write> = match output {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    serde_json::to_writer_pretty(&mut writer, graph)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

/// Read AECR requests from a JSON file holding an array of requests.
pub fn read_requests(path: impl AsRef<Path>) -> Result<Vec<AecrRequest>, AecrError> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Run requests in order over the graph in `input`. Conflicts with
/// existing text cancel a request unless it carries its own policy.
fn run_requests(
    input: &PathBuf,
    output: Option<&PathBuf>,
    requests: &[AecrRequest],
) -> Result<CommandOutput<Vec<ActionSummary>>, AecrError> {
    let mut graph = read_graph(input)?;
    let mut dirty = false;
    let outputs = {
        let mut engine = AecrEngine::new(CancelOnConflict).with_notifier(|| dirty = true);
        engine.run_batch(&mut graph, requests)?
    };
    if !dirty {
        info!("annotation graph unchanged");
    }
    write_graph(&graph, output)?;

    let mut report = Report::new();
    let mut summaries = Vec::with_capacity(outputs.len());
    for output in outputs {
        let (summary, sub_report) = output.into_parts();
        for issue in sub_report.issues() {
            report.add_issue(issue.clone());
        }
        summaries.push(summary);
    }
    Ok(CommandOutput::new(summaries, report))
}

/// Run one AECR request over the graph in `input`.
pub fn aecr_run(
    input: &PathBuf,
    output: Option<&PathBuf>,
    request: &AecrRequest,
) -> Result<CommandOutput<ActionSummary>, AecrError> {
    let (mut summaries, report) =
        run_requests(input, output, std::slice::from_ref(request))?.into_parts();
    // run_batch yields exactly one output per request
    let summary = summaries.pop().ok_or(AecrError::NoMatchingObjects)?;
    Ok(CommandOutput::new(summary, report))
}

/// Run the requests in the JSON file `requests` over the graph in
/// `input`, stopping at the first error.
pub fn aecr_batch(
    input: &PathBuf,
    output: Option<&PathBuf>,
    requests: &PathBuf,
) -> Result<CommandOutput<Vec<ActionSummary>>, AecrError> {
    let requests = read_requests(requests)?;
    info!("running {} request(s)", requests.len());
    run_requests(input, output, &requests)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conflict::{ApplyValue, Delimiter, ExistingTextPolicy},
        dispatch::Action,
        test_utilities::{graph_test_case_01, read_graph_file, temp_graph_file},
    };
    use tempfile::NamedTempFile;

    fn apply(field: &str, text: &str) -> AecrRequest {
        AecrRequest::new(Action::apply(field.parse().unwrap(), ApplyValue::new(text)))
    }

    #[test]
    fn test_aecr_run_writes_output() {
        let input = temp_graph_file(&graph_test_case_01()).unwrap();
        let output = NamedTempFile::new().unwrap();
        let output_path = output.path().to_path_buf();
        let result = aecr_run(
            &input.path().to_path_buf(),
            Some(&output_path),
            &apply("gene.allele", "a1"),
        )
        .unwrap();
        // three genes and one bare gene cross-reference
        assert_eq!(result.value().changed, 4);

        let graph = read_graph_file(&output_path).unwrap();
        let alleles = graph
            .features()
            .filter_map(|f| f.gene_data())
            .filter(|g| g.allele.as_deref() == Some("a1"))
            .count();
        assert_eq!(alleles, 4);
    }

    #[test]
    fn test_cancel_writes_nothing() {
        let input = temp_graph_file(&graph_test_case_01()).unwrap();
        let output = NamedTempFile::new().unwrap();
        let output_path = output.path().to_path_buf();
        let result = aecr_run(
            &input.path().to_path_buf(),
            Some(&output_path),
            &apply("gene.locus", "x"),
        );
        assert!(matches!(result, Err(AecrError::UserCancelled)));
        assert_eq!(std::fs::metadata(&output_path).unwrap().len(), 0);
    }

    #[test]
    fn test_aecr_batch() {
        let input = temp_graph_file(&graph_test_case_01()).unwrap();
        let mut requests_file = NamedTempFile::new().unwrap();
        let requests = vec![
            apply("gene.allele", "a1"),
            AecrRequest::new(Action::apply(
                "gene.allele".parse().unwrap(),
                ApplyValue::new("a2").with_policy(ExistingTextPolicy::Append(Delimiter::Comma)),
            )),
        ];
        serde_json::to_writer(&mut requests_file, &requests).unwrap();
        requests_file.flush().unwrap();

        let output = NamedTempFile::new().unwrap();
        let output_path = output.path().to_path_buf();
        let result = aecr_batch(
            &input.path().to_path_buf(),
            Some(&output_path),
            &requests_file.path().to_path_buf(),
        )
        .unwrap();
        assert_eq!(result.value().len(), 2);
        let graph = read_graph_file(&output_path).unwrap();
        assert!(graph
            .features()
            .filter(|f| f.is_gene())
            .all(|f| f.gene_data().and_then(|g| g.allele.as_deref()) == Some("a1, a2")));
    }
}
