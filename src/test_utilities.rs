//! Test cases and test utility functions.
//!

use rand::{distributions::Alphanumeric, seq::SliceRandom, thread_rng, Rng};
use std::{env, io::Write, path::PathBuf};
use tempfile::NamedTempFile;

use crate::{
    error::AecrError,
    graph::AnnotationGraph,
    model::{
        BioSource, CdRegion, DescriptorData, Feature, FeatureData, FeatureId, GeneRef, Genome,
        OrgMod, OrgModSubtype, OrgRef, ProtProcessing, ProtRef, Qualifier, RnaKind, RnaRef,
        RnaExt, SequenceKind, SubSource, SubSourceSubtype, TrnaExt,
    },
    ranges::{SeqInterval, Strand},
    Position,
};

/// The main nucleotide sequence of [`graph_test_case_01`].
pub const CASE_01_SEQ: &str = "NC_001";
/// Locus of the pseudo gene in [`graph_test_case_01`].
pub const CASE_01_PSEUDO_GENE: &str = "pseuC";
/// A coding region product sequence with no protein feature.
pub const CASE_01_BARE_PRODUCT: &str = "prot_bare";

// Random graph defaults
pub const MIN_GENE_LEN: Position = 90;
pub const MAX_GENE_LEN: Position = 3000;
pub const RANDOM_SEQ_LEN: Position = 5_000_000;

/// Words random product names are built from.
const PRODUCT_WORDS: &[&str] = &[
    "ABC",
    "transporter",
    "hypothetical",
    "protein",
    "kinase",
    "putative",
    "ribosomal",
    "subunit",
    "dehydrogenase",
    "binding",
];

fn interval(start: Position, stop: Position, strand: Strand) -> SeqInterval {
    SeqInterval::new(start, stop, strand)
}

fn gene(locus: &str, locus_tag: &str) -> GeneRef {
    GeneRef {
        locus: Some(locus.to_string()),
        locus_tag: Some(locus_tag.to_string()),
        ..Default::default()
    }
}

fn prot(names: &[&str], processed: ProtProcessing) -> FeatureData {
    FeatureData::Prot(ProtRef {
        names: names.iter().map(|n| n.to_string()).collect(),
        processed,
        ..Default::default()
    })
}

fn cds(graph: &mut AnnotationGraph, seq: &str, location: SeqInterval, product: &str) -> FeatureId {
    let id = graph.num_features();
    let mut feature = Feature::new(
        FeatureId(id),
        seq,
        location,
        FeatureData::Cds(CdRegion::default()),
    );
    feature.product = Some(product.to_string());
    graph.insert_feature(feature).unwrap()
}

/// A small annotated record set:
///
/// ```text
///  NC_001 (1000 nt)
///   0 gene  abcA  [100, 200] +
///   1 mRNA        [100, 200] +
///   2 CDS         [110, 190] +  -> prot_abcA
///   5 gene  abcB  [300, 500] -   synonym oldB
///   6 CDS         [310, 490] -  -> prot_abcB
///   8 gene  pseuC [600, 700] +   pseudo
///   9 tRNA-Gly    [800, 870] +
///  NC_002 (500 nt)
///  10 CDS         [10, 300] +   -> prot_bare, gene xref xyzX
///  11 source      [0, 499]
///  12 misc_feature [350, 400]    note "repeat region"
///  prot_abcA: 3 Protein "ABC transporter A", 4 mat_peptide "mature A"
///  prot_abcB: 7 Protein "hypothetical protein"
///  prot_bare: no protein feature
/// ```
///
/// plus a source descriptor on NC_001 and a set-level title.
pub fn graph_test_case_01() -> AnnotationGraph {
    let mut graph = AnnotationGraph::new();
    graph.add_sequence(CASE_01_SEQ, SequenceKind::Nucleotide, 1000);
    graph.add_sequence("NC_002", SequenceKind::Nucleotide, 500);
    graph.add_sequence("prot_abcA", SequenceKind::Protein, 120);
    graph.add_sequence("prot_abcB", SequenceKind::Protein, 80);
    graph.add_sequence(CASE_01_BARE_PRODUCT, SequenceKind::Protein, 50);

    // abcA: gene, mRNA, CDS, protein and a mature peptide
    graph
        .add_feature(
            CASE_01_SEQ,
            interval(100, 200, Strand::Plus),
            FeatureData::Gene(gene("abcA", "T_0001")),
        )
        .unwrap();
    graph
        .add_feature(
            CASE_01_SEQ,
            interval(100, 200, Strand::Plus),
            FeatureData::Rna(RnaRef::new(RnaKind::Mrna)),
        )
        .unwrap();
    cds(&mut graph, CASE_01_SEQ, interval(110, 190, Strand::Plus), "prot_abcA");
    graph
        .add_feature(
            "prot_abcA",
            interval(0, 119, Strand::Plus),
            prot(&["ABC transporter A"], ProtProcessing::NotSet),
        )
        .unwrap();
    graph
        .add_feature(
            "prot_abcA",
            interval(20, 119, Strand::Plus),
            prot(&["mature A"], ProtProcessing::Mature),
        )
        .unwrap();

    // abcB: minus strand, no mRNA
    let mut abc_b = gene("abcB", "T_0002");
    abc_b.synonyms.push("oldB".to_string());
    graph
        .add_feature(
            CASE_01_SEQ,
            interval(300, 500, Strand::Minus),
            FeatureData::Gene(abc_b),
        )
        .unwrap();
    cds(&mut graph, CASE_01_SEQ, interval(310, 490, Strand::Minus), "prot_abcB");
    graph
        .add_feature(
            "prot_abcB",
            interval(0, 79, Strand::Plus),
            prot(&["hypothetical protein"], ProtProcessing::NotSet),
        )
        .unwrap();

    let mut pseudo = gene(CASE_01_PSEUDO_GENE, "T_0003");
    pseudo.pseudo = true;
    graph
        .add_feature(
            CASE_01_SEQ,
            interval(600, 700, Strand::Plus),
            FeatureData::Gene(pseudo),
        )
        .unwrap();

    let trna = RnaRef {
        kind: RnaKind::Trna,
        ext: RnaExt::Trna(TrnaExt {
            aa: Some('G'),
            ..Default::default()
        }),
    };
    graph
        .add_feature(
            CASE_01_SEQ,
            interval(800, 870, Strand::Plus),
            FeatureData::Rna(trna),
        )
        .unwrap();

    // NC_002: a coding region with only a cross-reference to its gene
    let xref_cds = cds(&mut graph, "NC_002", interval(10, 300, Strand::Plus), CASE_01_BARE_PRODUCT);
    if let Some(feature) = graph.feature_mut(xref_cds) {
        feature.gene_xref = Some(GeneRef {
            locus: Some("xyzX".to_string()),
            ..Default::default()
        });
    }
    let source = BioSource {
        org: OrgRef {
            taxname: Some("Escherichia coli".to_string()),
            mods: vec![OrgMod {
                subtype: OrgModSubtype::Strain,
                value: "K-12".to_string(),
            }],
            ..Default::default()
        },
        ..Default::default()
    };
    graph
        .add_feature(
            "NC_002",
            interval(0, 499, Strand::Plus),
            FeatureData::Source(source),
        )
        .unwrap();
    let repeat = graph
        .add_feature(
            "NC_002",
            interval(350, 400, Strand::Plus),
            FeatureData::Import {
                key: "misc_feature".to_string(),
            },
        )
        .unwrap();
    if let Some(feature) = graph.feature_mut(repeat) {
        feature.qualifiers.push(Qualifier::new("note", "repeat region"));
    }

    let source = BioSource {
        genome: Genome::Genomic,
        org: OrgRef {
            taxname: Some("Escherichia coli".to_string()),
            mods: vec![
                OrgMod {
                    subtype: OrgModSubtype::Strain,
                    value: "K-12".to_string(),
                },
                OrgMod {
                    subtype: OrgModSubtype::Note,
                    value: "type strain".to_string(),
                },
            ],
            ..Default::default()
        },
        subtypes: vec![SubSource {
            subtype: SubSourceSubtype::Note,
            value: "collected 2019".to_string(),
        }],
        ..Default::default()
    };
    graph
        .add_descriptor(Some(CASE_01_SEQ), DescriptorData::Source(source))
        .unwrap();
    graph
        .add_descriptor(
            None,
            DescriptorData::Title {
                text: "test set".to_string(),
            },
        )
        .unwrap();
    graph
}

/// One sequence carrying a gene per description, with loci `gene0`,
/// `gene1`, ... and the given descriptions.
pub fn graph_with_genes(descriptions: &[&str]) -> AnnotationGraph {
    let mut graph = AnnotationGraph::new();
    let length = 100 * (descriptions.len() as Position + 1);
    graph.add_sequence("seq1", SequenceKind::Nucleotide, length);
    for (i, desc) in descriptions.iter().enumerate() {
        let start = 100 * i as Position;
        let gene = GeneRef {
            locus: Some(format!("gene{}", i)),
            desc: Some(desc.to_string()),
            ..Default::default()
        };
        graph
            .add_feature(
                "seq1",
                interval(start, start + 50, Strand::Plus),
                FeatureData::Gene(gene),
            )
            .unwrap();
    }
    graph
}

/// Random alphanumeric text of length `len`.
pub fn random_text(len: usize) -> String {
    thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

/// A random protein product name, e.g. `putative ABC kinase`.
pub fn random_product() -> String {
    let mut rng = thread_rng();
    let nwords = rng.gen_range(1..=4);
    (0..nwords)
        .filter_map(|_| PRODUCT_WORDS.choose(&mut rng).copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build a random graph of `n` gene/CDS/protein triples on one sequence,
/// roughly half of them on the minus strand. Genes do not overlap.
pub fn random_graph(n: usize) -> Result<AnnotationGraph, AecrError> {
    let mut rng = thread_rng();
    let mut graph = AnnotationGraph::new();
    let slot = RANDOM_SEQ_LEN / (n.max(1) as Position);
    let max_len = MAX_GENE_LEN.min(slot).max(MIN_GENE_LEN + 1);
    graph.add_sequence("chr1", SequenceKind::Nucleotide, RANDOM_SEQ_LEN);
    for i in 0..n {
        let len = rng.gen_range(MIN_GENE_LEN..max_len);
        let start = i as Position * slot;
        let strand = if rng.gen_bool(0.5) {
            Strand::Plus
        } else {
            Strand::Minus
        };
        let product = format!("prot_{}", i);
        graph.add_sequence(&product, SequenceKind::Protein, len / 3);
        graph.add_feature(
            "chr1",
            interval(start, start + len - 1, strand),
            FeatureData::Gene(gene(&format!("g{}", i), &format!("T_{:05}", i))),
        )?;
        let mut coding = Feature::new(
            FeatureId(graph.num_features()),
            "chr1",
            interval(start, start + len - 1, strand),
            FeatureData::Cds(CdRegion::default()),
        );
        coding.product = Some(product.clone());
        graph.insert_feature(coding)?;
        graph.add_feature(
            &product,
            interval(0, len / 3 - 1, Strand::Plus),
            prot(&[random_product().as_str()], ProtProcessing::NotSet),
        )?;
    }
    Ok(graph)
}

/// Write `graph` to a temporary JSON file.
pub fn temp_graph_file(graph: &AnnotationGraph) -> Result<NamedTempFile, AecrError> {
    let mut file = NamedTempFile::new()?;
    serde_json::to_writer_pretty(&mut file, graph)?;
    file.flush()?;
    Ok(file)
}

/// The path of the `aecr` binary built alongside the running test.
pub fn aecr_binary_path() -> PathBuf {
    let mut path = env::current_exe().expect("could not locate the test executable");
    path.pop(); // the test executable
    if path.ends_with("deps") {
        path.pop();
    }
    path.push("aecr");
    path
}

/// Read a graph back from a JSON file.
pub fn read_graph_file(path: impl AsRef<std::path::Path>) -> Result<AnnotationGraph, AecrError> {
    let file = std::fs::File::open(path)?;
    Ok(serde_json::from_reader(std::io::BufReader::new(file))?)
}
