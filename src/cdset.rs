//! Coding-region clusters ("CDS-gene-prot sets").
//!
//! [`build_cdsets`] groups the gene, mRNA, coding region, protein and
//! mature peptide features that describe one coding unit, so that a
//! `cgp.*` field can be applied to the whole unit at once.
//!
//! Per nucleotide sequence, genes and mRNAs are indexed in a
//! [`FeatureTree`] and each coding region is linked to
//!
//!  1. its gene: the gene named by its gene cross-reference if it has one
//!     (a cross-reference naming no gene links to nothing), otherwise the
//!     smallest strand-compatible gene containing it;
//!  2. its mRNA: the smallest strand-compatible mRNA containing it, kept
//!     only if that mRNA resolves to the same gene;
//!  3. the protein and mature peptide features on its product sequence.
//!
//! Leftover mRNAs join the cluster of their gene or start their own, and
//! leftover genes become singleton clusters. Every feature ends up in at
//! most one cluster.

use std::collections::HashMap;

use crate::{
    constraints::FilterSet,
    fields::Target,
    graph::{AnnotationGraph, Scope},
    model::{Feature, FeatureData, FeatureId, SequenceKind},
    ranges::{coitrees::FeatureTree, IntervalIndexed},
    traits::GenericRange,
};

/// One coding-region cluster.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CdSet {
    pub cds: Vec<FeatureId>,
    /// Gene features, or features whose gene cross-reference stands in for
    /// a gene that is not annotated.
    pub gene: Vec<FeatureId>,
    pub mrna: Vec<FeatureId>,
    /// Full-length protein and mature peptide features.
    pub prot: Vec<FeatureId>,
}

impl CdSet {
    /// A cluster holding only `feature` (and, for a coding region, its
    /// product's protein features).
    pub fn singleton(graph: &AnnotationGraph, feature: FeatureId) -> Self {
        let mut set = CdSet::default();
        let Some(f) = graph.feature(feature) else {
            return set;
        };
        match &f.data {
            FeatureData::Gene(_) => set.gene.push(feature),
            FeatureData::Cds(_) => {
                set.cds.push(feature);
                set.prot.extend(product_proteins(graph, feature));
            }
            FeatureData::Prot(_) => set.prot.push(feature),
            FeatureData::Rna(_) if f.is_mrna() => set.mrna.push(feature),
            _ if f.gene_xref.is_some() => set.gene.push(feature),
            _ => {}
        }
        set
    }

    /// All member features, without duplicates, coding regions first.
    pub fn members(&self) -> Vec<FeatureId> {
        let mut members: Vec<FeatureId> = Vec::new();
        for id in self.cds.iter().chain(&self.gene).chain(&self.mrna).chain(&self.prot) {
            if !members.contains(id) {
                members.push(*id);
            }
        }
        members
    }

    pub fn contains(&self, id: FeatureId) -> bool {
        self.cds.contains(&id) || self.gene.contains(&id) || self.mrna.contains(&id) || self.prot.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.cds.is_empty() && self.gene.is_empty() && self.mrna.is_empty() && self.prot.is_empty()
    }
}

/// The protein and mature peptide features of a coding region's product.
fn product_proteins(graph: &AnnotationGraph, cds: FeatureId) -> Vec<FeatureId> {
    let Some(product) = graph.product_sequence(cds) else {
        return Vec::new();
    };
    let mut prots: Vec<FeatureId> = graph.protein_feature(product).into_iter().collect();
    prots.extend(graph.mature_peptides(product));
    prots
}

/// Features of one kind on one sequence, with an interval tree over them.
struct IndexedFeatures<'a> {
    features: Vec<&'a Feature>,
    tree: FeatureTree,
}

impl<'a> IndexedFeatures<'a> {
    fn new(features: Vec<&'a Feature>) -> Self {
        let ranges: Vec<IntervalIndexed> = features
            .iter()
            .enumerate()
            .map(|(i, f)| IntervalIndexed::new(f.location.start, f.location.stop, i))
            .collect();
        Self {
            tree: FeatureTree::new(&ranges),
            features,
        }
    }

    /// The smallest strand-compatible feature containing `feature`, ties
    /// going to the earliest.
    fn smallest_containing(&self, feature: &Feature) -> Option<&'a Feature> {
        let location = &feature.location;
        self.tree
            .overlapping(location.start, location.stop)
            .into_iter()
            .map(|i| self.features[i])
            .filter(|candidate| candidate.id != feature.id)
            .filter(|candidate| candidate.location.contains_range(location))
            .filter(|candidate| candidate.location.strand.is_compatible(&feature.location.strand))
            .min_by_key(|candidate| (candidate.location.width(), candidate.id))
    }
}

/// Cluster builder state for one sequence.
struct Clusters {
    sets: Vec<CdSet>,
    assigned: HashMap<FeatureId, usize>,
}

impl Clusters {
    fn new() -> Self {
        Self {
            sets: Vec::new(),
            assigned: HashMap::new(),
        }
    }

    fn cluster_of(&self, id: Option<FeatureId>) -> Option<usize> {
        id.and_then(|id| self.assigned.get(&id).copied())
    }

    fn open(&mut self) -> usize {
        self.sets.push(CdSet::default());
        self.sets.len() - 1
    }

    fn is_assigned(&self, id: FeatureId) -> bool {
        self.assigned.contains_key(&id)
    }

    fn add_gene(&mut self, index: usize, id: FeatureId) {
        if self.assigned.insert(id, index).is_none() {
            self.sets[index].gene.push(id);
        }
    }

    fn add_mrna(&mut self, index: usize, id: FeatureId) {
        if self.assigned.insert(id, index).is_none() {
            self.sets[index].mrna.push(id);
        }
    }

    fn add_cds(&mut self, index: usize, id: FeatureId) {
        if self.assigned.insert(id, index).is_none() {
            self.sets[index].cds.push(id);
        }
    }

    fn add_prots(&mut self, index: usize, prots: Vec<FeatureId>) {
        for id in prots {
            if self.assigned.insert(id, index).is_none() {
                self.sets[index].prot.push(id);
            }
        }
    }
}

/// Linking rules over the genes and mRNAs of one sequence.
struct SequenceIndex<'a> {
    genes: IndexedFeatures<'a>,
    mrnas: IndexedFeatures<'a>,
}

impl<'a> SequenceIndex<'a> {
    /// The gene of a feature. An explicit cross-reference decides on its
    /// own: naming no gene suppresses the overlap rule, and naming a gene
    /// that is not annotated links to nothing.
    fn gene_for(&self, feature: &Feature) -> Option<FeatureId> {
        if let Some(xref) = &feature.gene_xref {
            if xref.is_suppressor() {
                return None;
            }
            return self
                .genes
                .features
                .iter()
                .find(|gene| gene.gene_data().map_or(false, |g| g.refers_to(xref)))
                .map(|gene| gene.id);
        }
        self.genes.smallest_containing(feature).map(|gene| gene.id)
    }

    fn mrna_for(&self, feature: &Feature) -> Option<&'a Feature> {
        self.mrnas.smallest_containing(feature)
    }
}

/// A feature whose non-suppressing cross-reference names no annotated
/// gene; its cross-reference is then the cluster's gene.
fn stands_in_for_gene(index: &SequenceIndex, feature: &Feature) -> bool {
    feature
        .gene_xref
        .as_ref()
        .map_or(false, |xref| !xref.is_suppressor())
        && index.gene_for(feature).is_none()
}

fn cluster_sequence(graph: &AnnotationGraph, seq_id: &str) -> Vec<CdSet> {
    let features: Vec<&Feature> = graph.features_on(seq_id).collect();
    let index = SequenceIndex {
        genes: IndexedFeatures::new(features.iter().copied().filter(|f| f.is_gene()).collect()),
        mrnas: IndexedFeatures::new(features.iter().copied().filter(|f| f.is_mrna()).collect()),
    };
    let mut clusters = Clusters::new();

    for cds in features.iter().filter(|f| f.is_cds()) {
        let gene = index.gene_for(cds);
        let mrna = index
            .mrna_for(cds)
            .filter(|mrna| index.gene_for(mrna) == gene)
            .map(|mrna| mrna.id);
        let cluster = clusters
            .cluster_of(gene)
            .or_else(|| clusters.cluster_of(mrna))
            .unwrap_or_else(|| clusters.open());
        clusters.add_cds(cluster, cds.id);
        if let Some(gene) = gene {
            clusters.add_gene(cluster, gene);
        } else if stands_in_for_gene(&index, cds) {
            clusters.add_gene(cluster, cds.id);
        }
        if let Some(mrna) = mrna {
            clusters.add_mrna(cluster, mrna);
        }
        clusters.add_prots(cluster, product_proteins(graph, cds.id));
    }

    for mrna in &index.mrnas.features {
        if clusters.is_assigned(mrna.id) {
            continue;
        }
        let gene = index.gene_for(mrna);
        let cluster = clusters
            .cluster_of(gene)
            .unwrap_or_else(|| clusters.open());
        clusters.add_mrna(cluster, mrna.id);
        if let Some(gene) = gene {
            clusters.add_gene(cluster, gene);
        }
    }

    for gene in &index.genes.features {
        if !clusters.is_assigned(gene.id) {
            let cluster = clusters.open();
            clusters.add_gene(cluster, gene.id);
        }
    }

    for feature in &features {
        let eligible = !feature.is_gene()
            && !feature.is_cds()
            && !feature.is_mrna()
            && !clusters.is_assigned(feature.id)
            && stands_in_for_gene(&index, feature);
        if eligible {
            let cluster = clusters.open();
            clusters.add_gene(cluster, feature.id);
        }
    }

    clusters.sets
}

/// Build the coding-region clusters of every nucleotide sequence in
/// `scope`, in sequence order.
pub fn build_cdsets(graph: &AnnotationGraph, scope: &Scope) -> Vec<CdSet> {
    let sets: Vec<CdSet> = graph
        .sequences()
        .filter(|seq| seq.kind == SequenceKind::Nucleotide && scope.includes(Some(&seq.id)))
        .flat_map(|seq| cluster_sequence(graph, &seq.id))
        .collect();
    tracing::debug!("built {} coding-region cluster(s)", sets.len());
    sets
}

/// The clusters in `scope` that pass `filter`.
pub fn matching_cdsets(graph: &AnnotationGraph, scope: &Scope, filter: &FilterSet) -> Vec<CdSet> {
    build_cdsets(graph, scope)
        .into_iter()
        .filter(|set| filter.accepts(graph, &Target::Cluster(set.clone())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{CdRegion, GeneRef},
        ranges::{SeqInterval, Strand},
        test_utilities::{graph_test_case_01, CASE_01_PSEUDO_GENE},
    };
    use std::collections::HashSet;

    fn gene(locus: &str) -> FeatureData {
        FeatureData::Gene(GeneRef {
            locus: Some(locus.to_string()),
            ..Default::default()
        })
    }

    fn locus_of(graph: &AnnotationGraph, id: FeatureId) -> Option<String> {
        graph.feature(id)?.gene_data()?.locus.clone()
    }

    #[test]
    fn test_case_01_clusters() {
        let graph = graph_test_case_01();
        let sets = build_cdsets(&graph, &Scope::all());
        assert_eq!(sets.len(), 4);

        // abcA: gene, mRNA, CDS, protein and mature peptide
        assert_eq!(sets[0].cds.len(), 1);
        assert_eq!(sets[0].mrna.len(), 1);
        assert_eq!(sets[0].prot.len(), 2);
        assert_eq!(locus_of(&graph, sets[0].gene[0]).as_deref(), Some("abcA"));

        // abcB: on the minus strand, no mRNA
        assert_eq!(locus_of(&graph, sets[1].gene[0]).as_deref(), Some("abcB"));
        assert!(sets[1].mrna.is_empty());
        assert_eq!(sets[1].prot.len(), 1);

        // the pseudogene has nothing else
        assert_eq!(
            locus_of(&graph, sets[2].gene[0]).as_deref(),
            Some(CASE_01_PSEUDO_GENE)
        );
        assert!(sets[2].cds.is_empty());

        // a coding region whose cross-reference names no annotated gene
        assert_eq!(sets[3].cds, sets[3].gene);
        assert!(sets[3].prot.is_empty());
    }

    #[test]
    fn test_each_feature_in_at_most_one_cluster() {
        let graph = graph_test_case_01();
        let mut seen = HashSet::new();
        for set in build_cdsets(&graph, &Scope::all()) {
            for id in set.members() {
                assert!(seen.insert(id), "{:?} clustered twice", id);
            }
        }
    }

    #[test]
    fn test_mrna_of_a_different_gene_is_not_merged() {
        let mut graph = AnnotationGraph::new();
        graph.add_sequence("chr1", SequenceKind::Nucleotide, 2000);
        let outer = graph
            .add_feature("chr1", SeqInterval::new(0, 1000, Strand::Plus), gene("outer"))
            .unwrap();
        let inner = graph
            .add_feature("chr1", SeqInterval::new(100, 400, Strand::Plus), gene("inner"))
            .unwrap();
        let mrna = graph
            .add_feature(
                "chr1",
                SeqInterval::new(50, 900, Strand::Plus),
                FeatureData::Rna(crate::model::RnaRef::new(crate::model::RnaKind::Mrna)),
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
        // the CDS belongs to "inner"; the mRNA belongs to "outer"
        let cds_set = sets.iter().find(|s| s.cds.contains(&cds)).unwrap();
        assert_eq!(cds_set.gene, vec![inner]);
        assert!(cds_set.mrna.is_empty());
        let mrna_set = sets.iter().find(|s| s.mrna.contains(&mrna)).unwrap();
        assert_eq!(mrna_set.gene, vec![outer]);
    }

    #[test]
    fn test_strand_and_suppressing_xref() {
        let mut graph = AnnotationGraph::new();
        graph.add_sequence("chr1", SequenceKind::Nucleotide, 2000);
        let minus_gene = graph
            .add_feature("chr1", SeqInterval::new(0, 1000, Strand::Minus), gene("m"))
            .unwrap();
        let plus_cds = graph
            .add_feature(
                "chr1",
                SeqInterval::new(100, 200, Strand::Plus),
                FeatureData::Cds(CdRegion::default()),
            )
            .unwrap();
        let suppressed = graph
            .add_feature(
                "chr1",
                SeqInterval::new(300, 400, Strand::Minus),
                FeatureData::Cds(CdRegion::default()),
            )
            .unwrap();
        graph.feature_mut(suppressed).unwrap().gene_xref = Some(GeneRef::default());

        let sets = build_cdsets(&graph, &Scope::all());
        for set in &sets {
            if set.cds.contains(&plus_cds) || set.cds.contains(&suppressed) {
                assert!(set.gene.is_empty());
            }
        }
        assert!(sets.iter().any(|s| s.gene == vec![minus_gene] && s.cds.is_empty()));
    }

    #[test]
    fn test_scope_limits_sequences() {
        let graph = graph_test_case_01();
        let scope = Scope::all().exclude_seqnames(&["NC_002".to_string()]);
        assert_eq!(build_cdsets(&graph, &scope).len(), 3);
    }

    #[test]
    fn test_singleton() {
        let graph = graph_test_case_01();
        let cds = graph
            .features()
            .find(|f| f.is_cds() && f.product.as_deref() == Some("prot_abcA"))
            .map(|f| f.id)
            .unwrap();
        let set = CdSet::singleton(&graph, cds);
        assert_eq!(set.cds, vec![cds]);
        assert_eq!(set.prot.len(), 2);
        assert!(set.gene.is_empty());
        assert_eq!(set.members().len(), 3);
    }
}
