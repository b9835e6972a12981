//! The AECR dispatcher.
//!
//! [`AecrEngine::run`] performs one [`AecrRequest`] end to end:
//!
//!  1. validate the request (source and destination fields must be
//!     distinct and share a domain);
//!  2. collect targets: coding-region clusters for `cgp.*` fields, the
//!     objects the traversal yields otherwise, restricted by the request's
//!     [`Scope`] and [`FilterSet`];
//!  3. for verbs that write new text over possibly existing text, run a
//!     dry pass over every destination into a [`GetSample`] and settle on
//!     one [`ExistingTextPolicy`], asking the [`ConflictDecider`] if the
//!     request does not carry one. Cancelling here aborts the verb before
//!     any write;
//!  4. write every target. A target whose kind does not support the field
//!     is skipped and counted, never fatal;
//!  5. notify the [`DirtyNotifier`] once if anything changed.
//!
//! Swap never consults the decider: both values are captured first and
//! then written over each other.
//!
//! [`Scope`]: crate::graph::Scope

use serde::{Deserialize, Serialize};
use std::{collections::HashSet, fmt};
use tracing::{debug, info, warn};

use crate::{
    cdset::matching_cdsets,
    conflict::{ApplyValue, ExistingTextPolicy, GetSample},
    constraints::{string::StringConstraint, FilterSet},
    error::AecrError,
    fields::{FieldRef, Target},
    graph::{AnnotationGraph, GraphTraversal, Scope},
    portion::TextPortion,
    reporting::{CommandOutput, Report},
    traits::{ConflictDecider, DirtyNotifier, FieldAccessor, ObjectTraversal},
};

static DEFAULT_TRAVERSAL: GraphTraversal = GraphTraversal;

/// The six AECR verbs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verb {
    Apply,
    Edit,
    Convert,
    Swap,
    Parse,
    Remove,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Apply => "apply",
            Verb::Edit => "edit",
            Verb::Convert => "convert",
            Verb::Swap => "swap",
            Verb::Parse => "parse",
            Verb::Remove => "remove",
        };
        write!(f, "{}", name)
    }
}

/// How a conversion treats the source field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConvertMode {
    /// Write the source text to the destination and remove the source.
    #[default]
    Move,
    /// Write the source text to the destination, keeping the source.
    Copy,
    /// Exchange source and destination.
    Swap,
    /// Write a portion of the source text to the destination, optionally
    /// cutting it out of the source.
    Parse {
        portion: TextPortion,
        #[serde(default)]
        remove_source: bool,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertFieldSpec {
    pub src: FieldRef,
    pub dst: FieldRef,
    #[serde(default)]
    pub mode: ConvertMode,
    /// Drop a leading destination field name (e.g. `strain:`) from the
    /// text before writing it.
    #[serde(default)]
    pub strip_name_from_text: bool,
    /// Policy for text already in the destination; the decider is asked
    /// when this is absent.
    #[serde(default)]
    pub existing_text_policy: Option<ExistingTextPolicy>,
}

impl ConvertFieldSpec {
    pub fn new(src: FieldRef, dst: FieldRef, mode: ConvertMode) -> Self {
        Self {
            src,
            dst,
            mode,
            strip_name_from_text: false,
            existing_text_policy: None,
        }
    }

    pub fn with_policy(mut self, policy: ExistingTextPolicy) -> Self {
        self.existing_text_policy = Some(policy);
        self
    }

    pub fn strip_name(mut self, strip: bool) -> Self {
        self.strip_name_from_text = strip;
        self
    }
}

/// One verb and its arguments.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Apply { field: FieldRef, value: ApplyValue },
    Edit { field: FieldRef, value: ApplyValue },
    Convert(ConvertFieldSpec),
    Remove { field: FieldRef },
}

impl Action {
    pub fn apply(field: FieldRef, value: ApplyValue) -> Self {
        Action::Apply { field, value }
    }

    pub fn edit(field: FieldRef, value: ApplyValue) -> Self {
        Action::Edit { field, value }
    }

    pub fn remove(field: FieldRef) -> Self {
        Action::Remove { field }
    }

    pub fn verb(&self) -> Verb {
        match self {
            Action::Apply { .. } => Verb::Apply,
            Action::Edit { .. } => Verb::Edit,
            Action::Remove { .. } => Verb::Remove,
            Action::Convert(spec) => match spec.mode {
                ConvertMode::Move | ConvertMode::Copy => Verb::Convert,
                ConvertMode::Swap => Verb::Swap,
                ConvertMode::Parse { .. } => Verb::Parse,
            },
        }
    }

    /// The field that decides which objects are visited.
    pub fn traversal_field(&self) -> &FieldRef {
        match self {
            Action::Apply { field, .. } | Action::Edit { field, .. } | Action::Remove { field } => {
                field
            }
            Action::Convert(spec) => &spec.src,
        }
    }

    /// The field being written.
    pub fn destination(&self) -> &FieldRef {
        match self {
            Action::Apply { field, .. } | Action::Edit { field, .. } | Action::Remove { field } => {
                field
            }
            Action::Convert(spec) => &spec.dst,
        }
    }

    fn validate(&self) -> Result<(), AecrError> {
        if let Action::Convert(spec) = self {
            if spec.src == spec.dst {
                return Err(AecrError::IdenticalFields(spec.src.to_string()));
            }
            if spec.src.domain() != spec.dst.domain() {
                return Err(AecrError::IncompatibleFields(
                    spec.src.to_string(),
                    spec.dst.to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A verb together with the objects it applies to.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AecrRequest {
    pub action: Action,
    #[serde(default)]
    pub filter: FilterSet,
    #[serde(default)]
    pub scope: Scope,
}

impl AecrRequest {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            filter: FilterSet::default(),
            scope: Scope::all(),
        }
    }

    pub fn with_filter(mut self, filter: FilterSet) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }
}

/// What one verb did.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSummary {
    pub verb: Verb,
    pub field: String,
    /// Objects (or clusters) that passed the filter.
    pub targets: usize,
    /// Targets whose fields changed.
    pub changed: usize,
    /// Targets whose kind does not support the field.
    pub skipped: usize,
    /// Destinations that already held text.
    pub existing_found: usize,
    /// The existing-text policy used, for verbs that need one.
    pub policy: Option<ExistingTextPolicy>,
}

impl ActionSummary {
    fn new(verb: Verb, field: &FieldRef, targets: usize) -> Self {
        Self {
            verb,
            field: field.to_string(),
            targets,
            changed: 0,
            skipped: 0,
            existing_found: 0,
            policy: None,
        }
    }

    /// Count the outcome of writing one target. A failed write only
    /// concerns that target, which is skipped.
    fn record(&mut self, target: &Target, result: Result<bool, AecrError>) {
        match result {
            Ok(true) => self.changed += 1,
            Ok(false) => {}
            Err(err) => {
                if err.is_recoverable() {
                    debug!("skipping {}: {}", target, err);
                } else {
                    warn!("skipping {}: {}", target, err);
                }
                self.skipped += 1;
            }
        }
    }
}

impl fmt::Display for ActionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} target(s), {} changed, {} skipped",
            self.verb, self.field, self.targets, self.changed, self.skipped
        )
    }
}

/// Drop a leading field name, and the `:`/`=`/whitespace after it, from
/// `text`.
fn strip_field_name(text: &str, field: &FieldRef) -> String {
    let label = field.label();
    let trimmed = text.trim_start();
    for name in [label.clone(), label.replace(' ', "_"), label.replace(' ', "-")] {
        let Some(head) = trimmed.get(..name.len()) else {
            continue;
        };
        if !head.eq_ignore_ascii_case(&name) {
            continue;
        }
        let rest = &trimmed[name.len()..];
        let is_separator = |c: char| c == ':' || c == '=' || c.is_whitespace();
        if rest.is_empty() || rest.starts_with(is_separator) {
            return rest.trim_start_matches(is_separator).to_string();
        }
    }
    text.to_string()
}

/// The text a conversion carries from source to destination.
fn converted_text(text: Option<String>, spec: &ConvertFieldSpec) -> Option<String> {
    let text = text?;
    let text = if spec.strip_name_from_text {
        strip_field_name(&text, &spec.dst)
    } else {
        text
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Runs AECR requests against an annotation graph.
pub struct AecrEngine<'a> {
    traversal: &'a dyn ObjectTraversal,
    decider: Box<dyn ConflictDecider + 'a>,
    notifier: Option<Box<dyn DirtyNotifier + 'a>>,
}

impl<'a> AecrEngine<'a> {
    /// An engine using the default traversal and `decider` for existing
    /// text conflicts.
    pub fn new<D: ConflictDecider + 'a>(decider: D) -> Self {
        Self {
            traversal: &DEFAULT_TRAVERSAL,
            decider: Box::new(decider),
            notifier: None,
        }
    }

    pub fn with_traversal(mut self, traversal: &'a dyn ObjectTraversal) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_notifier<N: DirtyNotifier + 'a>(mut self, notifier: N) -> Self {
        self.notifier = Some(Box::new(notifier));
        self
    }

    fn collect_targets(&self, graph: &AnnotationGraph, request: &AecrRequest) -> Vec<Target> {
        let field = request.action.traversal_field();
        if field.is_cgp() {
            return matching_cdsets(graph, &request.scope, &request.filter)
                .into_iter()
                .map(Target::Cluster)
                .collect();
        }
        let accessor = field.accessor();
        let mut destinations = HashSet::new();
        let mut targets = Vec::new();
        self.traversal.for_each_matching(
            graph,
            &field.object_kinds(),
            &request.scope,
            &request.filter,
            &mut |id, _context| {
                let target = Target::Object(id);
                let destination = accessor.destination(graph, &target).unwrap_or(id);
                if destinations.insert(destination) {
                    targets.push(target);
                } else {
                    debug!("{} reaches {} again, skipping", id, destination);
                }
            },
        );
        targets
    }

    /// Settle the existing-text policy for a verb from its dry-run sample.
    fn resolve_policy(
        &mut self,
        sample: &GetSample,
        preset: Option<ExistingTextPolicy>,
    ) -> Result<ExistingTextPolicy, AecrError> {
        if sample.is_empty() {
            return Ok(ExistingTextPolicy::ReplaceOld);
        }
        let policy = match preset {
            Some(policy) => policy,
            None => self.decider.decide(sample),
        };
        if policy == ExistingTextPolicy::Cancel {
            info!(
                "cancelled: {} destination(s) already hold text",
                sample.num_found
            );
            return Err(AecrError::UserCancelled);
        }
        Ok(policy)
    }

    /// Run one request.
    ///
    /// Returns [`AecrError::UserCancelled`] (with the graph untouched) if
    /// the existing-text decision was to cancel, and request validation
    /// errors before anything is visited.
    pub fn run(
        &mut self,
        graph: &mut AnnotationGraph,
        request: &AecrRequest,
    ) -> Result<CommandOutput<ActionSummary>, AecrError> {
        request.action.validate()?;
        let verb = request.action.verb();
        let targets = self.collect_targets(graph, request);
        let mut summary = ActionSummary::new(verb, request.action.destination(), targets.len());
        let mut report = Report::new();
        info!("{} {}: {} target(s)", verb, summary.field, targets.len());

        if targets.is_empty() {
            report.add_issue(format!(
                "no objects matched; {} {} did nothing",
                verb, summary.field
            ));
            return Ok(CommandOutput::new(summary, report));
        }

        let filter = &request.filter;
        match &request.action {
            Action::Apply { field, value } => {
                self.run_apply(graph, field, value, &targets, filter, &mut summary)?
            }
            Action::Edit { field, value } if value.is_replacement() => {
                let accessor = field.accessor();
                let field_filter = filter.field_filter(field);
                for target in &targets {
                    let result = accessor.set(graph, target, value, field_filter);
                    summary.record(target, result);
                }
            }
            Action::Edit { field, value } => {
                self.run_apply(graph, field, value, &targets, filter, &mut summary)?
            }
            Action::Remove { field } => {
                let accessor = field.accessor();
                for target in &targets {
                    let result = accessor.remove(graph, target);
                    summary.record(target, result);
                }
            }
            Action::Convert(spec) => match &spec.mode {
                ConvertMode::Swap => self.run_swap(graph, spec, &targets, filter, &mut summary)?,
                ConvertMode::Parse {
                    portion,
                    remove_source,
                } => self.run_parse(
                    graph,
                    spec,
                    portion,
                    *remove_source,
                    &targets,
                    filter,
                    &mut summary,
                )?,
                ConvertMode::Move | ConvertMode::Copy => {
                    self.run_convert(graph, spec, &targets, filter, &mut summary)?
                }
            },
        }

        if summary.skipped > 0 {
            report.add_issue(format!(
                "{} object(s) skipped: field {} could not be written to them",
                summary.skipped, summary.field
            ));
        }
        if summary.changed > 0 {
            if let Some(notifier) = self.notifier.as_mut() {
                notifier.mark_dirty();
            }
        }
        info!("{}", summary);
        Ok(CommandOutput::new(summary, report))
    }

    /// Run requests in order, stopping at the first error. Requests that
    /// completed before the error keep their changes.
    pub fn run_batch(
        &mut self,
        graph: &mut AnnotationGraph,
        requests: &[AecrRequest],
    ) -> Result<Vec<CommandOutput<ActionSummary>>, AecrError> {
        requests
            .iter()
            .map(|request| self.run(graph, request))
            .collect()
    }

    fn run_apply(
        &mut self,
        graph: &mut AnnotationGraph,
        field: &FieldRef,
        value: &ApplyValue,
        targets: &[Target],
        filter: &FilterSet,
        summary: &mut ActionSummary,
    ) -> Result<(), AecrError> {
        let accessor = field.accessor();
        let field_filter = filter.field_filter(field);
        let mut sample = GetSample::new();
        for target in targets {
            accessor.sample(graph, target, field_filter, &mut sample);
        }
        let policy = self.resolve_policy(&sample, value.existing_text_policy)?;
        summary.existing_found = sample.num_found;
        summary.policy = Some(policy);

        let value = ApplyValue {
            text_to_replace: None,
            existing_text_policy: Some(policy),
            ..value.clone()
        };
        for target in targets {
            let result = accessor.set(graph, target, &value, field_filter);
            summary.record(target, result);
        }
        Ok(())
    }

    /// Sample the destination of every target that has text to write.
    fn sample_destinations(
        graph: &AnnotationGraph,
        dst: &dyn FieldAccessor,
        dst_filter: Option<&StringConstraint>,
        pending: &[(&Target, Option<String>)],
    ) -> GetSample {
        let mut sample = GetSample::new();
        for (target, text) in pending {
            if text.is_some() {
                dst.sample(graph, target, dst_filter, &mut sample);
            }
        }
        sample
    }

    fn run_convert(
        &mut self,
        graph: &mut AnnotationGraph,
        spec: &ConvertFieldSpec,
        targets: &[Target],
        filter: &FilterSet,
        summary: &mut ActionSummary,
    ) -> Result<(), AecrError> {
        let src = spec.src.accessor();
        let dst = spec.dst.accessor();
        let src_filter = filter.field_filter(&spec.src);
        let dst_filter = filter.field_filter(&spec.dst);

        let pending: Vec<(&Target, Option<String>)> = targets
            .iter()
            .map(|target| (target, converted_text(src.get(graph, target, src_filter), spec)))
            .collect();
        let sample = Self::sample_destinations(graph, dst.as_ref(), dst_filter, &pending);
        let policy = self.resolve_policy(&sample, spec.existing_text_policy)?;
        summary.existing_found = sample.num_found;
        summary.policy = Some(policy);

        let keep_source = spec.mode == ConvertMode::Copy;
        for (target, text) in pending {
            let Some(text) = text else {
                continue;
            };
            let value = ApplyValue::new(&text).with_policy(policy);
            let result = dst.set(graph, target, &value, dst_filter).and_then(|changed| {
                if keep_source {
                    Ok(changed)
                } else {
                    src.remove(graph, target).map(|removed| changed || removed)
                }
            });
            summary.record(target, result);
        }
        Ok(())
    }

    fn run_swap(
        &mut self,
        graph: &mut AnnotationGraph,
        spec: &ConvertFieldSpec,
        targets: &[Target],
        filter: &FilterSet,
        summary: &mut ActionSummary,
    ) -> Result<(), AecrError> {
        let src = spec.src.accessor();
        let dst = spec.dst.accessor();
        let src_filter = filter.field_filter(&spec.src);
        let dst_filter = filter.field_filter(&spec.dst);

        let write = |graph: &mut AnnotationGraph,
                     accessor: &dyn FieldAccessor,
                     target: &Target,
                     text: &Option<String>,
                     filter: Option<&StringConstraint>| match text {
            Some(text) => accessor.set(graph, target, &ApplyValue::new(text), filter),
            None => accessor.remove(graph, target),
        };

        for target in targets {
            let src_text = src.get(graph, target, src_filter);
            let dst_text = dst.get(graph, target, dst_filter);
            if src_text == dst_text {
                continue;
            }
            let result = write(graph, dst.as_ref(), target, &src_text, dst_filter).and_then(|a| {
                write(graph, src.as_ref(), target, &dst_text, src_filter).map(|b| a || b)
            });
            summary.record(target, result);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn run_parse(
        &mut self,
        graph: &mut AnnotationGraph,
        spec: &ConvertFieldSpec,
        portion: &TextPortion,
        remove_source: bool,
        targets: &[Target],
        filter: &FilterSet,
        summary: &mut ActionSummary,
    ) -> Result<(), AecrError> {
        let src = spec.src.accessor();
        let dst = spec.dst.accessor();
        let src_filter = filter.field_filter(&spec.src);
        let dst_filter = filter.field_filter(&spec.dst);

        // (target, extracted text) plus the source text left behind
        let mut remainders: Vec<Option<String>> = Vec::with_capacity(targets.len());
        let pending: Vec<(&Target, Option<String>)> = targets
            .iter()
            .map(|target| {
                let source = src.get(graph, target, src_filter);
                let extracted = source
                    .as_deref()
                    .and_then(|text| portion.extract_from(text))
                    .map(str::to_string);
                remainders.push(source.as_deref().and_then(|text| portion.remove_from(text)));
                (target, converted_text(extracted, spec))
            })
            .collect();
        let sample = Self::sample_destinations(graph, dst.as_ref(), dst_filter, &pending);
        let policy = self.resolve_policy(&sample, spec.existing_text_policy)?;
        summary.existing_found = sample.num_found;
        summary.policy = Some(policy);

        for ((target, text), remainder) in pending.into_iter().zip(remainders) {
            let Some(text) = text else {
                continue;
            };
            let value = ApplyValue::new(&text).with_policy(policy);
            let result = dst.set(graph, target, &value, dst_filter).and_then(|changed| {
                match remainder.filter(|_| remove_source) {
                    Some(remainder) => src
                        .set(graph, target, &ApplyValue::new(&remainder), src_filter)
                        .map(|cut| changed || cut),
                    None => Ok(changed),
                }
            });
            summary.record(target, result);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        conflict::{CancelOnConflict, Delimiter, FixedPolicy},
        constraints::{
            choice::ChoiceConstraint,
            location::{LocationConstraint, LocationRelation},
            string::MatchLocation,
        },
        model::{FeatureData, ObjectId},
        test_utilities::{graph_test_case_01, graph_with_genes, CASE_01_SEQ},
    };
    use std::cell::Cell;

    fn field(s: &str) -> FieldRef {
        s.parse().unwrap()
    }

    fn gene_values(graph: &AnnotationGraph, f: &str) -> Vec<Option<String>> {
        let accessor = field(f).accessor();
        graph
            .features()
            .filter(|f| f.is_gene())
            .map(|f| accessor.get(graph, &Target::Object(ObjectId::Feature(f.id)), None))
            .collect()
    }

    #[test]
    fn test_append_after_one_decision() {
        let mut graph = graph_with_genes(&["A", "A"]);
        let calls = Cell::new(0);
        let mut engine = AecrEngine::new(|sample: &GetSample| {
            calls.set(calls.get() + 1);
            assert_eq!(sample.num_found, 2);
            assert!(sample.all_same);
            assert_eq!(sample.sample_text.as_deref(), Some("A"));
            ExistingTextPolicy::Append(Delimiter::Semicolon)
        });
        let request = AecrRequest::new(Action::apply(field("gene.description"), ApplyValue::new("B")));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(output.value().changed, 2);
        assert_eq!(
            gene_values(&graph, "gene.description"),
            vec![Some("A; B".to_string()), Some("A; B".to_string())]
        );
    }

    #[test]
    fn test_cancel_leaves_graph_untouched() {
        let mut graph = graph_with_genes(&["A", "C"]);
        let before = graph.clone();
        let dirty = Cell::new(false);
        let mut engine = AecrEngine::new(CancelOnConflict).with_notifier(|| dirty.set(true));
        let request = AecrRequest::new(Action::apply(field("gene.description"), ApplyValue::new("B")));
        let result = engine.run(&mut graph, &request);
        assert!(matches!(result, Err(AecrError::UserCancelled)));
        assert_eq!(graph, before);
        assert!(!dirty.get());
    }

    #[test]
    fn test_no_existing_text_skips_decider() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(|_: &GetSample| -> ExistingTextPolicy {
            panic!("decider should not be asked")
        });
        let request = AecrRequest::new(Action::apply(field("gene.allele"), ApplyValue::new("x")));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(output.value().policy, Some(ExistingTextPolicy::ReplaceOld));
        assert_eq!(output.value().changed, output.value().targets);
    }

    #[test]
    fn test_apply_then_remove_round_trip() {
        let mut graph = graph_test_case_01();
        let before = graph.clone();
        let mut engine = AecrEngine::new(CancelOnConflict);
        let apply = AecrRequest::new(Action::apply(field("gene.maploc"), ApplyValue::new("1q21")));
        let remove = AecrRequest::new(Action::remove(field("gene.maploc")));
        engine.run_batch(&mut graph, &[apply, remove]).unwrap();
        assert_eq!(graph, before);
    }

    #[test]
    fn test_swap_never_asks() {
        let mut graph = graph_with_genes(&["desc1", "desc2"]);
        let mut engine = AecrEngine::new(|_: &GetSample| -> ExistingTextPolicy {
            panic!("swap must not ask")
        });
        let spec = ConvertFieldSpec::new(field("gene.locus"), field("gene.description"), ConvertMode::Swap);
        let output = engine
            .run(&mut graph, &AecrRequest::new(Action::Convert(spec)))
            .unwrap();
        assert_eq!(output.value().verb, Verb::Swap);
        assert_eq!(output.value().changed, 2);
        assert_eq!(
            gene_values(&graph, "gene.locus"),
            vec![Some("desc1".to_string()), Some("desc2".to_string())]
        );
        assert_eq!(
            gene_values(&graph, "gene.description"),
            vec![Some("gene0".to_string()), Some("gene1".to_string())]
        );
    }

    #[test]
    fn test_swap_with_empty_side_moves() {
        let mut graph = graph_with_genes(&["desc1"]);
        let mut engine = AecrEngine::new(CancelOnConflict);
        let spec = ConvertFieldSpec::new(field("gene.description"), field("gene.allele"), ConvertMode::Swap);
        engine
            .run(&mut graph, &AecrRequest::new(Action::Convert(spec)))
            .unwrap();
        assert_eq!(gene_values(&graph, "gene.allele"), vec![Some("desc1".to_string())]);
        assert_eq!(gene_values(&graph, "gene.description"), vec![None]);
    }

    #[test]
    fn test_convert_move_and_copy() {
        let mut graph = graph_with_genes(&["desc1"]);
        let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));

        let copy = ConvertFieldSpec::new(field("gene.description"), field("gene.maploc"), ConvertMode::Copy);
        engine.run(&mut graph, &AecrRequest::new(Action::Convert(copy))).unwrap();
        assert_eq!(gene_values(&graph, "gene.maploc"), vec![Some("desc1".to_string())]);
        assert_eq!(gene_values(&graph, "gene.description"), vec![Some("desc1".to_string())]);

        let mv = ConvertFieldSpec::new(field("gene.description"), field("gene.allele"), ConvertMode::Move);
        engine.run(&mut graph, &AecrRequest::new(Action::Convert(mv))).unwrap();
        assert_eq!(gene_values(&graph, "gene.allele"), vec![Some("desc1".to_string())]);
        assert_eq!(gene_values(&graph, "gene.description"), vec![None]);
    }

    #[test]
    fn test_convert_strips_field_name() {
        let mut graph = graph_with_genes(&["allele: b2"]);
        let mut engine = AecrEngine::new(CancelOnConflict);
        let spec = ConvertFieldSpec::new(field("gene.description"), field("gene.allele"), ConvertMode::Move)
            .strip_name(true);
        engine.run(&mut graph, &AecrRequest::new(Action::Convert(spec))).unwrap();
        assert_eq!(gene_values(&graph, "gene.allele"), vec![Some("b2".to_string())]);
    }

    #[test]
    fn test_parse_with_remove_source() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(CancelOnConflict);
        let spec = ConvertFieldSpec::new(
            field("source.note-subsrc"),
            field("source.collection-date"),
            ConvertMode::Parse {
                portion: TextPortion::between(Some("collected "), None),
                remove_source: true,
            },
        );
        let output = engine
            .run(&mut graph, &AecrRequest::new(Action::Convert(spec)))
            .unwrap();
        assert_eq!(output.value().verb, Verb::Parse);
        assert_eq!(output.value().changed, 1);

        let descriptor = graph.descriptors().find(|d| d.biosource().is_some()).unwrap();
        let target = Target::Object(ObjectId::Descriptor(descriptor.id));
        assert_eq!(
            field("source.collection-date").accessor().get(&graph, &target, None),
            Some("2019".to_string())
        );
        assert_eq!(
            field("source.note-subsrc").accessor().get(&graph, &target, None),
            Some("collected".to_string())
        );
    }

    #[test]
    fn test_validation() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(CancelOnConflict);
        let same = ConvertFieldSpec::new(field("gene.locus"), field("gene.locus"), ConvertMode::Copy);
        assert!(matches!(
            engine.run(&mut graph, &AecrRequest::new(Action::Convert(same))),
            Err(AecrError::IdenticalFields(_))
        ));
        let mixed = ConvertFieldSpec::new(field("gene.locus"), field("protein.name"), ConvertMode::Copy);
        assert!(matches!(
            engine.run(&mut graph, &AecrRequest::new(Action::Convert(mixed))),
            Err(AecrError::IncompatibleFields(_, _))
        ));
        // the coding region domain covers its protein
        let ok = ConvertFieldSpec::new(field("cds.comment"), field("protein.name"), ConvertMode::Copy)
            .with_policy(ExistingTextPolicy::LeaveOld);
        assert!(engine.run(&mut graph, &AecrRequest::new(Action::Convert(ok))).is_ok());
    }

    #[test]
    fn test_no_targets_is_not_an_error() {
        let mut graph = graph_test_case_01();
        let dirty = Cell::new(0);
        let mut engine = AecrEngine::new(CancelOnConflict).with_notifier(|| dirty.set(dirty.get() + 1));
        let request = AecrRequest::new(Action::apply(field("gene.locus"), ApplyValue::new("x")))
            .with_filter(FilterSet::new().with_string(StringConstraint::contains("no such text")));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(output.value().targets, 0);
        assert!(!output.report().is_empty());
        assert_eq!(dirty.get(), 0);
    }

    #[test]
    fn test_edit_with_location_filter() {
        let mut graph = graph_test_case_01();
        let dirty = Cell::new(0);
        let mut engine = AecrEngine::new(CancelOnConflict).with_notifier(|| dirty.set(dirty.get() + 1));
        let request = AecrRequest::new(Action::edit(field("gene.locus"), ApplyValue::edit("abc", "xyz")))
            .with_filter(
                FilterSet::new().with_location(LocationConstraint::new(LocationRelation::Contained, 100, 200)),
            )
            .with_scope(Scope::all().retain_seqnames(&[CASE_01_SEQ.to_string()]));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(output.value().changed, 1);
        assert_eq!(dirty.get(), 1);
        let loci: Vec<Option<String>> = gene_values(&graph, "gene.locus");
        assert!(loci.contains(&Some("xyzA".to_string())));
        assert!(loci.contains(&Some("abcB".to_string())));
    }

    #[test]
    fn test_field_filter_selects_value() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));
        let synonym = field("gene.synonym");
        let request = AecrRequest::new(Action::apply(synonym.clone(), ApplyValue::new("newB")))
            .with_filter(FilterSet::new().with_choice(ChoiceConstraint::string_match(
                Some(synonym),
                StringConstraint::new("old", MatchLocation::StartsWith),
            )));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(output.value().targets, 1);
        assert_eq!(output.value().changed, 1);
        assert!(gene_values(&graph, "gene.synonym").contains(&Some("newB".to_string())));
    }

    #[test]
    fn test_cgp_apply_creates_missing_protein() {
        let mut graph = graph_test_case_01();
        let before = graph.num_features();
        let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::LeaveOld));
        let request = AecrRequest::new(Action::apply(field("cgp.protein-name"), ApplyValue::new("unnamed")));
        let output = engine.run(&mut graph, &request).unwrap();
        // the one coding region without a protein feature gets one
        assert_eq!(graph.num_features(), before + 1);
        assert_eq!(output.value().changed, 1);
        assert_eq!(output.value().existing_found, 2);
        let created = graph
            .features()
            .filter(|f| matches!(&f.data, FeatureData::Prot(p) if p.names == vec!["unnamed".to_string()]))
            .count();
        assert_eq!(created, 1);
    }

    #[test]
    fn test_protein_name_through_coding_regions() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(CancelOnConflict);
        // the coding region without a protein feature has nothing to remove
        let request = AecrRequest::new(Action::remove(field("protein.name")));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(output.value().targets, 3);
        assert_eq!(output.value().skipped, 0);
        assert_eq!(output.value().changed, 2);
    }

    #[test]
    fn test_failed_write_is_skipped_not_fatal() {
        let mut graph = AnnotationGraph::new();
        graph.add_sequence("chr1", crate::model::SequenceKind::Nucleotide, 1000);
        graph.add_sequence("pA", crate::model::SequenceKind::Protein, 50);
        graph.add_sequence("pZ", crate::model::SequenceKind::Protein, 0);
        for (start, product) in [(0, "pA"), (300, "pZ")] {
            let id = graph
                .add_feature(
                    "chr1",
                    crate::ranges::SeqInterval::new(start, start + 149, crate::ranges::Strand::Plus),
                    FeatureData::Cds(Default::default()),
                )
                .unwrap();
            graph.feature_mut(id).unwrap().product = Some(product.to_string());
        }

        let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));
        let request = AecrRequest::new(Action::apply(field("protein.name"), ApplyValue::new("kinase")));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(output.value().targets, 2);
        assert_eq!(output.value().changed, 1);
        assert_eq!(output.value().skipped, 1);
        assert_eq!(output.report().issues().len(), 1);
        // only the non-empty protein sequence gained a placeholder
        assert_eq!(graph.num_features(), 3);
        assert!(graph.protein_feature("pA").is_some());
        assert!(graph.protein_feature("pZ").is_none());
    }

    #[test]
    fn test_gene_reached_twice_is_counted_once() {
        let mut graph = graph_with_genes(&["A"]);
        let mrna = graph
            .add_feature(
                "seq1",
                crate::ranges::SeqInterval::new(0, 50, crate::ranges::Strand::Plus),
                FeatureData::Rna(crate::model::RnaRef::new(crate::model::RnaKind::Mrna)),
            )
            .unwrap();
        graph.feature_mut(mrna).unwrap().gene_xref = Some(crate::model::GeneRef {
            locus: Some("gene0".to_string()),
            ..Default::default()
        });

        let found = Cell::new(0);
        let mut engine = AecrEngine::new(|sample: &GetSample| {
            found.set(sample.num_found);
            ExistingTextPolicy::Append(Delimiter::Semicolon)
        });
        let request = AecrRequest::new(Action::apply(field("gene.description"), ApplyValue::new("B")));
        let output = engine.run(&mut graph, &request).unwrap();
        assert_eq!(found.get(), 1);
        assert_eq!(output.value().targets, 1);
        assert_eq!(output.value().changed, 1);
        assert_eq!(gene_values(&graph, "gene.description"), vec![Some("A; B".to_string())]);
        let xref = graph.feature(mrna).unwrap().gene_xref.as_ref().unwrap();
        assert_eq!(xref.desc, None);
    }

    #[test]
    fn test_gene_fields_reach_bare_cross_references() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));
        let request = AecrRequest::new(Action::apply(field("gene.locus-tag"), ApplyValue::new("LT1")));
        let output = engine.run(&mut graph, &request).unwrap();
        // three genes and the coding region whose gene is not annotated
        assert_eq!(output.value().targets, 4);
        assert_eq!(output.value().changed, 4);
        let xref = graph
            .features()
            .find(|f| f.is_cds() && f.gene_xref.is_some())
            .and_then(|f| f.gene_xref.as_ref())
            .unwrap();
        assert_eq!(xref.locus_tag.as_deref(), Some("LT1"));
    }

    #[test]
    fn test_repeated_parse_extracts_the_same_text() {
        let mut graph = graph_test_case_01();
        let mut engine = AecrEngine::new(FixedPolicy(ExistingTextPolicy::ReplaceOld));
        let spec = ConvertFieldSpec::new(
            field("source.note-subsrc"),
            field("source.collection-date"),
            ConvertMode::Parse {
                portion: TextPortion::between(Some("collected "), None),
                remove_source: false,
            },
        );
        let request = AecrRequest::new(Action::Convert(spec));
        let first = engine.run(&mut graph, &request).unwrap();
        assert_eq!(first.value().changed, 1);
        let after_first = graph.clone();

        let second = engine.run(&mut graph, &request).unwrap();
        assert_eq!(second.value().changed, 0);
        assert_eq!(graph, after_first);

        let descriptor = graph.descriptors().find(|d| d.biosource().is_some()).unwrap();
        let target = Target::Object(ObjectId::Descriptor(descriptor.id));
        assert_eq!(
            field("source.collection-date").accessor().get(&graph, &target, None),
            Some("2019".to_string())
        );
        assert_eq!(
            field("source.note-subsrc").accessor().get(&graph, &target, None),
            Some("collected 2019".to_string())
        );
    }

    /// Visits every feature, whatever the field.
    struct AllFeatures;

    impl ObjectTraversal for AllFeatures {
        fn for_each_matching(
            &self,
            graph: &AnnotationGraph,
            _kinds: &[crate::model::ObjectKind],
            _scope: &Scope,
            _filter: &FilterSet,
            visit: &mut dyn FnMut(ObjectId, &crate::graph::ObjectContext),
        ) {
            for feature in graph.features() {
                let id = ObjectId::Feature(feature.id);
                if let Some(context) = graph.context(id) {
                    visit(id, &context);
                }
            }
        }
    }

    #[test]
    fn test_unsupported_targets_are_skipped() {
        let mut graph = graph_test_case_01();
        let traversal = AllFeatures;
        let mut engine = AecrEngine::new(CancelOnConflict).with_traversal(&traversal);
        let request = AecrRequest::new(Action::remove(field("gene.locus")));
        let output = engine.run(&mut graph, &request).unwrap();
        // genes and the coding region with a gene cross-reference
        assert_eq!(output.value().changed, 4);
        assert_eq!(output.value().skipped, output.value().targets - 4);
        assert_eq!(output.report().issues().len(), 1);
    }

    #[test]
    fn test_request_serde() {
        let request = AecrRequest::new(Action::apply(
            field("source.strain"),
            ApplyValue::new("K-12").with_policy(ExistingTextPolicy::Append(Delimiter::Semicolon)),
        ));
        let json = serde_json::to_string(&request).unwrap();
        let back: AecrRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, request);
    }
}
