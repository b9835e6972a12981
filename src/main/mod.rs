use std::path::PathBuf;

use aecr::{
    commands::{aecr_batch, aecr_run},
    prelude::*,
    Position,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::metadata::LevelFilter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const INFO: &str = "\
aecr: constrained Apply/Edit/Convert/Swap/Parse/Remove edits of sequence annotations
usage: aecr [--help] <subcommand>

Subcommands:

  apply:   write text into a field of every matching object.
  edit:    replace text inside a field of every matching object.
  remove:  clear a field of every matching object.
  convert: move or copy one field's text into another field.
  swap:    exchange the text of two fields.
  parse:   copy part of one field's text into another field.
  batch:   run a JSON file of requests in order.

Fields are written as e.g. gene.locus, rna[tRNA].product, protein.name,
source.strain, import[misc_feature].note or cgp.protein-name.
";

#[derive(Parser)]
#[clap(name = "aecr")]
#[clap(about = INFO)]
struct Cli {
    /// log more (-d for info, -dd for debug); AECR_LOG overrides
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Args)]
struct GraphArgs {
    /// the input annotation graph (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// an optional output file (standard output will be used if not specified)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum MatchAt {
    Contains,
    Equals,
    StartsWith,
    EndsWith,
}

#[derive(Clone, Copy, ValueEnum)]
enum StrandArg {
    Any,
    Plus,
    Minus,
}

#[derive(Args)]
struct FilterArgs {
    /// only act on objects with text matching this string
    #[arg(long = "match")]
    pattern: Option<String>,

    /// where the match string must occur
    #[arg(long, value_enum, default_value_t = MatchAt::Contains)]
    match_at: MatchAt,

    /// restrict the match to one field's text, e.g. gene.synonym
    #[arg(long)]
    match_field: Option<FieldRef>,

    /// match case-insensitively
    #[arg(long)]
    ignore_case: bool,

    /// only match whole words
    #[arg(long)]
    whole_word: bool,

    /// act on objects that do NOT match
    #[arg(long)]
    negate: bool,

    /// only act on objects on these sequences
    #[arg(long = "seq")]
    seqs: Vec<String>,

    /// skip objects on these sequences
    #[arg(long = "exclude-seq")]
    exclude_seqs: Vec<String>,

    /// only act on features on this strand
    #[arg(long, value_enum, default_value_t = StrandArg::Any)]
    strand: StrandArg,

    /// only act on features lying within START..STOP (0-based, inclusive)
    #[arg(long, value_name = "START..STOP", value_parser = parse_span)]
    within: Option<(Position, Position)>,
}

fn parse_span(s: &str) -> Result<(Position, Position), String> {
    let (start, stop) = s
        .split_once("..")
        .ok_or_else(|| format!("expected START..STOP, got '{}'", s))?;
    let start: Position = start.trim().parse().map_err(|e| format!("{}", e))?;
    let stop: Position = stop.trim().parse().map_err(|e| format!("{}", e))?;
    if start > stop {
        return Err(AecrError::InvalidInterval(start, stop).to_string());
    }
    Ok((start, stop))
}

impl FilterArgs {
    fn filter(&self) -> FilterSet {
        let mut filter = FilterSet::new();
        if let Some(pattern) = &self.pattern {
            let location = match self.match_at {
                MatchAt::Contains => MatchLocation::Contains,
                MatchAt::Equals => MatchLocation::Equals,
                MatchAt::StartsWith => MatchLocation::StartsWith,
                MatchAt::EndsWith => MatchLocation::EndsWith,
            };
            let constraint = StringConstraint::new(pattern, location)
                .case_insensitive(self.ignore_case)
                .whole_word(self.whole_word)
                .negated(self.negate);
            filter = match &self.match_field {
                Some(field) => filter.with_choice(ChoiceConstraint::string_match(
                    Some(field.clone()),
                    constraint,
                )),
                None => filter.with_string(constraint),
            };
        }
        let strand = match self.strand {
            StrandArg::Any => StrandFilter::Any,
            StrandArg::Plus => StrandFilter::Plus,
            StrandArg::Minus => StrandFilter::Minus,
        };
        let location = match self.within {
            Some((start, stop)) => LocationConstraint::new(LocationRelation::Contained, start, stop),
            None => LocationConstraint::default(),
        }
        .on_strand(strand);
        if !location.is_vacuous() {
            filter = filter.with_location(location);
        }
        filter
    }

    fn scope(&self) -> Scope {
        let mut scope = Scope::all();
        if !self.seqs.is_empty() {
            scope = scope.retain_seqnames(&self.seqs);
        }
        if !self.exclude_seqs.is_empty() {
            scope = scope.exclude_seqnames(&self.exclude_seqs);
        }
        scope
    }

    fn request(&self, action: Action) -> AecrRequest {
        AecrRequest::new(action)
            .with_filter(self.filter())
            .with_scope(self.scope())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ExistingArg {
    /// stop without changing anything
    Cancel,
    /// overwrite the existing text
    Replace,
    /// keep the existing text
    Leave,
    /// add the new text after the existing text
    Append,
    /// add the new text before the existing text
    Prefix,
}

#[derive(Clone, Copy, ValueEnum)]
enum DelimiterArg {
    Semicolon,
    Comma,
    Colon,
    Space,
    None,
}

#[derive(Args)]
struct PolicyArgs {
    /// what to do with text already in the destination field; if not
    /// given, the command is cancelled when any is found
    #[arg(long, value_enum)]
    existing: Option<ExistingArg>,

    /// the delimiter used to append or prefix
    #[arg(long, value_enum, default_value_t = DelimiterArg::Semicolon)]
    delimiter: DelimiterArg,
}

impl PolicyArgs {
    fn policy(&self) -> Option<ExistingTextPolicy> {
        let delimiter = match self.delimiter {
            DelimiterArg::Semicolon => Delimiter::Semicolon,
            DelimiterArg::Comma => Delimiter::Comma,
            DelimiterArg::Colon => Delimiter::Colon,
            DelimiterArg::Space => Delimiter::Space,
            DelimiterArg::None => Delimiter::None,
        };
        self.existing.map(|existing| match existing {
            ExistingArg::Cancel => ExistingTextPolicy::Cancel,
            ExistingArg::Replace => ExistingTextPolicy::ReplaceOld,
            ExistingArg::Leave => ExistingTextPolicy::LeaveOld,
            ExistingArg::Append => ExistingTextPolicy::Append(delimiter),
            ExistingArg::Prefix => ExistingTextPolicy::Prefix(delimiter),
        })
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum EditAt {
    Anywhere,
    Beginning,
    End,
}

#[derive(Subcommand)]
enum Commands {
    Apply {
        /// the field to write, e.g. gene.description
        field: FieldRef,

        /// the text to write
        text: String,

        #[command(flatten)]
        graph: GraphArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    Edit {
        /// the field to edit
        field: FieldRef,

        /// the text to find
        find: String,

        /// the replacement text (the found text is deleted if not given)
        #[arg(long, default_value = "")]
        replace: String,

        /// where the found text must be
        #[arg(long, value_enum, default_value_t = EditAt::Anywhere)]
        at: EditAt,

        /// find the text case-insensitively
        #[arg(long)]
        find_ignore_case: bool,

        #[command(flatten)]
        graph: GraphArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    Remove {
        /// the field to clear
        field: FieldRef,

        #[command(flatten)]
        graph: GraphArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    Convert {
        /// the field to take text from
        src: FieldRef,

        /// the field to write text to
        dst: FieldRef,

        /// keep the text in the source field
        #[arg(long)]
        copy: bool,

        /// drop a leading destination field name (e.g. "strain:") from the text
        #[arg(long)]
        strip_name: bool,

        #[command(flatten)]
        graph: GraphArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    Swap {
        /// the first field
        src: FieldRef,

        /// the second field
        dst: FieldRef,

        #[command(flatten)]
        graph: GraphArgs,
        #[command(flatten)]
        filter: FilterArgs,
    },
    Parse {
        /// the field to take text from
        src: FieldRef,

        /// the field to write text to
        dst: FieldRef,

        /// the text the portion starts after (the start of the text if not given)
        #[arg(long)]
        left: Option<String>,

        /// the text the portion ends before (the end of the text if not given)
        #[arg(long)]
        right: Option<String>,

        /// include the left marker in the portion
        #[arg(long)]
        include_left: bool,

        /// include the right marker in the portion
        #[arg(long)]
        include_right: bool,

        /// cut the portion out of the source field
        #[arg(long)]
        remove_source: bool,

        /// drop a leading destination field name (e.g. "strain:") from the text
        #[arg(long)]
        strip_name: bool,

        #[command(flatten)]
        graph: GraphArgs,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        policy: PolicyArgs,
    },
    Batch {
        /// a JSON file holding an array of requests
        #[arg(long, required = true)]
        requests: PathBuf,

        #[command(flatten)]
        graph: GraphArgs,
    },
}

/// Set up logging to standard error. The `AECR_LOG` environment variable
/// takes `tracing` filter directives, e.g. `AECR_LOG=aecr=debug`.
fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .with_env_var("AECR_LOG")
        .from_env_lossy();
    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn run_request(graph: &GraphArgs, request: AecrRequest) -> Result<(), AecrError> {
    let output = aecr_run(&graph.input, graph.output.as_ref(), &request)?;
    eprintln!("{}", output.value());
    eprint!("{}", output.report());
    Ok(())
}

fn run() -> Result<(), AecrError> {
    let cli = Cli::parse();
    init_logging(cli.debug);
    match cli.command {
        Some(Commands::Apply {
            field,
            text,
            graph,
            filter,
            policy,
        }) => {
            let mut value = ApplyValue::new(&text);
            value.existing_text_policy = policy.policy();
            run_request(&graph, filter.request(Action::apply(field, value)))
        }
        Some(Commands::Edit {
            field,
            find,
            replace,
            at,
            find_ignore_case,
            graph,
            filter,
        }) => {
            let at = match at {
                EditAt::Anywhere => EditLocation::Anywhere,
                EditAt::Beginning => EditLocation::Beginning,
                EditAt::End => EditLocation::End,
            };
            let value = ApplyValue::edit(&find, &replace)
                .at(at)
                .case_insensitive(find_ignore_case);
            run_request(&graph, filter.request(Action::edit(field, value)))
        }
        Some(Commands::Remove {
            field,
            graph,
            filter,
        }) => run_request(&graph, filter.request(Action::remove(field))),
        Some(Commands::Convert {
            src,
            dst,
            copy,
            strip_name,
            graph,
            filter,
            policy,
        }) => {
            let mode = if copy {
                ConvertMode::Copy
            } else {
                ConvertMode::Move
            };
            let mut spec = ConvertFieldSpec::new(src, dst, mode).strip_name(strip_name);
            spec.existing_text_policy = policy.policy();
            run_request(&graph, filter.request(Action::Convert(spec)))
        }
        Some(Commands::Swap {
            src,
            dst,
            graph,
            filter,
        }) => {
            let spec = ConvertFieldSpec::new(src, dst, ConvertMode::Swap);
            run_request(&graph, filter.request(Action::Convert(spec)))
        }
        Some(Commands::Parse {
            src,
            dst,
            left,
            right,
            include_left,
            include_right,
            remove_source,
            strip_name,
            graph,
            filter,
            policy,
        }) => {
            let mut portion = TextPortion::between(left.as_deref(), right.as_deref())
                .case_insensitive(filter.ignore_case)
                .whole_word(filter.whole_word);
            if include_left {
                portion = portion.including_left();
            }
            if include_right {
                portion = portion.including_right();
            }
            let mode = ConvertMode::Parse {
                portion,
                remove_source,
            };
            let mut spec = ConvertFieldSpec::new(src, dst, mode).strip_name(strip_name);
            spec.existing_text_policy = policy.policy();
            run_request(&graph, filter.request(Action::Convert(spec)))
        }
        Some(Commands::Batch { requests, graph }) => {
            let output = aecr_batch(&graph.input, graph.output.as_ref(), &requests)?;
            for summary in output.value() {
                eprintln!("{}", summary);
            }
            eprint!("{}", output.report());
            Ok(())
        }
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    }
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
