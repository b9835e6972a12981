//! Intervals, strands and interval containers.
//!
//! Unlike BED-style ranges, annotation intervals are 0-based and *closed*:
//! a [`SeqInterval`] covers both `start` and `stop`.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{error::AecrError, traits::GenericRange, Position};

pub mod coitrees;

/// Strand of an annotated interval.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strand {
    Plus,
    Minus,
    #[default]
    Unknown,
}

impl Strand {
    /// Two strands are compatible unless one is plus and the other minus.
    pub fn is_compatible(&self, other: &Strand) -> bool {
        !matches!(
            (self, other),
            (Strand::Plus, Strand::Minus) | (Strand::Minus, Strand::Plus)
        )
    }

    pub fn is_minus(&self) -> bool {
        matches!(self, Strand::Minus)
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strand::Plus => write!(f, "+"),
            Strand::Minus => write!(f, "-"),
            Strand::Unknown => write!(f, "."),
        }
    }
}

/// A closed interval on one sequence, with strand and partialness.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeqInterval {
    pub start: Position,
    pub stop: Position,
    #[serde(default)]
    pub strand: Strand,
    #[serde(default)]
    pub partial_start: bool,
    #[serde(default)]
    pub partial_stop: bool,
}

impl SeqInterval {
    /// Create a new closed interval `[start, stop]`.
    pub fn new(start: Position, stop: Position, strand: Strand) -> Self {
        Self {
            start,
            stop,
            strand,
            partial_start: false,
            partial_stop: false,
        }
    }

    /// The biological 5' end: `stop` on the minus strand, `start` otherwise.
    pub fn five_prime(&self) -> Position {
        if self.strand.is_minus() {
            self.stop
        } else {
            self.start
        }
    }

    /// The biological 3' end.
    pub fn three_prime(&self) -> Position {
        if self.strand.is_minus() {
            self.start
        } else {
            self.stop
        }
    }
}

impl GenericRange for SeqInterval {
    fn start(&self) -> Position {
        self.start
    }
    fn end(&self) -> Position {
        self.stop
    }
}

impl fmt::Display for SeqInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}({})", self.start, self.stop, self.strand)
    }
}

/// A closed interval with an index to the feature it was built from.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IntervalIndexed {
    pub start: Position,
    pub stop: Position,
    pub index: usize,
}

impl IntervalIndexed {
    pub fn new(start: Position, stop: Position, index: usize) -> Self {
        Self { start, stop, index }
    }
}

/// Validates whether a closed interval fits on a sequence of a given `length`.
pub fn validate_range(start: Position, stop: Position, length: Position) -> Result<(), AecrError> {
    if start > stop {
        return Err(AecrError::InvalidInterval(start, stop));
    }

    if stop >= length {
        return Err(AecrError::InvalidIntervalForSequence(start, stop, length));
    }
    Ok(())
}
