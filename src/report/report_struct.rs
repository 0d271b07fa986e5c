use serde::Serialize;
use strum_macros::{Display, EnumIter, EnumString};

use crate::report::ErrorKey;
use crate::token::Loc;

/// Describes a report about a potentially problematic situation that can be logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogReport {
    /// Used for choosing output colors and for filtering reports.
    pub severity: Severity,
    /// Mostly invisible in the output; used for filtering.
    pub confidence: Confidence,
    /// Defines the problem category. Used for filtering reports.
    pub key: ErrorKey,
    /// The primary error message. A short description of the problem.
    pub msg: String,
    /// Optional info message to be printed at the end.
    pub info: Option<String>,
    /// Should contain one or more elements.
    pub pointers: Vec<PointedMessage>,
}

impl LogReport {
    /// Returns the primary pointer.
    ///
    /// # Panics
    /// The report builder guarantees there is at least one pointer.
    pub fn primary(&self) -> &PointedMessage {
        &self.pointers[0]
    }

    /// Returns the length of the longest line number.
    pub fn indentation(&self) -> usize {
        self.pointers.iter().map(|pointer| pointer.loc.line.to_string().len()).max().unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PointedMessage {
    /// Which resource and where in the resource the problem occurs.
    /// Might point to a whole resource, rather than a specific line.
    pub loc: Loc,
    /// The length of the offending phrase in characters.
    /// This will determine the number of carets that are printed at the given location.
    pub length: usize,
    /// A short message that will be printed at the caret location.
    pub msg: Option<String>,
}

impl PointedMessage {
    pub fn new(loc: Loc) -> Self {
        Self { loc, length: 1, msg: None }
    }
}

/// Determines the output colour.
/// User can also filter by minimum severity level: e.g. don't show me Tips-level messages.
#[derive(
    Default,
    Debug,
    Display,
    EnumString,
    Clone,
    Copy,
    Ord,
    PartialOrd,
    Eq,
    PartialEq,
    Hash,
    EnumIter,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// A hint that something could be improved in the input data.
    Tips,
    /// The input is sloppy but the output is unaffected.
    Untidy,
    /// The output may be incomplete or less accurate than it could be.
    #[default]
    Warning,
    /// The output for this item is wrong or missing.
    Error,
    /// The run cannot continue.
    Fatal,
}

/// Mostly invisible in the output.
/// User can filter by minimum confidence level.
#[derive(
    Default,
    Debug,
    Display,
    EnumString,
    Clone,
    Copy,
    Ord,
    PartialOrd,
    Eq,
    PartialEq,
    Hash,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Quite likely to be harmless.
    Weak,
    /// Reasonably confident that the problem is real.
    #[default]
    Reasonable,
    /// Very confident that this problem is real.
    Strong,
}
