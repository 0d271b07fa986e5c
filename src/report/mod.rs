//! Report framework: structured diagnostics collected during a run and printed at the end.

pub use builder::{err, fatal, tips, untidy, warn};
pub use error_loc::ErrorLoc;
pub use errorkey::ErrorKey;
pub use errors::{
    cache_source, disable_ansi_colors, emit_reports, ignore_key, log, set_min_confidence,
    set_min_severity, set_output_file, take_reports,
};
pub use output_style::OutputStyle;
pub use report_struct::{Confidence, LogReport, PointedMessage, Severity};

mod builder;
mod error_loc;
mod errorkey;
mod errors;
mod filter;
mod output_style;
mod report_struct;
mod writer;
mod writer_json;

pub(crate) use errors::decode;
