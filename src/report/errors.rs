//! Collect reports and then write them out.

use std::cmp::Ordering;
use std::fs::{read, File};
use std::io::{stdout, Write};
use std::mem::take;
use std::path::{Path, PathBuf};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};

use ahash::AHashMap;
use anyhow::Result;
use encoding_rs::{UTF_8, WINDOWS_1252};

use crate::report::filter::ReportFilter;
use crate::report::writer::log_report;
use crate::report::writer_json::log_report_json;
use crate::report::{Confidence, ErrorKey, LogReport, OutputStyle, Severity};
use crate::token::Loc;

static ERRORS: LazyLock<Mutex<Errors>> = LazyLock::new(|| Mutex::new(Errors::default()));

#[allow(missing_debug_implementations)]
pub struct Errors {
    pub(crate) output: Box<dyn Write + Send>,

    /// Resources that have been read in to get the lines where problems occurred.
    /// Cached here to avoid duplicate I/O and decoding.
    /// Fetched remote resources are registered here up front because they can't be re-read.
    filecache: AHashMap<PathBuf, String>,

    /// Determines whether a report should be printed.
    pub(crate) filter: ReportFilter,
    /// Output color and style configuration.
    pub(crate) styles: OutputStyle,

    /// All reports that passed the checks, stored here to be sorted before being emitted all at
    /// once.
    storage: Vec<LogReport>,
}

impl Default for Errors {
    fn default() -> Self {
        Errors {
            output: Box::new(stdout()),
            filecache: AHashMap::default(),
            filter: ReportFilter::default(),
            styles: OutputStyle::default(),
            storage: Vec::default(),
        }
    }
}

impl Errors {
    /// Fetch the contents of a single line from a resource.
    pub(crate) fn get_line(&mut self, loc: &Loc) -> Option<String> {
        if loc.line == 0 {
            return None;
        }
        let idx = loc.line as usize - 1;
        if let Some(contents) = self.filecache.get(loc.pathname()) {
            return contents.lines().nth(idx).map(str::to_owned);
        }
        let bytes = read(loc.pathname()).ok()?;
        let contents = decode(&bytes);
        let line = contents.lines().nth(idx).map(str::to_owned);
        self.filecache.insert(loc.pathname().to_path_buf(), contents);
        line
    }

    /// Perform some checks to see whether the report should actually be logged.
    /// If yes, it will add it to the storage.
    fn push_report(&mut self, report: LogReport) {
        if !self.filter.should_print_report(&report) {
            return;
        }
        if !self.storage.contains(&report) {
            self.storage.push(report);
        }
    }

    /// Extract the stored reports, sort them, and return them as a vector of [`LogReport`].
    /// The stored reports will be left empty.
    pub fn take_reports(&mut self) -> Vec<LogReport> {
        let mut reports = take(&mut self.storage);
        reports.sort_by(|a, b| {
            // Severity in descending order
            let mut cmp = b.severity.cmp(&a.severity);
            if cmp != Ordering::Equal {
                return cmp;
            }
            // Confidence in descending order too
            cmp = b.confidence.cmp(&a.confidence);
            if cmp != Ordering::Equal {
                return cmp;
            }
            // If severity and confidence are the same, order by loc. Check all locs in order.
            for (a, b) in a.pointers.iter().zip(b.pointers.iter()) {
                cmp = a.loc.cmp(&b.loc);
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            // Fallback: order by message text.
            a.msg.cmp(&b.msg)
        });
        reports
    }

    /// Print all the stored reports to the error output.
    /// Set `json` if they should be printed as a JSON array. Otherwise they are printed in the
    /// default output format.
    pub fn emit_reports(&mut self, json: bool) {
        let reports = self.take_reports();
        if json {
            _ = writeln!(self.output, "[");
            let mut first = true;
            for report in &reports {
                if !first {
                    _ = writeln!(self.output, ",");
                }
                first = false;
                log_report_json(self, report);
            }
            _ = writeln!(self.output, "\n]");
        } else {
            for report in &reports {
                log_report(self, report);
            }
        }
    }

    /// Get a mutable lock on the global ERRORS struct.
    ///
    /// A poisoned lock is taken over anyway; the store only holds plain data.
    pub fn get_mut() -> MutexGuard<'static, Errors> {
        ERRORS.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decode a resource as UTF-8, falling back to Windows-1252 for legacy exports.
/// A leading BOM is dropped.
pub(crate) fn decode(bytes: &[u8]) -> String {
    let (contents, had_errors) = UTF_8.decode_without_bom_handling(bytes);
    let contents =
        if had_errors { WINDOWS_1252.decode_without_bom_handling(bytes).0 } else { contents };
    contents.strip_prefix('\u{feff}').unwrap_or(&*contents).to_owned()
}

/// Store a report to be emitted when [`emit_reports`] is called.
pub fn log(report: LogReport) {
    Errors::get_mut().push_report(report);
}

/// Register the text of a resource that cannot be read back from disk, such as a fetched url,
/// so that reports can quote its lines.
pub fn cache_source<P: Into<PathBuf>>(pathname: P, contents: &str) {
    Errors::get_mut().filecache.insert(pathname.into(), contents.to_owned());
}

/// Print all the stored reports to the error output.
/// Set `json` if they should be printed as a JSON array. Otherwise they are printed in the
/// default output format.
///
/// Note that the default output format is not stable across versions. It is meant for human
/// readability and occasionally gets changed to improve that.
pub fn emit_reports(json: bool) {
    Errors::get_mut().emit_reports(json);
}

/// Extract the stored reports, sort them, and return them as a vector of [`LogReport`].
/// The stored reports will be left empty.
pub fn take_reports() -> Vec<LogReport> {
    Errors::get_mut().take_reports()
}

/// Configure the reports to be written to this file instead of to stdout.
pub fn set_output_file(file: &Path) -> Result<()> {
    let file = File::create(file)?;
    Errors::get_mut().output = Box::new(file);
    Ok(())
}

// =================================================================================================
// =============== Configuration (Output style):
// =================================================================================================

/// Disable color in the output.
pub fn disable_ansi_colors() {
    Errors::get_mut().styles = OutputStyle::no_color();
}

// =================================================================================================
// =============== Configuration (Filter):
// =================================================================================================

/// Only store reports of at least this severity.
pub fn set_min_severity(severity: Severity) {
    Errors::get_mut().filter.min_severity = severity;
}

/// Only store reports of at least this confidence.
pub fn set_min_confidence(confidence: Confidence) {
    Errors::get_mut().filter.min_confidence = confidence;
}

/// Never store reports with this key.
pub fn ignore_key(key: ErrorKey) {
    Errors::get_mut().filter.ignored.insert(key);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8_with_bom() {
        assert_eq!(decode("\u{feff}파이어".as_bytes()), "파이어");
    }

    #[test]
    fn test_decode_legacy() {
        // 0xE9 is é in Windows-1252 and invalid on its own in UTF-8
        assert_eq!(decode(b"Caf\xe9"), "Café");
    }
}
