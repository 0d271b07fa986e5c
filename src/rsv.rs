//! The registry of reserved values: game texts that the datasets only carry as placeholders and
//! that are recovered from network logs instead.

use std::collections::BTreeMap;
use std::fs::{read, write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::LazyLock;

use ahash::AHashMap;
use rayon::prelude::*;
use regex::Regex;
use thiserror::Error;

use crate::config::ReservedConfig;
use crate::report::{decode, untidy, warn, ErrorKey};
use crate::store::{read_table, write_table, StoreError, TableStore};
use crate::table::Table;
use crate::token::Loc;

/// Runs of control characters that the game uses as line breaks inside a value.
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\x01\x02\x03\x10]+").expect("line break regex"));

const FIELD_COUNT: usize = 7;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("reserved value registry {path} does not exist")]
    Missing { path: PathBuf },
    #[error("could not read {path}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("registry {path} is not a JSON object of strings")]
    Invalid { path: PathBuf, source: serde_json::Error },
    #[error("could not write registry {path}")]
    Write { path: PathBuf, source: std::io::Error },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a single log line turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Record { key: String, value: String },
    /// A line with the right tag but the wrong number of fields.
    Malformed { fields: usize },
    /// Anything else. Most lines of a network log are of this kind.
    Other,
}

#[derive(Debug, Clone, Default)]
pub struct ReservedValues {
    values: AHashMap<String, String>,
    /// Where each key was last defined, if it came from a log.
    origins: AHashMap<String, Loc>,
}

impl ReservedValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify one line of a log. Both the tagged network log records
    /// (`tag|time|lang|id|key|value|hash`) and the older `key|value` export are accepted.
    pub fn parse_line(line: &str, config: &ReservedConfig) -> LogLine {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.strip_prefix(config.log_tag.as_str()).is_some_and(|rest| rest.starts_with('|')) {
            let fields: Vec<&str> = line.split('|').collect();
            if fields.len() != FIELD_COUNT {
                return LogLine::Malformed { fields: fields.len() };
            }
            return LogLine::Record {
                key: fields[4].to_owned(),
                value: LINE_BREAK.replace_all(fields[5], "\n").into_owned(),
            };
        }
        let line = line.trim();
        if line.starts_with(config.placeholder.as_str()) {
            return match line.split_once('|') {
                Some((key, value)) => {
                    LogLine::Record { key: key.to_owned(), value: value.replace('\u{10}', " ") }
                }
                None => LogLine::Malformed { fields: 1 },
            };
        }
        LogLine::Other
    }

    /// Build a registry from log files, read in order. Later records override earlier ones.
    pub fn parse_logs(files: &[PathBuf], config: &ReservedConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for path in files {
            let bytes =
                read(path).map_err(|source| RegistryError::Read { path: path.clone(), source })?;
            registry.parse_log_text(&decode(&bytes), &Loc::for_file(path), config);
        }
        Ok(registry)
    }

    pub fn parse_log_text(&mut self, text: &str, loc: &Loc, config: &ReservedConfig) {
        for (nr, line) in text.lines().enumerate() {
            let loc = loc.at_line(u32::try_from(nr + 1).unwrap_or(u32::MAX));
            match Self::parse_line(line, config) {
                LogLine::Record { key, value } => self.define(key, value, loc),
                LogLine::Malformed { fields } => {
                    let msg = format!(
                        "reserved value record has {fields} fields instead of {FIELD_COUNT}"
                    );
                    warn(ErrorKey::ParseError).msg(msg).loc(loc).push();
                }
                LogLine::Other => (),
            }
        }
    }

    fn define(&mut self, key: String, value: String, loc: Loc) {
        if let Some(prev) = self.values.get(&key) {
            if *prev != value {
                let msg = format!("reserved value {key} is redefined");
                let mut report = untidy(ErrorKey::Duplicate)
                    .msg(msg)
                    .info("the last definition is used")
                    .loc_msg(loc.clone(), "here");
                if let Some(origin) = self.origins.get(&key) {
                    report = report.loc_msg(origin.clone(), "previous definition");
                }
                report.push();
            }
        }
        self.origins.insert(key.clone(), loc);
        self.values.insert(key, value);
    }

    pub fn insert(&mut self, key: String, value: String) {
        self.origins.remove(&key);
        self.values.insert(key, value);
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        if !path.is_file() {
            return Err(RegistryError::Missing { path: path.to_path_buf() });
        }
        let bytes = read(path)
            .map_err(|source| RegistryError::Read { path: path.to_path_buf(), source })?;
        let values: BTreeMap<String, String> = serde_json::from_str(&decode(&bytes))
            .map_err(|source| RegistryError::Invalid { path: path.to_path_buf(), source })?;
        Ok(ReservedValues { values: values.into_iter().collect(), origins: AHashMap::default() })
    }

    /// Write the registry as a JSON object with sorted keys.
    pub fn save(&self, path: &Path) -> Result<(), RegistryError> {
        let sorted: BTreeMap<&str, &str> =
            self.values.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let mut json = serde_json::to_string_pretty(&sorted)
            .map_err(|source| RegistryError::Invalid { path: path.to_path_buf(), source })?;
        json.push('\n');
        write(path, json)
            .map_err(|source| RegistryError::Write { path: path.to_path_buf(), source })
    }

    /// Replace every cell of the table that is exactly a registry key. Returns the number of
    /// cells replaced.
    pub fn apply_to_table(&self, table: &mut Table) -> usize {
        table.replace_cells(&self.values)
    }
}

/// Totals of a [`replace_dir`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplaceSummary {
    pub files: usize,
    pub cells: usize,
}

/// Apply the registry at `registry_path` to every table under `data_dir`, one task per file.
///
/// The registry is loaded before any table is touched, so a missing registry changes nothing.
/// `progress` is bumped once per finished file.
pub fn replace_dir(
    data_dir: &Path,
    registry_path: &Path,
    progress: &AtomicUsize,
) -> Result<ReplaceSummary, RegistryError> {
    let registry = ReservedValues::load(registry_path)?;
    let files = TableStore::new(data_dir).list()?;
    let cells = files
        .par_iter()
        .map(|path| -> Result<usize, RegistryError> {
            let mut table = read_table(path)?;
            let count = registry.apply_to_table(&mut table);
            if count > 0 {
                write_table(path, &table)?;
            }
            progress.fetch_add(1, Ordering::Relaxed);
            Ok(count)
        })
        .try_reduce(|| 0, |a, b| Ok(a + b))?;
    Ok(ReplaceSummary { files: files.len(), cells })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_record() {
        let config = ReservedConfig::default();
        let line = "262|2024-07-30T21:14:03.1230000+09:00|0001|0|\
                    _rsv_40593_-1_1_0_1_SE2DC5B04_EE2DC5B04|\
                    Shockwave\u{2}\u{10}\u{1}\u{3}of Light|0123456789abcdef\r\n";
        assert_eq!(
            ReservedValues::parse_line(line, &config),
            LogLine::Record {
                key: "_rsv_40593_-1_1_0_1_SE2DC5B04_EE2DC5B04".to_owned(),
                value: "Shockwave\nof Light".to_owned(),
            }
        );
        let malformed = ReservedValues::parse_line("262|a|b|c", &config);
        assert_eq!(malformed, LogLine::Malformed { fields: 4 });
        assert_eq!(ReservedValues::parse_line("2620|a|b|c|d|e|f", &config), LogLine::Other);
        assert_eq!(ReservedValues::parse_line("00|2024|0039||noise", &config), LogLine::Other);
    }

    #[test]
    fn test_legacy_record() {
        let config = ReservedConfig::default();
        assert_eq!(
            ReservedValues::parse_line("  _rsv_1_-1_1_0_1|Ravenous\u{10}Spark|x\n", &config),
            LogLine::Record {
                key: "_rsv_1_-1_1_0_1".to_owned(),
                value: "Ravenous Spark|x".to_owned(),
            }
        );
    }

    #[test]
    fn test_last_record_wins() {
        let config = ReservedConfig::default();
        let text = "262|t|l|i|_rsv_a|first|h\n01|zone\n262|t|l|i|_rsv_a|second|h\n";
        let mut registry = ReservedValues::new();
        registry.parse_log_text(text, &Loc::for_file("Network_1.log"), &config);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("_rsv_a"), Some("second"));
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("raidloca-rsv-{}.json", std::process::id()));
        let mut registry = ReservedValues::new();
        registry.insert("_rsv_b".to_owned(), "두 줄\n텍스트".to_owned());
        registry.insert("_rsv_a".to_owned(), "Spark".to_owned());
        registry.save(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"_rsv_a\": \"Spark\",\n"));
        let loaded = ReservedValues::load(&path).unwrap();
        assert_eq!(loaded.get("_rsv_b"), Some("두 줄\n텍스트"));
        _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_registry_changes_nothing() {
        let progress = AtomicUsize::new(0);
        let missing = Path::new("surely/not/rsv.json");
        let result = replace_dir(Path::new("tests/files"), missing, &progress);
        assert!(matches!(result, Err(RegistryError::Missing { .. })));
        assert_eq!(progress.load(Ordering::Relaxed), 0);
    }
}
