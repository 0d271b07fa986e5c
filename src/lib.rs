//! This library forms the bulk of the raidloca tool. It pulls the per-locale game datasets,
//! resolves entity names across locales, and produces localized versions of raid timeline
//! translation files.

#![warn(missing_debug_implementations)]

pub use crate::config::{
    locale_column, validate_config_file, Config, ConfigError, LocaleSource, NameKind,
    ReservedConfig, SheetColumn,
};
pub use crate::emit::{localize, render_blocks, LocalizedBlock};
pub use crate::extract::{clean_action, extract, parse_fragment, ExtractedEntities, TimelinePair};
pub use crate::fetch::{Fetch, FetchError, Fetcher};
pub use crate::ingest::{merge_locales, parse_sheet, FetchedSheet, IngestError, Ingestor};
pub use crate::lowercase::Lowercase;
pub use crate::report::{
    cache_source, disable_ansi_colors, emit_reports, ignore_key, set_min_confidence,
    set_min_severity, set_output_file, take_reports, Confidence, ErrorKey, LogReport, Severity,
};
pub use crate::resolve::{load_tables, normalize_name, Resolution, Resolver, Tables};
pub use crate::rewrite::{rewrite_all, RewriteStats, Rewriter};
pub use crate::rsv::{replace_dir, LogLine, RegistryError, ReplaceSummary, ReservedValues};
pub use crate::store::{StoreError, TableStore};
pub use crate::table::{Table, ID_COLUMN};
pub use crate::token::{Loc, Token};

pub mod config;
pub mod emit;
pub mod extract;
pub mod fetch;
pub mod ingest;
mod lowercase;
pub mod parse;
pub mod report;
pub mod resolve;
pub mod rewrite;
pub mod rsv;
pub mod store;
pub mod table;
pub mod token;
