//! Loading and interpreting the config file.
//!
//! The config holds the constant tables of the pipeline: which locales exist and where their
//! datasets live, which attributes to pull from each sheet, and which sheet columns hold the
//! entity names that get resolved. It is passed explicitly to the components that need it.

use std::collections::BTreeMap;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use strum_macros::{Display, EnumIter, EnumString};
use thiserror::Error;

/// The kinds of entity names that can be resolved.
#[derive(
    Debug,
    Display,
    EnumString,
    EnumIter,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NameKind {
    /// Skills and other actions cast by players and monsters
    Action,
    /// Monster names
    Npc,
    /// Zone and area names
    Place,
}

/// One dataset location per locale. `url` contains `{name}` where the sheet name goes.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocaleSource {
    pub code: String,
    pub url: String,
}

impl LocaleSource {
    fn new(code: &str, url: &str) -> Self {
        LocaleSource { code: code.to_owned(), url: url.to_owned() }
    }

    pub fn url_for(&self, sheet: &str) -> String {
        self.url.replace("{name}", sheet)
    }
}

/// Which sheet and attribute hold the names of a [`NameKind`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SheetColumn {
    pub sheet: String,
    pub attribute: String,
}

impl SheetColumn {
    fn new(sheet: &str, attribute: &str) -> Self {
        SheetColumn { sheet: sheet.to_owned(), attribute: attribute.to_owned() }
    }

    /// The name of this attribute's column for a locale, in a merged table.
    pub fn column_for(&self, locale: &str) -> String {
        locale_column(&self.attribute, locale)
    }
}

/// Settings for reserved-value placeholders.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ReservedConfig {
    /// Log records with this first field carry reserved values.
    pub log_tag: String,
    /// Table cells containing this are placeholders, not translations.
    pub placeholder: String,
    /// Skip placeholder rows while matching, instead of only falling back after the last match.
    pub skip_placeholder_rows: bool,
}

impl Default for ReservedConfig {
    fn default() -> Self {
        ReservedConfig {
            log_tag: "262".to_owned(),
            placeholder: "_rsv_".to_owned(),
            skip_placeholder_rows: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source_locale: String,
    /// All locales including the source locale, in the order their columns are merged.
    pub locales: Vec<LocaleSource>,
    /// Sheet name to the attributes that are pulled from it.
    pub sheets: BTreeMap<String, Vec<String>>,
    pub lookup: BTreeMap<NameKind, SheetColumn>,
    pub reserved: ReservedConfig,
    /// Literal replacements applied to script keys before they are looked up.
    pub key_substitutions: BTreeMap<String, String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}")]
    Unreadable { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file {path}")]
    Invalid { path: PathBuf, source: serde_json::Error },
    #[error("source locale {0} is not one of the configured locales")]
    NoSourceLocale(String),
}

const DATAMINING: &str =
    "https://raw.githubusercontent.com/xivapi/ffxiv-datamining/refs/heads/master/csv";

impl Default for Config {
    fn default() -> Self {
        let locales = vec![
            LocaleSource::new("en", &format!("{DATAMINING}/en/{{name}}.csv")),
            LocaleSource::new("de", &format!("{DATAMINING}/de/{{name}}.csv")),
            LocaleSource::new("fr", &format!("{DATAMINING}/fr/{{name}}.csv")),
            LocaleSource::new("ja", &format!("{DATAMINING}/ja/{{name}}.csv")),
            LocaleSource::new(
                "cn",
                "https://raw.githubusercontent.com/thewakingsands/ffxiv-datamining-cn/refs/heads/master/{name}.csv",
            ),
            LocaleSource::new(
                "ko",
                "https://raw.githubusercontent.com/Ra-Workspace/ffxiv-datamining-ko/refs/heads/master/csv/{name}.csv",
            ),
            LocaleSource::new(
                "tc",
                "https://raw.githubusercontent.com/thewakingsands/ffxiv-datamining-tc/refs/heads/main/{name}.csv",
            ),
        ];

        let sheets: [(&str, &[&str]); 12] = [
            ("Action", &["Name"]),
            ("BNpcName", &["Singular"]),
            ("Balloon", &["Dialogue"]),
            ("Completion", &["Text", "GroupTitle"]),
            ("DynamicEvent", &["Name", "Description"]),
            ("Fate", &["Name", "Description"]),
            ("InstanceContentTextData", &["Text"]),
            ("LogMessage", &["Text"]),
            ("NpcYell", &["Text"]),
            ("PlaceName", &["Name"]),
            ("PublicContentTextData", &["TextData"]),
            ("Status", &["Name", "Description"]),
        ];
        let sheets = sheets
            .into_iter()
            .map(|(sheet, attrs)| (sheet.to_owned(), attrs.iter().map(|&a| a.to_owned()).collect()))
            .collect();

        let lookup = BTreeMap::from([
            (NameKind::Action, SheetColumn::new("Action", "Name")),
            (NameKind::Npc, SheetColumn::new("BNpcName", "Singular")),
            (NameKind::Place, SheetColumn::new("PlaceName", "Name")),
        ]);

        Config {
            source_locale: "en".to_owned(),
            locales,
            sheets,
            lookup,
            reserved: ReservedConfig::default(),
            key_substitutions: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Read a JSON config file. Fields that are left out keep their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = read_to_string(path)
            .map_err(|source| ConfigError::Unreadable { path: path.to_path_buf(), source })?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|source| ConfigError::Invalid { path: path.to_path_buf(), source })?;
        config.check()?;
        Ok(config)
    }

    fn check(&self) -> Result<(), ConfigError> {
        if self.locale(&self.source_locale).is_none() {
            return Err(ConfigError::NoSourceLocale(self.source_locale.clone()));
        }
        Ok(())
    }

    pub fn locale(&self, code: &str) -> Option<&LocaleSource> {
        self.locales.iter().find(|l| l.code == code)
    }

    /// The configured locales other than the source locale, in configured order.
    pub fn target_locales(&self) -> impl Iterator<Item = &str> {
        self.locales.iter().map(|l| l.code.as_str()).filter(|&code| code != self.source_locale)
    }

    pub fn column(&self, kind: NameKind) -> Option<&SheetColumn> {
        self.lookup.get(&kind)
    }
}

/// Check the config file given on the command line, if any. A path that isn't an existing
/// `.json` file is dropped with a notice, so that the built-in defaults are used instead.
pub fn validate_config_file(config: Option<PathBuf>) -> Option<PathBuf> {
    let config = config?;
    if !config.is_file() {
        eprintln!("{} is not a valid file. Using the default config instead.", config.display());
        None
    } else if config.extension().is_some_and(|ext| ext != "json") {
        let path = config.display();
        eprintln!("{path} is not a valid .json file. Using the default config instead.");
        None
    } else {
        eprintln!("Using config file: {}", config.display());
        Some(config)
    }
}

/// Column naming in merged tables: the attribute suffixed by the locale code.
pub fn locale_column(attribute: &str, locale: &str) -> String {
    format!("{attribute}_{locale}")
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn test_default_locales() {
        let config = Config::default();
        assert!(config.check().is_ok());
        let targets: Vec<_> = config.target_locales().collect();
        assert_eq!(targets, ["de", "fr", "ja", "cn", "ko", "tc"]);
        assert_eq!(
            config.locale("ko").map(|l| l.url_for("Action")).as_deref(),
            Some("https://raw.githubusercontent.com/Ra-Workspace/ffxiv-datamining-ko/refs/heads/master/csv/Action.csv")
        );
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "locales": [
                {"code": "en", "url": "data/en/{name}.csv"},
                {"code": "ko", "url": "data/ko/{name}.csv"}
            ],
            "key_substitutions": {"Shiva's Ice": "Shiva's  Ice"}
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(config.check().is_ok());
        assert_eq!(config.locales.len(), 2);
        assert_eq!(config.reserved, ReservedConfig::default());
        let column = config.column(NameKind::Npc).map(|c| c.column_for("ko"));
        assert_eq!(column.as_deref(), Some("Singular_ko"));
    }

    #[test]
    fn test_missing_source_locale() {
        let json = r#"{"source_locale": "xx"}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert!(matches!(config.check(), Err(ConfigError::NoSourceLocale(_))));
    }

    #[test]
    fn test_name_kind_names() {
        assert_eq!(NameKind::from_str("npc"), Ok(NameKind::Npc));
        assert_eq!(NameKind::Place.to_string(), "place");
    }
}
