//! Finding the localized equivalent of a name in the merged tables.

use std::sync::LazyLock;

use ahash::AHashMap;
use regex::Regex;

use crate::config::{Config, NameKind};
use crate::lowercase::Lowercase;
use crate::rsv::ReservedValues;
use crate::store::{StoreError, TableStore};
use crate::table::Table;

static ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\s*\([^()]*\))+\s*$").expect("annotation regex"));

/// A quote together with all the backslashes escaping it.
static ESCAPED_QUOTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\+'").expect("escaped quote regex"));

/// Bring a name to the form used for lookups: escaped quotes are unescaped and trailing
/// parenthetical annotations are removed, so that `Shiva\'s Ice (2)` becomes `Shiva's Ice`.
///
/// A name that consists only of an annotation is kept as is. Normalized names contain no
/// escaped quotes, so normalizing twice gives the same result.
pub fn normalize_name(name: &str) -> String {
    let unescaped = ESCAPED_QUOTE.replace_all(name, "'");
    let stripped = ANNOTATION.replace(&unescaped, "");
    let stripped = stripped.trim();
    if stripped.is_empty() {
        unescaped.trim().to_owned()
    } else {
        stripped.to_owned()
    }
}

/// Merged tables by sheet name.
pub type Tables = AHashMap<String, Table>;

/// Load the tables that hold the names of every [`NameKind`] in the config.
pub fn load_tables(config: &Config, store: &TableStore) -> Result<Tables, StoreError> {
    let mut tables = AHashMap::new();
    for column in config.lookup.values() {
        if !tables.contains_key(&column.sheet) {
            tables.insert(column.sheet.clone(), store.load(&column.sheet)?);
        }
    }
    Ok(tables)
}

/// Row numbers per normalized source name, in table order.
type NameIndex = AHashMap<Lowercase<'static>, Vec<usize>>;

#[derive(Debug)]
pub struct Resolver<'a> {
    config: &'a Config,
    tables: &'a Tables,
    registry: Option<&'a ReservedValues>,
    indexes: AHashMap<NameKind, NameIndex>,
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a Config, tables: &'a Tables) -> Self {
        let mut indexes = AHashMap::new();
        for (&kind, column) in &config.lookup {
            let Some(table) = tables.get(&column.sheet) else {
                continue;
            };
            let Some(names) = table.column(&column.column_for(&config.source_locale)) else {
                continue;
            };
            let mut index = NameIndex::new();
            for (row, name) in names.enumerate() {
                if name.is_empty() {
                    continue;
                }
                let normalized = normalize_name(name);
                index.entry(Lowercase::new(&normalized).into_owned()).or_default().push(row);
            }
            indexes.insert(kind, index);
        }
        Resolver { config, tables, registry: None, indexes }
    }

    /// Use a reserved value registry for locale cells that still hold placeholders.
    #[must_use]
    pub fn with_registry(mut self, registry: &'a ReservedValues) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(&self) -> &'a Config {
        self.config
    }

    /// Find the locale value of the last row whose source name matches `name`.
    ///
    /// Rows without a value for the locale don't count. A placeholder cell is replaced by its
    /// registry value if there is one. Otherwise the row is skipped if the config says so, and
    /// if no later match turns up the result is [`Resolution::Reserved`].
    pub fn lookup(&self, name: &str, kind: NameKind, locale: &str) -> Resolution<'a> {
        let Some(column) = self.config.column(kind) else {
            return Resolution::Missing;
        };
        let Some(table) = self.tables.get(&column.sheet) else {
            return Resolution::Missing;
        };
        let table: &'a Table = table;
        let Some(idx) = table.column_index(&column.column_for(locale)) else {
            return Resolution::Missing;
        };
        let normalized = normalize_name(name);
        let folded = Lowercase::new(&normalized);
        let Some(rows) = self.indexes.get(&kind).and_then(|index| index.get(folded.as_str())) else {
            return Resolution::Missing;
        };

        let reserved = &self.config.reserved;
        let mut skipped = None;
        for &row in rows.iter().rev() {
            let value = table.rows()[row][idx].as_str();
            if value.is_empty() {
                continue;
            }
            if !value.contains(&reserved.placeholder) {
                return Resolution::Found(value);
            }
            if let Some(resolved) = self.registry.and_then(|registry| registry.get(value)) {
                if !resolved.contains(&reserved.placeholder) {
                    return Resolution::Found(resolved);
                }
            }
            if !reserved.skip_placeholder_rows {
                return Resolution::Reserved(value);
            }
            skipped.get_or_insert(value);
        }
        skipped.map_or(Resolution::Missing, Resolution::Reserved)
    }

    /// The localized equivalent of `name`, if the tables have a usable one.
    pub fn translate(&self, name: &str, kind: NameKind, locale: &str) -> Option<&'a str> {
        match self.lookup(name, kind, locale) {
            Resolution::Found(value) => Some(value),
            Resolution::Reserved(_) | Resolution::Missing => None,
        }
    }

    /// The localized equivalent of `name`, or `name` itself if there is none.
    pub fn resolve(&self, name: &str, kind: NameKind, locale: &str) -> String {
        self.translate(name, kind, locale).unwrap_or(name).to_owned()
    }
}

/// The outcome of a [`Resolver::lookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution<'a> {
    Found(&'a str),
    /// The name is known, but its translation is still a reserved value placeholder.
    Reserved(&'a str),
    Missing,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReservedConfig;

    fn action_table(rows: &[(&str, &str)]) -> AHashMap<String, Table> {
        let columns = vec!["#".to_owned(), "Name_en".to_owned(), "Name_ko".to_owned()];
        let mut table = Table::new(columns);
        for (i, (en, ko)) in rows.iter().enumerate() {
            table.push_row(vec![i.to_string(), (*en).to_owned(), (*ko).to_owned()]);
        }
        AHashMap::from([("Action".to_owned(), table)])
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize_name("Fire (3)"), "Fire");
        assert_eq!(normalize_name("Shiva\\'s Ice"), "Shiva's Ice");
        assert_eq!(normalize_name("Ruin (Pet) (2) "), "Ruin");
        assert_eq!(normalize_name("(Unknown)"), "(Unknown)");
        assert_eq!(normalize_name("Fire (3) II"), "Fire (3) II");
        assert_eq!(normalize_name("a\\\\'b"), "a'b");
        let names = ["Fire (3)", "Shiva\\'s Ice", "(Unknown)", " Blizzard ", "Ruin (Pet) (2)"];
        for name in names.into_iter().chain(["a\\\\'b"]) {
            let once = normalize_name(name);
            assert_eq!(normalize_name(&once), once);
        }
    }

    #[test]
    fn test_last_match_wins() {
        let config = Config::default();
        let tables = action_table(&[("Fire", "파이어"), ("Fire (3)", "파이어 2")]);
        let resolver = Resolver::new(&config, &tables);
        assert_eq!(resolver.resolve("Fire (3)", NameKind::Action, "ko"), "파이어 2");
        assert_eq!(resolver.resolve("FIRE", NameKind::Action, "ko"), "파이어 2");
    }

    #[test]
    fn test_empty_rows_are_skipped() {
        let config = Config::default();
        let tables = action_table(&[("Fire", "파이어"), ("Fire", "")]);
        let resolver = Resolver::new(&config, &tables);
        assert_eq!(resolver.lookup("Fire", NameKind::Action, "ko"), Resolution::Found("파이어"));
    }

    #[test]
    fn test_misses_fall_back() {
        let config = Config::default();
        let tables = action_table(&[("Fire", "파이어")]);
        let resolver = Resolver::new(&config, &tables);
        assert_eq!(resolver.resolve("Hell\\'s Sting", NameKind::Action, "ko"), "Hell\\'s Sting");
        assert_eq!(resolver.resolve("Fire", NameKind::Action, "tc"), "Fire");
        assert_eq!(resolver.resolve("Hesperos", NameKind::Npc, "ko"), "Hesperos");
    }

    #[test]
    fn test_placeholder_fallback() {
        let tables = action_table(&[("Ravenous Spark", "_rsv_1_-1_1_0_1")]);
        let config = Config::default();
        let resolver = Resolver::new(&config, &tables);
        assert_eq!(
            resolver.lookup("Ravenous Spark", NameKind::Action, "ko"),
            Resolution::Reserved("_rsv_1_-1_1_0_1")
        );
        assert_eq!(resolver.resolve("Ravenous Spark", NameKind::Action, "ko"), "Ravenous Spark");

        let keep = Config {
            reserved: ReservedConfig { skip_placeholder_rows: false, ..ReservedConfig::default() },
            ..Config::default()
        };
        let resolver = Resolver::new(&keep, &tables);
        assert_eq!(
            resolver.lookup("Ravenous Spark", NameKind::Action, "ko"),
            Resolution::Reserved("_rsv_1_-1_1_0_1")
        );
        assert_eq!(resolver.translate("Ravenous Spark", NameKind::Action, "ko"), None);
        assert_eq!(resolver.resolve("Ravenous Spark", NameKind::Action, "ko"), "Ravenous Spark");
    }

    #[test]
    fn test_placeholder_row_yields_to_earlier_row() {
        let config = Config::default();
        let tables = action_table(&[("Spark", "스파크"), ("Spark", "_rsv_9")]);
        let resolver = Resolver::new(&config, &tables);
        assert_eq!(resolver.resolve("Spark", NameKind::Action, "ko"), "스파크");
    }

    #[test]
    fn test_registry_fills_placeholders() {
        let config = Config::default();
        let tables = action_table(&[("Ravenous Spark", "_rsv_1_-1_1_0_1")]);
        let mut registry = ReservedValues::new();
        registry.insert("_rsv_1_-1_1_0_1".to_owned(), "굶주린 불꽃".to_owned());
        let resolver = Resolver::new(&config, &tables).with_registry(&registry);
        assert_eq!(resolver.resolve("ravenous spark", NameKind::Action, "ko"), "굶주린 불꽃");
    }
}
