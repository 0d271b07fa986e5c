//! Fetching the per-locale game datasets and merging them into one wide table per sheet.

use ahash::AHashMap;
use rayon::prelude::*;
use thiserror::Error;

use crate::config::{locale_column, Config, LocaleSource};
use crate::fetch::{Fetch, FetchError};
use crate::report::{warn, ErrorKey};
use crate::store::{StoreError, TableStore};
use crate::table::{Table, ID_COLUMN};
use crate::token::Loc;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not fetch {sheet} for locale {locale}")]
    Fetch { sheet: String, locale: String, source: FetchError },
    #[error("could not read the rows of {resource}")]
    Csv { resource: String, source: csv::Error },
    #[error("{resource} has no header row")]
    MalformedHeader { resource: String },
    #[error("{resource} has no column {column}")]
    MissingColumn { resource: String, column: String },
    #[error("locale {0} is not configured")]
    UnknownLocale(String),
    #[error("no dataset was fetched for the source locale {0}")]
    NoSourceLocale(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One locale's dataset for a sheet, cut down to the id column and the requested attributes.
/// The attribute columns are already suffixed with the locale code.
#[derive(Debug, Clone)]
pub struct FetchedSheet {
    pub locale: String,
    pub resource: String,
    pub table: Table,
}

#[derive(Debug)]
pub struct Ingestor<'a, F: Fetch> {
    config: &'a Config,
    fetcher: &'a F,
}

impl<'a, F: Fetch> Ingestor<'a, F> {
    pub fn new(config: &'a Config, fetcher: &'a F) -> Self {
        Ingestor { config, fetcher }
    }

    pub fn fetch_sheet(
        &self,
        sheet: &str,
        attributes: &[String],
        locale: &str,
    ) -> Result<FetchedSheet, IngestError> {
        let source = self
            .config
            .locale(locale)
            .ok_or_else(|| IngestError::UnknownLocale(locale.to_owned()))?;
        self.fetch_from(sheet, attributes, source)
    }

    fn fetch_from(
        &self,
        sheet: &str,
        attributes: &[String],
        source: &LocaleSource,
    ) -> Result<FetchedSheet, IngestError> {
        let resource = source.url_for(sheet);
        let text = self.fetcher.fetch_text(&resource).map_err(|e| IngestError::Fetch {
            sheet: sheet.to_owned(),
            locale: source.code.clone(),
            source: e,
        })?;
        let table = parse_sheet(&text, attributes, &source.code, &resource)?;
        Ok(FetchedSheet { locale: source.code.clone(), resource, table })
    }

    /// Fetch one sheet for every configured locale in parallel and merge the results.
    /// The first failure fails the whole sheet.
    pub fn ingest_category(
        &self,
        sheet: &str,
        attributes: &[String],
    ) -> Result<Table, IngestError> {
        let mut parts = self
            .config
            .locales
            .par_iter()
            .map(|source| self.fetch_from(sheet, attributes, source))
            .collect::<Result<Vec<_>, _>>()?;
        let source_idx = parts
            .iter()
            .position(|part| part.locale == self.config.source_locale)
            .ok_or_else(|| IngestError::NoSourceLocale(self.config.source_locale.clone()))?;
        let source = parts.remove(source_idx);
        parts.insert(0, source);
        Ok(merge_locales(&parts))
    }

    /// Ingest every configured sheet, persisting each merged table to the store.
    pub fn scrape(&self, store: &TableStore) -> Result<AHashMap<String, Table>, IngestError> {
        let tables = self
            .config
            .sheets
            .par_iter()
            .map(|(sheet, attributes)| {
                let table = self.ingest_category(sheet, attributes)?;
                store.save(sheet, &table)?;
                Ok((sheet.clone(), table))
            })
            .collect::<Result<Vec<_>, IngestError>>()?;
        Ok(tables.into_iter().collect())
    }
}

/// Parse the text of a dataset and keep only the id column and the given attributes.
///
/// The datamining exports start with a row of column numbers, then the header row, then a row of
/// column types. Some mirrors leave out the extra rows, so they are only skipped if the first
/// row isn't already the header.
pub fn parse_sheet(
    text: &str,
    attributes: &[String],
    locale: &str,
    resource: &str,
) -> Result<Table, IngestError> {
    let csv_err = |source| IngestError::Csv { resource: resource.to_owned(), source };
    let mut reader =
        csv::ReaderBuilder::new().has_headers(false).flexible(true).from_reader(text.as_bytes());
    let records = reader.records().collect::<Result<Vec<_>, _>>().map_err(csv_err)?;

    let first_cell = records.first().and_then(|r| r.get(0));
    let has_preamble = !first_cell.is_some_and(|first| first.starts_with(ID_COLUMN));
    let (header, data) = if has_preamble {
        (records.get(1), records.get(3..).unwrap_or_default())
    } else {
        (records.first(), records.get(1..).unwrap_or_default())
    };
    let header =
        header.ok_or_else(|| IngestError::MalformedHeader { resource: resource.to_owned() })?;

    let mut wanted = Vec::new();
    let mut columns = vec![ID_COLUMN.to_owned()];
    for name in std::iter::once(ID_COLUMN).chain(attributes.iter().map(String::as_str)) {
        let idx = header.iter().position(|h| h == name).ok_or_else(|| IngestError::MissingColumn {
            resource: resource.to_owned(),
            column: name.to_owned(),
        })?;
        wanted.push(idx);
        if name != ID_COLUMN {
            columns.push(locale_column(name, locale));
        }
    }

    let mut table = Table::new(columns);
    for record in data {
        let row = wanted.iter().map(|&idx| record.get(idx).unwrap_or_default().to_owned());
        table.push_row(row.collect());
    }
    Ok(table)
}

/// Merge per-locale sheets into one wide table. The first part is the source locale; its rows
/// and their order are kept, and the other locales' columns are joined to them by id.
///
/// Ids that are missing on either side are reported, and the missing cells are left empty.
pub fn merge_locales(parts: &[FetchedSheet]) -> Table {
    let Some((source, others)) = parts.split_first() else {
        return Table::default();
    };

    let mut columns = source.table.columns().to_vec();
    for part in others {
        columns.extend(part.table.columns().iter().skip(1).cloned());
    }
    let mut merged = Table::new(columns);

    let indexes: Vec<AHashMap<&str, &Vec<String>>> = others
        .iter()
        .map(|part| part.table.rows().iter().map(|row| (row[0].as_str(), row)).collect())
        .collect();
    let mut missing = vec![0usize; others.len()];

    for row in source.table.rows() {
        let mut wide = row.clone();
        for (i, part) in others.iter().enumerate() {
            let width = part.table.columns().len() - 1;
            match indexes[i].get(row[0].as_str()) {
                Some(other) => wide.extend(other[1..].iter().cloned()),
                None => {
                    missing[i] += 1;
                    wide.extend(std::iter::repeat_n(String::new(), width));
                }
            }
        }
        merged.push_row(wide);
    }

    let source_ids: ahash::AHashSet<&str> =
        source.table.rows().iter().map(|row| row[0].as_str()).collect();
    for (i, part) in others.iter().enumerate() {
        let rows = part.table.rows().iter();
        let extra = rows.filter(|row| !source_ids.contains(row[0].as_str())).count();
        if missing[i] > 0 || extra > 0 {
            let msg =
                format!("{} rows are not aligned with the {} dataset", part.locale, source.locale);
            let info = format!(
                "{} ids are missing from {} and {extra} ids exist only there",
                missing[i], part.locale
            );
            let loc = Loc::for_file(&part.resource);
            warn(ErrorKey::Alignment).msg(msg).info(info).loc(loc).push();
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::report::take_reports;

    static LOCK: Mutex<()> = Mutex::new(());

    struct MapFetcher(AHashMap<String, String>);

    impl Fetch for MapFetcher {
        fn fetch_text(&self, resource: &str) -> Result<String, FetchError> {
            let not_found = || FetchError::NotFound { resource: resource.to_owned() };
            self.0.get(resource).cloned().ok_or_else(not_found)
        }
    }

    fn config() -> Config {
        Config {
            locales: vec![
                LocaleSource { code: "en".to_owned(), url: "mem/en/{name}.csv".to_owned() },
                LocaleSource { code: "ko".to_owned(), url: "mem/ko/{name}.csv".to_owned() },
            ],
            ..Config::default()
        }
    }

    fn attrs() -> Vec<String> {
        vec!["Name".to_owned()]
    }

    const EN_ACTION: &str =
        "key,0,1\n#,Name,Icon\nint32,str,Image\n0,,0\n7,Fire,101\n9,Fire (3),102\n";
    const KO_ACTION: &str = "#,Name,Icon\n9,파이어 2,102\n7,파이어,101\n0,,0\n";

    #[test]
    fn test_preamble_detection() {
        let table = parse_sheet(EN_ACTION, &attrs(), "en", "mem/en/Action.csv").unwrap();
        assert_eq!(table.columns(), ["#", "Name_en"]);
        assert_eq!(table.len(), 3);
        let table = parse_sheet(KO_ACTION, &attrs(), "ko", "mem/ko/Action.csv").unwrap();
        assert_eq!(table.columns(), ["#", "Name_ko"]);
        assert_eq!(table.rows()[0], ["9", "파이어 2"]);
    }

    #[test]
    fn test_missing_column() {
        let result = parse_sheet(KO_ACTION, &["Singular".to_owned()], "ko", "mem/ko/Action.csv");
        assert!(
            matches!(result, Err(IngestError::MissingColumn { column, .. }) if column == "Singular")
        );
        let result = parse_sheet("", &attrs(), "ko", "x");
        assert!(matches!(result, Err(IngestError::MalformedHeader { .. })));
    }

    #[test]
    fn test_join_on_id() {
        let _guard = LOCK.lock().unwrap();
        _ = take_reports();
        let config = config();
        let fetcher = MapFetcher(AHashMap::from([
            ("mem/en/Action.csv".to_owned(), EN_ACTION.to_owned()),
            ("mem/ko/Action.csv".to_owned(), KO_ACTION.to_owned()),
        ]));
        let table = Ingestor::new(&config, &fetcher).ingest_category("Action", &attrs()).unwrap();
        assert_eq!(table.columns(), ["#", "Name_en", "Name_ko"]);
        assert_eq!(table.rows()[1], ["7", "Fire", "파이어"]);
        assert_eq!(table.rows()[2], ["9", "Fire (3)", "파이어 2"]);
        assert!(take_reports().iter().all(|r| r.key != ErrorKey::Alignment));
    }

    #[test]
    fn test_source_locale_configured_last() {
        let _guard = LOCK.lock().unwrap();
        let config = Config {
            locales: vec![
                LocaleSource { code: "ko".to_owned(), url: "mem/ko/{name}.csv".to_owned() },
                LocaleSource { code: "de".to_owned(), url: "mem/de/{name}.csv".to_owned() },
                LocaleSource { code: "en".to_owned(), url: "mem/en/{name}.csv".to_owned() },
            ],
            ..Config::default()
        };
        let fetcher = MapFetcher(AHashMap::from([
            ("mem/en/Action.csv".to_owned(), EN_ACTION.to_owned()),
            ("mem/ko/Action.csv".to_owned(), KO_ACTION.to_owned()),
            ("mem/de/Action.csv".to_owned(), "#,Name\n0,\n7,Feuer\n9,Feuer (3)\n".to_owned()),
        ]));
        let table = Ingestor::new(&config, &fetcher).ingest_category("Action", &attrs()).unwrap();
        assert_eq!(table.columns(), ["#", "Name_en", "Name_ko", "Name_de"]);
        assert_eq!(table.rows()[1], ["7", "Fire", "파이어", "Feuer"]);
        _ = take_reports();
    }

    #[test]
    fn test_misaligned_locale_is_reported() {
        let _guard = LOCK.lock().unwrap();
        _ = take_reports();
        let config = config();
        let fetcher = MapFetcher(AHashMap::from([
            ("mem/en/Action.csv".to_owned(), EN_ACTION.to_owned()),
            ("mem/ko/Action.csv".to_owned(), "#,Name\n7,파이어\n12,블리자드\n".to_owned()),
        ]));
        let table = Ingestor::new(&config, &fetcher).ingest_category("Action", &attrs()).unwrap();
        assert_eq!(table.rows()[2], ["9", "Fire (3)", ""]);
        let reports = take_reports();
        assert_eq!(reports.iter().filter(|r| r.key == ErrorKey::Alignment).count(), 1);
    }

    #[test]
    fn test_failed_fetch_fails_sheet() {
        let config = config();
        let fetcher =
            MapFetcher(AHashMap::from([("mem/en/Action.csv".to_owned(), EN_ACTION.to_owned())]));
        let result = Ingestor::new(&config, &fetcher).ingest_category("Action", &attrs());
        assert!(matches!(result, Err(IngestError::Fetch { locale, .. }) if locale == "ko"));
    }
}
