//! Durable storage of merged tables, one CSV file per sheet.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use thiserror::Error;
use walkdir::WalkDir;

use crate::table::Table;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("could not create data directory {path}")]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("could not read table {path}")]
    Read { path: PathBuf, source: csv::Error },
    #[error("could not write table {path}")]
    Write { path: PathBuf, source: csv::Error },
    #[error("table {path} has no header row")]
    NoHeader { path: PathBuf },
    #[error("could not list tables under {path}")]
    List { path: PathBuf, source: walkdir::Error },
}

/// A directory of `<sheet>.csv` tables.
#[derive(Debug, Clone)]
pub struct TableStore {
    root: PathBuf,
}

impl TableStore {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        TableStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, sheet: &str) -> PathBuf {
        self.root.join(format!("{sheet}.csv"))
    }

    pub fn save(&self, sheet: &str, table: &Table) -> Result<PathBuf, StoreError> {
        create_dir_all(&self.root)
            .map_err(|source| StoreError::CreateDir { path: self.root.clone(), source })?;
        let path = self.path_for(sheet);
        write_table(&path, table)?;
        Ok(path)
    }

    pub fn load(&self, sheet: &str) -> Result<Table, StoreError> {
        read_table(&self.path_for(sheet))
    }

    /// All table files under the store root, recursively, in lexical order.
    pub fn list(&self) -> Result<Vec<PathBuf>, StoreError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry =
                entry.map_err(|source| StoreError::List { path: self.root.clone(), source })?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
            {
                paths.push(entry.into_path());
            }
        }
        Ok(paths)
    }
}

pub fn read_table(path: &Path) -> Result<Table, StoreError> {
    let read_err = |source| StoreError::Read { path: path.to_path_buf(), source };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)
        .map_err(read_err)?;
    let mut records = reader.records();
    let header = match records.next() {
        Some(record) => record.map_err(read_err)?,
        None => return Err(StoreError::NoHeader { path: path.to_path_buf() }),
    };
    let mut table = Table::new(header.iter().map(str::to_owned).collect());
    for record in records {
        let record = record.map_err(read_err)?;
        table.push_row(record.iter().map(str::to_owned).collect());
    }
    Ok(table)
}

pub fn write_table(path: &Path, table: &Table) -> Result<(), StoreError> {
    let write_err = |source| StoreError::Write { path: path.to_path_buf(), source };
    let mut writer = csv::Writer::from_path(path).map_err(write_err)?;
    writer.write_record(table.columns()).map_err(write_err)?;
    for row in table.rows() {
        writer.write_record(row).map_err(write_err)?;
    }
    writer.flush().map_err(|e| write_err(e.into()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs::{create_dir_all, remove_dir_all};

    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir =
            std::env::temp_dir().join(format!("raidloca-store-{name}-{}", std::process::id()));
        _ = remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_save_and_load() {
        let dir = scratch("save");
        let store = TableStore::new(&dir);
        let columns = vec!["#".to_owned(), "Name_en".to_owned(), "Name_ko".to_owned()];
        let mut table = Table::new(columns);
        table.push_row(vec!["7".to_owned(), "Fire, Again".to_owned(), "파이어\n2".to_owned()]);
        table.push_row(vec!["8".to_owned(), "Blizzard".to_owned(), String::new()]);
        let path = store.save("Action", &table).unwrap();
        assert_eq!(path, dir.join("Action.csv"));
        assert_eq!(store.load("Action").unwrap(), table);
        _ = remove_dir_all(&dir);
    }

    #[test]
    fn test_list_is_recursive() {
        let dir = scratch("list");
        let store = TableStore::new(&dir);
        let table = Table::new(vec!["#".to_owned()]);
        store.save("PlaceName", &table).unwrap();
        let nested = TableStore::new(dir.join("older"));
        nested.save("Action", &table).unwrap();
        create_dir_all(dir.join("notes.csv.d")).unwrap();
        let listed = store.list().unwrap();
        assert_eq!(listed, [dir.join("PlaceName.csv"), dir.join("older").join("Action.csv")]);
        _ = remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_table() {
        let store = TableStore::new(scratch("missing"));
        assert!(matches!(store.load("Action"), Err(StoreError::Read { .. })));
    }
}
