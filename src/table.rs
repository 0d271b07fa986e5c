//! A simple column-named table of text cells, as pulled from the game datasets.
//!
//! Cells are kept as strings. An empty cell stands for "no value"; the datasets don't
//! distinguish between the two.

use ahash::AHashMap;

/// Name of the ordinal id column in the game datasets.
pub const ID_COLUMN: &str = "#";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table { columns, rows: Vec::new() }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Iterate over the cells of one column, in row order.
    pub fn column(&self, name: &str) -> Option<impl DoubleEndedIterator<Item = &str>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| row.get(idx).map_or("", String::as_str)))
    }

    /// Append a row. Short rows are padded with empty cells and long rows are cut to fit.
    pub fn push_row(&mut self, mut row: Vec<String>) {
        row.resize(self.columns.len(), String::new());
        self.rows.push(row);
    }

    /// Replace every cell whose whole text is a key of `mapping` by the mapped value.
    /// Returns the number of cells replaced.
    pub fn replace_cells(&mut self, mapping: &AHashMap<String, String>) -> usize {
        let mut count = 0;
        for cell in self.rows.iter_mut().flatten() {
            if let Some(value) = mapping.get(cell.as_str()) {
                cell.clone_from(value);
                count += 1;
            }
        }
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        let mut table = Table::new(vec!["#".to_owned(), "Name_en".to_owned()]);
        table.push_row(vec!["0".to_owned(), "Fire".to_owned()]);
        table.push_row(vec!["1".to_owned()]);
        table.push_row(vec!["2".to_owned(), "_rsv_1_-1_1_0_1".to_owned(), "extra".to_owned()]);
        table
    }

    #[test]
    fn test_rows_are_padded() {
        let table = sample();
        assert_eq!(table.len(), 3);
        assert!(table.rows().iter().all(|row| row.len() == 2));
        let names: Vec<_> = table.column("Name_en").unwrap().collect();
        assert_eq!(names, ["Fire", "", "_rsv_1_-1_1_0_1"]);
        assert!(table.column("Name_ko").is_none());
    }

    #[test]
    fn test_replace_whole_cells() {
        let mut table = sample();
        let mapping = AHashMap::from([
            ("_rsv_1_-1_1_0_1".to_owned(), "Ravenous Spark".to_owned()),
            ("Fir".to_owned(), "nope".to_owned()),
        ]);
        assert_eq!(table.replace_cells(&mapping), 1);
        let names: Vec<_> = table.column("Name_en").unwrap().collect();
        assert_eq!(names, ["Fire", "", "Ravenous Spark"]);
    }
}
