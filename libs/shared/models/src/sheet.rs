use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum SheetTableError {
    #[error("Range has no header row")]
    MissingHeader,

    #[error("Column not found: {0}")]
    MissingColumn(String),
}

/// A block of spreadsheet values: the first row is the header, the rest
/// are data rows.
///
/// The values API trims trailing empty cells, so a row may be shorter than
/// the header. Those cells are *missing*, which is not the same thing as a
/// cell holding an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SheetTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl SheetTable {
    pub fn from_values(mut values: Vec<Vec<String>>) -> Result<Self, SheetTableError> {
        if values.is_empty() {
            return Err(SheetTableError::MissingHeader);
        }

        let headers = values.remove(0);
        Ok(Self { headers, rows: values })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == column)
    }

    /// Fails when any of `columns` is absent from the header.
    pub fn require_columns(&self, columns: &[&str]) -> Result<(), SheetTableError> {
        match columns.iter().find(|c| self.column_index(c).is_none()) {
            Some(missing) => Err(SheetTableError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index).map(String::as_str)
    }

    pub fn rows(&self) -> impl Iterator<Item = SheetRow<'_>> {
        (0..self.rows.len()).map(move |index| SheetRow { table: self, index })
    }

    /// Rows whose cell in `column` exists, even when it holds "".
    pub fn count_present(&self, column: &str) -> usize {
        self.rows().filter(|row| row.get(column).is_some()).count()
    }

    /// 1-based spreadsheet row of a data row, accounting for the header.
    pub fn sheet_row_number(index: usize) -> u32 {
        index as u32 + 2
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    table: &'a SheetTable,
    index: usize,
}

impl<'a> SheetRow<'a> {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn sheet_row_number(&self) -> u32 {
        SheetTable::sheet_row_number(self.index)
    }

    pub fn get(&self, column: &str) -> Option<&'a str> {
        self.table.cell(self.index, column)
    }

    /// Cell text, empty when the cell is missing.
    pub fn text(&self, column: &str) -> String {
        self.get(column).unwrap_or_default().to_string()
    }

    /// Exact comparison; a missing cell never matches.
    pub fn is(&self, column: &str, expected: &str) -> bool {
        self.get(column) == Some(expected)
    }
}
