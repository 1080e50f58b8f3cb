// src/sql/csv.rs

use crate::sql::value::StringVal;

/// Row-at-a-time reader over a comma-separated file. Fields are owned by
/// the reader, so handed-out StringVals stay valid until close.
#[repr(C)]
#[derive(Debug, Default)]
pub struct CsvReader {
    rows: Vec<Vec<String>>,
    /// Index of the current row; starts one before the first
    pos: isize,
}

impl CsvReader {
    /// Load a file. Returns false (an empty reader) when it cannot be read.
    pub fn open(path: &str) -> Option<Self> {
        let content = std::fs::read_to_string(path).ok()?;
        Some(Self::from_content(&content))
    }

    pub fn from_content(content: &str) -> Self {
        let rows = content
            .lines()
            .filter(|line| !line.is_empty())
            .map(|line| line.split(',').map(|f| f.trim().to_string()).collect())
            .collect();
        Self { rows, pos: -1 }
    }

    /// Move to the next row; false at end of input
    pub fn advance(&mut self) -> bool {
        if (self.pos + 1) as usize >= self.rows.len() {
            return false;
        }
        self.pos += 1;
        true
    }

    pub fn field(&self, index: u32) -> StringVal {
        if self.pos < 0 {
            return StringVal::null();
        }
        self.rows[self.pos as usize]
            .get(index as usize)
            .map(|s| StringVal::from_str(s))
            .unwrap_or_else(StringVal::null)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_fields() {
        let mut reader = CsvReader::from_content("a,1\nb,2\nc,3\n");
        assert_eq!(reader.row_count(), 3);
        let mut names = Vec::new();
        while reader.advance() {
            names.push(reader.field(0).as_str().to_string());
        }
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn missing_field_is_null() {
        let mut reader = CsvReader::from_content("only");
        assert!(reader.advance());
        assert!(reader.field(3).is_null);
        assert!(!reader.advance());
    }
}
