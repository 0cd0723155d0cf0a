use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Rows shown at each end of a [`Table`] preview
const PREVIEW_ROWS: usize = 5;

static NULL: Value = Value::Null;

/// Tabular result set with named, heterogeneous columns.
///
/// Columns keep first-seen order and are the union of keys across all rows.
/// A row missing a column reads as `null`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Map<String, Value>>,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from JSON objects
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = Map<String, Value>>,
    {
        let mut table = Self::new();
        for record in records {
            table.push(record);
        }
        table
    }

    pub fn push(&mut self, row: Map<String, Value>) {
        for key in row.keys() {
            if !self.columns.iter().any(|c| c == key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
    }

    /// Append all rows of `other` after the rows of `self`
    pub fn append(&mut self, other: Table) {
        for row in other.rows {
            self.push(row);
        }
    }

    /// Stack tables in order
    pub fn concat<I>(tables: I) -> Self
    where
        I: IntoIterator<Item = Table>,
    {
        let mut out = Self::new();
        for table in tables {
            out.append(table);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Map<String, Value>] {
        &self.rows
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Cell at `row`, `null` when the row lacks the column
    pub fn cell(&self, row: usize, column: &str) -> &Value {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .unwrap_or(&NULL)
    }

    pub fn column(&self, name: &str) -> Vec<&Value> {
        self.rows
            .iter()
            .map(|r| r.get(name).unwrap_or(&NULL))
            .collect()
    }

    /// Distinct values of a column in first-seen order
    pub fn unique(&self, name: &str) -> Vec<&Value> {
        let mut seen: Vec<&Value> = Vec::new();
        for value in self.column(name) {
            if !seen.contains(&value) {
                seen.push(value);
            }
        }
        seen
    }
}

/// Plain text for a cell: strings unquoted, `null` empty
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.columns.is_empty() {
            return write!(f, "Empty Table\n[{} rows x 0 columns]", self.len());
        }

        let shown: Vec<usize> = if self.len() > PREVIEW_ROWS * 2 {
            (0..PREVIEW_ROWS)
                .chain(self.len() - PREVIEW_ROWS..self.len())
                .collect()
        } else {
            (0..self.len()).collect()
        };

        let index_width = self.len().saturating_sub(1).to_string().len();
        let widths: Vec<usize> = self
            .columns
            .iter()
            .map(|c| {
                shown
                    .iter()
                    .map(|&i| cell_text(self.cell(i, c)).chars().count())
                    .chain(std::iter::once(c.chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        write!(f, "{:width$}", "", width = index_width)?;
        for (column, width) in self.columns.iter().zip(&widths) {
            write!(f, "  {:>width$}", column, width = *width)?;
        }
        writeln!(f)?;

        for (pos, &i) in shown.iter().enumerate() {
            if pos == PREVIEW_ROWS && shown.len() < self.len() {
                writeln!(f, "{:width$}  ...", "..", width = index_width)?;
            }
            write!(f, "{:<width$}", i, width = index_width)?;
            for (column, width) in self.columns.iter().zip(&widths) {
                write!(f, "  {:>width$}", cell_text(self.cell(i, column)), width = *width)?;
            }
            writeln!(f)?;
        }

        write!(f, "\n[{} rows x {} columns]", self.len(), self.columns.len())
    }
}
