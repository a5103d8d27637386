//! Delimited-text ingestion and table shape detection.
//!
//! Uploaded files arrive as raw text. [`parse_delimited`] turns them into a
//! typed [`Table`]; [`Table::classify`] then decides whether the table is a
//! symmetric correlation matrix or a raw observation table, which determines
//! whether the correlation engine needs to run at all.

use serde::{Deserialize, Serialize};

/// Tolerance for the symmetry check `|data[i][j] - data[j][i]|`.
const SYMMETRY_EPSILON: f64 = 1e-4;
/// Tolerance for the diagonal-of-ones check.
const DIAGONAL_EPSILON: f64 = 1e-3;
/// Fraction of header/row-label pairs allowed to disagree in a matrix.
const LABEL_MISMATCH_RATIO: f64 = 0.1;

/// A single parsed cell. Numeric text becomes [`Cell::Number`], everything
/// else is kept verbatim as [`Cell::Text`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Cell {
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(_) => None,
        }
    }
}

/// Shape classification of a parsed [`Table`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableShape {
    /// Square, symmetric, diagonal ≈ 1.0, labels agree: already a
    /// correlation matrix.
    Matrix,
    /// Rectangular observation table: rows are entities, columns samples.
    Table,
    /// Neither; the caller must surface a parse error.
    Unknown,
}

/// Parsed delimited text. `header` excludes the first column label, which
/// names the row-label column and is stored in `label_column`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub label_column: String,
    pub header: Vec<String>,
    pub row_labels: Vec<String>,
    pub data: Vec<Vec<Cell>>,
}

/// Split `text` into a [`Table`] on an auto-detected delimiter (tab when the
/// header line contains one, comma otherwise). The first row is the header,
/// each following row's first cell is the row label, numeric cells are
/// parsed to floats and empty lines are skipped. Returns `None` when the
/// input contains no non-empty lines.
pub fn parse_delimited(text: &str) -> Option<Table> {
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());
    let header_line = lines.next()?;
    let delimiter = if header_line.contains('\t') { '\t' } else { ',' };

    let mut header_cells = split_row(header_line, delimiter);
    if header_cells.is_empty() {
        return None;
    }
    let label_column = header_cells.remove(0);

    let mut row_labels = Vec::new();
    let mut data = Vec::new();
    for line in lines {
        let mut cells = split_row(line, delimiter);
        if cells.is_empty() {
            continue;
        }
        row_labels.push(cells.remove(0));
        data.push(cells.into_iter().map(parse_cell).collect());
    }

    tracing::debug!(
        columns = header_cells.len(),
        rows = data.len(),
        delimiter = %delimiter.escape_debug(),
        "parsed delimited table"
    );
    Some(Table {
        label_column,
        header: header_cells,
        row_labels,
        data,
    })
}

fn split_row(line: &str, delimiter: char) -> Vec<String> {
    line.split(delimiter).map(|c| c.trim().to_string()).collect()
}

fn parse_cell(raw: String) -> Cell {
    match raw.parse::<f64>() {
        Ok(v) => Cell::Number(v),
        Err(_) => Cell::Text(raw),
    }
}

impl Table {
    /// Number of data columns (header labels).
    pub fn width(&self) -> usize {
        self.header.len()
    }

    /// Number of data rows.
    pub fn height(&self) -> usize {
        self.data.len()
    }

    /// Decide whether this table is a symmetric correlation matrix, a raw
    /// observation table, or unusable.
    pub fn classify(&self) -> TableShape {
        if self.is_matrix() {
            TableShape::Matrix
        } else if self.is_observations() {
            TableShape::Table
        } else {
            TableShape::Unknown
        }
    }

    /// Rows as floats, with non-numeric cells mapped to NaN so the
    /// correlation engine can pairwise-exclude them.
    pub fn numeric_rows(&self) -> Vec<Vec<f64>> {
        self.data
            .iter()
            .map(|row| {
                row.iter()
                    .map(|c| c.as_number().unwrap_or(f64::NAN))
                    .collect()
            })
            .collect()
    }

    fn is_matrix(&self) -> bool {
        let n = self.header.len();
        if n == 0 || self.data.len() != n || self.row_labels.len() != n {
            return false;
        }
        if self.data.iter().any(|row| row.len() != n) {
            return false;
        }
        // All cells must be numeric for the symmetry and diagonal checks.
        let mut values = vec![vec![0.0f64; n]; n];
        for (i, row) in self.data.iter().enumerate() {
            for (j, cell) in row.iter().enumerate() {
                match cell.as_number() {
                    Some(v) => values[i][j] = v,
                    None => return false,
                }
            }
        }
        for (i, row) in values.iter().enumerate() {
            if (row[i] - 1.0).abs() > DIAGONAL_EPSILON {
                return false;
            }
            for (j, value) in row.iter().enumerate() {
                if (value - values[j][i]).abs() > SYMMETRY_EPSILON {
                    return false;
                }
            }
        }
        let mismatches = self
            .header
            .iter()
            .zip(self.row_labels.iter())
            .filter(|(h, r)| h != r)
            .count();
        if mismatches as f64 > LABEL_MISMATCH_RATIO * n as f64 {
            tracing::debug!(
                mismatches,
                n,
                "square symmetric table rejected as matrix: header/row label disagreement"
            );
            return false;
        }
        true
    }

    fn is_observations(&self) -> bool {
        let width = self.header.len();
        if width == 0 {
            return false;
        }
        if self.header.iter().any(|h| h.is_empty()) {
            return false;
        }
        if self.row_labels.is_empty() || self.row_labels.iter().any(|l| l.is_empty()) {
            return false;
        }
        self.data.iter().all(|row| row.len() == width)
    }
}
