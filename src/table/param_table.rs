use std::collections::HashSet;

use log::info;

use crate::error::JobError;
use crate::template::substitute::Bindings;

/// Column holding the name of each job's directory
pub const JOB_NAME: &str = "JOB_NAME";

/// Rows x named columns, every cell kept as text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl ParamTable {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, JobError> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(JobError::config(format!("Duplicate column '{column}' in param_table")));
            }
        }
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(JobError::config(format!(
                    "Row {i} of param_table has {} values, expected {}",
                    row.len(),
                    columns.len()
                )));
            }
        }
        Ok(ParamTable { columns, rows })
    }

    /// Build a table from (column name, values) pairs, keeping column order
    pub fn from_columns(columns: Vec<(String, Vec<String>)>) -> Result<Self, JobError> {
        let n_rows = columns.first().map_or(0, |(_, values)| values.len());
        if let Some((name, values)) = columns.iter().find(|(_, values)| values.len() != n_rows) {
            return Err(JobError::config(format!(
                "Column '{name}' has {} values, expected {n_rows}",
                values.len()
            )));
        }

        let names = columns.iter().map(|(name, _)| name.clone()).collect();
        let mut rows = vec![Vec::with_capacity(columns.len()); n_rows];
        for (_, values) in columns {
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        ParamTable::new(names, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Make sure a `JOB_NAME` column exists
    ///
    /// Without one, the first column with no duplicate values is copied into `JOB_NAME`. If
    /// every column has duplicates the row index is used instead. Returns the column the names
    /// came from, `None` for the row index.
    pub fn ensure_job_name(&mut self) -> Option<String> {
        if self.columns.iter().any(|c| c == JOB_NAME) {
            return Some(JOB_NAME.to_string());
        }

        let source = (0..self.columns.len()).find(|&i| self.is_unique(i));
        match source {
            Some(i) => {
                info!("Using column '{}' as {JOB_NAME}", self.columns[i]);
                for row in self.rows.iter_mut() {
                    let name = row[i].clone();
                    row.push(name);
                }
            }
            None => {
                info!("No column with unique values, using row index as {JOB_NAME}");
                for (index, row) in self.rows.iter_mut().enumerate() {
                    row.push(index.to_string());
                }
            }
        }
        self.columns.push(JOB_NAME.to_string());
        source.map(|i| self.columns[i].clone())
    }

    /// One binding dictionary per row, in row order
    pub fn bindings(&self) -> Vec<Bindings> {
        self.rows
            .iter()
            .map(|row| self.columns.iter().cloned().zip(row.iter().cloned()).collect())
            .collect()
    }

    fn is_unique(&self, column: usize) -> bool {
        let mut seen = HashSet::new();
        self.rows.iter().all(|row| seen.insert(row[column].as_str()))
    }
}
