use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::info;
use serde_json::{Map, Value};

use crate::error::JobError;
use crate::table::param_table::ParamTable;

/// Field separator of a delimited parameter file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Separator {
    /// Any run of spaces or tabs
    #[default]
    Whitespace,
    Char(u8),
}

impl FromStr for Separator {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" | "\\s+" | "whitespace" => Ok(Separator::Whitespace),
            "\\t" => Ok(Separator::Char(b'\t')),
            _ if s.len() == 1 && s.is_ascii() => Ok(Separator::Char(s.as_bytes()[0])),
            _ => Err(JobError::config(format!(
                "Unsupported table separator '{s}', use a single character or \\s+"
            ))),
        }
    }
}

/// Where the parameter table comes from
#[derive(Debug, Clone)]
pub enum ParamSource {
    Table(ParamTable),
    /// Delimited text file with a header row, or a `.json` column mapping
    File { path: PathBuf, sep: Separator },
    /// Column name -> values, in column order
    Columns(Map<String, Value>),
}

impl ParamSource {
    pub fn load(self) -> Result<ParamTable, JobError> {
        match self {
            ParamSource::Table(table) => Ok(table),
            ParamSource::File { path, sep } => read_table_file(&path, sep),
            ParamSource::Columns(columns) => table_from_json(columns),
        }
    }
}

fn read_table_file(path: &Path, sep: Separator) -> Result<ParamTable, JobError> {
    if !path.is_file() {
        return Err(JobError::config(format!("{} is not a valid file name!", path.display())));
    }
    info!("Reading param_table from {}", path.display());

    let is_json = path.extension().map_or(false, |ext| ext == "json");
    let table = match (is_json, sep) {
        (true, _) => read_json(path)?,
        (false, Separator::Whitespace) => parse_whitespace(&fs::read_to_string(path)?)?,
        (false, Separator::Char(delimiter)) => read_delimited(path, delimiter)?,
    };
    info!("Read {} rows with columns {:?}", table.len(), table.columns());
    Ok(table)
}

fn read_json(path: &Path) -> Result<ParamTable, JobError> {
    let json_string = fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&json_string) {
        Ok(Value::Object(columns)) => table_from_json(columns),
        Ok(_) => Err(JobError::config(format!(
            "{} must hold an object mapping column names to lists of values",
            path.display()
        ))),
        Err(err) => Err(JobError::config(format!("Can't parse {}: {err}", path.display()))),
    }
}

/// Header line followed by one row per line, fields split on runs of whitespace
fn parse_whitespace(text: &str) -> Result<ParamTable, JobError> {
    let mut lines = text.lines().map(str::trim).filter(|line| !line.is_empty());
    let columns: Vec<String> = match lines.next() {
        Some(header) => header.split_whitespace().map(String::from).collect(),
        None => return Err(JobError::config("param_table file is empty")),
    };
    let rows = lines
        .map(|line| line.split_whitespace().map(String::from).collect())
        .collect();
    ParamTable::new(columns, rows)
}

fn read_delimited(path: &Path, delimiter: u8) -> Result<ParamTable, JobError> {
    let csv_error = |err: csv::Error| JobError::config(format!("Can't read {}: {err}", path.display()));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_path(path)
        .map_err(csv_error)?;

    let columns = reader.headers().map_err(csv_error)?.iter().map(String::from).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(String::from).collect());
    }
    ParamTable::new(columns, rows)
}

fn table_from_json(columns: Map<String, Value>) -> Result<ParamTable, JobError> {
    let mut table = Vec::with_capacity(columns.len());
    for (name, values) in columns {
        let values = match values {
            Value::Array(values) => values
                .into_iter()
                .map(|value| scalar_to_string(&name, value))
                .collect::<Result<Vec<String>, JobError>>()?,
            _ => return Err(JobError::config(format!("Column '{name}' must be a list of values"))),
        };
        table.push((name, values));
    }
    ParamTable::from_columns(table)
}

fn scalar_to_string(column: &str, value: Value) -> Result<String, JobError> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        _ => Err(JobError::config(format!("Column '{column}' holds a non-scalar value"))),
    }
}
