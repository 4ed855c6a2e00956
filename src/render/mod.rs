//! Report rendering
//!
//! The table is laid out by `tabled` from the `ReportRow` derive: borderless,
//! every column padded to its widest cell plus two spaces, the last column
//! unpadded. JSON and YAML serialize the rows as a list of objects.

use crate::error::{Error, Result};
use crate::inventory::report::ReportRow;
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use tabled::settings::object::{Columns, Rows};
use tabled::settings::{Padding, Remove, Style};
use tabled::{Table, Tabled};

/// Output format of the report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "table" | "wide" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(Error::Configuration(format!(
                "unknown output format '{}' (expected table, json or yaml)",
                other
            ))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Write `rows` to `out` in the given format
pub fn render<W: Write>(rows: &[ReportRow], format: OutputFormat, headers: bool, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Table => write_table(rows, headers, out),
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, rows)?;
            writeln!(out)?;
            Ok(())
        }
        OutputFormat::Yaml => {
            serde_yaml::to_writer(&mut *out, rows)?;
            Ok(())
        }
    }
}

fn write_table<W: Write>(rows: &[ReportRow], headers: bool, out: &mut W) -> Result<()> {
    if rows.is_empty() && !headers {
        return Ok(());
    }

    let mut table = Table::new(rows);
    // blank style puts one space between columns; one more comes from padding
    table
        .with(Style::blank())
        .with(Padding::new(0, 1, 0, 0))
        .modify(Columns::single(ReportRow::LENGTH - 1), Padding::zero());
    if !headers {
        table.with(Remove::row(Rows::first()));
    }

    for line in table.to_string().lines() {
        writeln!(out, "{}", line.trim_end())?;
    }

    Ok(())
}
