//! Spreadsheets (xls, xlsx, xlsb, ods) to a JSON dump of each sheet's rows.

use std::io::Cursor;

use calamine::{Data, Reader, open_workbook_auto_from_rs};
use serde::{Serialize, Serializer, ser::SerializeMap};

use crate::error::{Error, Result};

const FORMAT: &str = "spreadsheet";

/// A cell value as it appears in the JSON dump.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Null,
            Data::Bool(b) => Cell::Bool(*b),
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) => float_cell(*f),
            Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            // Dates stay as spreadsheet serial numbers.
            Data::DateTime(dt) => float_cell(dt.as_f64()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

fn float_cell(value: f64) -> Cell {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        Cell::Int(value as i64)
    } else {
        Cell::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

/// Sheets in workbook order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// JSON object from sheet name to rows, omitting sheets without rows.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

impl Serialize for Workbook {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let non_empty = self.sheets.iter().filter(|s| !s.rows.is_empty());
        let mut map = serializer.serialize_map(None)?;
        for sheet in non_empty {
            map.serialize_entry(&sheet.name, &sheet.rows)?;
        }
        map.end()
    }
}

pub fn read_workbook(content: &[u8]) -> Result<Workbook> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(content))
        .map_err(|e| Error::conversion(FORMAT, e))?;

    let mut sheets = Vec::new();
    for name in workbook.sheet_names() {
        let range = workbook
            .worksheet_range(&name)
            .map_err(|e| Error::conversion(FORMAT, format!("sheet '{name}': {e}")))?;
        // Blank rows stay as `[]` so positions match the sheet.
        let rows = range
            .rows()
            .map(|row| {
                let mut cells: Vec<Cell> = row.iter().map(Cell::from).collect();
                while cells.last() == Some(&Cell::Null) {
                    cells.pop();
                }
                cells
            })
            .collect();
        sheets.push(Sheet { name, rows });
    }

    Ok(Workbook { sheets })
}
