//! Single-sheet xlsx workbooks with a styled header row.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook};
use tracing::debug;

use crate::error::Result;

/// Maximum column width in characters.
const MAX_COLUMN_WIDTH: usize = 50;
const HEADER_FILL: u32 = 0x366092;
const AMOUNT_FORMAT: &str = "0.00";

/// A value written into one spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Integer(i64),
    /// Written as a number with two decimals.
    Amount(Decimal),
    Empty,
}

impl Cell {
    pub fn text(value: impl Into<String>) -> Self {
        Cell::Text(value.into())
    }

    pub fn optional_text(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.is_empty() => Cell::Text(v.to_string()),
            _ => Cell::Empty,
        }
    }

    /// Width of the value as shown in the sheet.
    fn display_len(&self) -> usize {
        match self {
            Cell::Text(value) => value.chars().count(),
            Cell::Integer(value) => value.to_string().len(),
            Cell::Amount(value) => format!("{:.2}", value).len(),
            Cell::Empty => 0,
        }
    }
}

/// Headers plus rows for one worksheet.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, headers: &[&str]) -> Self {
        Self {
            name: name.into(),
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Longest value per column, header included, capped at 50 after padding.
    pub fn column_widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                let longest = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(col))
                    .map(Cell::display_len)
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0);
                (longest + 2).min(MAX_COLUMN_WIDTH)
            })
            .collect()
    }

    /// Serializes the sheet into xlsx bytes.
    pub fn to_xlsx(&self) -> Result<Vec<u8>> {
        debug!("Rendering sheet '{}' with {} rows", self.name, self.rows.len());

        let mut workbook = Workbook::new();
        let header_format = Format::new()
            .set_bold()
            .set_font_color(Color::White)
            .set_background_color(Color::RGB(HEADER_FILL))
            .set_align(FormatAlign::Center)
            .set_align(FormatAlign::VerticalCenter);
        let amount_format = Format::new().set_num_format(AMOUNT_FORMAT);

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(&self.name)?;

        for (col, header) in self.headers.iter().enumerate() {
            worksheet.write_string_with_format(0, col as u16, header, &header_format)?;
        }

        for (index, row) in self.rows.iter().enumerate() {
            let row_number = (index + 1) as u32;
            for (col, cell) in row.iter().enumerate() {
                let col = col as u16;
                match cell {
                    Cell::Text(value) => {
                        worksheet.write_string(row_number, col, value)?;
                    }
                    Cell::Integer(value) => {
                        worksheet.write_number(row_number, col, *value as f64)?;
                    }
                    Cell::Amount(value) => {
                        let number = value.round_dp(2).to_f64().unwrap_or_default();
                        worksheet.write_number_with_format(row_number, col, number, &amount_format)?;
                    }
                    Cell::Empty => {}
                }
            }
        }

        for (col, width) in self.column_widths().into_iter().enumerate() {
            worksheet.set_column_width(col as u16, width as f64)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        Ok(workbook.save_to_buffer()?)
    }
}
