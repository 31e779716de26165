//! Printable A4 landscape tables.

use std::path::PathBuf;

use genpdf::elements::{FrameCellDecorator, Paragraph, TableLayout};
use genpdf::style::Style;
use genpdf::{Element, SimplePageDecorator, Size};
use tracing::{debug, error};

use crate::error::{ReportError, Result};

/// Location of the TrueType family used for Cyrillic output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfFonts {
    pub dir: PathBuf,
    /// File prefix, e.g. `LiberationSans` for `LiberationSans-Regular.ttf`.
    pub family: String,
}

impl Default for PdfFonts {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/usr/share/fonts/truetype/liberation"),
            family: "LiberationSans".to_string(),
        }
    }
}

/// A titled table ready to be printed.
#[derive(Debug, Clone, Default)]
pub struct PdfTable {
    pub title: String,
    pub subtitle: Vec<String>,
    pub headers: Vec<String>,
    /// Relative column widths, one per header.
    pub weights: Vec<usize>,
    pub rows: Vec<Vec<String>>,
}

impl PdfTable {
    pub fn render(&self, fonts: &PdfFonts) -> Result<Vec<u8>> {
        if !fonts.dir.is_dir() {
            error!("PDF font directory {} does not exist", fonts.dir.display());
            return Err(ReportError::Font(format!(
                "font directory {} not found",
                fonts.dir.display()
            )));
        }
        let family = genpdf::fonts::from_files(&fonts.dir, &fonts.family, None)
            .map_err(|e| ReportError::Font(format!("{}: {}", fonts.family, e)))?;

        debug!("Rendering PDF '{}' with {} rows", self.title, self.rows.len());

        let mut doc = genpdf::Document::new(family);
        doc.set_title(self.title.clone());
        doc.set_paper_size(Size::new(297, 210));
        doc.set_font_size(8);
        let mut decorator = SimplePageDecorator::new();
        decorator.set_margins(10);
        doc.set_page_decorator(decorator);

        doc.push(Paragraph::new(self.title.clone()).styled(Style::new().bold().with_font_size(14)));
        for line in &self.subtitle {
            doc.push(Paragraph::new(line.clone()));
        }
        doc.push(genpdf::elements::Break::new(1));

        let mut table = TableLayout::new(self.weights.clone());
        table.set_cell_decorator(FrameCellDecorator::new(true, true, false));

        let mut header = table.row();
        for title in &self.headers {
            header.push_element(Paragraph::new(title.clone()).styled(Style::new().bold()).padded(1));
        }
        header.push()?;

        for row in &self.rows {
            let mut table_row = table.row();
            for value in row {
                table_row.push_element(Paragraph::new(value.clone()).padded(1));
            }
            table_row.push()?;
        }
        doc.push(table);

        let mut buffer = Vec::new();
        doc.render(&mut buffer)?;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_font_directory_is_reported() {
        let fonts = PdfFonts {
            dir: PathBuf::from("/nonexistent/fonts"),
            family: "LiberationSans".to_string(),
        };
        let table = PdfTable {
            title: "Виписки".to_string(),
            headers: vec!["ID".to_string()],
            weights: vec![1],
            rows: vec![vec!["1".to_string()]],
            ..Default::default()
        };

        match table.render(&fonts) {
            Err(ReportError::Font(message)) => assert!(message.contains("/nonexistent/fonts")),
            other => panic!("expected font error, got {:?}", other.map(|b| b.len())),
        }
    }
}
