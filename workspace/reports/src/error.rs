use thiserror::Error;

/// Error types for the reports crate
#[derive(Error, Debug)]
pub enum ReportError {
    /// Error from the database operations
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Error while building an xlsx workbook
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] rust_xlsxwriter::XlsxError),

    /// Error while laying out or rendering a PDF
    #[error("PDF error: {0}")]
    Pdf(#[from] genpdf::error::Error),

    /// The configured TrueType family could not be loaded
    #[error("Font error: {0}")]
    Font(String),
}

/// Result type for report operations
pub type Result<T> = std::result::Result<T, ReportError>;
