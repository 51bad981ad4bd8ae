use common::domain::DomainError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetError {
    #[error("No worksheets in the Excel sheet provided")]
    NoWorksheets,

    #[error("Unable to read spreadsheet: {0}")]
    Read(String),

    #[error("Unable to write spreadsheet: {0}")]
    Write(#[from] rust_xlsxwriter::XlsxError),
}

impl From<calamine::Error> for SheetError {
    fn from(error: calamine::Error) -> Self {
        SheetError::Read(error.to_string())
    }
}

impl From<SheetError> for DomainError {
    fn from(error: SheetError) -> Self {
        match error {
            SheetError::NoWorksheets => DomainError::NoWorksheets,
            SheetError::Read(msg) => DomainError::SpreadsheetError(msg),
            SheetError::Write(e) => DomainError::SpreadsheetError(e.to_string()),
        }
    }
}
