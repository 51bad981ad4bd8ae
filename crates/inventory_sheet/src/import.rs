use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use common::domain::{DeviceFields, DeviceState};
use std::io::Cursor;
use tracing::{debug, instrument};

use crate::SheetError;

/// Options controlling how an uploaded worksheet is read
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    /// Treat the first row as a header instead of data
    pub skip_header_row: bool,
}

/// One worksheet row mapped onto device fields, not yet validated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedRow {
    /// 1-based row number as shown by spreadsheet applications
    pub row_number: u32,
    pub fields: DeviceFields,
}

/// Read the first worksheet of a workbook into device rows
#[instrument(skip(bytes), fields(bytes = bytes.len()))]
pub fn import_devices(
    bytes: &[u8],
    options: ImportOptions,
) -> Result<Vec<ImportedRow>, SheetError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;
    let range = workbook.worksheet_range_at(0).transpose()?;
    rows_from_range(range.as_ref(), options)
}

/// Map an already-loaded worksheet; `None` means the workbook had none
pub fn rows_from_range(
    range: Option<&Range<Data>>,
    options: ImportOptions,
) -> Result<Vec<ImportedRow>, SheetError> {
    let range = range.ok_or(SheetError::NoWorksheets)?;

    let (Some((first_row, _)), Some((last_row, _))) = (range.start(), range.end()) else {
        debug!("worksheet is empty");
        return Ok(Vec::new());
    };

    let first_data_row = if options.skip_header_row {
        first_row + 1
    } else {
        first_row
    };

    let rows: Vec<ImportedRow> = (first_data_row..=last_row)
        .map(|row| ImportedRow {
            row_number: row + 1,
            fields: fields_from_row(range, row),
        })
        .collect();

    debug!(rows = rows.len(), "parsed worksheet rows");
    Ok(rows)
}

fn fields_from_row(range: &Range<Data>, row: u32) -> DeviceFields {
    let text = |col: u32| range.get_value((row, col)).and_then(cell_text);

    DeviceFields {
        serial_num: text(1),
        make: text(2),
        model: text(3),
        os: text(4),
        os_version: text(5),
        environment: text(6),
        project: text(7),
        service_provider: text(8),
        phone_num: range.get_value((row, 9)).and_then(cell_integer),
        mac_addr: text(10),
        ip_addr: text(11),
        possessor: text(12),
        owner: text(13),
        property_of: text(14),
        state: Some(DeviceState::Available),
        ..Default::default()
    }
}

/// Cell rendered as text; whole floats lose their ".0"
fn cell_text(cell: &Data) -> Option<String> {
    let text = match cell {
        Data::Empty => return None,
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// Integer coercion that keeps the leading numeric prefix of text cells.
///
/// Blank cells yield `None`; text without a leading number yields `Some(0)`.
fn cell_integer(cell: &Data) -> Option<i64> {
    match cell {
        Data::Empty => None,
        Data::Int(i) => Some(*i),
        Data::Float(f) => Some(f.trunc() as i64),
        Data::Bool(b) => Some(i64::from(*b)),
        Data::String(s) => leading_integer(s),
        other => leading_integer(&other.to_string()),
    }
}

fn leading_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (sign, digits) = match text.as_bytes()[0] {
        b'-' => (-1, &text[1..]),
        b'+' => (1, &text[1..]),
        _ => (1, text),
    };

    // `_` only separates digits: "1_000" is 1000, "_5" and "1__0" stop early
    let bytes = digits.as_bytes();
    let mut value = 0i64;
    for (i, &b) in bytes.iter().enumerate() {
        match b {
            b'0'..=b'9' => {
                value = value
                    .saturating_mul(10)
                    .saturating_add(i64::from(b - b'0'));
            }
            b'_' if i > 0
                && bytes[i - 1].is_ascii_digit()
                && bytes.get(i + 1).is_some_and(u8::is_ascii_digit) => {}
            _ => break,
        }
    }

    Some(sign * value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{export_devices, HEADERS};
    use common::domain::Device;
    use common::testing::sample_device;

    fn range_with_rows(rows: &[[&str; 15]]) -> Range<Data> {
        let mut range = Range::new((0, 0), (rows.len() as u32 - 1, 14));
        for (r, row) in rows.iter().enumerate() {
            for (c, value) in row.iter().enumerate() {
                if !value.is_empty() {
                    range.set_value((r as u32, c as u32), Data::String(value.to_string()));
                }
            }
        }
        range
    }

    const HEADER_ROW: [&str; 15] = [
        "", "Serial", "Make", "Model", "OS", "OS Version", "Env", "Project", "Provider", "Phone",
        "MAC", "IP", "Possessor", "Owner", "Property Of",
    ];

    const DATA_ROW: [&str; 15] = [
        "ignored", "SN9", "Acme", "X9", "iOS", "17", "qa", "P2", "Carrier", "555-0100",
        "AA:CC", "10.0.0.9", "bob", "alice", "Lab",
    ];

    #[test]
    fn test_missing_worksheet_is_reported() {
        let result = rows_from_range(None, ImportOptions::default());
        assert!(matches!(result, Err(SheetError::NoWorksheets)));
    }

    #[test]
    fn test_column_mapping() {
        let range = range_with_rows(&[DATA_ROW]);
        let rows = rows_from_range(Some(&range), ImportOptions::default()).unwrap();

        assert_eq!(rows.len(), 1);
        let fields = &rows[0].fields;
        assert_eq!(fields.serial_num.as_deref(), Some("SN9"));
        assert_eq!(fields.make.as_deref(), Some("Acme"));
        assert_eq!(fields.model.as_deref(), Some("X9"));
        assert_eq!(fields.os.as_deref(), Some("iOS"));
        assert_eq!(fields.os_version.as_deref(), Some("17"));
        assert_eq!(fields.environment.as_deref(), Some("qa"));
        assert_eq!(fields.project.as_deref(), Some("P2"));
        assert_eq!(fields.service_provider.as_deref(), Some("Carrier"));
        assert_eq!(fields.phone_num, Some(555));
        assert_eq!(fields.mac_addr.as_deref(), Some("AA:CC"));
        assert_eq!(fields.ip_addr.as_deref(), Some("10.0.0.9"));
        assert_eq!(fields.possessor.as_deref(), Some("bob"));
        assert_eq!(fields.owner.as_deref(), Some("alice"));
        assert_eq!(fields.property_of.as_deref(), Some("Lab"));
        assert_eq!(fields.state, Some(DeviceState::Available));
        assert!(fields.device_type.is_none());
        assert!(fields.label.is_none());
    }

    #[test]
    fn test_first_row_is_data_by_default() {
        let range = range_with_rows(&[HEADER_ROW, DATA_ROW]);
        let rows = rows_from_range(Some(&range), ImportOptions::default()).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row_number, 1);
        assert_eq!(rows[0].fields.serial_num.as_deref(), Some("Serial"));
        assert_eq!(rows[0].fields.phone_num, Some(0));
    }

    #[test]
    fn test_skip_header_row() {
        let range = range_with_rows(&[HEADER_ROW, DATA_ROW]);
        let options = ImportOptions {
            skip_header_row: true,
        };
        let rows = rows_from_range(Some(&range), options).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].row_number, 2);
        assert_eq!(rows[0].fields.serial_num.as_deref(), Some("SN9"));
    }

    #[test]
    fn test_empty_worksheet_yields_no_rows() {
        let range: Range<Data> = Range::empty();
        let rows = rows_from_range(Some(&range), ImportOptions::default()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_phone_coercion() {
        assert_eq!(cell_integer(&Data::Empty), None);
        assert_eq!(cell_integer(&Data::String("   ".to_string())), None);
        assert_eq!(cell_integer(&Data::Float(5551234.0)), Some(5551234));
        assert_eq!(cell_integer(&Data::Float(12.9)), Some(12));
        assert_eq!(cell_integer(&Data::Int(42)), Some(42));
        assert_eq!(cell_integer(&Data::String("5551234".to_string())), Some(5551234));
        assert_eq!(cell_integer(&Data::String("555-1234".to_string())), Some(555));
        assert_eq!(cell_integer(&Data::String("-12abc".to_string())), Some(-12));
        assert_eq!(cell_integer(&Data::String("1_000".to_string())), Some(1000));
        assert_eq!(cell_integer(&Data::String("n/a".to_string())), Some(0));
    }

    #[test]
    fn test_underscore_only_between_digits() {
        assert_eq!(leading_integer("_5"), Some(0));
        assert_eq!(leading_integer("-_5"), Some(0));
        assert_eq!(leading_integer("1__0"), Some(1));
        assert_eq!(leading_integer("12_"), Some(12));
        assert_eq!(leading_integer("1_2_3"), Some(123));
    }

    #[test]
    fn test_numeric_text_cells_drop_trailing_zero() {
        assert_eq!(cell_text(&Data::Float(12.0)), Some("12".to_string()));
        assert_eq!(cell_text(&Data::Float(12.5)), Some("12.5".to_string()));
        assert_eq!(cell_text(&Data::String("  ".to_string())), None);
    }

    #[test]
    fn test_export_then_import_keeps_overlapping_columns() {
        let mut second = sample_device("dev-2", None);
        second.attributes.os = "iOS".to_string();
        second.attributes.os_version = "17.1".to_string();
        second.attributes.environment = "staging".to_string();
        second.attributes.project = "P9".to_string();
        let devices: Vec<Device> = vec![sample_device("dev-1", None), second];

        let bytes = export_devices(&devices).unwrap();
        let options = ImportOptions {
            skip_header_row: true,
        };
        let rows = import_devices(&bytes, options).unwrap();

        assert_eq!(rows.len(), devices.len());
        for (row, device) in rows.iter().zip(&devices) {
            let attrs = &device.attributes;
            assert_eq!(row.fields.os.as_deref(), Some(attrs.os.as_str()));
            assert_eq!(row.fields.os_version.as_deref(), Some(attrs.os_version.as_str()));
            assert_eq!(row.fields.environment.as_deref(), Some(attrs.environment.as_str()));
            assert_eq!(row.fields.project.as_deref(), Some(attrs.project.as_str()));
        }

        // Export and import column orders differ outside columns 4..=7
        assert_eq!(HEADERS[1], "Product");
        assert_eq!(
            rows[0].fields.serial_num.as_deref(),
            Some(devices[0].attributes.model.as_str())
        );
    }

    #[test]
    fn test_garbage_bytes_are_a_read_error() {
        let result = import_devices(b"not a spreadsheet", ImportOptions::default());
        assert!(matches!(result, Err(SheetError::Read(_))));
    }
}
