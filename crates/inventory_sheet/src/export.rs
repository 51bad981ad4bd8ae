use common::domain::Device;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};
use tracing::{debug, instrument};

use crate::SheetError;

pub const EXPORT_SHEET_NAME: &str = "Devices List";
pub const EXPORT_FILE_NAME: &str = "Mobile Devices List.xls";
pub const EXPORT_CONTENT_TYPE: &str = "application/vnd.ms-excel";

/// Header row of an exported workbook, in column order
pub const HEADERS: [&str; 17] = [
    "Manufacturer",
    "Product",
    "Label",
    "Serial Number",
    "OS",
    "OS Version",
    "Environment",
    "Project",
    "Status",
    "Provider",
    "IMEI",
    "Phone",
    "MAC Address",
    "IP Address",
    "Owner",
    "Possessor",
    "Property Of",
];

const PHONE_COLUMN: u16 = 11;

/// Render devices into workbook bytes, one row per device after the header
#[instrument(skip(devices), fields(device_count = devices.len()))]
pub fn export_devices(devices: &[Device]) -> Result<Vec<u8>, SheetError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name(EXPORT_SHEET_NAME)?;

    let header_format = Format::new().set_bold().set_font_color(Color::Green);
    for (col, title) in (0u16..).zip(HEADERS) {
        worksheet.write_string_with_format(0, col, title, &header_format)?;
    }

    for (row, device) in (1u32..).zip(devices) {
        write_device_row(worksheet, row, device)?;
    }

    let bytes = workbook.save_to_buffer()?;
    debug!(bytes = bytes.len(), "exported devices workbook");
    Ok(bytes)
}

fn write_device_row(
    worksheet: &mut Worksheet,
    row: u32,
    device: &Device,
) -> Result<(), SheetError> {
    let attrs = &device.attributes;
    let state = device.state.map(|s| s.as_str());

    let text_cells: [(u16, Option<&str>); 16] = [
        (0, Some(attrs.make.as_str())),
        (1, Some(attrs.model.as_str())),
        (2, attrs.label.as_deref()),
        (3, Some(attrs.serial_num.as_str())),
        (4, Some(attrs.os.as_str())),
        (5, Some(attrs.os_version.as_str())),
        (6, Some(attrs.environment.as_str())),
        (7, Some(attrs.project.as_str())),
        (8, state),
        (9, Some(attrs.service_provider.as_str())),
        (10, attrs.imei.as_deref()),
        (12, Some(attrs.mac_addr.as_str())),
        (13, Some(attrs.ip_addr.as_str())),
        (14, attrs.owner.as_deref()),
        (15, attrs.possessor.as_deref()),
        (16, attrs.property_of.as_deref()),
    ];

    for (col, value) in text_cells {
        if let Some(value) = value {
            worksheet.write_string(row, col, value)?;
        }
    }

    worksheet.write_number(row, PHONE_COLUMN, attrs.phone_num as f64)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{open_workbook_auto_from_rs, Data, Reader};
    use common::domain::DeviceState;
    use common::testing::sample_device;
    use std::io::Cursor;

    #[test]
    fn test_export_writes_header_and_rows() {
        let devices = vec![
            sample_device("dev-1", Some(DeviceState::Available)),
            sample_device("dev-2", None),
        ];

        let bytes = export_devices(&devices).unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        assert_eq!(workbook.sheet_names(), vec![EXPORT_SHEET_NAME.to_string()]);

        let range = workbook.worksheet_range_at(0).unwrap().unwrap();
        assert_eq!(range.height(), 3);

        for (col, title) in HEADERS.iter().enumerate() {
            assert_eq!(
                range.get_value((0, col as u32)),
                Some(&Data::String(title.to_string()))
            );
        }

        assert_eq!(
            range.get_value((1, 0)),
            Some(&Data::String(devices[0].attributes.make.clone()))
        );
        assert_eq!(
            range.get_value((1, 8)),
            Some(&Data::String("available".to_string()))
        );
        assert_eq!(range.get_value((2, 8)), Some(&Data::Empty));
        assert_eq!(
            range.get_value((1, PHONE_COLUMN as u32)),
            Some(&Data::Float(devices[0].attributes.phone_num as f64))
        );
    }

    #[test]
    fn test_export_of_no_devices_has_only_header() {
        let bytes = export_devices(&[]).unwrap();
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range_at(0).unwrap().unwrap();

        assert_eq!(range.height(), 1);
        assert_eq!(range.width(), HEADERS.len());
    }
}
