//! Fixtures shared by unit tests here and in downstream crates.

use crate::domain::{Device, DeviceFields, DeviceState};

/// A complete, valid set of device fields
pub fn sample_device_fields() -> DeviceFields {
    DeviceFields {
        make: Some("Acme".to_string()),
        model: Some("X1".to_string()),
        serial_num: Some("SN1".to_string()),
        os: Some("Android".to_string()),
        os_version: Some("12".to_string()),
        environment: Some("prod".to_string()),
        project: Some("P1".to_string()),
        device_type: Some("phone".to_string()),
        service_provider: Some("Carrier".to_string()),
        phone_num: Some(5551234),
        mac_addr: Some("AA:BB".to_string()),
        ip_addr: Some("1.2.3.4".to_string()),
        ..Default::default()
    }
}

/// A persisted-looking device built from [`sample_device_fields`]
pub fn sample_device(device_id: &str, state: Option<DeviceState>) -> Device {
    let (attributes, _) = sample_device_fields()
        .into_attributes()
        .unwrap_or_default();
    Device {
        id: device_id.to_string(),
        attributes,
        state,
        created_by: Some("admin".to_string()),
        updated_by: None,
        created_at: None,
        updated_at: None,
    }
}
