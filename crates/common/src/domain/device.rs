use crate::domain::result::DomainResult;
use crate::domain::{CreateRequestRepoInput, Request};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Availability state stored on a device row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceState {
    Available,
    Unavailable,
    Requested,
}

impl DeviceState {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceState::Available => "available",
            DeviceState::Unavailable => "unavailable",
            DeviceState::Requested => "requested",
        }
    }
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(DeviceState::Available),
            "unavailable" => Ok(DeviceState::Unavailable),
            "requested" => Ok(DeviceState::Requested),
            other => Err(format!("unknown device state: {}", other)),
        }
    }
}

/// Named lifecycle transitions and the messages each one produces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Ask,
    Receive,
    MakeUnavailable,
    MakeAvailable,
}

impl LifecycleAction {
    pub fn success_notice(&self) -> &'static str {
        match self {
            LifecycleAction::Ask => "Sent a request successfully.",
            LifecycleAction::Receive => {
                "Returned the device successfully. It's now available to other users"
            }
            LifecycleAction::MakeUnavailable => {
                "The device is now marked unavailable to other users."
            }
            LifecycleAction::MakeAvailable => "The device is now marked available to other users.",
        }
    }

    pub fn failure_message(&self) -> &'static str {
        match self {
            LifecycleAction::Ask => "Unable to add a request.",
            LifecycleAction::Receive => "Unable to receive the device",
            LifecycleAction::MakeUnavailable => "Unable to mark the device as unavailable.",
            LifecycleAction::MakeAvailable => "Unable to mark the device as available.",
        }
    }

    /// Event Log message for a successful transition
    pub fn event_message(&self, actor: &impl fmt::Display) -> String {
        match self {
            LifecycleAction::Ask => format!("Device has been requested by {}", actor),
            LifecycleAction::Receive => format!("Device has been returned by {}", actor),
            LifecycleAction::MakeUnavailable => format!(
                "Device has been made unavailable to other users by {}",
                actor
            ),
            LifecycleAction::MakeAvailable => {
                format!("Device has been made available to other users by {}", actor)
            }
        }
    }

    /// State the device ends up in once the transition succeeds
    pub fn target_state(&self) -> DeviceState {
        match self {
            LifecycleAction::Ask => DeviceState::Requested,
            LifecycleAction::Receive | LifecycleAction::MakeAvailable => DeviceState::Available,
            LifecycleAction::MakeUnavailable => DeviceState::Unavailable,
        }
    }
}

/// Validated device attributes as persisted
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceAttributes {
    pub make: String,
    pub model: String,
    pub label: Option<String>,
    pub serial_num: String,
    pub os: String,
    pub os_version: String,
    pub environment: String,
    pub project: String,
    pub device_type: String,
    pub service_provider: String,
    pub imei: Option<String>,
    pub phone_num: i64,
    pub mac_addr: String,
    pub ip_addr: String,
    pub owner: Option<String>,
    pub possessor: Option<String>,
    pub property_of: Option<String>,
}

/// Device entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    #[serde(flatten)]
    pub attributes: DeviceAttributes,
    pub state: Option<DeviceState>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Device {
    /// State used for transition preconditions; an unset state counts as available
    pub fn effective_state(&self) -> DeviceState {
        self.state.unwrap_or(DeviceState::Available)
    }

    /// Whether `action` may be applied to the device in its current state
    pub fn permits(&self, action: LifecycleAction) -> bool {
        match action {
            LifecycleAction::Ask | LifecycleAction::MakeUnavailable => {
                self.effective_state() == DeviceState::Available
            }
            LifecycleAction::Receive => {
                self.effective_state() == DeviceState::Requested
                    || self.attributes.possessor.is_some()
            }
            LifecycleAction::MakeAvailable => self.effective_state() == DeviceState::Unavailable,
        }
    }

    /// Case-insensitive substring match over make, model, os, os version and project
    pub fn matches_query(&self, query: &str) -> bool {
        let needle = query.to_lowercase();
        [
            &self.attributes.make,
            &self.attributes.model,
            &self.attributes.os,
            &self.attributes.os_version,
            &self.attributes.project,
        ]
        .iter()
        .any(|value| value.to_lowercase().contains(&needle))
    }

    pub fn to_fields(&self) -> DeviceFields {
        let a = &self.attributes;
        DeviceFields {
            make: Some(a.make.clone()),
            model: Some(a.model.clone()),
            label: a.label.clone(),
            serial_num: Some(a.serial_num.clone()),
            os: Some(a.os.clone()),
            os_version: Some(a.os_version.clone()),
            environment: Some(a.environment.clone()),
            project: Some(a.project.clone()),
            device_type: Some(a.device_type.clone()),
            service_provider: Some(a.service_provider.clone()),
            imei: a.imei.clone(),
            phone_num: Some(a.phone_num),
            mac_addr: Some(a.mac_addr.clone()),
            ip_addr: Some(a.ip_addr.clone()),
            owner: a.owner.clone(),
            possessor: a.possessor.clone(),
            property_of: a.property_of.clone(),
            state: self.state,
        }
    }
}

/// Unvalidated device fields as submitted by a form, JSON body or import row
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DeviceFields {
    #[serde(alias = "manufacturer")]
    #[garde(required)]
    pub make: Option<String>,
    #[garde(required)]
    pub model: Option<String>,
    #[garde(skip)]
    pub label: Option<String>,
    #[garde(required)]
    pub serial_num: Option<String>,
    #[garde(required)]
    pub os: Option<String>,
    #[garde(required)]
    pub os_version: Option<String>,
    #[garde(required)]
    pub environment: Option<String>,
    #[garde(required)]
    pub project: Option<String>,
    #[garde(required)]
    pub device_type: Option<String>,
    #[garde(required)]
    pub service_provider: Option<String>,
    #[garde(skip)]
    pub imei: Option<String>,
    #[serde(deserialize_with = "deserialize_phone_num")]
    #[garde(required)]
    pub phone_num: Option<i64>,
    #[garde(required)]
    pub mac_addr: Option<String>,
    #[garde(required)]
    pub ip_addr: Option<String>,
    #[garde(skip)]
    pub owner: Option<String>,
    #[garde(skip)]
    pub possessor: Option<String>,
    #[garde(skip)]
    pub property_of: Option<String>,
    #[serde(alias = "status")]
    #[garde(skip)]
    pub state: Option<DeviceState>,
}

/// Phone numbers arrive as JSON numbers or as form text; blank text is absent
fn deserialize_phone_num<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum PhoneInput {
        Number(i64),
        Text(String),
    }

    match Option::<PhoneInput>::deserialize(deserializer)? {
        None => Ok(None),
        Some(PhoneInput::Number(n)) => Ok(Some(n)),
        Some(PhoneInput::Text(text)) => match text.trim() {
            "" => Ok(None),
            digits => digits.parse().map(Some).map_err(serde::de::Error::custom),
        },
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

impl DeviceFields {
    /// Trim every text field and treat blank values as missing
    pub fn normalized(self) -> Self {
        Self {
            make: blank_to_none(self.make),
            model: blank_to_none(self.model),
            label: blank_to_none(self.label),
            serial_num: blank_to_none(self.serial_num),
            os: blank_to_none(self.os),
            os_version: blank_to_none(self.os_version),
            environment: blank_to_none(self.environment),
            project: blank_to_none(self.project),
            device_type: blank_to_none(self.device_type),
            service_provider: blank_to_none(self.service_provider),
            imei: blank_to_none(self.imei),
            phone_num: self.phone_num,
            mac_addr: blank_to_none(self.mac_addr),
            ip_addr: blank_to_none(self.ip_addr),
            owner: blank_to_none(self.owner),
            possessor: blank_to_none(self.possessor),
            property_of: blank_to_none(self.property_of),
            state: self.state,
        }
    }

    /// Overlay the fields present in `patch` on top of `self`
    pub fn merged_with(self, patch: DeviceFields) -> Self {
        Self {
            make: patch.make.or(self.make),
            model: patch.model.or(self.model),
            label: patch.label.or(self.label),
            serial_num: patch.serial_num.or(self.serial_num),
            os: patch.os.or(self.os),
            os_version: patch.os_version.or(self.os_version),
            environment: patch.environment.or(self.environment),
            project: patch.project.or(self.project),
            device_type: patch.device_type.or(self.device_type),
            service_provider: patch.service_provider.or(self.service_provider),
            imei: patch.imei.or(self.imei),
            phone_num: patch.phone_num.or(self.phone_num),
            mac_addr: patch.mac_addr.or(self.mac_addr),
            ip_addr: patch.ip_addr.or(self.ip_addr),
            owner: patch.owner.or(self.owner),
            possessor: patch.possessor.or(self.possessor),
            property_of: patch.property_of.or(self.property_of),
            state: patch.state.or(self.state),
        }
    }

    /// Normalize, check presence of every required field, and split into
    /// persisted attributes plus the optional state.
    pub fn into_attributes(self) -> DomainResult<(DeviceAttributes, Option<DeviceState>)> {
        let fields = self.normalized();
        crate::garde::validate_struct(&fields)?;

        let attributes = DeviceAttributes {
            make: fields.make.unwrap_or_default(),
            model: fields.model.unwrap_or_default(),
            label: fields.label,
            serial_num: fields.serial_num.unwrap_or_default(),
            os: fields.os.unwrap_or_default(),
            os_version: fields.os_version.unwrap_or_default(),
            environment: fields.environment.unwrap_or_default(),
            project: fields.project.unwrap_or_default(),
            device_type: fields.device_type.unwrap_or_default(),
            service_provider: fields.service_provider.unwrap_or_default(),
            imei: fields.imei,
            phone_num: fields.phone_num.unwrap_or_default(),
            mac_addr: fields.mac_addr.unwrap_or_default(),
            ip_addr: fields.ip_addr.unwrap_or_default(),
            owner: fields.owner,
            possessor: fields.possessor,
            property_of: fields.property_of,
        };

        Ok((attributes, fields.state))
    }
}

/// Input for creating a device with a pre-generated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceRepoInput {
    pub device_id: String,
    pub attributes: DeviceAttributes,
    pub state: Option<DeviceState>,
    pub created_by: String,
}

/// Input for getting a device by ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GetDeviceRepoInput {
    pub device_id: String,
}

/// Input for listing devices in a given state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListDevicesByStateRepoInput {
    pub state: DeviceState,
}

/// Input for substring search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchDevicesRepoInput {
    pub query: String,
}

/// Input for replacing a device's attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDeviceRepoInput {
    pub device_id: String,
    pub attributes: DeviceAttributes,
    pub state: Option<DeviceState>,
    pub updated_by: String,
}

/// Input for a plain state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateDeviceStateRepoInput {
    pub device_id: String,
    pub state: DeviceState,
    pub updated_by: String,
}

/// Input for returning a device: clears the possessor and closes open requests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveDeviceRepoInput {
    pub device_id: String,
    pub updated_by: String,
}

/// Input for asking for a device: state change plus request creation, atomically
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskDeviceRepoInput {
    pub device_id: String,
    pub request: CreateRequestRepoInput,
    pub updated_by: String,
}

/// Input for deleting a device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteDeviceRepoInput {
    pub device_id: String,
}

/// Repository trait for device storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceRepository: Send + Sync {
    /// Persist a new device
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device>;

    /// Get a device by ID
    async fn get_device(&self, input: GetDeviceRepoInput) -> DomainResult<Option<Device>>;

    /// List every device in store order (oldest first)
    async fn list_devices(&self) -> DomainResult<Vec<Device>>;

    /// List devices currently in the given state
    async fn list_devices_by_state(
        &self,
        input: ListDevicesByStateRepoInput,
    ) -> DomainResult<Vec<Device>>;

    /// Substring search over make, model, os, os version and project
    async fn search_devices(&self, input: SearchDevicesRepoInput) -> DomainResult<Vec<Device>>;

    /// Replace attributes; DeviceNotFound if the row is gone
    async fn update_device(&self, input: UpdateDeviceRepoInput) -> DomainResult<Device>;

    /// Set the state column; DeviceNotFound if the row is gone
    async fn update_device_state(&self, input: UpdateDeviceStateRepoInput)
        -> DomainResult<Device>;

    /// Return a device to the pool
    async fn receive_device(&self, input: ReceiveDeviceRepoInput) -> DomainResult<Device>;

    /// Mark a device requested and create its request in one atomic unit
    async fn ask_device(&self, input: AskDeviceRepoInput) -> DomainResult<Request>;

    /// Delete a device row. Returns false if nothing was deleted.
    async fn delete_device(&self, input: DeleteDeviceRepoInput) -> DomainResult<bool>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;
    use crate::testing::sample_device_fields as complete_fields;

    fn device_with(state: Option<DeviceState>, possessor: Option<&str>) -> Device {
        let (mut attributes, _) = complete_fields().into_attributes().unwrap();
        attributes.possessor = possessor.map(str::to_string);
        Device {
            id: "dev-1".to_string(),
            attributes,
            state,
            created_by: None,
            updated_by: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn test_complete_fields_validate() {
        let (attributes, state) = complete_fields().into_attributes().unwrap();
        assert_eq!(attributes.make, "Acme");
        assert_eq!(attributes.phone_num, 5551234);
        assert_eq!(state, None);
    }

    #[test]
    fn test_each_required_field_is_enforced() {
        let strip: Vec<(&str, fn(&mut DeviceFields))> = vec![
            ("make", |f| f.make = None),
            ("model", |f| f.model = None),
            ("serial_num", |f| f.serial_num = None),
            ("os", |f| f.os = None),
            ("os_version", |f| f.os_version = None),
            ("environment", |f| f.environment = None),
            ("project", |f| f.project = None),
            ("device_type", |f| f.device_type = None),
            ("service_provider", |f| f.service_provider = None),
            ("phone_num", |f| f.phone_num = None),
            ("mac_addr", |f| f.mac_addr = None),
            ("ip_addr", |f| f.ip_addr = None),
        ];

        for (name, clear) in strip {
            let mut fields = complete_fields();
            clear(&mut fields);
            match fields.into_attributes() {
                Err(DomainError::ValidationError(messages)) => {
                    assert_eq!(messages.len(), 1, "{}: {:?}", name, messages);
                    assert!(messages[0].starts_with(name), "{:?}", messages);
                }
                other => panic!("expected validation error for {}, got {:?}", name, other),
            }
        }
    }

    #[test]
    fn test_blank_strings_count_as_missing() {
        let mut fields = complete_fields();
        fields.environment = Some("   ".to_string());
        assert!(matches!(
            fields.into_attributes(),
            Err(DomainError::ValidationError(_))
        ));
    }

    #[test]
    fn test_manufacturer_alias_deserializes_into_make() {
        let fields: DeviceFields =
            serde_json::from_str(r#"{"manufacturer": "Acme", "status": "unavailable"}"#).unwrap();
        assert_eq!(fields.make.as_deref(), Some("Acme"));
        assert_eq!(fields.state, Some(DeviceState::Unavailable));
    }

    #[test]
    fn test_phone_number_accepts_form_text() {
        let fields: DeviceFields = serde_json::from_str(r#"{"phone_num": "5551234"}"#).unwrap();
        assert_eq!(fields.phone_num, Some(5551234));

        let fields: DeviceFields = serde_json::from_str(r#"{"phone_num": " "}"#).unwrap();
        assert_eq!(fields.phone_num, None);

        let fields: DeviceFields = serde_json::from_str(r#"{"phone_num": 42}"#).unwrap();
        assert_eq!(fields.phone_num, Some(42));

        assert!(serde_json::from_str::<DeviceFields>(r#"{"phone_num": "abc"}"#).is_err());
    }

    #[test]
    fn test_merge_keeps_existing_values_and_clears_blank_optionals() {
        let mut existing = complete_fields();
        existing.label = Some("lab".to_string());
        let patch = DeviceFields {
            project: Some("P2".to_string()),
            label: Some(String::new()),
            ..Default::default()
        };

        let (attributes, _) = existing.merged_with(patch).into_attributes().unwrap();
        assert_eq!(attributes.project, "P2");
        assert_eq!(attributes.make, "Acme");
        assert_eq!(attributes.label, None);
    }

    #[test]
    fn test_unset_state_behaves_as_available() {
        let device = device_with(None, None);
        assert!(device.permits(LifecycleAction::MakeUnavailable));
        assert!(device.permits(LifecycleAction::Ask));
        assert!(!device.permits(LifecycleAction::MakeAvailable));
        assert!(!device.permits(LifecycleAction::Receive));
    }

    #[test]
    fn test_receive_requires_an_assignment() {
        assert!(device_with(Some(DeviceState::Requested), None).permits(LifecycleAction::Receive));
        assert!(
            device_with(Some(DeviceState::Available), Some("bob")).permits(LifecycleAction::Receive)
        );
        assert!(
            !device_with(Some(DeviceState::Available), None).permits(LifecycleAction::Receive)
        );
    }

    #[test]
    fn test_make_available_requires_unavailable() {
        assert!(
            device_with(Some(DeviceState::Unavailable), None)
                .permits(LifecycleAction::MakeAvailable)
        );
        assert!(
            !device_with(Some(DeviceState::Unavailable), None)
                .permits(LifecycleAction::MakeUnavailable)
        );
    }

    #[test]
    fn test_search_matches_are_case_insensitive_and_scoped() {
        let device = device_with(None, None);
        assert!(device.matches_query(""));
        assert!(device.matches_query("acm"));
        assert!(device.matches_query("ANDROID"));
        assert!(device.matches_query("p1"));
        // serial number and environment are not searched
        assert!(!device.matches_query("SN1"));
        assert!(!device.matches_query("prod"));
    }

    #[test]
    fn test_state_round_trips_through_text() {
        for state in [
            DeviceState::Available,
            DeviceState::Unavailable,
            DeviceState::Requested,
        ] {
            assert_eq!(state.as_str().parse::<DeviceState>(), Ok(state));
        }
        assert!("asked".parse::<DeviceState>().is_err());
    }

    #[test]
    fn test_event_messages_name_the_actor() {
        assert_eq!(
            LifecycleAction::MakeUnavailable.event_message(&"alice"),
            "Device has been made unavailable to other users by alice"
        );
        assert_eq!(
            LifecycleAction::Receive.event_message(&"bob"),
            "Device has been returned by bob"
        );
    }
}
