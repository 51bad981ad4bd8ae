use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Lookup entity for device categories; names are unique
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceType {
    pub id: String,
    pub name: String,
    pub created_at: Option<DateTime<Utc>>,
}

/// Device type name as submitted
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Validate)]
pub struct DeviceTypeFields {
    #[garde(length(min = 1))]
    pub name: String,
}

impl DeviceTypeFields {
    /// Trim, then require a non-empty name
    pub fn into_name(self) -> DomainResult<String> {
        let fields = Self {
            name: self.name.trim().to_string(),
        };
        crate::garde::validate_struct(&fields)?;
        Ok(fields.name)
    }
}

/// Input for creating a device type with a pre-generated ID
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateDeviceTypeRepoInput {
    pub id: String,
    pub name: String,
}

/// Repository trait for device type storage operations
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeviceTypeRepository: Send + Sync {
    /// Create a device type; DeviceTypeAlreadyExists on a duplicate name
    async fn create_device_type(&self, input: CreateDeviceTypeRepoInput)
        -> DomainResult<DeviceType>;

    /// List device types ordered by name
    async fn list_device_types(&self) -> DomainResult<Vec<DeviceType>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DomainError;

    #[test]
    fn test_name_is_trimmed() {
        let fields = DeviceTypeFields {
            name: "  tablet ".to_string(),
        };
        assert_eq!(fields.into_name().unwrap(), "tablet");
    }

    #[test]
    fn test_blank_name_fails_on_the_name_field() {
        let fields = DeviceTypeFields {
            name: " \t".to_string(),
        };
        match fields.into_name() {
            Err(DomainError::ValidationError(messages)) => {
                assert_eq!(messages.len(), 1);
                assert!(messages[0].starts_with("name: "));
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }
}
