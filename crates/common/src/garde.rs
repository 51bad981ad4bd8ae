//! Garde validation utilities.

use crate::domain::DomainError;
use garde::{Report, Validate};

/// Convert a garde validation report into a field-level DomainError
pub fn validate_struct<T>(value: &T) -> Result<(), DomainError>
where
    T: Validate,
    T::Context: Default,
{
    value
        .validate()
        .map_err(|report| DomainError::ValidationError(field_messages(&report)))
}

/// One `field: message` entry per failed rule
fn field_messages(report: &Report) -> Vec<String> {
    report
        .iter()
        .map(|(path, error)| {
            let path = path.to_string();
            if path.is_empty() {
                error.message().to_string()
            } else {
                format!("{}: {}", path, error.message())
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use garde::Validate;

    #[derive(Validate)]
    struct TestRequest {
        #[garde(length(min = 1))]
        name: String,
        #[garde(required)]
        serial: Option<String>,
    }

    #[test]
    fn test_validate_success() {
        let request = TestRequest {
            name: "value".to_string(),
            serial: Some("SN".to_string()),
        };
        assert!(validate_struct(&request).is_ok());
    }

    #[test]
    fn test_validate_collects_every_field() {
        let request = TestRequest {
            name: "".to_string(),
            serial: None,
        };
        match validate_struct(&request) {
            Err(DomainError::ValidationError(messages)) => {
                assert_eq!(messages.len(), 2);
                assert!(messages.iter().any(|m| m.starts_with("name")));
                assert!(messages.iter().any(|m| m.starts_with("serial")));
            }
            other => panic!("Expected ValidationError, got {:?}", other),
        }
    }
}
