use common::auth::{Actor, AuthorizationProvider};
use common::domain::{
    CreateDeviceTypeRepoInput, DeviceType, DeviceTypeFields, DeviceTypeRepository, DomainResult,
};
use std::sync::Arc;
use tracing::{info, instrument};

/// Service for the device type lookup list
pub struct DeviceTypeService {
    device_type_repository: Arc<dyn DeviceTypeRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
}

impl DeviceTypeService {
    pub fn new(
        device_type_repository: Arc<dyn DeviceTypeRepository>,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            device_type_repository,
            authorization_provider,
        }
    }

    pub async fn list_device_types(&self) -> DomainResult<Vec<DeviceType>> {
        self.device_type_repository.list_device_types().await
    }

    /// Register a new type name. Admin only; names are unique.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn create_device_type(&self, actor: &Actor, name: &str) -> DomainResult<DeviceType> {
        self.authorization_provider
            .require_admin(actor, "create device type")?;

        let name = DeviceTypeFields {
            name: name.to_string(),
        }
        .into_name()?;

        let device_type = self
            .device_type_repository
            .create_device_type(CreateDeviceTypeRepoInput {
                id: xid::new().to_string(),
                name,
            })
            .await?;

        info!(device_type_id = %device_type.id, "Device type created");
        Ok(device_type)
    }
}
