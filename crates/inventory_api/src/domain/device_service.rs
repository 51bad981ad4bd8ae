use common::auth::{Actor, AuthorizationProvider};
use common::domain::{
    AddCommentRepoInput, AskDeviceRepoInput, CommentRepository, CreateDeviceRepoInput,
    CreateRequestRepoInput, DeleteDeviceRepoInput, Device, DeviceFields, DeviceRepository,
    DeviceState, DomainError, DomainResult, Event, EventRepository, GetDeviceRepoInput,
    LifecycleAction, ListDevicesByStateRepoInput, ListRecentEventsRepoInput,
    ReceiveDeviceRepoInput, RecordEventRepoInput, Request, SearchDevicesRepoInput,
    UpdateDeviceRepoInput, UpdateDeviceStateRepoInput, DEFAULT_RECENT_EVENTS_LIMIT,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

/// Service request for creating a device
#[derive(Debug, Clone)]
pub struct CreateDeviceRequest {
    pub actor: Actor,
    pub fields: DeviceFields,
}

/// Service request for updating a device. Fields absent from `fields` keep
/// their stored value.
#[derive(Debug, Clone)]
pub struct UpdateDeviceRequest {
    pub actor: Actor,
    pub device_id: String,
    pub fields: DeviceFields,
    pub comment: Option<String>,
}

/// Service request for asking for a device
#[derive(Debug, Clone)]
pub struct AskDeviceRequest {
    pub actor: Actor,
    pub device_id: String,
    pub note: Option<String>,
}

/// Service request addressing one device
#[derive(Debug, Clone)]
pub struct DeviceRequest {
    pub actor: Actor,
    pub device_id: String,
}

/// A device together with its most recent events, newest first
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceDetails {
    pub device: Device,
    pub events: Vec<Event>,
}

/// Service for device records and their lifecycle
pub struct DeviceService {
    device_repository: Arc<dyn DeviceRepository>,
    event_repository: Arc<dyn EventRepository>,
    comment_repository: Arc<dyn CommentRepository>,
    authorization_provider: Arc<dyn AuthorizationProvider>,
    recent_events_limit: i64,
}

impl DeviceService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        event_repository: Arc<dyn EventRepository>,
        comment_repository: Arc<dyn CommentRepository>,
        authorization_provider: Arc<dyn AuthorizationProvider>,
    ) -> Self {
        Self {
            device_repository,
            event_repository,
            comment_repository,
            authorization_provider,
            recent_events_limit: DEFAULT_RECENT_EVENTS_LIMIT,
        }
    }

    pub fn with_recent_events_limit(mut self, limit: i64) -> Self {
        self.recent_events_limit = limit;
        self
    }

    /// Devices the actor is allowed to see, in store order
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn list_for(&self, actor: &Actor) -> DomainResult<Vec<Device>> {
        let devices = self.device_repository.list_devices().await?;
        let visible: Vec<Device> = devices
            .into_iter()
            .filter(|device| self.authorization_provider.can_view(actor, device))
            .collect();

        debug!(count = visible.len(), "listed visible devices");
        Ok(visible)
    }

    /// Devices withdrawn from circulation. Admin only.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn unavailable(&self, actor: &Actor) -> DomainResult<Vec<Device>> {
        self.authorization_provider
            .require_admin(actor, "list unavailable devices")?;

        self.device_repository
            .list_devices_by_state(ListDevicesByStateRepoInput {
                state: DeviceState::Unavailable,
            })
            .await
    }

    /// Case-insensitive substring search. A missing or empty query matches everything;
    /// whitespace is matched literally.
    #[instrument(skip(self))]
    pub async fn search(&self, query: Option<&str>) -> DomainResult<Vec<Device>> {
        let query = query.unwrap_or_default();
        if query.is_empty() {
            return self.device_repository.list_devices().await;
        }

        self.device_repository
            .search_devices(SearchDevicesRepoInput {
                query: query.to_string(),
            })
            .await
    }

    /// A device and its recent events
    #[instrument(skip(self), fields(device_id = %device_id))]
    pub async fn show(&self, device_id: &str) -> DomainResult<DeviceDetails> {
        let device = self.get_device(device_id).await?;
        let events = self
            .event_repository
            .list_recent_events(ListRecentEventsRepoInput {
                device_id: device.id.clone(),
                limit: self.recent_events_limit,
            })
            .await?;

        Ok(DeviceDetails { device, events })
    }

    /// Blank field set backing the new-device form. Admin only.
    pub fn new_template(&self, actor: &Actor) -> DomainResult<DeviceFields> {
        self.authorization_provider
            .require_admin(actor, "create device")?;
        Ok(DeviceFields::default())
    }

    /// Device as loaded for the edit form. Admin only.
    #[instrument(skip(self, request), fields(device_id = %request.device_id))]
    pub async fn edit(&self, request: DeviceRequest) -> DomainResult<Device> {
        self.authorization_provider
            .require_admin(&request.actor, "edit device")?;
        self.get_device(&request.device_id).await
    }

    /// Create a device. Admin only. The state is stored exactly as given.
    #[instrument(skip(self, request), fields(user_id = %request.actor.user_id))]
    pub async fn create(&self, request: CreateDeviceRequest) -> DomainResult<Device> {
        self.authorization_provider
            .require_admin(&request.actor, "create device")?;

        let (attributes, state) = request.fields.into_attributes()?;
        let device_id = xid::new().to_string();

        let device = self
            .device_repository
            .create_device(CreateDeviceRepoInput {
                device_id,
                attributes,
                state,
                created_by: request.actor.user_id.clone(),
            })
            .await?;

        self.record_event(&device.id, format!("Device has been created by {}", request.actor))
            .await?;

        info!(device_id = %device.id, "Device created successfully");
        Ok(device)
    }

    /// Apply field changes on top of the stored device, re-validate and persist.
    /// Admin only. Concurrent updates are last-writer-wins.
    #[instrument(
        skip(self, request),
        fields(device_id = %request.device_id, user_id = %request.actor.user_id)
    )]
    pub async fn update(&self, request: UpdateDeviceRequest) -> DomainResult<Device> {
        self.authorization_provider
            .require_admin(&request.actor, "update device")?;

        let existing = self.get_device(&request.device_id).await?;
        let (attributes, state) = existing
            .to_fields()
            .merged_with(request.fields)
            .into_attributes()?;

        let device = self
            .device_repository
            .update_device(UpdateDeviceRepoInput {
                device_id: existing.id,
                attributes,
                state,
                updated_by: request.actor.user_id.clone(),
            })
            .await?;

        if let Some(body) = request
            .comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
        {
            self.comment_repository
                .add_comment(AddCommentRepoInput {
                    comment_id: xid::new().to_string(),
                    device_id: device.id.clone(),
                    author: request.actor.user_id.clone(),
                    body,
                })
                .await?;
        }

        self.record_event(&device.id, format!("Device has been updated by {}", request.actor))
            .await?;

        info!(device_id = %device.id, "Device updated successfully");
        Ok(device)
    }

    /// Delete a device. Admin only. Its events are left in place.
    #[instrument(skip(self, request), fields(device_id = %request.device_id))]
    pub async fn destroy(&self, request: DeviceRequest) -> DomainResult<()> {
        self.authorization_provider
            .require_admin(&request.actor, "delete device")?;

        let deleted = self
            .device_repository
            .delete_device(DeleteDeviceRepoInput {
                device_id: request.device_id.clone(),
            })
            .await?;

        if !deleted {
            return Err(DomainError::DeviceNotFound(request.device_id));
        }

        info!(device_id = %request.device_id, "Device deleted");
        Ok(())
    }

    /// Mark the device requested and open a request to its owner, atomically.
    /// Any failure after the precondition check is reported as `RequestNotCreated`.
    #[instrument(
        skip(self, request),
        fields(device_id = %request.device_id, user_id = %request.actor.user_id)
    )]
    pub async fn ask(&self, request: AskDeviceRequest) -> DomainResult<Request> {
        let device = self.get_device(&request.device_id).await?;
        self.check_transition(&device, LifecycleAction::Ask)?;

        let created = self
            .device_repository
            .ask_device(AskDeviceRepoInput {
                device_id: device.id.clone(),
                request: CreateRequestRepoInput {
                    request_id: xid::new().to_string(),
                    owner: device.attributes.owner.clone(),
                    requestor: request.actor.user_id.clone(),
                    note: request.note,
                },
                updated_by: request.actor.user_id.clone(),
            })
            .await;

        let created = match created {
            Ok(created) => created,
            Err(e) => {
                error!(device_id = %device.id, error = %e, "ask transaction rolled back");
                return Err(DomainError::RequestNotCreated);
            }
        };

        self.record_event(&device.id, LifecycleAction::Ask.event_message(&request.actor))
            .await?;

        info!(request_id = %created.id, "Request created");
        Ok(created)
    }

    /// Return a requested or possessed device to the pool
    #[instrument(
        skip(self, request),
        fields(device_id = %request.device_id, user_id = %request.actor.user_id)
    )]
    pub async fn receive(&self, request: DeviceRequest) -> DomainResult<Device> {
        let device = self.get_device(&request.device_id).await?;
        self.check_transition(&device, LifecycleAction::Receive)?;

        let device = self
            .device_repository
            .receive_device(ReceiveDeviceRepoInput {
                device_id: device.id,
                updated_by: request.actor.user_id.clone(),
            })
            .await?;

        self.record_event(&device.id, LifecycleAction::Receive.event_message(&request.actor))
            .await?;
        Ok(device)
    }

    /// available -> unavailable. Admin only.
    pub async fn make_unavailable(&self, request: DeviceRequest) -> DomainResult<Device> {
        self.authorization_provider
            .require_admin(&request.actor, "make device unavailable")?;
        self.change_state(request, LifecycleAction::MakeUnavailable)
            .await
    }

    /// unavailable -> available
    pub async fn make_available(&self, request: DeviceRequest) -> DomainResult<Device> {
        self.change_state(request, LifecycleAction::MakeAvailable)
            .await
    }

    #[instrument(skip(self, request), fields(device_id = %request.device_id, action = ?action))]
    async fn change_state(
        &self,
        request: DeviceRequest,
        action: LifecycleAction,
    ) -> DomainResult<Device> {
        let device = self.get_device(&request.device_id).await?;
        self.check_transition(&device, action)?;

        let device = self
            .device_repository
            .update_device_state(UpdateDeviceStateRepoInput {
                device_id: device.id,
                state: action.target_state(),
                updated_by: request.actor.user_id.clone(),
            })
            .await?;

        self.record_event(&device.id, action.event_message(&request.actor))
            .await?;

        debug!(state = %action.target_state(), "device state changed");
        Ok(device)
    }

    fn check_transition(&self, device: &Device, action: LifecycleAction) -> DomainResult<()> {
        if device.permits(action) {
            return Ok(());
        }

        debug!(
            device_id = %device.id,
            state = ?device.state,
            action = ?action,
            "transition refused"
        );
        Err(DomainError::InvalidStateTransition {
            device_id: device.id.clone(),
            action,
        })
    }

    async fn get_device(&self, device_id: &str) -> DomainResult<Device> {
        self.device_repository
            .get_device(GetDeviceRepoInput {
                device_id: device_id.to_string(),
            })
            .await?
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))
    }

    async fn record_event(&self, device_id: &str, message: String) -> DomainResult<Event> {
        self.event_repository
            .record_event(RecordEventRepoInput {
                device_id: device_id.to_string(),
                message,
            })
            .await
    }
}
