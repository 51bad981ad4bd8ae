use crate::domain::{
    AddCommentRepoInput, AskDeviceRepoInput, CommentRepository, CreateDeviceRepoInput,
    CreateDeviceTypeRepoInput, DeleteDeviceRepoInput, Device, DeviceComment, DeviceRepository,
    DeviceState, DeviceType, DeviceTypeRepository, DomainError, DomainResult, Event,
    EventRepository, GetDeviceRepoInput, ListDevicesByStateRepoInput, ListRecentEventsRepoInput,
    ReceiveDeviceRepoInput, RecordEventRepoInput, Request, SearchDevicesRepoInput,
    UpdateDeviceRepoInput, UpdateDeviceStateRepoInput,
};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct InventoryState {
    devices: Vec<Device>,
    requests: Vec<Request>,
    comments: Vec<DeviceComment>,
    device_types: Vec<DeviceType>,
    events: Vec<Event>,
    next_event_id: i64,
}

impl InventoryState {
    fn device_mut(&mut self, device_id: &str) -> DomainResult<&mut Device> {
        self.devices
            .iter_mut()
            .find(|d| d.id == device_id)
            .ok_or_else(|| DomainError::DeviceNotFound(device_id.to_string()))
    }
}

/// In-memory implementation of every inventory repository, sharing one lock
/// so multi-table operations stay atomic.
#[derive(Clone, Default)]
pub struct InMemoryInventoryStore {
    state: Arc<RwLock<InventoryState>>,
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests created for a device, oldest first
    pub async fn requests_for(&self, device_id: &str) -> Vec<Request> {
        let state = self.state.read().await;
        state
            .requests
            .iter()
            .filter(|r| r.device_id == device_id)
            .cloned()
            .collect()
    }

    /// Update comments for a device, oldest first
    pub async fn comments_for(&self, device_id: &str) -> Vec<DeviceComment> {
        let state = self.state.read().await;
        state
            .comments
            .iter()
            .filter(|c| c.device_id == device_id)
            .cloned()
            .collect()
    }

    /// Total number of events, for any device
    pub async fn event_count(&self) -> usize {
        self.state.read().await.events.len()
    }
}

#[async_trait]
impl DeviceRepository for InMemoryInventoryStore {
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        let mut state = self.state.write().await;
        if state.devices.iter().any(|d| d.id == input.device_id) {
            return Err(DomainError::DeviceAlreadyExists(input.device_id));
        }

        let now = Utc::now();
        let device = Device {
            id: input.device_id,
            attributes: input.attributes,
            state: input.state,
            created_by: Some(input.created_by),
            updated_by: None,
            created_at: Some(now),
            updated_at: Some(now),
        };
        state.devices.push(device.clone());
        Ok(device)
    }

    async fn get_device(&self, input: GetDeviceRepoInput) -> DomainResult<Option<Device>> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .iter()
            .find(|d| d.id == input.device_id)
            .cloned())
    }

    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        Ok(self.state.read().await.devices.clone())
    }

    async fn list_devices_by_state(
        &self,
        input: ListDevicesByStateRepoInput,
    ) -> DomainResult<Vec<Device>> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .iter()
            .filter(|d| d.state == Some(input.state))
            .cloned()
            .collect())
    }

    async fn search_devices(&self, input: SearchDevicesRepoInput) -> DomainResult<Vec<Device>> {
        let state = self.state.read().await;
        Ok(state
            .devices
            .iter()
            .filter(|d| d.matches_query(&input.query))
            .cloned()
            .collect())
    }

    async fn update_device(&self, input: UpdateDeviceRepoInput) -> DomainResult<Device> {
        let mut state = self.state.write().await;
        let device = state.device_mut(&input.device_id)?;
        device.attributes = input.attributes;
        device.state = input.state;
        device.updated_by = Some(input.updated_by);
        device.updated_at = Some(Utc::now());
        Ok(device.clone())
    }

    async fn update_device_state(
        &self,
        input: UpdateDeviceStateRepoInput,
    ) -> DomainResult<Device> {
        let mut state = self.state.write().await;
        let device = state.device_mut(&input.device_id)?;
        device.state = Some(input.state);
        device.updated_by = Some(input.updated_by);
        device.updated_at = Some(Utc::now());
        Ok(device.clone())
    }

    async fn receive_device(&self, input: ReceiveDeviceRepoInput) -> DomainResult<Device> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let device = state.device_mut(&input.device_id)?;
        device.state = Some(DeviceState::Available);
        device.attributes.possessor = None;
        device.updated_by = Some(input.updated_by);
        device.updated_at = Some(now);
        let device = device.clone();

        state
            .requests
            .iter_mut()
            .filter(|r| r.device_id == input.device_id && r.closed_at.is_none())
            .for_each(|r| r.closed_at = Some(now));

        Ok(device)
    }

    async fn ask_device(&self, input: AskDeviceRepoInput) -> DomainResult<Request> {
        let mut state = self.state.write().await;
        let now = Utc::now();

        let device = state.device_mut(&input.device_id)?;
        let snapshot = device.clone();
        device.state = Some(DeviceState::Requested);
        device.updated_by = Some(input.updated_by);
        device.updated_at = Some(now);

        // Same constraint the requests table enforces with NOT NULL
        let Some(owner) = input.request.owner else {
            *state.device_mut(&input.device_id)? = snapshot;
            return Err(DomainError::RepositoryError(anyhow::anyhow!(
                "request owner must not be null"
            )));
        };

        let request = Request {
            id: input.request.request_id,
            device_id: input.device_id,
            owner,
            requestor: input.request.requestor,
            note: input.request.note,
            closed_at: None,
            created_at: Some(now),
        };
        state.requests.push(request.clone());
        Ok(request)
    }

    async fn delete_device(&self, input: DeleteDeviceRepoInput) -> DomainResult<bool> {
        let mut state = self.state.write().await;
        let before = state.devices.len();
        state.devices.retain(|d| d.id != input.device_id);
        let deleted = state.devices.len() < before;

        // Requests and comments cascade; events are left in place
        if deleted {
            state.requests.retain(|r| r.device_id != input.device_id);
            state.comments.retain(|c| c.device_id != input.device_id);
        }
        Ok(deleted)
    }
}

#[async_trait]
impl EventRepository for InMemoryInventoryStore {
    async fn record_event(&self, input: RecordEventRepoInput) -> DomainResult<Event> {
        let mut state = self.state.write().await;
        state.next_event_id += 1;
        let event = Event {
            id: state.next_event_id,
            device_id: input.device_id,
            message: input.message,
            created_at: Utc::now(),
        };
        state.events.push(event.clone());
        Ok(event)
    }

    async fn list_recent_events(
        &self,
        input: ListRecentEventsRepoInput,
    ) -> DomainResult<Vec<Event>> {
        let state = self.state.read().await;
        let limit = usize::try_from(input.limit).unwrap_or(0);
        Ok(state
            .events
            .iter()
            .rev()
            .filter(|e| e.device_id == input.device_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DeviceTypeRepository for InMemoryInventoryStore {
    async fn create_device_type(
        &self,
        input: CreateDeviceTypeRepoInput,
    ) -> DomainResult<DeviceType> {
        let mut state = self.state.write().await;
        if state.device_types.iter().any(|t| t.name == input.name) {
            return Err(DomainError::DeviceTypeAlreadyExists(input.name));
        }
        let device_type = DeviceType {
            id: input.id,
            name: input.name,
            created_at: Some(Utc::now()),
        };
        state.device_types.push(device_type.clone());
        Ok(device_type)
    }

    async fn list_device_types(&self) -> DomainResult<Vec<DeviceType>> {
        let mut types = self.state.read().await.device_types.clone();
        types.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(types)
    }
}

#[async_trait]
impl CommentRepository for InMemoryInventoryStore {
    async fn add_comment(&self, input: AddCommentRepoInput) -> DomainResult<DeviceComment> {
        let mut state = self.state.write().await;
        let comment = DeviceComment {
            id: input.comment_id,
            device_id: input.device_id,
            author: input.author,
            body: input.body,
            created_at: Some(Utc::now()),
        };
        state.comments.push(comment.clone());
        Ok(comment)
    }
}
