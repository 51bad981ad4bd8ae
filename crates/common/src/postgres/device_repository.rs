use crate::domain::{
    AskDeviceRepoInput, CreateDeviceRepoInput, DeleteDeviceRepoInput, Device, DeviceAttributes,
    DeviceRepository, DeviceState, DomainError, DomainResult, GetDeviceRepoInput,
    ListDevicesByStateRepoInput, ReceiveDeviceRepoInput, Request, SearchDevicesRepoInput,
    UpdateDeviceRepoInput, UpdateDeviceStateRepoInput,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::Row;
use tracing::{debug, instrument};

const DEVICE_COLUMNS: &str = "id, make, model, label, serial_num, os, os_version, environment, \
     project, device_type, service_provider, imei, phone_num, mac_addr, ip_addr, owner, \
     possessor, property_of, state, created_by, updated_by, created_at, updated_at";

/// Device row for PostgreSQL storage with audit metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRow {
    pub id: String,
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
    pub state: Option<String>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Row> for DeviceRow {
    fn from(row: &Row) -> Self {
        DeviceRow {
            id: row.get("id"),
            make: row.get("make"),
            model: row.get("model"),
            label: row.get("label"),
            serial_num: row.get("serial_num"),
            os: row.get("os"),
            os_version: row.get("os_version"),
            environment: row.get("environment"),
            project: row.get("project"),
            device_type: row.get("device_type"),
            service_provider: row.get("service_provider"),
            imei: row.get("imei"),
            phone_num: row.get("phone_num"),
            mac_addr: row.get("mac_addr"),
            ip_addr: row.get("ip_addr"),
            owner: row.get("owner"),
            possessor: row.get("possessor"),
            property_of: row.get("property_of"),
            state: row.get("state"),
            created_by: row.get("created_by"),
            updated_by: row.get("updated_by"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }
}

/// Convert database DeviceRow to domain Device
impl TryFrom<DeviceRow> for Device {
    type Error = DomainError;

    fn try_from(row: DeviceRow) -> Result<Self, Self::Error> {
        let state = row
            .state
            .as_deref()
            .map(str::parse::<DeviceState>)
            .transpose()
            .map_err(|e| DomainError::RepositoryError(anyhow::anyhow!(e)))?;

        Ok(Device {
            id: row.id,
            attributes: DeviceAttributes {
                make: row.make,
                model: row.model,
                label: row.label,
                serial_num: row.serial_num,
                os: row.os,
                os_version: row.os_version,
                environment: row.environment,
                project: row.project,
                device_type: row.device_type,
                service_provider: row.service_provider,
                imei: row.imei,
                phone_num: row.phone_num,
                mac_addr: row.mac_addr,
                ip_addr: row.ip_addr,
                owner: row.owner,
                possessor: row.possessor,
                property_of: row.property_of,
            },
            state,
            created_by: row.created_by,
            updated_by: row.updated_by,
            created_at: Some(row.created_at),
            updated_at: Some(row.updated_at),
        })
    }
}

fn rows_to_devices(rows: &[Row]) -> DomainResult<Vec<Device>> {
    rows.iter()
        .map(|row| Device::try_from(DeviceRow::from(row)))
        .collect()
}

/// Escape LIKE wildcards so the query is matched literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

/// PostgreSQL implementation of DeviceRepository trait
#[derive(Clone)]
pub struct PostgresDeviceRepository {
    client: PostgresClient,
}

impl PostgresDeviceRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceRepository for PostgresDeviceRepository {
    #[instrument(
        skip(self, input),
        fields(device_id = %input.device_id, serial_num = %input.attributes.serial_num)
    )]
    async fn create_device(&self, input: CreateDeviceRepoInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        let a = &input.attributes;
        let state = input.state.map(|s| s.as_str());

        let result = conn
            .query_one(
                &format!(
                    "INSERT INTO devices (id, make, model, label, serial_num, os, os_version, environment,
                         project, device_type, service_provider, imei, phone_num, mac_addr, ip_addr, owner,
                         possessor, property_of, state, created_by, updated_by, created_at, updated_at)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
                         $17, $18, $19, $20, NULL, $21, $21)
                     RETURNING {}",
                    DEVICE_COLUMNS
                ),
                &[
                    &input.device_id,
                    &a.make,
                    &a.model,
                    &a.label,
                    &a.serial_num,
                    &a.os,
                    &a.os_version,
                    &a.environment,
                    &a.project,
                    &a.device_type,
                    &a.service_provider,
                    &a.imei,
                    &a.phone_num,
                    &a.mac_addr,
                    &a.ip_addr,
                    &a.owner,
                    &a.possessor,
                    &a.property_of,
                    &state,
                    &input.created_by,
                    &now,
                ],
            )
            .await;

        let row = match result {
            Ok(row) => row,
            Err(e) => {
                if let Some(db_err) = e.as_db_error() {
                    // PostgreSQL error code 23505 is unique_violation
                    if db_err.code().code() == "23505" {
                        return Err(DomainError::DeviceAlreadyExists(input.device_id));
                    }
                }
                return Err(DomainError::RepositoryError(e.into()));
            }
        };

        debug!("registered device: {}", input.device_id);
        Device::try_from(DeviceRow::from(&row))
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    async fn get_device(&self, input: GetDeviceRepoInput) -> DomainResult<Option<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!("SELECT {} FROM devices WHERE id = $1", DEVICE_COLUMNS),
                &[&input.device_id],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        row.map(|row| Device::try_from(DeviceRow::from(&row)))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_devices(&self) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM devices ORDER BY created_at ASC, id ASC",
                    DEVICE_COLUMNS
                ),
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} devices", rows.len());
        rows_to_devices(&rows)
    }

    #[instrument(skip(self, input), fields(state = %input.state))]
    async fn list_devices_by_state(
        &self,
        input: ListDevicesByStateRepoInput,
    ) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM devices WHERE state = $1 ORDER BY created_at ASC, id ASC",
                    DEVICE_COLUMNS
                ),
                &[&input.state.as_str()],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("found {} devices in state {}", rows.len(), input.state);
        rows_to_devices(&rows)
    }

    #[instrument(skip(self, input), fields(query = %input.query))]
    async fn search_devices(&self, input: SearchDevicesRepoInput) -> DomainResult<Vec<Device>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let pattern = like_pattern(&input.query);
        let rows = conn
            .query(
                &format!(
                    "SELECT {} FROM devices
                     WHERE make ILIKE $1 OR model ILIKE $1 OR os ILIKE $1
                        OR os_version ILIKE $1 OR project ILIKE $1
                     ORDER BY created_at ASC, id ASC",
                    DEVICE_COLUMNS
                ),
                &[&pattern],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("search matched {} devices", rows.len());
        rows_to_devices(&rows)
    }

    #[instrument(
        skip(self, input),
        fields(device_id = %input.device_id, updated_by = %input.updated_by)
    )]
    async fn update_device(&self, input: UpdateDeviceRepoInput) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let a = &input.attributes;
        let state = input.state.map(|s| s.as_str());

        let row = conn
            .query_opt(
                &format!(
                    "UPDATE devices SET make = $2, model = $3, label = $4, serial_num = $5, os = $6,
                         os_version = $7, environment = $8, project = $9, device_type = $10,
                         service_provider = $11, imei = $12, phone_num = $13, mac_addr = $14,
                         ip_addr = $15, owner = $16, possessor = $17, property_of = $18, state = $19,
                         updated_by = $20, updated_at = $21
                     WHERE id = $1
                     RETURNING {}",
                    DEVICE_COLUMNS
                ),
                &[
                    &input.device_id,
                    &a.make,
                    &a.model,
                    &a.label,
                    &a.serial_num,
                    &a.os,
                    &a.os_version,
                    &a.environment,
                    &a.project,
                    &a.device_type,
                    &a.service_provider,
                    &a.imei,
                    &a.phone_num,
                    &a.mac_addr,
                    &a.ip_addr,
                    &a.owner,
                    &a.possessor,
                    &a.property_of,
                    &state,
                    &input.updated_by,
                    &Utc::now(),
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::DeviceNotFound(input.device_id.clone()))?;

        debug!("updated device: {}", input.device_id);
        Device::try_from(DeviceRow::from(&row))
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id, state = %input.state))]
    async fn update_device_state(
        &self,
        input: UpdateDeviceStateRepoInput,
    ) -> DomainResult<Device> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_opt(
                &format!(
                    "UPDATE devices SET state = $2, updated_by = $3, updated_at = $4
                     WHERE id = $1
                     RETURNING {}",
                    DEVICE_COLUMNS
                ),
                &[
                    &input.device_id,
                    &input.state.as_str(),
                    &input.updated_by,
                    &Utc::now(),
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::DeviceNotFound(input.device_id.clone()))?;

        Device::try_from(DeviceRow::from(&row))
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    async fn receive_device(&self, input: ReceiveDeviceRepoInput) -> DomainResult<Device> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let now = Utc::now();
        let row = tx
            .query_opt(
                &format!(
                    "UPDATE devices SET state = $2, possessor = NULL, updated_by = $3, updated_at = $4
                     WHERE id = $1
                     RETURNING {}",
                    DEVICE_COLUMNS
                ),
                &[
                    &input.device_id,
                    &DeviceState::Available.as_str(),
                    &input.updated_by,
                    &now,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?
            .ok_or_else(|| DomainError::DeviceNotFound(input.device_id.clone()))?;

        let closed = tx
            .execute(
                "UPDATE requests SET closed_at = $2 WHERE device_id = $1 AND closed_at IS NULL",
                &[&input.device_id, &now],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(closed_requests = closed, "received device: {}", input.device_id);
        Device::try_from(DeviceRow::from(&row))
    }

    #[instrument(
        skip(self, input),
        fields(device_id = %input.device_id, requestor = %input.request.requestor)
    )]
    async fn ask_device(&self, input: AskDeviceRepoInput) -> DomainResult<Request> {
        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        // Dropping the transaction without commit rolls back the state change
        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let now = Utc::now();
        let updated = tx
            .execute(
                "UPDATE devices SET state = $2, updated_by = $3, updated_at = $4 WHERE id = $1",
                &[
                    &input.device_id,
                    &DeviceState::Requested.as_str(),
                    &input.updated_by,
                    &now,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        if updated == 0 {
            return Err(DomainError::DeviceNotFound(input.device_id));
        }

        let row = tx
            .query_one(
                "INSERT INTO requests (id, device_id, owner, requestor, note, created_at)
                 VALUES ($1, $2, $3, $4, $5, $6)
                 RETURNING id, device_id, owner, requestor, note, closed_at, created_at",
                &[
                    &input.request.request_id,
                    &input.device_id,
                    &input.request.owner,
                    &input.request.requestor,
                    &input.request.note,
                    &now,
                ],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!("created request {} for device {}", input.request.request_id, input.device_id);

        Ok(Request {
            id: row.get("id"),
            device_id: row.get("device_id"),
            owner: row.get("owner"),
            requestor: row.get("requestor"),
            note: row.get("note"),
            closed_at: row.get("closed_at"),
            created_at: Some(row.get("created_at")),
        })
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    async fn delete_device(&self, input: DeleteDeviceRepoInput) -> DomainResult<bool> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let deleted = conn
            .execute("DELETE FROM devices WHERE id = $1", &[&input.device_id])
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(deleted, "deleted device: {}", input.device_id);
        Ok(deleted > 0)
    }
}
