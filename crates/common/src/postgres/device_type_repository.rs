use crate::domain::{
    CreateDeviceTypeRepoInput, DeviceType, DeviceTypeRepository, DomainError, DomainResult,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, instrument};

/// PostgreSQL implementation of DeviceTypeRepository trait
#[derive(Clone)]
pub struct PostgresDeviceTypeRepository {
    client: PostgresClient,
}

impl PostgresDeviceTypeRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DeviceTypeRepository for PostgresDeviceTypeRepository {
    #[instrument(skip(self, input), fields(id = %input.id, name = %input.name))]
    async fn create_device_type(
        &self,
        input: CreateDeviceTypeRepoInput,
    ) -> DomainResult<DeviceType> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        let result = conn
            .execute(
                "INSERT INTO device_types (id, name, created_at) VALUES ($1, $2, $3)",
                &[&input.id, &input.name, &now],
            )
            .await;

        if let Err(e) = result {
            if let Some(db_err) = e.as_db_error() {
                // PostgreSQL error code 23505 is unique_violation
                if db_err.code().code() == "23505" {
                    return Err(DomainError::DeviceTypeAlreadyExists(input.name));
                }
            }
            return Err(DomainError::RepositoryError(e.into()));
        }

        debug!("created device type: {}", input.name);

        Ok(DeviceType {
            id: input.id,
            name: input.name,
            created_at: Some(now),
        })
    }

    #[instrument(skip(self))]
    async fn list_device_types(&self) -> DomainResult<Vec<DeviceType>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, name, created_at FROM device_types ORDER BY name ASC",
                &[],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| DeviceType {
                id: row.get("id"),
                name: row.get("name"),
                created_at: Some(row.get("created_at")),
            })
            .collect())
    }
}
