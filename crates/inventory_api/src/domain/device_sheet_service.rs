use common::auth::Actor;
use common::domain::{
    CreateDeviceRepoInput, DeviceRepository, DeviceState, DomainError, DomainResult,
    EventRepository, RecordEventRepoInput,
};
use inventory_sheet::{export_devices, import_devices, ImportOptions, ImportedRow};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Notice shown after an import that found a worksheet, whatever the row outcomes
pub const IMPORT_NOTICE: &str = "Import successful, new records added to the database.";

/// How uploaded workbooks are turned into devices
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportConfig {
    pub skip_header_row: bool,
    /// Device type assigned to imported rows, which carry no type column
    pub default_device_type: Option<String>,
}

/// What happened to one worksheet row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RowOutcome {
    Imported { row_number: u32, device_id: String },
    Rejected { row_number: u32, errors: Vec<String> },
}

/// Result of an import: the compatibility notice plus per-row outcomes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub notice: String,
    pub imported: usize,
    pub rejected: usize,
    pub rows: Vec<RowOutcome>,
}

impl ImportReport {
    fn from_outcomes(rows: Vec<RowOutcome>) -> Self {
        let imported = rows
            .iter()
            .filter(|r| matches!(r, RowOutcome::Imported { .. }))
            .count();
        Self {
            notice: IMPORT_NOTICE.to_string(),
            imported,
            rejected: rows.len() - imported,
            rows,
        }
    }
}

/// Spreadsheet export and batch import of devices
pub struct DeviceSheetService {
    device_repository: Arc<dyn DeviceRepository>,
    event_repository: Arc<dyn EventRepository>,
    import_config: ImportConfig,
}

impl DeviceSheetService {
    pub fn new(
        device_repository: Arc<dyn DeviceRepository>,
        event_repository: Arc<dyn EventRepository>,
        import_config: ImportConfig,
    ) -> Self {
        Self {
            device_repository,
            event_repository,
            import_config,
        }
    }

    /// Every device rendered as workbook bytes
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn export(&self, actor: &Actor) -> DomainResult<Vec<u8>> {
        let devices = self.device_repository.list_devices().await?;
        Ok(export_devices(&devices)?)
    }

    /// Create one device per worksheet row. Rows that fail validation or
    /// storage are skipped and reported; the rest are created as available.
    #[instrument(skip(self, actor, bytes), fields(user_id = %actor.user_id, bytes = bytes.len()))]
    pub async fn import(&self, actor: &Actor, bytes: &[u8]) -> DomainResult<ImportReport> {
        let options = ImportOptions {
            skip_header_row: self.import_config.skip_header_row,
        };
        let rows = import_devices(bytes, options)?;
        debug!(rows = rows.len(), "importing worksheet rows");

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            outcomes.push(self.import_row(actor, row).await);
        }

        let report = ImportReport::from_outcomes(outcomes);
        info!(
            imported = report.imported,
            rejected = report.rejected,
            "Import finished"
        );
        Ok(report)
    }

    async fn import_row(&self, actor: &Actor, row: ImportedRow) -> RowOutcome {
        let row_number = row.row_number;
        match self.create_from_row(actor, row).await {
            Ok(device_id) => RowOutcome::Imported {
                row_number,
                device_id,
            },
            Err(e) => {
                warn!(row_number, error = %e, "skipping import row");
                let errors = match e {
                    DomainError::ValidationError(messages) => messages,
                    other => vec![other.user_message()],
                };
                RowOutcome::Rejected { row_number, errors }
            }
        }
    }

    async fn create_from_row(&self, actor: &Actor, row: ImportedRow) -> DomainResult<String> {
        let mut fields = row.fields;
        if fields.device_type.is_none() {
            fields.device_type = self.import_config.default_device_type.clone();
        }
        let (attributes, _) = fields.into_attributes()?;

        let device = self
            .device_repository
            .create_device(CreateDeviceRepoInput {
                device_id: xid::new().to_string(),
                attributes,
                state: Some(DeviceState::Available),
                created_by: actor.user_id.clone(),
            })
            .await?;

        self.event_repository
            .record_event(RecordEventRepoInput {
                device_id: device.id.clone(),
                message: format!("Device has been imported by {}", actor),
            })
            .await?;

        Ok(device.id)
    }
}
