use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::PipelineOutput;
use crate::record::{groups_view, TableView};

pub type RunId = String;

/// Una corrida del pipeline: un archivo subido -> tres tablas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunInfo {
    pub id: RunId,
    /// Nombre del archivo subido (si vino en la carga)
    pub file_name: Option<String>,
    pub submitted_at: DateTime<Utc>,

    pub total_rows: usize,
    pub report_count: usize,

    pub original: TableView,
    pub annotated: TableView,
    pub aggregated: TableView,
}

impl RunInfo {
    pub fn new(file_name: Option<String>, output: &PipelineOutput) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_name,
            submitted_at: Utc::now(),
            total_rows: output.original.len(),
            report_count: output.groups.len(),
            original: output.original.view(),
            annotated: output.annotated.view(),
            aggregated: groups_view(&output.groups),
        }
    }
}

/// Cuerpo JSON de error de la API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunErrorBody {
    pub error: String,
    #[serde(default)]
    pub missing: Vec<String>,
}
