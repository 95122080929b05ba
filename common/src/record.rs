use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tipo de entidad de una fila (columna `Type`).
///
/// Se compara el texto exacto (sensible a mayúsculas, sin trim);
/// cualquier otro valor, incluido el vacío, cae en `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityType {
    Schedule,
    JobStepDefinition,
    JobDefinition,
    Other(String),
}

impl EntityType {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "Schedule" => EntityType::Schedule,
            "JobStepDefinition" => EntityType::JobStepDefinition,
            "JobDefinition" => EntityType::JobDefinition,
            other => EntityType::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EntityType::Schedule => "Schedule",
            EntityType::JobStepDefinition => "JobStepDefinition",
            EntityType::JobDefinition => "JobDefinition",
            EntityType::Other(raw) => raw,
        }
    }
}

/// Representación textual de un valor escalar.
///   - string: tal cual
///   - número: su texto canónico (12345 -> "12345")
///   - null: ""
pub fn value_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// Una fila de entrada. No se modifica después de leerse.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub name: String,
    pub entity_type: EntityType,
    /// Valor crudo; se convierte a texto recién en la agregación.
    pub recipient: Value,
    /// Todas las celdas de la fila, alineadas con `Table::columns`.
    pub cells: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn view(&self) -> TableView {
        TableView {
            columns: self.columns.clone(),
            rows: self
                .records
                .iter()
                .map(|r| r.cells.iter().map(value_text).collect())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnotatedRecord {
    pub record: Record,
    pub report: String,
    pub job: String,
}

/// Tabla original + columna `Report`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnnotatedTable {
    pub columns: Vec<String>,
    pub records: Vec<AnnotatedRecord>,
}

impl AnnotatedTable {
    pub fn view(&self) -> TableView {
        TableView {
            columns: self.columns.clone(),
            rows: self
                .records
                .iter()
                .map(|r| {
                    let mut row: Vec<String> = r.record.cells.iter().map(value_text).collect();
                    row.push(r.report.clone());
                    row
                })
                .collect(),
        }
    }
}

/// Fila del resultado agregado, una por valor distinto de `Report`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportGroup {
    pub report: String,
    pub schedule_recipients: String,
    pub jobstepdefinition_recipients: String,
    pub jobs: String,
}

pub const REPORT_COLUMNS: [&str; 4] = [
    "Report",
    "schedule_recipients",
    "jobstepdefinition_recipients",
    "jobs",
];

impl ReportGroup {
    pub fn to_row(&self) -> [&str; 4] {
        [
            &self.report,
            &self.schedule_recipients,
            &self.jobstepdefinition_recipients,
            &self.jobs,
        ]
    }
}

pub fn groups_view(groups: &[ReportGroup]) -> TableView {
    TableView {
        columns: REPORT_COLUMNS.iter().map(|c| c.to_string()).collect(),
        rows: groups
            .iter()
            .map(|g| g.to_row().iter().map(|s| s.to_string()).collect())
            .collect(),
    }
}

/// Vista sólo-texto de una tabla, para HTML / API / CLI.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TableView {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn entity_type_parsea_texto_exacto() {
        assert_eq!(EntityType::parse("Schedule"), EntityType::Schedule);
        assert_eq!(
            EntityType::parse("JobStepDefinition"),
            EntityType::JobStepDefinition
        );
        assert_eq!(EntityType::parse("JobDefinition"), EntityType::JobDefinition);

        // sensible a mayúsculas y sin trim
        assert_eq!(
            EntityType::parse("schedule"),
            EntityType::Other("schedule".to_string())
        );
        assert_eq!(
            EntityType::parse(" Schedule"),
            EntityType::Other(" Schedule".to_string())
        );
        assert_eq!(EntityType::parse("").as_str(), "");
    }

    #[test]
    fn value_text_convierte_escalares() {
        assert_eq!(value_text(&json!("a@x.com")), "a@x.com");
        assert_eq!(value_text(&json!(12345)), "12345");
        assert_eq!(value_text(&json!(1.5)), "1.5");
        assert_eq!(value_text(&json!(true)), "true");
        assert_eq!(value_text(&Value::Null), "");
    }

    #[test]
    fn annotated_view_agrega_columna_report() {
        let record = Record {
            name: "Weekly".to_string(),
            entity_type: EntityType::Schedule,
            recipient: json!("a@x.com"),
            cells: vec![json!("Weekly"), json!("Schedule"), json!("a@x.com")],
        };
        let table = AnnotatedTable {
            columns: vec![
                "Name".to_string(),
                "Type".to_string(),
                "Recipient".to_string(),
                "Report".to_string(),
            ],
            records: vec![AnnotatedRecord {
                record,
                report: "Weekly".to_string(),
                job: String::new(),
            }],
        };

        let view = table.view();
        assert_eq!(view.columns.len(), 4);
        assert_eq!(view.rows, vec![vec!["Weekly", "Schedule", "a@x.com", "Weekly"]]);
    }

    #[test]
    fn groups_view_usa_encabezados_de_salida() {
        let view = groups_view(&[]);
        assert_eq!(
            view.columns,
            vec![
                "Report",
                "schedule_recipients",
                "jobstepdefinition_recipients",
                "jobs"
            ]
        );
        assert!(view.rows.is_empty());
    }
}
