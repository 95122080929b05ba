use thiserror::Error;

/// Errores del pipeline (lectura, validación de esquema y escritura).
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Al archivo le faltan columnas obligatorias; el pipeline no corre.
    #[error("The uploaded file does not have the required columns (missing: {})", .missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn is_schema(&self) -> bool {
        matches!(self, PipelineError::Schema { .. })
    }

    /// Columnas faltantes (vacío si el error no es de esquema).
    pub fn missing_columns(&self) -> &[String] {
        match self {
            PipelineError::Schema { missing } => missing,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_error_lista_columnas_faltantes() {
        let err = PipelineError::Schema {
            missing: vec!["Type".to_string(), "Recipient".to_string()],
        };

        assert!(err.is_schema());
        assert_eq!(err.missing_columns(), ["Type", "Recipient"]);
        assert!(err.to_string().contains("missing: Type, Recipient"));
    }

    #[test]
    fn errores_de_io_no_son_de_esquema() {
        let err = PipelineError::from(std::io::Error::new(std::io::ErrorKind::Other, "x"));
        assert!(!err.is_schema());
        assert!(err.missing_columns().is_empty());
    }
}
