use crate::record::EntityType;

/// Resultado de clasificar una fila: clave de agrupación y nombre de job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Classification {
    pub report: String,
    pub job: String,
}

/// Segmento antes del primer '-', sin espacios alrededor.
/// Sin '-' devuelve el nombre completo (recortado).
pub fn first_segment(name: &str) -> &str {
    name.split('-').next().unwrap_or(name).trim()
}

/// Segmento después del último '-', sin espacios alrededor.
pub fn last_segment(name: &str) -> &str {
    name.rsplit('-').next().unwrap_or(name).trim()
}

/// Deriva (Report, Job) a partir de `Name` y `Type`. Nunca falla.
///
/// | Type              | Report              | Job                  |
/// |-------------------|---------------------|----------------------|
/// | Schedule          | Name                | ""                   |
/// | JobStepDefinition | último segmento     | primer segmento      |
/// | JobDefinition     | ""                  | Name                 |
/// | otro              | ""                  | ""                   |
///
/// Los guiones no se pueden escapar: un '-' dentro del dato se toma como separador.
pub fn classify(name: &str, entity_type: &EntityType) -> Classification {
    match entity_type {
        EntityType::Schedule => Classification {
            report: name.to_string(),
            job: String::new(),
        },
        EntityType::JobStepDefinition => Classification {
            report: last_segment(name).to_string(),
            job: first_segment(name).to_string(),
        },
        EntityType::JobDefinition => Classification {
            report: String::new(),
            job: name.to_string(),
        },
        EntityType::Other(_) => Classification::default(),
    }
}
