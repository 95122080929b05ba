use anyhow::Context;
use std::{
    collections::{HashMap, HashSet},
    fs::{self, File},
    io::BufWriter,
    path::Path,
};
use tracing::debug;

use crate::classify::classify;
use crate::io::{read_csv_file, write_report_csv};
use crate::record::{
    value_text, AnnotatedRecord, AnnotatedTable, EntityType, ReportGroup, Table,
};

/// Nombre de la columna que agrega `annotate`.
pub const REPORT_COLUMN: &str = "Report";

/// Las tres tablas de una corrida: original, anotada y agregada.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub original: Table,
    pub annotated: AnnotatedTable,
    pub groups: Vec<ReportGroup>,
}

/* =========================
   Anotación
   ========================= */

/// Agrega `Report` (y guarda `Job`) a cada fila, sin filtrar ni reordenar.
/// No toca la tabla de entrada.
pub fn annotate(table: &Table) -> AnnotatedTable {
    let mut columns = table.columns.clone();
    columns.push(REPORT_COLUMN.to_string());

    let records = table
        .records
        .iter()
        .map(|rec| {
            let c = classify(&rec.name, &rec.entity_type);
            AnnotatedRecord {
                record: rec.clone(),
                report: c.report,
                job: c.job,
            }
        })
        .collect();

    AnnotatedTable { columns, records }
}

/* =========================
   Agregación por Report
   ========================= */

/// Acumulador de un grupo: dos listas de destinatarios y la lista
/// de jobs sin repetidos (con su set auxiliar).
struct GroupAccumulator {
    report: String,
    schedule_recipients: Vec<String>,
    jobstep_recipients: Vec<String>,
    jobs: Vec<String>,
    seen_jobs: HashSet<String>,
}

impl GroupAccumulator {
    fn new(report: &str) -> Self {
        Self {
            report: report.to_string(),
            schedule_recipients: Vec::new(),
            jobstep_recipients: Vec::new(),
            jobs: Vec::new(),
            seen_jobs: HashSet::new(),
        }
    }

    fn add(&mut self, entity_type: &EntityType, recipient: String, job: &str) {
        match entity_type {
            EntityType::Schedule => self.schedule_recipients.push(recipient),
            EntityType::JobStepDefinition => self.jobstep_recipients.push(recipient),
            _ => {}
        }

        if !job.trim().is_empty() && self.seen_jobs.insert(job.to_string()) {
            self.jobs.push(job.to_string());
        }
    }

    fn finish(self) -> ReportGroup {
        ReportGroup {
            report: self.report,
            schedule_recipients: self.schedule_recipients.join(", "),
            jobstepdefinition_recipients: self.jobstep_recipients.join(", "),
            jobs: self.jobs.join(", "),
        }
    }
}

/// Agrupa las filas con `Report` no vacío.
///
/// Una sola pasada: mapa Report -> posición del acumulador, y los
/// acumuladores en un Vec para emitir en orden de primera aparición.
/// La clave se compara exacta (sin trim, sensible a mayúsculas).
pub fn aggregate(table: &AnnotatedTable) -> Vec<ReportGroup> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<GroupAccumulator> = Vec::new();
    let mut skipped = 0usize;

    for row in &table.records {
        if row.report.is_empty() {
            skipped += 1;
            continue;
        }

        let pos = *index.entry(row.report.as_str()).or_insert_with(|| {
            groups.push(GroupAccumulator::new(&row.report));
            groups.len() - 1
        });

        groups[pos].add(
            &row.record.entity_type,
            value_text(&row.record.recipient),
            &row.job,
        );
    }

    debug!(
        "agregación: {} grupos, {} filas sin report descartadas",
        groups.len(),
        skipped
    );

    groups.into_iter().map(GroupAccumulator::finish).collect()
}

/* =========================
   Pipeline completo
   ========================= */

/// annotate -> aggregate sobre una tabla ya validada.
pub fn run_pipeline(table: Table) -> PipelineOutput {
    let annotated = annotate(&table);
    let groups = aggregate(&annotated);

    PipelineOutput {
        original: table,
        annotated,
        groups,
    }
}

/// Lee `input_path`, corre el pipeline y escribe el CSV agregado en `output_path`.
pub fn process_csv_file(input_path: &str, output_path: &str) -> anyhow::Result<PipelineOutput> {
    let table = read_csv_file(input_path)
        .with_context(|| format!("no se pudo leer {}", input_path))?;

    let output = run_pipeline(table);

    if let Some(parent) = Path::new(output_path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("no se pudo crear {}", parent.display()))?;
        }
    }

    let out = File::create(output_path)
        .with_context(|| format!("no se pudo crear {}", output_path))?;
    write_report_csv(BufWriter::new(out), &output.groups)?;

    Ok(output)
}
