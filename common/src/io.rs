use serde_json::{Map, Value};
use std::{
    fs::File,
    io::{self, BufReader, Read, Write},
};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::record::{value_text, EntityType, Record, ReportGroup, Table, REPORT_COLUMNS};

/// Columnas que todo archivo de entrada tiene que traer.
pub const REQUIRED_COLUMNS: [&str; 3] = ["Name", "Type", "Recipient"];

/// Nombre sugerido para la descarga del resultado agregado.
pub const DOWNLOAD_FILE_NAME: &str = "aggregated_data.csv";
pub const CSV_MIME: &str = "text/csv";

/// Posición de cada columna obligatoria dentro del encabezado.
#[derive(Debug, Clone, Copy)]
struct ColumnIndex {
    name: usize,
    entity_type: usize,
    recipient: usize,
}

fn index_required_columns(columns: &[String]) -> Result<ColumnIndex> {
    let position = |col: &str| columns.iter().position(|c| c == col);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| position(**col).is_none())
        .map(|col| col.to_string())
        .collect();

    match (position("Name"), position("Type"), position("Recipient")) {
        (Some(name), Some(entity_type), Some(recipient)) => Ok(ColumnIndex {
            name,
            entity_type,
            recipient,
        }),
        _ => Err(PipelineError::Schema { missing }),
    }
}

fn build_record(index: ColumnIndex, cells: Vec<Value>) -> Record {
    let cell = |i: usize| cells.get(i).cloned().unwrap_or(Value::Null);

    Record {
        name: value_text(&cell(index.name)),
        entity_type: EntityType::parse(&value_text(&cell(index.entity_type))),
        recipient: cell(index.recipient),
        cells,
    }
}

/// Lee un CSV (primera fila = encabezados) y valida el esquema.
///
/// - Un BOM al inicio del encabezado se descarta.
/// - Los valores NO se recortan: "Schedule " no es "Schedule".
/// - Filas cortas se completan con celdas vacías; las celdas sobrantes se ignoran.
pub fn read_csv_table<R: Read>(reader: R) -> Result<Table> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns: Vec<String> = rdr
        .headers()?
        .iter()
        .enumerate()
        .map(|(i, h)| {
            if i == 0 {
                h.trim_start_matches('\u{feff}').to_string()
            } else {
                h.to_string()
            }
        })
        .collect();

    let index = index_required_columns(&columns)?;

    let mut records = Vec::new();
    for row in rdr.records() {
        let row = row?;
        let cells: Vec<Value> = (0..columns.len())
            .map(|i| Value::String(row.get(i).unwrap_or("").to_string()))
            .collect();
        records.push(build_record(index, cells));
    }

    debug!("leídas {} filas CSV ({} columnas)", records.len(), columns.len());
    Ok(Table { columns, records })
}

pub fn read_csv_file(path: &str) -> Result<Table> {
    let file = File::open(path)?;
    read_csv_table(BufReader::new(file))
}

/// Construye una tabla desde objetos JSON (entrada de la API).
/// Las columnas son la unión de claves en orden de aparición;
/// una clave ausente en una fila se lee como null.
pub fn table_from_json(rows: Vec<Map<String, Value>>) -> Result<Table> {
    let mut columns: Vec<String> = Vec::new();
    for row in &rows {
        for key in row.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let index = index_required_columns(&columns)?;

    let records = rows
        .into_iter()
        .map(|row| {
            let cells = columns
                .iter()
                .map(|c| row.get(c).cloned().unwrap_or(Value::Null))
                .collect();
            build_record(index, cells)
        })
        .collect();

    Ok(Table { columns, records })
}

/// Escribe el resultado agregado como CSV.
/// El encabezado se escribe siempre, aunque no haya grupos.
pub fn write_report_csv<W: Write>(writer: W, groups: &[ReportGroup]) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(writer);

    wtr.write_record(REPORT_COLUMNS)?;
    for group in groups {
        wtr.write_record(group.to_row())?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn report_csv_string(groups: &[ReportGroup]) -> Result<String> {
    let mut buf = Vec::new();
    write_report_csv(&mut buf, groups)?;
    String::from_utf8(buf).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::{env, fs, io::Write, path::PathBuf};

    fn temp_dir(sub: &str) -> PathBuf {
        let base = env::temp_dir().join("report_io_tests").join(sub);
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        base
    }

    fn group(report: &str, sched: &str, steps: &str, jobs: &str) -> ReportGroup {
        ReportGroup {
            report: report.to_string(),
            schedule_recipients: sched.to_string(),
            jobstepdefinition_recipients: steps.to_string(),
            jobs: jobs.to_string(),
        }
    }

    #[test]
    fn read_csv_table_lee_columnas_y_tipos() {
        let data = "Name,Type,Recipient\nWeekly,Schedule,a@x.com\nETL-Weekly,JobStepDefinition,12345\n";

        let table = read_csv_table(data.as_bytes()).unwrap();

        assert_eq!(table.columns, vec!["Name", "Type", "Recipient"]);
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].name, "Weekly");
        assert_eq!(table.records[0].entity_type, EntityType::Schedule);
        assert_eq!(table.records[1].entity_type, EntityType::JobStepDefinition);
        assert_eq!(table.records[1].recipient, json!("12345"));
    }

    #[test]
    fn read_csv_table_acepta_columnas_extra_en_cualquier_orden() {
        let data = "Id,Recipient,Owner,Type,Name\n1,a@x.com,ana,Schedule,Weekly\n";

        let table = read_csv_table(data.as_bytes()).unwrap();
        let rec = &table.records[0];

        assert_eq!(rec.name, "Weekly");
        assert_eq!(rec.entity_type, EntityType::Schedule);
        assert_eq!(rec.recipient, json!("a@x.com"));
        assert_eq!(rec.cells.len(), 5);
        assert_eq!(table.view().rows[0], vec!["1", "a@x.com", "ana", "Schedule", "Weekly"]);
    }

    #[test]
    fn read_csv_table_reporta_columnas_faltantes() {
        let data = "Name,Recipient\nWeekly,a@x.com\n";

        let err = read_csv_table(data.as_bytes()).unwrap_err();

        assert!(err.is_schema());
        assert_eq!(err.missing_columns(), ["Type"]);
    }

    #[test]
    fn read_csv_table_vacio_es_error_de_esquema() {
        let err = read_csv_table("".as_bytes()).unwrap_err();
        assert_eq!(err.missing_columns(), ["Name", "Type", "Recipient"]);
    }

    #[test]
    fn read_csv_table_solo_encabezado_da_tabla_vacia() {
        let table = read_csv_table("Name,Type,Recipient\n".as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn read_csv_table_no_recorta_ni_falla_con_filas_cortas() {
        let data = "\u{feff}Name,Type,Recipient\nWeekly,Schedule \nOther\n";

        let table = read_csv_table(data.as_bytes()).unwrap();

        assert_eq!(table.columns[0], "Name");
        assert_eq!(
            table.records[0].entity_type,
            EntityType::Other("Schedule ".to_string())
        );
        assert_eq!(table.records[0].recipient, json!(""));
        assert_eq!(table.records[1].name, "Other");
        assert_eq!(table.records[1].entity_type, EntityType::Other(String::new()));
    }

    #[test]
    fn read_csv_table_ignora_lineas_vacias() {
        let data = "\u{feff}Name,Type,Recipient\r\n\r\n\
                    Weekly Report,Schedule,a@x.com\r\n\r\n\
                    ETL-Weekly Report,JobStepDefinition,12345\r\n\r\n\r\n";

        let table = read_csv_table(data.as_bytes()).unwrap();

        assert_eq!(table.columns[0], "Name");
        assert_eq!(table.len(), 2);
        assert_eq!(table.records[0].name, "Weekly Report");
        assert_eq!(table.records[1].recipient, json!("12345"));
    }

    #[test]
    fn read_csv_table_respeta_comillas() {
        let data = "Name,Type,Recipient\n\"ETL-LOAD-Report, Q1\",JobStepDefinition,\"a@x.com, b@x.com\"\n";

        let table = read_csv_table(data.as_bytes()).unwrap();

        assert_eq!(table.records[0].name, "ETL-LOAD-Report, Q1");
        assert_eq!(table.records[0].recipient, json!("a@x.com, b@x.com"));
    }

    #[test]
    fn read_csv_file_lee_desde_disco() {
        let tmp = temp_dir("read_file");
        let path = tmp.join("in.csv");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(f, "Name,Type,Recipient").unwrap();
        writeln!(f, "Weekly,Schedule,a@x.com").unwrap();

        let table = read_csv_file(path.to_str().unwrap()).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_from_json_une_claves_y_conserva_valores_crudos() {
        let rows = vec![
            json!({"Name": "Weekly", "Type": "Schedule", "Recipient": 12345}),
            json!({"Name": "X", "Type": "JobDefinition", "Recipient": null, "Extra": 1}),
        ]
        .into_iter()
        .map(|v| v.as_object().unwrap().clone())
        .collect();

        let table = table_from_json(rows).unwrap();

        assert_eq!(table.columns, vec!["Name", "Type", "Recipient", "Extra"]);
        assert_eq!(table.records[0].recipient, json!(12345));
        assert_eq!(table.records[0].cells[3], Value::Null);
        assert_eq!(table.records[1].entity_type, EntityType::JobDefinition);
    }

    #[test]
    fn table_from_json_sin_filas_es_error_de_esquema() {
        let err = table_from_json(Vec::new()).unwrap_err();
        assert!(err.is_schema());
    }

    #[test]
    fn write_report_csv_escribe_encabezado_y_comillas() {
        let groups = vec![
            group("Weekly Report", "a@x.com, c@x.com", "b@x.com", "ETL"),
            group("Daily", "", "d@x.com", "LOAD, SYNC"),
        ];

        let out = report_csv_string(&groups).unwrap();

        assert_eq!(
            out,
            "Report,schedule_recipients,jobstepdefinition_recipients,jobs\n\
             Weekly Report,\"a@x.com, c@x.com\",b@x.com,ETL\n\
             Daily,,d@x.com,\"LOAD, SYNC\"\n"
        );
    }

    #[test]
    fn write_report_csv_sin_grupos_deja_solo_encabezado() {
        let out = report_csv_string(&[]).unwrap();
        assert_eq!(
            out,
            "Report,schedule_recipients,jobstepdefinition_recipients,jobs\n"
        );
    }
}
