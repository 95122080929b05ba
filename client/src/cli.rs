use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use common::{
    engine, PipelineError, RunErrorBody, RunInfo, TableView, CSV_MIME, DOWNLOAD_FILE_NAME,
};
use reqwest::{header, Client};
use std::{env, fs, path::Path};
use tracing::{debug, info};

/// URL base del servidor.
/// - En Docker: SERVER_URL=http://server:8080
/// - Local: default http://localhost:8080
fn server_base_url() -> String {
    env::var("SERVER_URL").unwrap_or_else(|_| "http://localhost:8080".to_string())
}

#[derive(Parser, Debug)]
#[command(name = "client")]
#[command(about = "Genera la columna Report y agrega destinatarios/jobs por Report")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Procesa un CSV local y escribe el resultado agregado
    Process {
        /// CSV de entrada con columnas Name, Type, Recipient
        #[arg(value_name = "INPUT_CSV")]
        input: String,

        /// Ruta del CSV agregado
        #[arg(long, default_value = DOWNLOAD_FILE_NAME)]
        output: String,

        /// Imprime las tablas original, procesada y agregada
        #[arg(long)]
        show: bool,
    },
    /// Sube un CSV al servidor
    Submit {
        #[arg(value_name = "INPUT_CSV")]
        input: String,
    },
    /// Consulta una corrida del servidor
    Status {
        #[arg(value_name = "RUN_ID")]
        id: String,
    },
    /// Descarga el CSV agregado de una corrida
    Download {
        #[arg(value_name = "RUN_ID")]
        id: String,

        #[arg(long, default_value = DOWNLOAD_FILE_NAME)]
        output: String,
    },
}

/// Imprime una tabla con columnas alineadas.
fn print_table(title: &str, table: &TableView) {
    println!("{}", title);

    let mut widths: Vec<usize> = table.columns.iter().map(|c| c.chars().count()).collect();
    for row in &table.rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(w) = widths.get_mut(i) {
                *w = (*w).max(cell.chars().count());
            }
        }
    }

    let fmt_row = |cells: &[String]| {
        cells
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths.get(i).copied().unwrap_or(0)))
            .collect::<Vec<_>>()
            .join(" | ")
    };

    println!("  {}", fmt_row(table.columns.as_slice()));
    if table.rows.is_empty() {
        println!("  (sin filas)");
    }
    for row in &table.rows {
        println!("  {}", fmt_row(row.as_slice()));
    }
    println!();
}

fn print_run(run: &RunInfo) {
    println!("Corrida:");
    println!("  id: {}", run.id);
    if let Some(ref name) = run.file_name {
        println!("  archivo: {}", name);
    }
    println!("  submitted_at: {}", run.submitted_at);
    println!("  filas: {}, reports: {}", run.total_rows, run.report_count);
    println!();
}

/// Mensaje de error del servidor (cuerpo RunErrorBody si se puede leer).
async fn server_error(resp: reqwest::Response) -> anyhow::Error {
    let status = resp.status();
    match resp.json::<RunErrorBody>().await {
        Ok(body) if !body.missing.is_empty() => anyhow::anyhow!(
            "{} (status {}, faltan: {})",
            body.error,
            status,
            body.missing.join(", ")
        ),
        Ok(body) => anyhow::anyhow!("{} (status {})", body.error, status),
        Err(_) => anyhow::anyhow!("error del servidor (status {})", status),
    }
}

/// Trae una corrida; cualquier respuesta que no sea 2xx es error.
async fn fetch_run(client: &Client, base_url: &str, id: &str) -> Result<RunInfo> {
    let url = format!("{}/api/v1/runs/{}", base_url, id);
    let resp = client.get(&url).send().await?;

    if !resp.status().is_success() {
        return Err(server_error(resp).await);
    }

    Ok(resp.json().await?)
}

fn process_local(input: &str, output: &str, show: bool) -> Result<()> {
    info!("procesando {} -> {}", input, output);

    let result = match engine::process_csv_file(input, output) {
        Ok(result) => result,
        Err(e) => {
            if let Some(PipelineError::Schema { missing }) = e.downcast_ref::<PipelineError>() {
                bail!(
                    "The uploaded file does not have the required columns. (faltan: {})",
                    missing.join(", ")
                );
            }
            return Err(e);
        }
    };

    if show {
        print_table("Original Data:", &result.original.view());
        print_table("Processed Data:", &result.annotated.view());
        print_table("Aggregated Data by Report:", &common::groups_view(&result.groups));
    }

    println!(
        "{} filas procesadas, {} reports. Archivo de salida: {}",
        result.original.len(),
        result.groups.len(),
        output
    );
    Ok(())
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let client = Client::new();
    let base_url = server_base_url();
    debug!("servidor: {}", base_url);

    match cli.command {
        Commands::Process {
            input,
            output,
            show,
        } => process_local(&input, &output, show)?,

        Commands::Submit { input } => {
            let data =
                fs::read(&input).with_context(|| format!("no se pudo leer {}", input))?;
            let file_name = Path::new(&input)
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| input.clone());

            let url = format!("{}/api/v1/runs", base_url);
            let resp = client
                .post(&url)
                .query(&[("file_name", file_name.as_str())])
                .header(header::CONTENT_TYPE, CSV_MIME)
                .body(data)
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(server_error(resp).await);
            }

            let run: RunInfo = resp.json().await?;
            print_run(&run);
            print_table("Aggregated Data by Report:", &run.aggregated);
        }

        Commands::Status { id } => {
            let run = fetch_run(&client, &base_url, &id).await?;
            print_run(&run);
            print_table("Aggregated Data by Report:", &run.aggregated);
        }

        Commands::Download { id, output } => {
            let url = format!("{}/api/v1/runs/{id}/download", base_url);
            let resp = client.get(&url).send().await?;

            if !resp.status().is_success() {
                return Err(server_error(resp).await);
            }

            let csv = resp.text().await?;
            fs::write(&output, csv).with_context(|| format!("no se pudo escribir {}", output))?;
            println!("CSV agregado guardado en {}", output);
        }
    }

    Ok(())
}
