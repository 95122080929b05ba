use common::{RunInfo, TableView, REQUIRED_COLUMNS};
use serde::Serialize;
use tera::{Context, Tera};

const PAGE_TEMPLATE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Report Column Generator &amp; Aggregator</title>
  <style>
    body { font-family: sans-serif; margin: 2rem; }
    table { border-collapse: collapse; margin-bottom: 1.5rem; }
    th, td { border: 1px solid #ccc; padding: 0.25rem 0.5rem; text-align: left; }
    .error { color: #b00020; font-weight: bold; }
  </style>
</head>
<body>
  <h1>Report Column Generator &amp; Aggregator</h1>
  <p>Upload a CSV file with columns: {{ required_columns | join(sep=", ") }}</p>
  <form action="/upload" method="post" enctype="multipart/form-data">
    <input type="file" name="file" accept=".csv">
    <button type="submit">Upload</button>
  </form>
  {% if error %}
  <p class="error">{{ error }}</p>
  {% if missing %}<p>Missing columns: {{ missing | join(sep=", ") }}</p>{% endif %}
  {% endif %}
  {% for section in sections %}
  <h2>{{ section.title }}</h2>
  <table>
    <thead><tr>{% for col in section.table.columns %}<th>{{ col }}</th>{% endfor %}</tr></thead>
    <tbody>
    {% for row in section.table.rows %}<tr>{% for cell in row %}<td>{{ cell }}</td>{% endfor %}</tr>
    {% endfor %}
    </tbody>
  </table>
  {% endfor %}
  {% if download_url %}
  <p><a href="{{ download_url | safe }}" download>Download Aggregated Data as CSV</a></p>
  {% endif %}
</body>
</html>
"#;

#[derive(Serialize)]
struct Section<'a> {
    title: &'static str,
    table: &'a TableView,
}

/// Plantillas HTML de la página de carga / resultados.
/// El nombre termina en .html, así que Tera escapa todo el contenido.
pub struct Views {
    tera: Tera,
}

impl Views {
    pub fn new() -> Result<Self, tera::Error> {
        let mut tera = Tera::default();
        tera.add_raw_template("page.html", PAGE_TEMPLATE)?;
        Ok(Self { tera })
    }

    fn base_context() -> Context {
        let mut ctx = Context::new();
        ctx.insert("required_columns", &REQUIRED_COLUMNS);
        ctx.insert("error", &Option::<String>::None);
        ctx.insert("missing", &Vec::<String>::new());
        ctx.insert("sections", &Vec::<Section>::new());
        ctx.insert("download_url", &Option::<String>::None);
        ctx
    }

    pub fn index(&self) -> Result<String, tera::Error> {
        self.tera.render("page.html", &Self::base_context())
    }

    pub fn error(&self, message: &str, missing: &[String]) -> Result<String, tera::Error> {
        let mut ctx = Self::base_context();
        ctx.insert("error", message);
        ctx.insert("missing", missing);
        self.tera.render("page.html", &ctx)
    }

    pub fn results(&self, run: &RunInfo) -> Result<String, tera::Error> {
        let sections = vec![
            Section {
                title: "Original Data:",
                table: &run.original,
            },
            Section {
                title: "Processed Data:",
                table: &run.annotated,
            },
            Section {
                title: "Aggregated Data by Report:",
                table: &run.aggregated,
            },
        ];

        let mut ctx = Self::base_context();
        ctx.insert("sections", &sections);
        ctx.insert(
            "download_url",
            &format!("/api/v1/runs/{}/download", run.id),
        );
        self.tera.render("page.html", &ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::{read_csv_table, run_pipeline};

    fn run_info(data: &str) -> RunInfo {
        let output = run_pipeline(read_csv_table(data.as_bytes()).unwrap());
        RunInfo::new(None, &output)
    }

    #[test]
    fn index_muestra_formulario_sin_tablas() {
        let html = Views::new().unwrap().index().unwrap();

        assert!(html.contains("Upload a CSV file with columns: Name, Type, Recipient"));
        assert!(html.contains(r#"accept=".csv""#));
        assert!(!html.contains("<table>"));
        assert!(!html.contains("Download Aggregated Data as CSV"));
    }

    #[test]
    fn results_muestra_tres_tablas_y_link_de_descarga() {
        let run = run_info("Name,Type,Recipient\nWeekly,Schedule,a@x.com\n");
        let html = Views::new().unwrap().results(&run).unwrap();

        assert!(html.contains("Original Data:"));
        assert!(html.contains("Processed Data:"));
        assert!(html.contains("Aggregated Data by Report:"));
        assert_eq!(html.matches("<table>").count(), 3);
        assert!(html.contains(&format!("/api/v1/runs/{}/download", run.id)));
    }

    #[test]
    fn results_escapa_html_de_las_celdas() {
        let run = run_info("Name,Type,Recipient\n<b>x</b>,Schedule,a@x.com\n");
        let html = Views::new().unwrap().results(&run).unwrap();

        assert!(!html.contains("<b>x</b>"));
        assert!(html.contains("&lt;b&gt;"));
    }

    #[test]
    fn error_muestra_mensaje_y_columnas_faltantes() {
        let html = Views::new()
            .unwrap()
            .error(
                "The uploaded file does not have the required columns.",
                &["Type".to_string()],
            )
            .unwrap();

        assert!(html.contains("The uploaded file does not have the required columns."));
        assert!(html.contains("Missing columns: Type"));
    }
}
