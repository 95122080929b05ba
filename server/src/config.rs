use std::env;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_RUNS_IN_MEM: usize = 64;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Configuración del servidor, leída una vez al arrancar.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Cuántas corridas se guardan en memoria para poder descargarlas.
    pub max_runs: usize,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            max_runs: DEFAULT_MAX_RUNS_IN_MEM,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// - BIND_ADDR (default 0.0.0.0:8080)
    /// - MAX_RUNS_IN_MEM (default 64, mínimo 1)
    /// - MAX_UPLOAD_BYTES (default 10 MiB)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parse = |key: &str| lookup(key).and_then(|s| s.trim().parse::<usize>().ok());

        Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or(defaults.bind_addr),
            max_runs: parse("MAX_RUNS_IN_MEM").unwrap_or(defaults.max_runs).max(1),
            max_upload_bytes: parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
        }
    }
}
