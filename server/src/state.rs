// server/src/state.rs

use common::{ReportGroup, RunId, RunInfo};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex, MutexGuard},
};

use crate::config::ServerConfig;
use crate::views::Views;

#[derive(Clone)]
pub struct AppState {
    pub runs: Arc<Mutex<RunStore>>,
    pub views: Arc<Views>,
}

impl AppState {
    pub fn new(config: &ServerConfig) -> Result<Self, tera::Error> {
        Ok(Self {
            runs: Arc::new(Mutex::new(RunStore::new(config.max_runs))),
            views: Arc::new(Views::new()?),
        })
    }

    /// Un lock envenenado se sigue usando.
    pub fn runs(&self) -> MutexGuard<'_, RunStore> {
        self.runs.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
pub struct StoredRun {
    pub info: RunInfo,
    // grupos sin renderizar, para generar el CSV de descarga
    pub groups: Vec<ReportGroup>,
}

/// Corridas recientes en memoria; al llenarse se descarta la más vieja.
#[derive(Debug)]
pub struct RunStore {
    runs: HashMap<RunId, StoredRun>,
    order: VecDeque<RunId>,
    capacity: usize,
}

impl RunStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            runs: HashMap::new(),
            order: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Guarda la corrida y devuelve el id desalojado, si hubo.
    pub fn insert(&mut self, run: StoredRun) -> Option<RunId> {
        let mut evicted = None;
        if self.order.len() >= self.capacity {
            if let Some(old) = self.order.pop_front() {
                self.runs.remove(&old);
                evicted = Some(old);
            }
        }

        self.order.push_back(run.info.id.clone());
        self.runs.insert(run.info.id.clone(), run);
        evicted
    }

    pub fn get(&self, id: &str) -> Option<&StoredRun> {
        self.runs.get(id)
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }
}
