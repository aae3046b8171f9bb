// master/src/state.rs

use common::{JobId, JobInfo};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use crate::config::MasterConfig;
use crate::invoker::TaskInvoker;
use crate::registry::WorkerRegistry;

#[derive(Clone)]
pub struct AppState {
    pub jobs: Arc<Mutex<HashMap<JobId, JobInfo>>>,
    pub registry: WorkerRegistry,
    pub invoker: Arc<dyn TaskInvoker>,
    pub config: Arc<MasterConfig>,
    // los jobs corren de a uno: comparten el mismo pool de workers
    pub job_lock: Arc<tokio::sync::Mutex<()>>,
}

impl AppState {
    pub fn new(config: MasterConfig, invoker: Arc<dyn TaskInvoker>) -> Self {
        Self {
            jobs: Arc::new(Mutex::new(HashMap::new())),
            registry: WorkerRegistry::new(),
            invoker,
            config: Arc::new(config),
            job_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Aplica `f` al job si existe.
    pub fn update_job<F>(&self, job_id: &str, f: F)
    where
        F: FnOnce(&mut JobInfo),
    {
        let mut jobs = self.jobs.lock().unwrap();
        if let Some(job) = jobs.get_mut(job_id) {
            f(job);
        }
    }
}
