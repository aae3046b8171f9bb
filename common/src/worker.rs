use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Dirección base del worker (ej: "http://worker-1:9000").
/// Para el master es opaca: sólo la usa para invocar tareas.
pub type WorkerAddr = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegisterRequest {
    pub addr: WorkerAddr,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRegisterResponse {
    pub ok: bool,
    /// Cantidad de workers registrados después de este registro
    pub workers: usize,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WorkerInfo {
    pub addr: WorkerAddr,
    pub registered_at: DateTime<Utc>,
}
