use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};

use crate::phase::JobPhase;

pub type JobId = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRequest {
    pub name: String,

    /// Patrón de archivos de entrada, ej: "/data/input/*.txt".
    /// Cada archivo es una tarea map.
    pub input_glob: String,

    /// Cantidad de tareas reduce (particiones de salida)
    pub n_reduce: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Accepted,
    Running,
    Succeeded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobInfo {
    pub id: JobId,
    pub name: String,
    pub status: JobStatus,

    /// Fase en ejecución; None antes de arrancar y al terminar
    pub phase: Option<JobPhase>,

    /// Archivos que matchearon input_glob, ordenados
    pub input_files: Vec<String>,
    pub n_reduce: usize,
    pub output_dir: String,

    /// -------- Métricas del job --------
    pub submitted_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub total_tasks: usize,
}

/// Nombre del archivo intermedio que produce la tarea map `map_task`
/// para la tarea reduce `reduce_task`.
pub fn reduce_name(job_name: &str, map_task: usize, reduce_task: usize) -> String {
    format!("mrtmp.{}-{}-{}", job_name, map_task, reduce_task)
}

/// Nombre del archivo de salida de la tarea reduce `reduce_task`.
pub fn merge_name(job_name: &str, reduce_task: usize) -> String {
    format!("mrtmp.{}-res-{}", job_name, reduce_task)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_status_solo_tiene_estados_alcanzables() {
        let json = serde_json::to_string(&JobStatus::Succeeded).unwrap();
        assert_eq!(json, "\"SUCCEEDED\"");

        // un job no puede fallar: las tareas se reintentan hasta salir bien
        assert!(serde_json::from_str::<JobStatus>("\"FAILED\"").is_err());
    }

    #[test]
    fn nombres_de_archivos() {
        assert_eq!(reduce_name("wc", 2, 1), "mrtmp.wc-2-1");
        assert_eq!(merge_name("wc", 1), "mrtmp.wc-res-1");
    }
}
