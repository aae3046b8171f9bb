use serde::{Deserialize, Serialize};

use crate::job::JobId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResults {
    pub job_id: JobId,
    /// Directorio donde quedaron los outputs de este job
    pub output_dir: String,
    /// Archivos de salida de los reduces que ya existen en output_dir
    pub files: Vec<String>,
}
