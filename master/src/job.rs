use anyhow::{Context, Result};
use chrono::Utc;
use common::{JobInfo, JobPhase, JobRequest, JobStatus};
use glob::glob;
use tracing::{info, warn};

use crate::schedule::schedule;
use crate::state::AppState;

/// Expande `input_glob` a la lista de archivos de entrada (uno por tarea map),
/// ordenada para que los números de tarea sean estables.
pub fn expand_inputs(pattern: &str) -> Result<Vec<String>> {
    let mut files = Vec::new();

    let entries =
        glob(pattern).with_context(|| format!("patrón input_glob inválido: {}", pattern))?;
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path.to_string_lossy().to_string()),
            Ok(_) => {}
            Err(e) => warn!("ignorando entrada ilegible del glob: {}", e),
        }
    }

    files.sort();
    Ok(files)
}

pub fn new_job(id: String, req: JobRequest, input_files: Vec<String>, output_dir: &str) -> JobInfo {
    let total_tasks = input_files.len() + req.n_reduce;

    JobInfo {
        id,
        name: req.name,
        status: JobStatus::Accepted,
        phase: None,
        input_files,
        n_reduce: req.n_reduce,
        output_dir: output_dir.to_string(),
        submitted_at: Utc::now(),
        started_at: None,
        finished_at: None,
        total_tasks,
    }
}

/// Corre un job completo: fase map y después fase reduce, cada una con un
/// feed nuevo de workers. Espera su turno si hay otro job corriendo.
pub async fn run_job(state: AppState, job_id: String) {
    let _turn = state.job_lock.lock().await;

    let (input_files, n_reduce) = {
        let jobs = state.jobs.lock().unwrap();
        match jobs.get(&job_id) {
            Some(job) => (job.input_files.clone(), job.n_reduce),
            None => {
                warn!("job {} desapareció antes de arrancar", job_id);
                return;
            }
        }
    };

    state.update_job(&job_id, |job| {
        job.status = JobStatus::Running;
        job.started_at = Some(Utc::now());
    });
    info!(
        "job {}: {} archivos de entrada, {} reduces",
        job_id,
        input_files.len(),
        n_reduce
    );

    for phase in [JobPhase::Map, JobPhase::Reduce] {
        state.update_job(&job_id, |job| job.phase = Some(phase));

        let mut feed = state.registry.feed(state.config.feed_capacity);
        schedule(
            &job_id,
            &input_files,
            n_reduce,
            phase,
            &mut feed,
            state.invoker.clone(),
        )
        .await;
    }

    state.update_job(&job_id, |job| {
        job.status = JobStatus::Succeeded;
        job.phase = None;
        job.finished_at = Some(Utc::now());
    });
    info!("job {} terminado", job_id);
}
