use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{
    merge_name, JobInfo, JobRequest, JobResults, WorkerInfo, WorkerRegisterRequest,
    WorkerRegisterResponse,
};
use std::path::Path as FsPath;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::job::{expand_inputs, new_job, run_job};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/jobs", post(create_job))
        .route("/api/v1/jobs/:id", get(get_job))
        .route("/api/v1/jobs/:id/results", get(get_job_results))
        .route("/api/v1/workers", get(list_workers))
        .route("/api/v1/workers/register", post(register_worker))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/* ---------------- handlers HTTP ---------------- */

async fn health() -> &'static str {
    "ok"
}

// Crea un job: una tarea map por archivo que matchee input_glob y
// n_reduce tareas reduce. Arranca en segundo plano.
async fn create_job(
    State(state): State<AppState>,
    Json(req): Json<JobRequest>,
) -> Result<Json<JobInfo>, (StatusCode, String)> {
    if req.n_reduce == 0 {
        return Err((
            StatusCode::BAD_REQUEST,
            "n_reduce tiene que ser al menos 1".to_string(),
        ));
    }

    let input_files = expand_inputs(&req.input_glob).map_err(|e| {
        warn!("job rechazado: {:#}", e);
        (StatusCode::BAD_REQUEST, format!("{:#}", e))
    })?;

    let job_id = uuid::Uuid::new_v4().to_string();
    let job_info = new_job(job_id.clone(), req, input_files, &state.config.output_dir);

    info!(
        "job {} ({}) aceptado: {} maps, {} reduces",
        job_info.id,
        job_info.name,
        job_info.input_files.len(),
        job_info.n_reduce
    );

    {
        let mut jobs = state.jobs.lock().unwrap();
        jobs.insert(job_id.clone(), job_info.clone());
    }

    tokio::spawn(run_job(state.clone(), job_id));

    Ok(Json(job_info))
}

// Devuelve info básica de un job
async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobInfo>, StatusCode> {
    let jobs = state.jobs.lock().unwrap();

    if let Some(job) = jobs.get(&id) {
        Ok(Json(job.clone()))
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

// Lista los archivos de salida de los reduces que ya existen
async fn get_job_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<JobResults>, StatusCode> {
    let job = {
        let jobs = state.jobs.lock().unwrap();
        jobs.get(&id).cloned().ok_or(StatusCode::NOT_FOUND)?
    };

    let files = (0..job.n_reduce)
        .map(|r| merge_name(&job.id, r))
        .filter(|name| FsPath::new(&job.output_dir).join(name).is_file())
        .collect();

    Ok(Json(JobResults {
        job_id: job.id,
        output_dir: job.output_dir,
        files,
    }))
}

// Registra un worker nuevo; queda disponible para la fase actual y las siguientes
async fn register_worker(
    State(state): State<AppState>,
    Json(req): Json<WorkerRegisterRequest>,
) -> Result<Json<WorkerRegisterResponse>, (StatusCode, String)> {
    let addr = req.addr.trim().trim_end_matches('/').to_string();
    if addr.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "addr vacío".to_string()));
    }

    let workers = state.registry.register(addr);
    Ok(Json(WorkerRegisterResponse { ok: true, workers }))
}

async fn list_workers(State(state): State<AppState>) -> Json<Vec<WorkerInfo>> {
    Json(state.registry.list())
}
