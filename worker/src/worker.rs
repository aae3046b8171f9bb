use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use common::{wordcount, DoTaskArgs, DoTaskReply, WorkerRegisterRequest, WorkerRegisterResponse};
use reqwest::Client;
use std::{
    path::PathBuf,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};
use tokio::net::TcpListener;
use tokio::time::sleep;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::{default_advertise_url, WorkerConfig};

#[derive(Clone)]
pub struct WorkerState {
    pub output_dir: PathBuf,
    pub max_tasks: Option<usize>,
    served: Arc<AtomicUsize>,
}

impl WorkerState {
    pub fn new(output_dir: PathBuf, max_tasks: Option<usize>) -> Self {
        Self {
            output_dir,
            max_tasks,
            served: Arc::new(AtomicUsize::new(0)),
        }
    }
}

pub fn build_router(state: WorkerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/tasks/do", post(do_task))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

// Ejecuta una tarea map o reduce que manda el master
async fn do_task(
    State(state): State<WorkerState>,
    Json(args): Json<DoTaskArgs>,
) -> Result<Json<DoTaskReply>, StatusCode> {
    let served = state.served.fetch_add(1, Ordering::SeqCst);
    if let Some(max) = state.max_tasks {
        if served >= max {
            warn!(
                "ya atendí {} tareas (límite), rechazo la tarea {} de {}",
                max, args.task_number, args.phase
            );
            return Err(StatusCode::SERVICE_UNAVAILABLE);
        }
    }

    info!(
        "tengo tarea {} de {} (job={} input={:?})",
        args.task_number, args.phase, args.job_name, args.input_file
    );

    // el conteo de palabras es bloqueante: va a un hilo aparte
    let dir = state.output_dir.clone();
    let task = args.clone();
    let handle = tokio::task::spawn_blocking(move || wordcount::run_task(&task, &dir));

    match handle.await {
        Ok(Ok(())) => {
            info!("terminé tarea {} de {} correctamente", args.task_number, args.phase);
            Ok(Json(DoTaskReply { ok: true }))
        }
        Ok(Err(e)) => {
            warn!(
                "error procesando tarea {} de {}: {:?}",
                args.task_number, args.phase, e
            );
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            warn!("panic o join error en tarea {}: {:?}", args.task_number, e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn try_register(
    client: &Client,
    register_url: &str,
    request: &WorkerRegisterRequest,
) -> reqwest::Result<WorkerRegisterResponse> {
    client
        .post(register_url)
        .json(request)
        .send()
        .await?
        .error_for_status()?
        .json()
        .await
}

/// Se registra en el master, reintentando hasta que lo acepte.
pub async fn register_with_master(
    client: &Client,
    master_url: &str,
    advertise_url: &str,
    retry: Duration,
) -> WorkerRegisterResponse {
    let register_url = format!("{}/api/v1/workers/register", master_url.trim_end_matches('/'));
    let request = WorkerRegisterRequest {
        addr: advertise_url.to_string(),
    };

    loop {
        match try_register(client, &register_url, &request).await {
            Ok(resp) => return resp,
            Err(e) => {
                warn!(
                    "no pude registrarme en {} ({:?}), reintento en {:?}",
                    register_url, e, retry
                );
                sleep(retry).await;
            }
        }
    }
}

/// Loop principal del worker.
/// - Levanta el servidor HTTP de tareas.
/// - Se registra en el master con su URL pública.
pub async fn run(config: WorkerConfig) -> Result<()> {
    let listener = TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("no se pudo escuchar en {}", config.bind_addr))?;
    let local = listener.local_addr()?;

    let advertise_url = config
        .advertise_url
        .clone()
        .unwrap_or_else(|| default_advertise_url(local.port()));

    info!(
        "worker escuchando en {} (publicado como {}) contra {}",
        local, advertise_url, config.master_url
    );

    let app = build_router(WorkerState::new(config.output_dir.clone(), config.max_tasks));

    // el registro va después del bind: el master puede mandar tareas enseguida
    let client = Client::new();
    let master_url = config.master_url.clone();
    let retry = config.register_retry;
    tokio::spawn(async move {
        let resp = register_with_master(&client, &master_url, &advertise_url, retry).await;
        info!(
            "worker {} registrado ({} workers en el master)",
            advertise_url, resp.workers
        );
    });

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use common::{merge_name, reduce_name, JobPhase};
    use std::{env, fs, io::Write};
    use std::sync::Mutex;
    use tower::ServiceExt;

    fn temp_dir(sub: &str) -> PathBuf {
        let base = env::temp_dir().join("worker_tests").join(sub);
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        base
    }

    fn task_request(args: &DoTaskArgs) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/tasks/do")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(args).unwrap()))
            .unwrap()
    }

    fn map_args(input: &PathBuf, n_reduce: usize) -> DoTaskArgs {
        let files = vec![input.to_string_lossy().to_string()];
        DoTaskArgs::for_phase("wjob", JobPhase::Map, 0, &files, n_reduce)
    }

    #[tokio::test]
    async fn do_task_ejecuta_map_y_reduce() {
        let tmp = temp_dir("map_reduce");
        let input = tmp.join("in.txt");
        writeln!(fs::File::create(&input).unwrap(), "hola hola mundo").unwrap();
        let out = tmp.join("out");

        let app = build_router(WorkerState::new(out.clone(), None));

        let resp = app.clone().oneshot(task_request(&map_args(&input, 1))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let reply: DoTaskReply = serde_json::from_slice(&body).unwrap();
        assert!(reply.ok);
        assert!(out.join(reduce_name("wjob", 0, 0)).exists());

        let reduce = DoTaskArgs::for_phase("wjob", JobPhase::Reduce, 0, &[], 1);
        let resp = app.oneshot(task_request(&reduce)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let content = fs::read_to_string(out.join(merge_name("wjob", 0))).unwrap();
        assert_eq!(content.lines().collect::<Vec<_>>(), vec!["hola,2", "mundo,1"]);
    }

    #[tokio::test]
    async fn do_task_con_error_devuelve_500() {
        let tmp = temp_dir("error");
        let app = build_router(WorkerState::new(tmp.clone(), None));

        let missing = map_args(&tmp.join("no_existe.txt"), 2);
        let resp = app.oneshot(task_request(&missing)).await.unwrap();

        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn do_task_rechaza_despues_del_limite() {
        let tmp = temp_dir("limit");
        let input = tmp.join("in.txt");
        writeln!(fs::File::create(&input).unwrap(), "a b").unwrap();

        let app = build_router(WorkerState::new(tmp.join("out"), Some(1)));
        let args = map_args(&input, 1);

        let first = app.clone().oneshot(task_request(&args)).await.unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = app.oneshot(task_request(&args)).await.unwrap();
        assert_eq!(second.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    /// Master falso que rechaza el primer registro y acepta el segundo.
    #[tokio::test]
    async fn register_with_master_reintenta_hasta_lograrlo() {
        let seen: Arc<Mutex<Vec<String>>> = Arc::default();
        let seen_in_handler = seen.clone();

        let master = Router::new().route(
            "/api/v1/workers/register",
            post(move |Json(req): Json<WorkerRegisterRequest>| {
                let seen = seen_in_handler.clone();
                async move {
                    let mut seen = seen.lock().unwrap();
                    seen.push(req.addr);
                    if seen.len() == 1 {
                        Err(StatusCode::SERVICE_UNAVAILABLE)
                    } else {
                        Ok(Json(WorkerRegisterResponse {
                            ok: true,
                            workers: 1,
                        }))
                    }
                }
            }),
        );

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, master).await.unwrap();
        });

        let resp = tokio::time::timeout(
            Duration::from_secs(5),
            register_with_master(
                &Client::new(),
                &format!("http://{}", addr),
                "http://yo:9000",
                Duration::from_millis(10),
            ),
        )
        .await
        .expect("el registro no terminó");

        assert!(resp.ok);
        assert_eq!(
            seen.lock().unwrap().clone(),
            vec!["http://yo:9000", "http://yo:9000"]
        );
    }
}
