use std::{env, path::PathBuf, str::FromStr, time::Duration};

use tracing::warn;

const DEFAULT_MASTER_URL: &str = "http://localhost:8080";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:9000";
const DEFAULT_OUTPUT_DIR: &str = "/data/output";
const DEFAULT_REGISTER_RETRY_SECS: u64 = 2;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// - En Docker: MASTER_URL=http://master:8080
    /// - Local: default http://localhost:8080
    pub master_url: String,
    pub bind_addr: String,
    /// URL con la que el master llega a este worker.
    /// Si no viene, se arma con el hostname y el puerto real.
    pub advertise_url: Option<String>,
    pub output_dir: PathBuf,
    /// Después de atender esta cantidad de tareas el worker rechaza todo
    /// (simula un worker caído). None = sin límite.
    pub max_tasks: Option<usize>,
    pub register_retry: Duration,
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let max_tasks = env::var("WORKER_MAX_TASKS")
            .ok()
            .and_then(|raw| match raw.trim().parse::<usize>() {
                Ok(n) => Some(n),
                Err(_) => {
                    warn!("WORKER_MAX_TASKS={:?} inválido, sin límite", raw);
                    None
                }
            });

        let register_retry_secs = env_parse("REGISTER_RETRY_SECS", DEFAULT_REGISTER_RETRY_SECS);

        Self {
            master_url: env::var("MASTER_URL")
                .unwrap_or_else(|_| DEFAULT_MASTER_URL.to_string()),
            bind_addr: env::var("WORKER_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            advertise_url: env::var("WORKER_ADVERTISE_URL").ok(),
            output_dir: PathBuf::from(
                env::var("MR_OUTPUT_DIR").unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string()),
            ),
            max_tasks,
            register_retry: Duration::from_secs(register_retry_secs.max(1)),
        }
    }
}

/// Lee `key` y la parsea; si no está o no se puede parsear usa `default`.
fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr + Copy + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{}={:?} inválido, usando {:?}", key, raw, default);
            default
        }),
        Err(_) => default,
    }
}

/// URL por defecto: http://<hostname>:<puerto>
pub fn default_advertise_url(port: u16) -> String {
    let hostname = hostname::get()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let host = if hostname.is_empty() {
        "localhost".to_string()
    } else {
        hostname
    };
    format!("http://{}:{}", host, port)
}
