use std::{env, str::FromStr, time::Duration};

use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_OUTPUT_DIR: &str = "/data/output";
const DEFAULT_FEED_CAPACITY: usize = 16;
const DEFAULT_RPC_TIMEOUT_SECS: u64 = 120;

/// Configuración del master, leída de variables de entorno al arrancar.
#[derive(Debug, Clone)]
pub struct MasterConfig {
    pub bind_addr: String,
    /// Directorio compartido donde los workers dejan intermedios y resultados
    pub output_dir: String,
    /// Capacidad del canal de workers libres que recibe cada fase
    pub feed_capacity: usize,
    /// Timeout de cada llamada DoTask; vencido cuenta como fallo
    pub rpc_timeout: Duration,
}

impl MasterConfig {
    pub fn from_env() -> Self {
        Self {
            bind_addr: env::var("MASTER_BIND_ADDR")
                .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string()),
            output_dir: env::var("MR_OUTPUT_DIR")
                .unwrap_or_else(|_| DEFAULT_OUTPUT_DIR.to_string()),
            feed_capacity: env_parse("WORKER_FEED_CAPACITY", DEFAULT_FEED_CAPACITY).max(1),
            rpc_timeout: Duration::from_secs(env_parse(
                "TASK_RPC_TIMEOUT_SECS",
                DEFAULT_RPC_TIMEOUT_SECS,
            )),
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
