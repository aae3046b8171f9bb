use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use common::{DoTaskArgs, DoTaskReply, WorkerAddr};
use reqwest::Client;
use tracing::debug;

/// Ejecuta una tarea en un worker remoto.
///
/// Cualquier problema (timeout, conexión, status de error, respuesta rara)
/// se reporta como `false`: para el scheduler una tarea sólo sale bien o mal.
#[async_trait]
pub trait TaskInvoker: Send + Sync {
    async fn do_task(&self, worker: &WorkerAddr, args: &DoTaskArgs) -> bool;
}

/// Invoca `POST <worker>/api/v1/tasks/do` por HTTP.
pub struct HttpInvoker {
    client: Client,
}

impl HttpInvoker {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("no se pudo construir el cliente HTTP")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl TaskInvoker for HttpInvoker {
    async fn do_task(&self, worker: &WorkerAddr, args: &DoTaskArgs) -> bool {
        let url = format!("{}/api/v1/tasks/do", worker.trim_end_matches('/'));

        let resp = match self.client.post(&url).json(args).send().await {
            Ok(resp) => resp,
            Err(e) => {
                debug!("error HTTP llamando a {}: {:?}", worker, e);
                return false;
            }
        };

        if !resp.status().is_success() {
            debug!(
                "worker {} devolvió status {} para la tarea {} de {}",
                worker,
                resp.status(),
                args.task_number,
                args.phase
            );
            return false;
        }

        match resp.json::<DoTaskReply>().await {
            Ok(reply) => reply.ok,
            Err(e) => {
                debug!("respuesta inválida de {}: {:?}", worker, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::JobPhase;

    #[tokio::test]
    async fn worker_inalcanzable_cuenta_como_fallo() {
        let invoker = HttpInvoker::new(Duration::from_secs(2)).unwrap();
        let args = DoTaskArgs::for_phase("job", JobPhase::Reduce, 0, &[], 1);

        // puerto 1: nadie escucha, la conexión se rechaza
        let ok = invoker
            .do_task(&"http://127.0.0.1:1".to_string(), &args)
            .await;

        assert!(!ok);
    }
}
