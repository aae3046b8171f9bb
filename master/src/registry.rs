use std::sync::{Arc, Mutex};

use chrono::Utc;
use common::{WorkerAddr, WorkerInfo};
use tokio::sync::{mpsc, Notify};
use tracing::{debug, info};

use crate::feed::WorkerFeed;

/// Workers registrados en el master, en orden de llegada.
#[derive(Clone, Default)]
pub struct WorkerRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    state: Mutex<Registered>,
    changed: Notify,
}

#[derive(Default)]
struct Registered {
    /// Un registro por dirección, para listar
    workers: Vec<WorkerInfo>,
    /// Cada llamada a `register`, repetidas incluidas; los feeds la recorren
    announced: Vec<WorkerAddr>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registra un worker y lo anuncia a los feeds abiertos. Registrar de
    /// nuevo una dirección conocida no la duplica en la lista, pero sí la
    /// vuelve a ofrecer (un worker que se reinició vuelve con la misma URL).
    /// Devuelve la cantidad de workers registrados.
    pub fn register(&self, addr: WorkerAddr) -> usize {
        let count = {
            let mut state = self.inner.state.lock().unwrap();
            match state.workers.iter_mut().find(|w| w.addr == addr) {
                Some(known) => {
                    debug!("worker {} se registró de nuevo", addr);
                    known.registered_at = Utc::now();
                }
                None => {
                    info!("worker registrado: {}", addr);
                    state.workers.push(WorkerInfo {
                        addr: addr.clone(),
                        registered_at: Utc::now(),
                    });
                }
            }
            state.announced.push(addr);
            state.workers.len()
        };

        self.inner.changed.notify_waiters();
        count
    }

    pub fn list(&self) -> Vec<WorkerInfo> {
        self.inner.state.lock().unwrap().workers.clone()
    }

    /// Feed nuevo para una fase: recibe todos los workers ya registrados
    /// y los que se registren (o re-registren) después. El reenvío termina
    /// cuando se descarta el feed.
    pub fn feed(&self, capacity: usize) -> WorkerFeed {
        let (tx, feed) = WorkerFeed::channel(capacity);

        let (known, next) = {
            let state = self.inner.state.lock().unwrap();
            let known: Vec<WorkerAddr> = state.workers.iter().map(|w| w.addr.clone()).collect();
            (known, state.announced.len())
        };

        tokio::spawn(forward_registrations(self.inner.clone(), known, next, tx));
        feed
    }
}

async fn forward_registrations(
    inner: Arc<RegistryInner>,
    known: Vec<WorkerAddr>,
    mut next: usize,
    tx: mpsc::Sender<WorkerAddr>,
) {
    for addr in known {
        if tx.send(addr).await.is_err() {
            return;
        }
    }

    loop {
        // registrarse en Notify antes de mirar la lista, para no perder avisos
        let notified = inner.changed.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        let pending: Vec<WorkerAddr> = {
            let state = inner.state.lock().unwrap();
            state.announced[next.min(state.announced.len())..].to_vec()
        };

        if pending.is_empty() {
            tokio::select! {
                _ = &mut notified => continue,
                _ = tx.closed() => return,
            }
        }

        for addr in pending {
            if tx.send(addr).await.is_err() {
                return;
            }
            next += 1;
        }
    }
}
