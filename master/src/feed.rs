use common::WorkerAddr;
use tokio::sync::mpsc;

/// Canal de workers libres para una fase.
///
/// `next` suspende hasta que haya un worker disponible. Los workers que
/// terminan bien una tarea vuelven al canal a través de `returner`.
pub struct WorkerFeed {
    rx: mpsc::Receiver<WorkerAddr>,
    // mantiene el canal abierto mientras viva el feed
    tx: mpsc::Sender<WorkerAddr>,
}

impl WorkerFeed {
    /// Crea un feed acotado a `capacity` y devuelve el extremo por donde
    /// se publican los workers registrados.
    pub fn channel(capacity: usize) -> (mpsc::Sender<WorkerAddr>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx.clone(), Self { rx, tx })
    }

    /// Próximo worker libre. Nunca termina en None: el propio feed guarda
    /// un sender, así que sin workers simplemente espera.
    pub async fn next(&mut self) -> WorkerAddr {
        match self.rx.recv().await {
            Some(addr) => addr,
            None => std::future::pending().await,
        }
    }

    /// Sender para devolver workers al feed.
    pub fn returner(&self) -> mpsc::Sender<WorkerAddr> {
        self.tx.clone()
    }
}

#[cfg(test)]
impl WorkerFeed {
    /// Saca un worker si ya hay uno esperando, sin bloquear.
    pub fn try_next(&mut self) -> Option<WorkerAddr> {
        self.rx.try_recv().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn next_entrega_en_orden_fifo() {
        let (tx, mut feed) = WorkerFeed::channel(4);
        tx.send("a".to_string()).await.unwrap();
        tx.send("b".to_string()).await.unwrap();

        assert_eq!(feed.next().await, "a");
        assert_eq!(feed.next().await, "b");
    }

    #[tokio::test]
    async fn next_espera_aunque_se_caiga_el_registro() {
        let (tx, mut feed) = WorkerFeed::channel(1);
        drop(tx);

        let res = timeout(Duration::from_millis(50), feed.next()).await;
        assert!(res.is_err(), "next no debería devolver nada sin workers");
    }

    #[tokio::test]
    async fn returner_vuelve_a_publicar_el_worker() {
        let (_tx, mut feed) = WorkerFeed::channel(1);
        feed.returner().send("w".to_string()).await.unwrap();

        assert_eq!(feed.try_next().as_deref(), Some("w"));
        assert_eq!(feed.try_next(), None);
    }
}
