use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use common::{DoTaskArgs, JobPhase, WorkerAddr};
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, info};

use crate::feed::WorkerFeed;
use crate::invoker::TaskInvoker;

/// Progreso de una fase: qué tareas ya salieron bien y cuántas van.
struct PhaseProgress {
    ntasks: usize,
    succeeded: Vec<AtomicBool>,
    finished: AtomicUsize,
    attempts: AtomicUsize,
    failures: AtomicUsize,
}

impl PhaseProgress {
    fn new(ntasks: usize) -> Self {
        Self {
            ntasks,
            succeeded: (0..ntasks).map(|_| AtomicBool::new(false)).collect(),
            finished: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            failures: AtomicUsize::new(0),
        }
    }

    /// Marca la tarea como completada. Devuelve true sólo para la llamada
    /// cuyo incremento hace llegar el contador a `ntasks`.
    /// Un segundo éxito de la misma tarea no cuenta.
    fn record_success(&self, task_number: usize) -> bool {
        if self.succeeded[task_number].swap(true, Ordering::AcqRel) {
            return false;
        }
        self.finished.fetch_add(1, Ordering::AcqRel) + 1 == self.ntasks
    }
}

/// Todo lo que comparte cada dispatch con el loop principal.
#[derive(Clone)]
struct Dispatcher {
    invoker: Arc<dyn TaskInvoker>,
    progress: Arc<PhaseProgress>,
    done: CancellationToken,
    pending: mpsc::UnboundedSender<DoTaskArgs>,
    returns: mpsc::Sender<WorkerAddr>,
    tracker: TaskTracker,
}

impl Dispatcher {
    async fn dispatch(self, worker: WorkerAddr, args: DoTaskArgs) {
        self.progress.attempts.fetch_add(1, Ordering::Relaxed);

        if !self.invoker.do_task(&worker, &args).await {
            // el worker no vuelve al feed; la tarea se reintenta tal cual
            self.progress.failures.fetch_add(1, Ordering::Relaxed);
            debug!(
                "tarea {} de {} falló en {}, reencolando",
                args.task_number, args.phase, worker
            );
            let _ = self.pending.send(args);
            return;
        }

        if self.progress.record_success(args.task_number) {
            self.done.cancel();
            return;
        }

        if self.done.is_cancelled() {
            return;
        }

        // devolver el worker sin frenar este dispatch; si la fase termina
        // antes de que el feed lo acepte, se abandona
        let returns = self.returns;
        let done = self.done;
        self.tracker.spawn(async move {
            tokio::select! {
                _ = returns.send(worker) => {}
                _ = done.cancelled() => {}
            }
        });
    }
}

/// Ejecuta todas las tareas de una fase y vuelve recién cuando cada una
/// salió bien una vez.
///
/// - Map: una tarea por archivo de `map_files`, cada una sabe de `n_reduce`.
/// - Reduce: `n_reduce` tareas, cada una sabe de `map_files.len()` maps.
///
/// Las tareas fallidas se reintentan sin límite; el worker que falló no
/// vuelve a `feed`. Si el feed nunca entrega un worker que funcione, esta
/// función no termina.
pub async fn schedule(
    job_name: &str,
    map_files: &[String],
    n_reduce: usize,
    phase: JobPhase,
    feed: &mut WorkerFeed,
    invoker: Arc<dyn TaskInvoker>,
) {
    let (ntasks, n_other) = match phase {
        JobPhase::Map => (map_files.len(), n_reduce),
        JobPhase::Reduce => (n_reduce, map_files.len()),
    };

    info!("schedule: {} tareas de {} ({} I/Os)", ntasks, phase, n_other);

    if ntasks == 0 {
        info!("schedule: {} listo", phase);
        return;
    }

    let (pending_tx, mut pending_rx) = mpsc::unbounded_channel();
    for task_number in 0..ntasks {
        let args = DoTaskArgs::for_phase(job_name, phase, task_number, map_files, n_other);
        let _ = pending_tx.send(args);
    }

    let progress = Arc::new(PhaseProgress::new(ntasks));
    let done = CancellationToken::new();
    let tracker = TaskTracker::new();

    let dispatcher = Dispatcher {
        invoker,
        progress: progress.clone(),
        done: done.clone(),
        pending: pending_tx,
        returns: feed.returner(),
        tracker: tracker.clone(),
    };

    loop {
        let args = tokio::select! {
            biased;
            _ = done.cancelled() => break,
            next = pending_rx.recv() => match next {
                Some(args) => args,
                None => break,
            },
        };

        let worker = tokio::select! {
            biased;
            _ = done.cancelled() => break,
            worker = feed.next() => worker,
        };

        debug!(
            "asignando tarea {} de {} a {}",
            args.task_number, phase, worker
        );
        tracker.spawn(dispatcher.clone().dispatch(worker, args));
    }

    pending_rx.close();
    drop(dispatcher);

    // quedan a lo sumo devoluciones de workers, que ya perdieron la carrera
    tracker.close();
    tracker.wait().await;

    info!(
        "schedule: {} listo ({} intentos, {} fallidos)",
        phase,
        progress.attempts.load(Ordering::Relaxed),
        progress.failures.load(Ordering::Relaxed)
    );
}
