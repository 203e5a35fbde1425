use std::{sync::Arc, time::Duration};

use tokio::{sync::broadcast, task::JoinHandle, time};

use crate::{api::SummarizerApi, config::ClientConfig, registry::TaskRegistry};

/// Spawns and owns the per-task poll chains. Each chain is an independent
/// tokio task: fetch status, full-replace into the registry, sleep, repeat
/// until a terminal status or a failure. Chains for different tasks never
/// coordinate; the registry key is the only thing they share.
#[derive(Clone)]
pub struct Poller {
    api: Arc<dyn SummarizerApi>,
    registry: TaskRegistry,
    poll_interval: Duration,
    shutdown: broadcast::Sender<()>,
}

/// Lifetime handle for one task's poll chain. Cancelling (or dropping) the
/// handle stops the chain before its next fetch; the registry entry is left
/// in whatever state the last completed poll produced.
pub struct PollHandle {
    task_id: String,
    cancel: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl PollHandle {
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn cancel(&self) {
        let _ = self.cancel.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the chain to stop, whichever way it stops.
    pub async fn join(self) {
        let _ = self.task.await;
    }
}

impl Poller {
    pub fn new(api: Arc<dyn SummarizerApi>, registry: TaskRegistry, config: &ClientConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            api,
            registry,
            poll_interval: config.poll_interval,
            shutdown,
        }
    }

    /// Start an indefinite poll chain for one task id.
    pub fn spawn(&self, task_id: String) -> PollHandle {
        let (cancel, cancel_rx) = broadcast::channel(1);
        let chain = PollChain {
            api: Arc::clone(&self.api),
            registry: self.registry.clone(),
            poll_interval: self.poll_interval,
        };
        let shutdown_rx = self.shutdown.subscribe();
        let task = tokio::spawn(chain.run(task_id.clone(), cancel_rx, shutdown_rx));
        PollHandle {
            task_id,
            cancel,
            task,
        }
    }

    /// Stop every chain spawned from this poller before its next fetch.
    pub fn shutdown_all(&self) {
        let _ = self.shutdown.send(());
    }
}

struct PollChain {
    api: Arc<dyn SummarizerApi>,
    registry: TaskRegistry,
    poll_interval: Duration,
}

impl PollChain {
    async fn run(
        self,
        task_id: String,
        mut cancel: broadcast::Receiver<()>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        loop {
            match self.api.task_status(&task_id).await {
                Ok(snapshot) => {
                    let terminal = snapshot.is_terminal();
                    tracing::debug!(task_id = %task_id, status = %snapshot.status, "poll update");
                    self.registry.apply(&task_id, snapshot);
                    if terminal {
                        return;
                    }
                }
                Err(e) => {
                    // No retry: the chain ends here and the entry is flagged
                    // unreachable rather than left looking alive.
                    tracing::warn!(task_id = %task_id, error = %e, "status poll failed");
                    self.registry.mark_unreachable(&task_id, &e.to_string());
                    return;
                }
            }

            tokio::select! {
                _ = cancel.recv() => return,
                _ = shutdown.recv() => return,
                _ = time::sleep(self.poll_interval) => {}
            }
        }
    }
}
