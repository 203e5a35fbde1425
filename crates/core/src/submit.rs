use std::{
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    api::SummarizerApi,
    error::{KonspektError, Result},
    poller::{PollHandle, Poller},
    registry::TaskRegistry,
};

/// What one dispatch achieved. Failures never roll back registrations made
/// earlier in the same dispatch; the frontend shows `last_error` in its
/// single error slot.
pub struct SubmissionOutcome {
    pub handles: Vec<PollHandle>,
    pub errors: Vec<KonspektError>,
}

impl SubmissionOutcome {
    pub fn task_ids(&self) -> Vec<String> {
        self.handles.iter().map(|h| h.task_id().to_string()).collect()
    }

    pub fn last_error(&self) -> Option<&KonspektError> {
        self.errors.last()
    }
}

/// Validates and dispatches user-provided URLs and files to the backend,
/// registering every returned task id and starting its poll chain. A busy
/// flag is held across the whole dispatch sequence so a second concurrent
/// dispatch fails fast instead of double-submitting.
pub struct SubmissionController {
    api: Arc<dyn SummarizerApi>,
    registry: TaskRegistry,
    poller: Poller,
    busy: AtomicBool,
}

struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SubmissionController {
    pub fn new(api: Arc<dyn SummarizerApi>, registry: TaskRegistry, poller: Poller) -> Self {
        Self {
            api,
            registry,
            poller,
            busy: AtomicBool::new(false),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::SeqCst)
    }

    /// Dispatch one batch: all non-blank URLs in a single creation call,
    /// then every staged file as its own independent upload. The style
    /// directive applies uniformly to every job in the batch.
    pub async fn dispatch(
        &self,
        urls: &[String],
        files: &[PathBuf],
        custom_style: &str,
    ) -> Result<SubmissionOutcome> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(KonspektError::SubmissionInProgress);
        }
        let _busy = BusyGuard(&self.busy);

        let mut outcome = SubmissionOutcome {
            handles: Vec::new(),
            errors: Vec::new(),
        };

        let valid: Vec<String> = urls
            .iter()
            .filter(|url| !url.trim().is_empty())
            .cloned()
            .collect();

        if !valid.is_empty() {
            match self.api.create_jobs(&valid, custom_style).await {
                Ok(task_ids) => {
                    for (task_id, url) in task_ids.into_iter().zip(&valid) {
                        outcome.handles.push(self.track(task_id, url));
                    }
                }
                Err(e) => outcome.errors.push(e),
            }
        }

        // one upload per file; a failed upload never blocks the rest
        for file in files {
            match self.api.upload_media(file, custom_style).await {
                Ok(task_id) => {
                    let source = file_label(file);
                    outcome.handles.push(self.track(task_id, &source));
                }
                Err(e) => outcome.errors.push(e),
            }
        }

        Ok(outcome)
    }

    fn track(&self, task_id: String, source: &str) -> PollHandle {
        self.registry.register(&task_id, source);
        self.poller.spawn(task_id)
    }
}

fn file_label(file: &Path) -> String {
    file.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| file.display().to_string())
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::{
        registry::TaskHealth,
        test_support::{backend_error, done_snapshot, ScriptedApi},
        ClientConfig,
    };

    const JOIN_LIMIT: Duration = Duration::from_secs(5);

    fn controller(api: Arc<ScriptedApi>) -> (SubmissionController, TaskRegistry) {
        let registry = TaskRegistry::new();
        let config =
            ClientConfig::new("http://backend").with_poll_interval(Duration::from_millis(5));
        let poller = Poller::new(api.clone() as Arc<dyn SummarizerApi>, registry.clone(), &config);
        (
            SubmissionController::new(api, registry.clone(), poller),
            registry,
        )
    }

    async fn drain(outcome: SubmissionOutcome) {
        for handle in outcome.handles {
            timeout(JOIN_LIMIT, handle.join()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn a_batch_of_k_urls_registers_k_tasks_in_server_order() {
        let api = Arc::new(ScriptedApi::new());
        api.script_create(Ok(vec!["t1".to_string(), "t2".to_string(), "t3".to_string()]));
        for id in ["t1", "t2", "t3"] {
            api.script_status(id, Ok(done_snapshot("http://v", "done")));
        }

        let (controller, registry) = controller(Arc::clone(&api));
        let urls = vec![
            "http://v1".to_string(),
            "http://v2".to_string(),
            "http://v3".to_string(),
        ];
        let outcome = controller.dispatch(&urls, &[], "").await.unwrap();

        assert_eq!(outcome.task_ids(), ["t1", "t2", "t3"]);
        assert!(outcome.errors.is_empty());
        let ids: Vec<String> = registry.entries().into_iter().map(|e| e.task_id).collect();
        assert_eq!(ids, ["t1", "t2", "t3"]);

        let calls = api.create_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, urls);
        drain(outcome).await;
    }

    #[tokio::test]
    async fn blank_urls_are_filtered_before_the_batch_call() {
        let api = Arc::new(ScriptedApi::new());
        api.script_create(Ok(vec!["t1".to_string()]));
        api.script_status("t1", Ok(done_snapshot("http://v1", "done")));

        let (controller, _registry) = controller(Arc::clone(&api));
        let urls = vec![
            "".to_string(),
            "   ".to_string(),
            "http://v1".to_string(),
        ];
        let outcome = controller.dispatch(&urls, &[], "").await.unwrap();

        assert_eq!(api.create_calls()[0].0, ["http://v1"]);
        drain(outcome).await;
    }

    #[tokio::test]
    async fn all_blank_urls_skip_the_batch_call_entirely() {
        let api = Arc::new(ScriptedApi::new());
        let (controller, registry) = controller(Arc::clone(&api));

        let outcome = controller
            .dispatch(&["".to_string(), "  ".to_string()], &[], "")
            .await
            .unwrap();

        assert!(outcome.handles.is_empty());
        assert!(outcome.errors.is_empty());
        assert!(api.create_calls().is_empty());
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn the_style_directive_travels_with_every_call() {
        let api = Arc::new(ScriptedApi::new());
        api.script_create(Ok(vec!["t1".to_string()]));
        api.script_upload(Ok("t2".to_string()));
        api.script_status("t1", Ok(done_snapshot("http://v1", "done")));
        api.script_status("t2", Ok(done_snapshot("talk.mp4", "done")));

        let (controller, _registry) = controller(Arc::clone(&api));
        let outcome = controller
            .dispatch(
                &["http://v1".to_string()],
                &[PathBuf::from("talk.mp4")],
                "like a keynote",
            )
            .await
            .unwrap();

        assert_eq!(api.create_calls()[0].1, "like a keynote");
        assert_eq!(api.upload_calls()[0].1, "like a keynote");
        drain(outcome).await;
    }

    #[tokio::test]
    async fn a_failed_upload_never_blocks_the_next_one() {
        let api = Arc::new(ScriptedApi::new());
        api.script_upload(Err(backend_error("Upload failed for a.mp4")));
        api.script_upload(Ok("tb".to_string()));
        api.script_status("tb", Ok(done_snapshot("b.mp4", "B summary")));

        let (controller, registry) = controller(Arc::clone(&api));
        let files = vec![PathBuf::from("a.mp4"), PathBuf::from("b.mp4")];
        let outcome = controller.dispatch(&[], &files, "").await.unwrap();

        assert_eq!(outcome.task_ids(), ["tb"]);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(
            outcome.last_error().unwrap().to_string(),
            "Upload failed for a.mp4"
        );

        drain(outcome).await;
        // B was registered AND polled despite A's failure
        let entry = registry.get("tb").unwrap();
        assert_eq!(entry.source, "b.mp4");
        assert_eq!(entry.health, TaskHealth::Terminal);
        assert_eq!(api.status_count("tb"), 1);
    }

    #[tokio::test]
    async fn a_failed_batch_still_lets_file_uploads_proceed() {
        let api = Arc::new(ScriptedApi::new());
        api.script_create(Err(backend_error("Processing request failed")));
        api.script_upload(Ok("tf".to_string()));
        api.script_status("tf", Ok(done_snapshot("clip.mp4", "done")));

        let (controller, registry) = controller(Arc::clone(&api));
        let outcome = controller
            .dispatch(
                &["http://v1".to_string()],
                &[PathBuf::from("clip.mp4")],
                "",
            )
            .await
            .unwrap();

        assert_eq!(outcome.task_ids(), ["tf"]);
        assert_eq!(outcome.errors.len(), 1);
        drain(outcome).await;
        assert!(registry.get("tf").is_some());
    }

    #[tokio::test]
    async fn the_busy_flag_releases_after_dispatch() {
        let api = Arc::new(ScriptedApi::new());
        api.script_create(Ok(vec!["t1".to_string()]));
        api.script_create(Ok(vec!["t2".to_string()]));
        api.script_status("t1", Ok(done_snapshot("http://v1", "done")));
        api.script_status("t2", Ok(done_snapshot("http://v2", "done")));

        let (controller, _registry) = controller(Arc::clone(&api));
        assert!(!controller.is_busy());

        let first = controller
            .dispatch(&["http://v1".to_string()], &[], "")
            .await
            .unwrap();
        assert!(!controller.is_busy());

        let second = controller
            .dispatch(&["http://v2".to_string()], &[], "")
            .await
            .unwrap();
        drain(first).await;
        drain(second).await;
    }
}
