use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use tokio::sync::broadcast;

use crate::types::TaskSnapshot;

const UPDATE_BUFFER_CAPACITY: usize = 64;

/// Tri-state outcome of a task's poll chain. A dead chain is surfaced here
/// instead of vanishing silently, so the frontend can tell "still working"
/// apart from "nobody is watching this anymore".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskHealth {
    /// The poll chain is alive and no terminal status has been seen.
    Progressing,
    /// The backend reported one of the two terminal statuses.
    Terminal,
    /// The poll chain stopped on a transport or protocol failure; the
    /// snapshot, if any, is the last one successfully fetched.
    Unreachable { reason: String },
}

#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub task_id: String,
    /// Submitted URL or uploaded file name.
    pub source: String,
    pub snapshot: Option<TaskSnapshot>,
    pub health: TaskHealth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryEvent {
    Registered { task_id: String },
    Updated { task_id: String },
    Unreachable { task_id: String },
}

impl RegistryEvent {
    pub fn task_id(&self) -> &str {
        match self {
            RegistryEvent::Registered { task_id }
            | RegistryEvent::Updated { task_id }
            | RegistryEvent::Unreachable { task_id } => task_id,
        }
    }
}

/// In-memory mapping from task id to its latest known state, shared between
/// the poll chains and the render layer. Entries live for the whole session;
/// updates are a full replace of the snapshot, keyed per task, so concurrent
/// chains never conflict.
#[derive(Clone)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    state: RwLock<RegistryState>,
    updates: broadcast::Sender<RegistryEvent>,
}

struct RegistryState {
    entries: HashMap<String, TaskEntry>,
    order: Vec<String>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BUFFER_CAPACITY);
        Self {
            inner: Arc::new(RegistryInner {
                state: RwLock::new(RegistryState {
                    entries: HashMap::new(),
                    order: Vec::new(),
                }),
                updates,
            }),
        }
    }

    /// Insert a fresh entry for a newly created task. Registering an id that
    /// already exists leaves the existing entry untouched.
    pub fn register(&self, task_id: &str, source: &str) {
        {
            let mut state = self.write();
            if state.entries.contains_key(task_id) {
                return;
            }
            state.entries.insert(
                task_id.to_string(),
                TaskEntry {
                    task_id: task_id.to_string(),
                    source: source.to_string(),
                    snapshot: None,
                    health: TaskHealth::Progressing,
                },
            );
            state.order.push(task_id.to_string());
        }
        self.emit(RegistryEvent::Registered {
            task_id: task_id.to_string(),
        });
    }

    /// Full-replace the task's snapshot with a fresh poll response.
    pub fn apply(&self, task_id: &str, snapshot: TaskSnapshot) {
        {
            let mut state = self.write();
            let health = if snapshot.is_terminal() {
                TaskHealth::Terminal
            } else {
                TaskHealth::Progressing
            };
            match state.entries.get_mut(task_id) {
                Some(entry) => {
                    entry.snapshot = Some(snapshot);
                    entry.health = health;
                }
                None => {
                    // A poll response for an id nobody registered; adopt it,
                    // the snapshot itself carries the source reference.
                    let source = snapshot.url.clone();
                    state.entries.insert(
                        task_id.to_string(),
                        TaskEntry {
                            task_id: task_id.to_string(),
                            source,
                            snapshot: Some(snapshot),
                            health,
                        },
                    );
                    state.order.push(task_id.to_string());
                }
            }
        }
        self.emit(RegistryEvent::Updated {
            task_id: task_id.to_string(),
        });
    }

    /// Record that the task's poll chain died without reaching a terminal
    /// status. The last fetched snapshot, if any, is kept.
    pub fn mark_unreachable(&self, task_id: &str, reason: &str) {
        {
            let mut state = self.write();
            let Some(entry) = state.entries.get_mut(task_id) else {
                return;
            };
            entry.health = TaskHealth::Unreachable {
                reason: reason.to_string(),
            };
        }
        self.emit(RegistryEvent::Unreachable {
            task_id: task_id.to_string(),
        });
    }

    pub fn get(&self, task_id: &str) -> Option<TaskEntry> {
        self.read().entries.get(task_id).cloned()
    }

    /// All entries in insertion order.
    pub fn entries(&self) -> Vec<TaskEntry> {
        let state = self.read();
        state
            .order
            .iter()
            .filter_map(|id| state.entries.get(id).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.read().order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True once no entry is still progressing, i.e. every poll chain has
    /// reached a terminal status or died.
    pub fn is_settled(&self) -> bool {
        self.read()
            .entries
            .values()
            .all(|entry| entry.health != TaskHealth::Progressing)
    }

    /// Subscribe to registry updates. A lagging subscriber misses events but
    /// can always re-read the full projection.
    pub fn subscribe(&self) -> broadcast::Receiver<RegistryEvent> {
        self.inner.updates.subscribe()
    }

    fn emit(&self, event: RegistryEvent) {
        let _ = self.inner.updates.send(event);
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RegistryState> {
        self.inner.state.read().expect("task registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RegistryState> {
        self.inner.state.write().expect("task registry lock poisoned")
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}
