use std::{
    collections::{HashMap, VecDeque},
    path::Path,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    api::SummarizerApi,
    error::{KonspektError, Result},
    types::{STATUS_DONE, STATUS_FAILED, TaskSnapshot},
};

pub fn backend_error(message: &str) -> KonspektError {
    KonspektError::Backend {
        message: message.to_string(),
    }
}

pub fn progress_snapshot(status: &str, url: &str) -> TaskSnapshot {
    TaskSnapshot {
        status: status.to_string(),
        url: url.to_string(),
        result: None,
        mindmap: None,
        error: None,
    }
}

pub fn done_snapshot(url: &str, result: &str) -> TaskSnapshot {
    TaskSnapshot {
        status: STATUS_DONE.to_string(),
        url: url.to_string(),
        result: Some(result.to_string()),
        mindmap: None,
        error: None,
    }
}

pub fn failed_snapshot(url: &str, error: &str) -> TaskSnapshot {
    TaskSnapshot {
        status: STATUS_FAILED.to_string(),
        url: url.to_string(),
        result: None,
        mindmap: None,
        error: Some(error.to_string()),
    }
}

/// Scripted fake backend: every endpoint pops canned results in order and
/// records its calls. An exhausted script answers with a backend error so a
/// chain that polls more than scripted fails loudly in assertions.
#[derive(Default)]
pub struct ScriptedApi {
    create_script: Mutex<VecDeque<Result<Vec<String>>>>,
    upload_script: Mutex<VecDeque<Result<String>>>,
    status_scripts: Mutex<HashMap<String, VecDeque<Result<TaskSnapshot>>>>,
    ask_script: Mutex<VecDeque<Result<String>>>,
    save_script: Mutex<VecDeque<Result<String>>>,

    create_calls: Mutex<Vec<(Vec<String>, String)>>,
    upload_calls: Mutex<Vec<(String, String)>>,
    status_calls: Mutex<Vec<String>>,
    ask_calls: Mutex<Vec<(String, String)>>,
    save_calls: Mutex<Vec<String>>,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_create(&self, result: Result<Vec<String>>) {
        self.create_script.lock().unwrap().push_back(result);
    }

    pub fn script_upload(&self, result: Result<String>) {
        self.upload_script.lock().unwrap().push_back(result);
    }

    pub fn script_status(&self, task_id: &str, result: Result<TaskSnapshot>) {
        self.status_scripts
            .lock()
            .unwrap()
            .entry(task_id.to_string())
            .or_default()
            .push_back(result);
    }

    pub fn script_ask(&self, result: Result<String>) {
        self.ask_script.lock().unwrap().push_back(result);
    }

    pub fn script_save(&self, result: Result<String>) {
        self.save_script.lock().unwrap().push_back(result);
    }

    pub fn create_calls(&self) -> Vec<(Vec<String>, String)> {
        self.create_calls.lock().unwrap().clone()
    }

    pub fn upload_calls(&self) -> Vec<(String, String)> {
        self.upload_calls.lock().unwrap().clone()
    }

    pub fn status_count(&self, task_id: &str) -> usize {
        self.status_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|id| id.as_str() == task_id)
            .count()
    }

    pub fn ask_calls(&self) -> Vec<(String, String)> {
        self.ask_calls.lock().unwrap().clone()
    }

    pub fn save_calls(&self) -> Vec<String> {
        self.save_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SummarizerApi for ScriptedApi {
    async fn create_jobs(&self, urls: &[String], custom_style: &str) -> Result<Vec<String>> {
        self.create_calls
            .lock()
            .unwrap()
            .push((urls.to_vec(), custom_style.to_string()));
        self.create_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(backend_error("create script exhausted")))
    }

    async fn upload_media(&self, file: &Path, custom_style: &str) -> Result<String> {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.display().to_string());
        self.upload_calls
            .lock()
            .unwrap()
            .push((name, custom_style.to_string()));
        self.upload_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(backend_error("upload script exhausted")))
    }

    async fn task_status(&self, task_id: &str) -> Result<TaskSnapshot> {
        self.status_calls.lock().unwrap().push(task_id.to_string());
        self.status_scripts
            .lock()
            .unwrap()
            .get_mut(task_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Err(backend_error("status script exhausted")))
    }

    async fn ask(&self, task_id: &str, question: &str) -> Result<String> {
        self.ask_calls
            .lock()
            .unwrap()
            .push((task_id.to_string(), question.to_string()));
        self.ask_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(backend_error("ask script exhausted")))
    }

    async fn save_result(&self, task_id: &str) -> Result<String> {
        self.save_calls.lock().unwrap().push(task_id.to_string());
        self.save_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(backend_error("save script exhausted")))
    }
}
