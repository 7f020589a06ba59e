use std::sync::mpsc::{self, Receiver, Sender};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskProgress {
    pub name: String,
    pub message: String,
    pub completed: bool,
}

impl TaskProgress {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: String::new(),
            completed: false,
        }
    }

    pub fn message(message: impl Into<String>) -> Self {
        Self {
            name: String::new(),
            message: message.into(),
            completed: false,
        }
    }

    pub fn completed(mut self) -> Self {
        self.completed = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadProgress {
    pub artifact: String,
    pub downloaded: u64,
    pub total: Option<u64>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    Task(TaskProgress),
    Download(DownloadProgress),
}

/// Ordered sink for task and download progress.
///
/// Events are dropped silently once the receiving side has gone away; an
/// install never fails because nobody is watching it.
#[derive(Debug, Clone)]
pub struct ProgressSender {
    tx: Option<Sender<ProgressEvent>>,
}

impl ProgressSender {
    pub fn channel() -> (Self, Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Some(tx) }, rx)
    }

    pub fn discard() -> Self {
        Self { tx: None }
    }

    pub fn task(&self, task: TaskProgress) {
        self.send(ProgressEvent::Task(task));
    }

    pub fn download(&self, download: DownloadProgress) {
        self.send(ProgressEvent::Download(download));
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(event);
        }
    }
}
