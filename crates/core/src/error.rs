use thiserror::Error;

#[derive(Error, Debug)]
pub enum KonspektError {
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{message}")]
    Backend { message: String },

    #[error("Malformed response: missing {field}")]
    MalformedResponse { field: &'static str },

    #[error("A submission is already in progress")]
    SubmissionInProgress,

    #[error("A question is already pending for task {task_id}")]
    QuestionPending { task_id: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, KonspektError>;
