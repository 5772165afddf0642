use thiserror::Error;

use super::types::Source;

#[derive(Debug, Error)]
pub enum SignalError {
    #[error("{0} process is already running")]
    AlreadyRunning(Source),

    #[error("failed to start {process} process: {source}")]
    Spawn {
        process: Source,
        #[source]
        source: std::io::Error,
    },

    #[error("recipient or message is empty")]
    EmptyMessage,

    #[error("signal-cli exited with {}: {stderr}", exit_label(.code))]
    CommandFailed { code: Option<i32>, stderr: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "a signal".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, SignalError>;
