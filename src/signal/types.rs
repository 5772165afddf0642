use std::fmt;
use std::process::Child;

/// Which supervised process a piece of output or an exit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Daemon,
    Link,
    Receive,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Daemon => "daemon",
            Source::Link => "link",
            Source::Receive => "receive",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stream {
    Stdout,
    Stderr,
}

/// Typed notifications fanned out by the [`EventBus`](super::EventBus)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignalEvent {
    /// The daemon socket is up (or the ready timeout passed)
    DaemonReady,
    /// One complete line of process output
    Output {
        source: Source,
        stream: Stream,
        line: String,
    },
    /// Provisioning URI printed by `link`; the process keeps running afterwards
    LinkCode(String),
    /// `link` finished successfully and the flag was persisted
    Linked,
    LinkFailed { code: Option<i32> },
    Exited { source: Source, code: Option<i32> },
}

/// Lifecycle of one supervised child process
#[derive(Debug, Default)]
pub enum ProcessState {
    #[default]
    NotStarted,
    Running(Child),
    /// Exit status, `None` when killed by a signal
    Exited(Option<i32>),
}

impl ProcessState {
    pub fn is_running(&self) -> bool {
        matches!(self, ProcessState::Running(_))
    }

    pub fn label(&self) -> String {
        match self {
            ProcessState::NotStarted => "not started".to_string(),
            ProcessState::Running(child) => format!("running (pid {})", child.id()),
            ProcessState::Exited(Some(code)) => format!("exited ({})", code),
            ProcessState::Exited(None) => "killed".to_string(),
        }
    }
}

/// Captured result of a one-shot signal-cli invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// One entry of `listContacts` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub number: Option<String>,
    /// The raw line as printed by signal-cli
    pub raw: String,
}

impl Contact {
    /// Identifier to select and send to: the number if one was found
    pub fn id(&self) -> &str {
        self.number.as_deref().unwrap_or(&self.raw)
    }
}
