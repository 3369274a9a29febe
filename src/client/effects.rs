use crate::errors::CliError;
use crate::models::{Reply, Submission, Thread, ThreadId, Turn};

/// A backend call requested by a `ClientState` operation. The caller performs it
/// and feeds the matching `Outcome` back through `ClientState::apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    FetchThreads { focus_most_recent: bool },
    FetchConversation { thread_id: ThreadId },
    Submit { thread_id: ThreadId, submission: Submission },
    DeleteThread { thread_id: ThreadId },
}

impl Effect {
    pub fn name(&self) -> &'static str {
        match self {
            Effect::FetchThreads { .. } => "fetch_threads",
            Effect::FetchConversation { .. } => "fetch_conversation",
            Effect::Submit { .. } => "submit",
            Effect::DeleteThread { .. } => "delete_thread",
        }
    }
}

/// Result of performing an `Effect`.
#[derive(Debug)]
pub enum Outcome {
    Threads {
        focus_most_recent: bool,
        result: Result<Vec<Thread>, CliError>,
    },
    Conversation {
        thread_id: ThreadId,
        result: Result<Vec<Turn>, CliError>,
    },
    Submitted {
        thread_id: ThreadId,
        result: Result<Reply, CliError>,
    },
    Deleted {
        thread_id: ThreadId,
        result: Result<(), CliError>,
    },
}

impl Outcome {
    pub fn error(&self) -> Option<&CliError> {
        match self {
            Outcome::Threads { result, .. } => result.as_ref().err(),
            Outcome::Conversation { result, .. } => result.as_ref().err(),
            Outcome::Submitted { result, .. } => result.as_ref().err(),
            Outcome::Deleted { result, .. } => result.as_ref().err(),
        }
    }
}
