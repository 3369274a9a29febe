use std::collections::VecDeque;

use chrono::Utc;

use crate::client::effects::{Effect, Outcome};
use crate::client::state::ClientState;
use crate::errors::CliError;
use crate::models::{Reply, Submission, Thread, ThreadId, Turn};

/// The four backend calls the client makes.
#[allow(async_fn_in_trait)]
pub trait Backend {
    async fn list_threads(&self) -> Result<Vec<Thread>, CliError>;
    async fn fetch_conversation(&self, thread_id: ThreadId) -> Result<Vec<Turn>, CliError>;
    async fn submit(&self, thread_id: ThreadId, submission: &Submission) -> Result<Reply, CliError>;
    async fn delete_thread(&self, thread_id: ThreadId) -> Result<(), CliError>;
}

pub async fn perform<B: Backend>(backend: &B, effect: Effect) -> Outcome {
    tracing::debug!(effect = effect.name(), "performing");
    match effect {
        Effect::FetchThreads { focus_most_recent } => Outcome::Threads {
            focus_most_recent,
            result: backend.list_threads().await,
        },
        Effect::FetchConversation { thread_id } => Outcome::Conversation {
            thread_id,
            result: backend.fetch_conversation(thread_id).await,
        },
        Effect::Submit {
            thread_id,
            submission,
        } => Outcome::Submitted {
            thread_id,
            result: backend.submit(thread_id, &submission).await,
        },
        Effect::DeleteThread { thread_id } => Outcome::Deleted {
            thread_id,
            result: backend.delete_thread(thread_id).await,
        },
    }
}

/// Performs effects one at a time until the queue drains, feeding each outcome
/// back into `state`. Returns the first error seen so one-shot callers can report it.
pub async fn run<B: Backend>(
    backend: &B,
    state: &mut ClientState,
    effects: impl IntoIterator<Item = Effect>,
) -> Option<CliError> {
    let mut queue: VecDeque<Effect> = effects.into_iter().collect();
    let mut first_error = None;
    while let Some(effect) = queue.pop_front() {
        let outcome = perform(backend, effect).await;
        if first_error.is_none() {
            first_error = outcome.error().cloned();
        }
        queue.extend(state.apply(outcome, Utc::now()));
    }
    first_error
}
