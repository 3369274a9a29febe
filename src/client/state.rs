use chrono::{DateTime, Utc};

use crate::client::composer::Composer;
use crate::client::conversation::{ChatArea, bot_node, build_turn_nodes, error_node, user_node};
use crate::client::effects::{Effect, Outcome};
use crate::client::layout::SidePanel;
use crate::client::session::Session;
use crate::client::thread_list::ThreadList;
use crate::errors::{CliError, ValidationError};
use crate::models::{Reply, Submission, Thread, ThreadId, Turn};

/// All mutable client state. Operations never touch the network themselves;
/// they return the `Effect`s to perform and take results back through `apply`.
#[derive(Debug)]
pub struct ClientState {
    session: Session,
    threads: ThreadList,
    chat: ChatArea,
    pub composer: Composer,
    pub side_panel: SidePanel,
}

impl ClientState {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            threads: ThreadList::default(),
            chat: ChatArea::default(),
            composer: Composer::default(),
            side_panel: SidePanel::default(),
        }
    }

    pub fn pointer(&self) -> ThreadId {
        self.session.pointer()
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn threads(&self) -> &ThreadList {
        &self.threads
    }

    pub fn chat(&self) -> &ChatArea {
        &self.chat
    }

    pub fn chat_mut(&mut self) -> &mut ChatArea {
        &mut self.chat
    }

    pub fn focused_thread(&self) -> Option<&Thread> {
        self.threads.get(self.pointer())
    }

    /// Page-load sequence: list threads, focusing the persisted or most recent one.
    pub fn start(&self) -> Effect {
        self.refresh_thread_list(true)
    }

    pub fn apply(&mut self, outcome: Outcome, now: DateTime<Utc>) -> Vec<Effect> {
        match outcome {
            Outcome::Threads {
                focus_most_recent,
                result,
            } => self.on_threads_loaded(focus_most_recent, result, now),
            Outcome::Conversation { thread_id, result } => {
                self.on_conversation_loaded(thread_id, result);
                Vec::new()
            }
            Outcome::Submitted { thread_id, result } => self.on_submit_finished(thread_id, result),
            Outcome::Deleted { thread_id, result } => self.on_thread_deleted(thread_id, result),
        }
    }

    // ------------------------------------------------------------------
    // Thread list
    // ------------------------------------------------------------------

    pub fn refresh_thread_list(&self, focus_most_recent: bool) -> Effect {
        Effect::FetchThreads { focus_most_recent }
    }

    pub fn on_threads_loaded(
        &mut self,
        focus_most_recent: bool,
        result: Result<Vec<Thread>, CliError>,
        now: DateTime<Utc>,
    ) -> Vec<Effect> {
        let threads = match result {
            Ok(threads) => threads,
            Err(err) => {
                tracing::warn!(error = %err, "thread list refresh failed");
                return Vec::new();
            }
        };

        self.threads.replace(&threads, now);
        self.session.set_thread_count(threads.len());

        let pointer = self.session.pointer();
        if !pointer.is_new() && !self.threads.contains(pointer) {
            tracing::debug!(thread = %pointer, "focused thread is gone from the list");
            self.session.set_pointer(ThreadId::NEW);
        }
        if focus_most_recent && self.session.pointer().is_new() {
            if let Some(first) = self.threads.first().map(|t| t.id) {
                self.session.set_pointer(first);
            }
        }

        self.load_conversation(None).into_iter().collect()
    }

    // ------------------------------------------------------------------
    // Conversation
    // ------------------------------------------------------------------

    /// Focus `thread_id` (or keep the current focus) and request its turns.
    /// The sentinel clears the chat without a request.
    pub fn load_conversation(&mut self, thread_id: Option<ThreadId>) -> Option<Effect> {
        if let Some(id) = thread_id {
            self.session.set_pointer(id);
        }
        let id = self.session.pointer();
        if id.is_new() {
            self.chat.clear();
            return None;
        }
        Some(Effect::FetchConversation { thread_id: id })
    }

    /// Overlapping loads are not reconciled: whichever response arrives last is shown.
    pub fn on_conversation_loaded(&mut self, thread_id: ThreadId, result: Result<Vec<Turn>, CliError>) {
        match result {
            Ok(turns) => {
                if thread_id != self.pointer() {
                    tracing::debug!(thread = %thread_id, focused = %self.pointer(), "rendering a conversation that lost focus");
                }
                self.chat.replace(build_turn_nodes(&turns));
            }
            Err(err) => {
                tracing::warn!(thread = %thread_id, error = %err, "conversation load failed");
            }
        }
    }

    /// Unfocus everything so the next send creates a thread.
    pub fn new_thread(&mut self) {
        self.session.set_pointer(ThreadId::NEW);
        self.chat.clear();
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Build a submission from the composer and send it.
    pub fn submit_draft(&mut self) -> Result<Effect, ValidationError> {
        let submission = self.composer.build_submission()?;
        Ok(self.submit(submission))
    }

    /// Renders the user's message immediately, then targets the focused thread.
    pub fn submit(&mut self, submission: Submission) -> Effect {
        self.chat
            .push(user_node(&submission.prompt, &submission.file_names()));
        Effect::Submit {
            thread_id: self.pointer(),
            submission,
        }
    }

    pub fn on_submit_finished(
        &mut self,
        thread_id: ThreadId,
        result: Result<Reply, CliError>,
    ) -> Vec<Effect> {
        match result {
            Ok(reply) => {
                let mut effects = Vec::new();
                if thread_id.is_new() {
                    effects.push(self.refresh_thread_list(true));
                }
                self.chat.push(bot_node(&reply.text, &reply.attached_files));
                effects
            }
            Err(err) => {
                tracing::warn!(thread = %thread_id, error = %err, "prompt submission failed");
                self.chat.push(error_node());
                Vec::new()
            }
        }
    }

    // ------------------------------------------------------------------
    // Deletion
    // ------------------------------------------------------------------

    pub fn delete_thread(&self, thread_id: ThreadId) -> Effect {
        Effect::DeleteThread { thread_id }
    }

    pub fn on_thread_deleted(&mut self, thread_id: ThreadId, result: Result<(), CliError>) -> Vec<Effect> {
        if let Err(err) = result {
            tracing::warn!(thread = %thread_id, error = %err, "thread delete failed");
            return Vec::new();
        }

        let was_focused = thread_id == self.pointer();
        if was_focused {
            self.session.set_pointer(ThreadId::NEW);
            self.chat.clear();
        }
        vec![self.refresh_thread_list(was_focused)]
    }

    pub fn toggle_side_panel(&mut self) {
        self.side_panel.toggle();
    }
}
