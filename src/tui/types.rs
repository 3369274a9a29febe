use std::path::PathBuf;

use ratatui::widgets::ListState;

use crate::client::ClientState;
use crate::client::effects::Outcome;
use crate::errors::CliError;
use crate::models::{Attachment, ThreadId};

// ============================================================================
// UI mode enum
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Chat,
    /// Keyboard focus is on the side panel's thread list.
    Threads,
    /// Reviewing composer attachments before sending.
    Attachments,
    AttachPrompt,
    Help,
}

#[derive(Debug, Clone, Default)]
pub struct TextPromptState {
    pub prompt: String,
    pub input: Vec<char>,
    pub cursor: usize,
}

impl TextPromptState {
    pub fn new(prompt: &str) -> Self {
        Self {
            prompt: prompt.to_string(),
            ..Self::default()
        }
    }

    pub fn value(&self) -> String {
        self.input.iter().collect()
    }
}

// ============================================================================
// Main App state
// ============================================================================

#[derive(Debug)]
pub struct App {
    pub mode: Mode,
    pub should_quit: bool,

    pub api_url: String,
    pub profile: String,
    pub session_present: bool,
    pub log_path: Option<PathBuf>,

    pub state: ClientState,
    /// Selection over thread entries in display order (headers excluded).
    pub thread_state: ListState,
    pub attachment_state: ListState,
    pub text_prompt: Option<TextPromptState>,

    /// Sends still waiting for a reply.
    pub waiting: u32,
    pub bg_tasks: u32,
    pub status: String,
}

impl App {
    pub fn new(state: ClientState, api_url: String, profile: String, session_present: bool) -> Self {
        Self {
            mode: Mode::Chat,
            should_quit: false,
            api_url,
            profile,
            session_present,
            log_path: None,
            state,
            thread_state: ListState::default(),
            attachment_state: ListState::default(),
            text_prompt: None,
            waiting: 0,
            bg_tasks: 0,
            status: "Loading threads...".to_string(),
        }
    }

    pub fn highlighted_thread(&self) -> Option<ThreadId> {
        let idx = self.thread_state.selected()?;
        self.state.threads().entries().nth(idx).map(|t| t.id)
    }

    /// Keeps the panel selection valid after the list changes, preferring the focused thread.
    pub fn sync_thread_selection(&mut self) {
        let len = self.state.threads().len();
        if len == 0 {
            self.thread_state.select(None);
            return;
        }
        let focused = self.state.pointer();
        let focused_idx = self
            .state
            .threads()
            .entries()
            .position(|t| t.id == focused);
        match (self.thread_state.selected(), focused_idx) {
            (Some(idx), _) if idx < len && self.mode == Mode::Threads => {}
            (_, Some(idx)) => self.thread_state.select(Some(idx)),
            (Some(idx), None) => self.thread_state.select(Some(idx.min(len - 1))),
            (None, None) => self.thread_state.select(Some(0)),
        }
    }

    pub fn sync_attachment_selection(&mut self) {
        let len = self.state.composer.files().len();
        if len == 0 {
            self.attachment_state.select(None);
        } else {
            let idx = self.attachment_state.selected().unwrap_or(0).min(len - 1);
            self.attachment_state.select(Some(idx));
        }
    }
}

// ============================================================================
// Async message enum
// ============================================================================

#[derive(Debug)]
pub enum TuiMsg {
    /// A backend call finished.
    Backend(Outcome),
    /// A file picked for attachment was read off disk.
    Attached(PathBuf, Result<Attachment, CliError>),
}
