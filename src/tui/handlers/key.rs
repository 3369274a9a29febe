use std::path::PathBuf;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::widgets::ListState;
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::client::composer::EnterAction;
use crate::client::effects::Effect;
use crate::errors::CliError;
use crate::tui::types::{App, Mode, TextPromptState, TuiMsg};

use super::async_ops::{dispatch, expand_path, spawn_attachment_read};

const SCROLL_STEP: usize = 5;

/// Work a key press asks for beyond the state change itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Backend(Effect),
    Attach(PathBuf),
}

pub fn handle_event(
    api: &ApiClient,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    app: &mut App,
    event: Event,
) -> Result<(), CliError> {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            handle_key(api, tx, app, key)?;
        }
        _ => {}
    }
    Ok(())
}

pub fn handle_key(
    api: &ApiClient,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    app: &mut App,
    key: KeyEvent,
) -> Result<(), CliError> {
    for action in apply_key(app, key) {
        match action {
            Action::Backend(effect) => dispatch(api, tx, app, [effect]),
            Action::Attach(path) => {
                app.status = format!("Reading {}...", path.display());
                spawn_attachment_read(tx.clone(), path);
            }
        }
    }
    Ok(())
}

pub fn apply_key(app: &mut App, key: KeyEvent) -> Vec<Action> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    if ctrl && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Vec::new();
    }

    match app.mode {
        Mode::Help => {
            if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                app.mode = Mode::Chat;
            }
            Vec::new()
        }
        Mode::AttachPrompt => handle_attach_prompt_key(app, key),
        Mode::Attachments => {
            handle_attachments_key(app, key);
            Vec::new()
        }
        Mode::Threads => handle_threads_key(app, key, ctrl),
        Mode::Chat => handle_chat_key(app, key, ctrl),
    }
}

fn toggle_panel(app: &mut App) {
    app.state.toggle_side_panel();
    if app.state.side_panel.is_open() {
        app.mode = Mode::Threads;
        app.thread_state.select(None);
        app.sync_thread_selection();
    } else {
        app.mode = Mode::Chat;
    }
}

fn backend(effects: impl IntoIterator<Item = Effect>) -> Vec<Action> {
    effects.into_iter().map(Action::Backend).collect()
}

fn handle_chat_key(app: &mut App, key: KeyEvent, ctrl: bool) -> Vec<Action> {
    let newline_modifier = key
        .modifiers
        .intersects(KeyModifiers::ALT | KeyModifiers::SHIFT);

    match key.code {
        KeyCode::Esc => app.should_quit = true,
        KeyCode::F(1) => app.mode = Mode::Help,
        KeyCode::F(3) => toggle_panel(app),
        KeyCode::Char('b') if ctrl => toggle_panel(app),
        KeyCode::Tab if app.state.side_panel.is_open() => {
            app.mode = Mode::Threads;
            app.sync_thread_selection();
        }
        KeyCode::Char('n') if ctrl => {
            app.state.new_thread();
            app.status = "New conversation".to_string();
        }
        KeyCode::Char('r') if ctrl => {
            app.status = "Refreshing threads...".to_string();
            return backend([app.state.refresh_thread_list(false)]);
        }
        KeyCode::Char('o') if ctrl => {
            app.text_prompt = Some(TextPromptState::new("Path of the file to attach"));
            app.mode = Mode::AttachPrompt;
        }
        KeyCode::Char('x') if ctrl => {
            if app.state.composer.files().is_empty() {
                app.status = "No attachments.".to_string();
            } else {
                app.sync_attachment_selection();
                app.mode = Mode::Attachments;
            }
        }
        KeyCode::Enter => match app.state.composer.on_enter(newline_modifier) {
            EnterAction::Newline => app.state.composer.insert_newline(),
            EnterAction::Ignored => {}
            EnterAction::Submit => match app.state.submit_draft() {
                Ok(effect) => {
                    app.sync_attachment_selection();
                    app.status = "Thinking...".to_string();
                    return backend([effect]);
                }
                Err(err) => app.status = err.to_string(),
            },
        },
        KeyCode::Backspace => app.state.composer.backspace(),
        KeyCode::Delete => app.state.composer.delete(),
        KeyCode::Left => app.state.composer.move_left(),
        KeyCode::Right => app.state.composer.move_right(),
        KeyCode::Home => app.state.composer.move_home(),
        KeyCode::End => app.state.composer.move_end(),
        KeyCode::PageUp => app.state.chat_mut().scroll_up(SCROLL_STEP),
        KeyCode::PageDown => app.state.chat_mut().scroll_down(SCROLL_STEP),
        KeyCode::Char(ch) if !ctrl => app.state.composer.insert_char(ch),
        _ => {}
    }
    Vec::new()
}

fn handle_threads_key(app: &mut App, key: KeyEvent, ctrl: bool) -> Vec<Action> {
    let len = app.state.threads().len();
    match key.code {
        KeyCode::Up => move_selection(&mut app.thread_state, -1, len),
        KeyCode::Down => move_selection(&mut app.thread_state, 1, len),
        KeyCode::PageUp => move_selection(&mut app.thread_state, -(SCROLL_STEP as isize), len),
        KeyCode::PageDown => move_selection(&mut app.thread_state, SCROLL_STEP as isize, len),
        KeyCode::Enter => {
            if let Some(id) = app.highlighted_thread() {
                app.mode = Mode::Chat;
                app.status = format!("Loading thread {id}...");
                return backend(app.state.load_conversation(Some(id)));
            }
        }
        KeyCode::Char('d') | KeyCode::Delete => {
            if let Some(id) = app.highlighted_thread() {
                app.status = format!("Deleting thread {id}...");
                return backend([app.state.delete_thread(id)]);
            }
        }
        KeyCode::Char('n') => {
            app.state.new_thread();
            app.mode = Mode::Chat;
            app.status = "New conversation".to_string();
        }
        KeyCode::Char('r') => {
            app.status = "Refreshing threads...".to_string();
            return backend([app.state.refresh_thread_list(false)]);
        }
        KeyCode::Tab => app.mode = Mode::Chat,
        KeyCode::F(1) => app.mode = Mode::Help,
        KeyCode::Esc | KeyCode::F(3) => toggle_panel(app),
        KeyCode::Char('b') if ctrl => toggle_panel(app),
        _ => {}
    }
    Vec::new()
}

fn handle_attachments_key(app: &mut App, key: KeyEvent) {
    let len = app.state.composer.files().len();
    match key.code {
        KeyCode::Up => move_selection(&mut app.attachment_state, -1, len),
        KeyCode::Down => move_selection(&mut app.attachment_state, 1, len),
        KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => {
            if let Some(idx) = app.attachment_state.selected() {
                if let Some(file) = app.state.composer.remove_file(idx) {
                    app.status = format!("Removed {}", file.name);
                }
            }
            app.sync_attachment_selection();
            if app.state.composer.files().is_empty() {
                app.mode = Mode::Chat;
            }
        }
        KeyCode::Esc | KeyCode::Enter => app.mode = Mode::Chat,
        _ => {}
    }
}

fn handle_attach_prompt_key(app: &mut App, key: KeyEvent) -> Vec<Action> {
    let Some(mut st) = app.text_prompt.take() else {
        app.mode = Mode::Chat;
        return Vec::new();
    };

    match key.code {
        KeyCode::Esc => {
            app.mode = Mode::Chat;
            return Vec::new();
        }
        KeyCode::Enter => {
            let value = st.value();
            if !value.trim().is_empty() {
                app.mode = Mode::Chat;
                return vec![Action::Attach(expand_path(&value))];
            }
        }
        KeyCode::Backspace => {
            if st.cursor > 0 && st.cursor <= st.input.len() {
                st.cursor -= 1;
                st.input.remove(st.cursor);
            }
        }
        KeyCode::Left => st.cursor = st.cursor.saturating_sub(1),
        KeyCode::Right => st.cursor = (st.cursor + 1).min(st.input.len()),
        KeyCode::Home => st.cursor = 0,
        KeyCode::End => st.cursor = st.input.len(),
        KeyCode::Char(ch) => {
            st.cursor = st.cursor.min(st.input.len());
            st.input.insert(st.cursor, ch);
            st.cursor += 1;
        }
        _ => {}
    }
    app.text_prompt = Some(st);
    Vec::new()
}

fn move_selection(state: &mut ListState, delta: isize, len: usize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let cur = state.selected().unwrap_or(0) as isize;
    let mut next = cur + delta;
    if next < 0 {
        next = 0;
    }
    if next as usize >= len {
        next = (len - 1) as isize;
    }
    state.select(Some(next as usize));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientState;
    use crate::client::session::Session;
    use crate::models::{Attachment, Thread, ThreadId};
    use chrono::Utc;

    fn app() -> App {
        App::new(
            ClientState::new(Session::in_memory()),
            "http://localhost:8000".to_string(),
            "default".to_string(),
            true,
        )
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn with(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    fn type_text(app: &mut App, text: &str) {
        for ch in text.chars() {
            apply_key(app, press(KeyCode::Char(ch)));
        }
    }

    fn load_threads(app: &mut App, ids: &[u64]) {
        let now = Utc::now();
        let threads = ids
            .iter()
            .map(|id| Thread {
                id: ThreadId(*id),
                title: format!("t{id}"),
                created_at: now,
                updated_at: None,
            })
            .collect();
        let _ = app.state.on_threads_loaded(false, Ok(threads), now);
    }

    #[test]
    fn enter_submits_and_empty_enter_does_nothing() {
        let mut app = app();
        assert!(apply_key(&mut app, press(KeyCode::Enter)).is_empty());
        assert!(app.state.chat().nodes().is_empty());

        type_text(&mut app, "Hi");
        let actions = apply_key(&mut app, press(KeyCode::Enter));
        assert!(matches!(
            actions.as_slice(),
            [Action::Backend(Effect::Submit { thread_id, submission })]
                if thread_id.is_new() && submission.prompt == "Hi"
        ));
        assert_eq!(app.state.chat().nodes().len(), 1);
        assert_eq!(app.state.composer.text(), "");
    }

    #[test]
    fn alt_or_shift_enter_inserts_newline() {
        let mut app = app();
        type_text(&mut app, "a");
        assert!(apply_key(&mut app, with(KeyCode::Enter, KeyModifiers::ALT)).is_empty());
        assert!(apply_key(&mut app, with(KeyCode::Enter, KeyModifiers::SHIFT)).is_empty());
        assert_eq!(app.state.composer.text(), "a\n\n");
        assert_eq!(app.state.composer.rows(), 3);
    }

    #[test]
    fn side_panel_toggle_moves_focus() {
        let mut app = app();
        load_threads(&mut app, &[4, 3]);
        apply_key(&mut app, with(KeyCode::Char('b'), KeyModifiers::CONTROL));
        assert!(app.state.side_panel.is_open());
        assert_eq!(app.mode, Mode::Threads);

        apply_key(&mut app, press(KeyCode::Down));
        assert_eq!(app.highlighted_thread(), Some(ThreadId(3)));
        let actions = apply_key(&mut app, press(KeyCode::Enter));
        assert_eq!(
            actions,
            vec![Action::Backend(Effect::FetchConversation { thread_id: ThreadId(3) })]
        );
        assert_eq!(app.state.pointer(), ThreadId(3));
        assert_eq!(app.mode, Mode::Chat);
        assert!(app.state.side_panel.is_open());

        apply_key(&mut app, press(KeyCode::Tab));
        apply_key(&mut app, press(KeyCode::Esc));
        assert!(!app.state.side_panel.is_open());
        assert_eq!(app.mode, Mode::Chat);
    }

    #[test]
    fn delete_key_targets_highlighted_thread() {
        let mut app = app();
        load_threads(&mut app, &[4, 3]);
        apply_key(&mut app, press(KeyCode::F(3)));
        let actions = apply_key(&mut app, press(KeyCode::Char('d')));
        assert_eq!(
            actions,
            vec![Action::Backend(Effect::DeleteThread { thread_id: ThreadId(4) })]
        );
    }

    #[test]
    fn attach_prompt_yields_path() {
        let mut app = app();
        apply_key(&mut app, with(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert_eq!(app.mode, Mode::AttachPrompt);
        type_text(&mut app, "cv.pdf");
        let actions = apply_key(&mut app, press(KeyCode::Enter));
        assert_eq!(actions, vec![Action::Attach(PathBuf::from("cv.pdf"))]);
        assert_eq!(app.mode, Mode::Chat);
    }

    #[test]
    fn attachments_mode_removes_selected_file() {
        let mut app = app();
        for name in ["a.pdf", "b.png"] {
            app.state.composer.attach(Attachment {
                name: name.to_string(),
                bytes: Vec::new(),
            });
        }
        apply_key(&mut app, with(KeyCode::Char('x'), KeyModifiers::CONTROL));
        assert_eq!(app.mode, Mode::Attachments);
        apply_key(&mut app, press(KeyCode::Down));
        apply_key(&mut app, press(KeyCode::Char('x')));
        let names: Vec<_> = app.state.composer.files().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a.pdf"]);
    }

    #[test]
    fn new_thread_shortcut_clears_focus() {
        let mut app = app();
        load_threads(&mut app, &[4]);
        let _ = app.state.load_conversation(Some(ThreadId(4)));
        apply_key(&mut app, with(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(app.state.pointer(), ThreadId::NEW);
        assert!(app.state.chat().is_new_conversation());
    }
}
