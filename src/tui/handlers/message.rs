use chrono::Utc;
use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::client::effects::{Effect, Outcome};
use crate::errors::CliError;
use crate::tui::types::{App, TuiMsg};

use super::async_ops::dispatch;

pub fn handle_tui_msg(api: &ApiClient, tx: &mpsc::UnboundedSender<TuiMsg>, app: &mut App, msg: TuiMsg) {
    let effects = apply_msg(app, msg);
    dispatch(api, tx, app, effects);
}

/// Folds one async result into the app and returns the follow-up calls it asks for.
pub fn apply_msg(app: &mut App, msg: TuiMsg) -> Vec<Effect> {
    match msg {
        TuiMsg::Backend(outcome) => {
            app.bg_tasks = app.bg_tasks.saturating_sub(1);
            if matches!(outcome, Outcome::Submitted { .. }) {
                app.waiting = app.waiting.saturating_sub(1);
            }
            app.status = outcome_status(&outcome);
            let effects = app.state.apply(outcome, Utc::now());
            app.sync_thread_selection();
            effects
        }
        TuiMsg::Attached(path, res) => {
            match res {
                Ok(file) => {
                    app.status = format!("Attached {}", file.name);
                    app.state.composer.attach(file);
                    app.sync_attachment_selection();
                }
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "attachment failed");
                    app.status = err.to_string();
                }
            }
            Vec::new()
        }
    }
}

fn outcome_status(outcome: &Outcome) -> String {
    match outcome {
        Outcome::Threads { result: Ok(threads), .. } => match threads.len() {
            0 => "No threads yet. Start typing to begin one.".to_string(),
            1 => "1 thread".to_string(),
            n => format!("{n} threads"),
        },
        Outcome::Threads { result: Err(err), .. } => error_status("Failed loading threads", err),
        Outcome::Conversation { result: Ok(_), .. } => "Ready".to_string(),
        Outcome::Conversation { thread_id, result: Err(err) } => {
            error_status(&format!("Failed loading thread {thread_id}"), err)
        }
        Outcome::Submitted { result: Ok(_), .. } => "Ready".to_string(),
        Outcome::Submitted { result: Err(err), .. } => error_status("Send failed", err),
        Outcome::Deleted { thread_id, result: Ok(()) } => format!("Deleted thread {thread_id}"),
        Outcome::Deleted { thread_id, result: Err(err) } => {
            error_status(&format!("Failed deleting thread {thread_id}"), err)
        }
    }
}

fn error_status(context: &str, err: &CliError) -> String {
    match err {
        CliError::Auth(_) => format!("{context}: not signed in. Run `resumax config set session <id>`."),
        other => format!("{context}: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientState;
    use crate::client::conversation::NodeRole;
    use crate::client::session::Session;
    use crate::models::{Reply, Thread, ThreadId};
    use std::path::PathBuf;

    fn app() -> App {
        App::new(
            ClientState::new(Session::in_memory()),
            "http://localhost:8000".to_string(),
            "default".to_string(),
            true,
        )
    }

    #[test]
    fn thread_list_result_focuses_and_requests_conversation() {
        let mut app = app();
        app.bg_tasks = 1;
        let effects = apply_msg(
            &mut app,
            TuiMsg::Backend(Outcome::Threads {
                focus_most_recent: true,
                result: Ok(vec![Thread {
                    id: ThreadId(5),
                    title: "Resume Review".to_string(),
                    created_at: Utc::now(),
                    updated_at: None,
                }]),
            }),
        );
        assert_eq!(effects, vec![Effect::FetchConversation { thread_id: ThreadId(5) }]);
        assert_eq!(app.bg_tasks, 0);
        assert_eq!(app.highlighted_thread(), Some(ThreadId(5)));
        assert_eq!(app.status, "1 thread");
    }

    #[test]
    fn reply_clears_waiting() {
        let mut app = app();
        app.waiting = 1;
        app.bg_tasks = 1;
        let effects = apply_msg(
            &mut app,
            TuiMsg::Backend(Outcome::Submitted {
                thread_id: ThreadId(3),
                result: Ok(Reply {
                    text: "Hello!".to_string(),
                    attached_files: Vec::new(),
                }),
            }),
        );
        assert!(effects.is_empty());
        assert_eq!(app.waiting, 0);
        assert_eq!(app.state.chat().nodes()[0].role, NodeRole::Bot);
    }

    #[test]
    fn auth_failure_hints_at_session() {
        let mut app = app();
        apply_msg(
            &mut app,
            TuiMsg::Backend(Outcome::Threads {
                focus_most_recent: true,
                result: Err(CliError::Auth("redirect".to_string())),
            }),
        );
        assert!(app.status.contains("not signed in"));
    }

    #[test]
    fn failed_attachment_reports_status() {
        let mut app = app();
        apply_msg(
            &mut app,
            TuiMsg::Attached(
                PathBuf::from("missing.pdf"),
                Err(CliError::Usage("Cannot read missing.pdf".to_string())),
            ),
        );
        assert!(app.state.composer.files().is_empty());
        assert_eq!(app.status, "Cannot read missing.pdf");
    }
}
