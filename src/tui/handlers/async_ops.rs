use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::api::ApiClient;
use crate::client::driver;
use crate::client::effects::Effect;
use crate::models::Attachment;
use crate::tui::types::{App, TuiMsg};

/// Runs one effect in the background; its outcome comes back as `TuiMsg::Backend`.
pub fn spawn_effect(api: ApiClient, tx: mpsc::UnboundedSender<TuiMsg>, effect: Effect) {
    tokio::spawn(async move {
        let outcome = driver::perform(&api, effect).await;
        let _ = tx.send(TuiMsg::Backend(outcome));
    });
}

pub fn dispatch(
    api: &ApiClient,
    tx: &mpsc::UnboundedSender<TuiMsg>,
    app: &mut App,
    effects: impl IntoIterator<Item = Effect>,
) {
    for effect in effects {
        app.bg_tasks = app.bg_tasks.saturating_add(1);
        if matches!(effect, Effect::Submit { .. }) {
            app.waiting = app.waiting.saturating_add(1);
        }
        spawn_effect(api.clone(), tx.clone(), effect);
    }
}

pub fn spawn_attachment_read(tx: mpsc::UnboundedSender<TuiMsg>, path: PathBuf) {
    tokio::spawn(async move {
        let res = Attachment::read(&path).await;
        let _ = tx.send(TuiMsg::Attached(path, res));
    });
}

/// `~/` expands to the home directory; everything else is taken as typed.
pub fn expand_path(input: &str) -> PathBuf {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(trimmed)
}
