use clap::Subcommand;
use serde_json::{Value, json};

use crate::app::Runtime;
use crate::client::ClientState;
use crate::client::conversation::{ChatNode, NodeRole};
use crate::client::driver;
use crate::errors::CliError;
use crate::markdown::{line_text, render_markdown};
use crate::models::ThreadId;

#[derive(Debug, Subcommand)]
pub enum ThreadCommand {
    /// Print every turn of a thread
    Show { id: u64 },
    /// Delete a thread
    Delete { id: u64 },
}

/// `resumax threads`: the side panel as text, newest group first.
pub async fn list(runtime: &Runtime) -> Result<(), CliError> {
    let api = runtime.api_client()?;
    let mut state = ClientState::new(runtime.ephemeral_session());
    let refresh = state.refresh_thread_list(false);
    if let Some(err) = driver::run(&api, &mut state, [refresh]).await {
        return Err(err);
    }

    if runtime.output.json {
        let groups = state
            .threads()
            .groups()
            .iter()
            .map(|group| {
                json!({
                    "label": group.bucket.label(),
                    "threads": group.threads.iter().map(|t| json!({
                        "id": t.id,
                        "title": t.title,
                        "createdAt": t.created_at.to_rfc3339(),
                    })).collect::<Vec<_>>(),
                })
            })
            .collect::<Vec<_>>();
        runtime.output.print_json(&json!({ "groups": groups }))?;
        return Ok(());
    }

    if state.threads().is_empty() {
        runtime.output.print_human("No threads yet.");
        return Ok(());
    }
    for group in state.threads().groups() {
        runtime.output.print_human(group.bucket.label());
        for thread in &group.threads {
            runtime
                .output
                .print_human(&format!("  {:>6}  {}", thread.id, thread.title));
        }
    }
    Ok(())
}

pub async fn handle(runtime: &Runtime, command: ThreadCommand) -> Result<(), CliError> {
    match command {
        ThreadCommand::Show { id } => show(runtime, parse_id(id)?).await,
        ThreadCommand::Delete { id } => delete(runtime, parse_id(id)?).await,
    }
}

fn parse_id(id: u64) -> Result<ThreadId, CliError> {
    let id = ThreadId(id);
    if id.is_new() {
        return Err(CliError::Usage("Thread id must be a positive number.".to_string()));
    }
    Ok(id)
}

async fn show(runtime: &Runtime, id: ThreadId) -> Result<(), CliError> {
    let api = runtime.api_client()?;
    let mut state = ClientState::new(runtime.ephemeral_session());
    let load = state.load_conversation(Some(id));
    if let Some(err) = driver::run(&api, &mut state, load).await {
        return Err(err);
    }

    let nodes = state.chat().nodes();
    if runtime.output.json {
        let turns = nodes.iter().map(node_json).collect::<Vec<_>>();
        runtime
            .output
            .print_json(&json!({ "thread": id, "messages": turns }))?;
        return Ok(());
    }

    for node in nodes {
        runtime.output.print_human(&render_node(node));
        runtime.output.print_human("");
    }
    Ok(())
}

async fn delete(runtime: &Runtime, id: ThreadId) -> Result<(), CliError> {
    let api = runtime.api_client()?;
    let state = ClientState::new(runtime.ephemeral_session());
    // No list is on screen here, so the follow-up refresh is skipped.
    let outcome = driver::perform(&api, state.delete_thread(id)).await;
    if let Some(err) = outcome.error() {
        return Err(err.clone());
    }

    if runtime.output.json {
        runtime
            .output
            .print_json(&json!({ "ok": true, "thread": id }))?;
    } else {
        runtime.output.print_human(&format!("Deleted thread {id}."));
    }
    Ok(())
}

fn node_json(node: &ChatNode) -> Value {
    let role = match node.role {
        NodeRole::User => "user",
        NodeRole::Bot => "bot",
        NodeRole::Error => "error",
    };
    json!({
        "role": role,
        "text": node.text,
        "attachments": node.attachments,
    })
}

fn render_node(node: &ChatNode) -> String {
    let mut out = match node.role {
        NodeRole::User => format!("You: {}", node.text),
        NodeRole::Bot | NodeRole::Error => {
            let body = render_markdown(&node.text)
                .iter()
                .map(line_text)
                .collect::<Vec<_>>()
                .join("\n");
            format!("Resumax:\n{body}")
        }
    };
    for name in &node.attachments {
        out.push_str(&format!("\n  [file] {name}"));
    }
    out
}
