use std::io::{self, Read};
use std::path::PathBuf;

use clap::Args;
use serde_json::json;

use crate::app::Runtime;
use crate::client::ClientState;
use crate::client::conversation::{NodeRole, REQUEST_FAILED_TEXT};
use crate::client::driver;
use crate::errors::CliError;
use crate::models::{Attachment, ThreadId};

#[derive(Debug, Args)]
pub struct ChatArgs {
    /// Prompt text
    pub prompt: Option<String>,
    /// Continue an existing thread instead of starting a new one
    #[arg(short = 't', long = "thread")]
    pub thread: Option<u64>,
    /// Attach a file (repeatable)
    #[arg(short = 'f', long = "file")]
    pub files: Vec<PathBuf>,
    /// Read prompt from stdin
    #[arg(long)]
    pub stdin: bool,
}

pub async fn handle(runtime: &Runtime, args: ChatArgs) -> Result<(), CliError> {
    let prompt = resolve_prompt(&args)?;
    let api = runtime.api_client()?;
    let mut state = ClientState::new(runtime.ephemeral_session());

    for path in &args.files {
        let file = Attachment::read(path).await?;
        tracing::debug!(file = %file.name, bytes = file.bytes.len(), "attached");
        state.composer.attach(file);
    }
    state.composer.set_text(&prompt);

    if let Some(id) = args.thread.map(ThreadId).filter(|id| !id.is_new()) {
        // Loading first surfaces a missing thread before anything is sent.
        let load = state.load_conversation(Some(id));
        if let Some(err) = driver::run(&api, &mut state, load).await {
            return Err(err);
        }
    }

    let target = state.pointer();
    let effect = state.submit_draft()?;
    let error = driver::run(&api, &mut state, [effect]).await;

    // Success leaves a bot entry last; a failed send leaves the error notice.
    let reply = state
        .chat()
        .nodes()
        .last()
        .filter(|n| n.role == NodeRole::Bot)
        .cloned();
    let Some(reply) = reply else {
        return Err(error.unwrap_or_else(|| CliError::Generic(REQUEST_FAILED_TEXT.to_string())));
    };
    if let Some(err) = error {
        tracing::warn!(error = %err, "reply received but a follow-up refresh failed");
    }

    if runtime.output.json {
        runtime.output.print_json(&json!({
            "thread": state.pointer(),
            "title": state.focused_thread().map(|t| t.title.clone()),
            "response": reply.text,
            "attachedFiles": reply.attachments,
        }))?;
        return Ok(());
    }

    runtime.output.print_human(&reply.text);
    for name in &reply.attachments {
        runtime.output.print_human(&format!("[file] {name}"));
    }
    if target.is_new() && !state.pointer().is_new() {
        runtime
            .output
            .print_stderr(&format!("thread={} (continue with --thread {})", state.pointer(), state.pointer()));
    }
    Ok(())
}

fn resolve_prompt(args: &ChatArgs) -> Result<String, CliError> {
    if args.stdin {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .map_err(|e| CliError::Generic(format!("Failed reading stdin: {e}")))?;
        let trimmed = input.trim().to_string();
        if trimmed.is_empty() {
            return Err(CliError::Usage(
                "No prompt provided via stdin. Pipe text or pass a prompt argument.".to_string(),
            ));
        }
        return Ok(trimmed);
    }

    match &args.prompt {
        Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
        _ => Err(CliError::Usage(
            "Missing prompt. Use `resumax chat \"...\"` or pass `--stdin`.".to_string(),
        )),
    }
}
