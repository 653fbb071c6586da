// SPDX-FileCopyrightText: 2026 Varta Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interactive chat shell.
//!
//! A thin presentation collaborator over the turn orchestrator: it only
//! calls entry points and re-renders session snapshots on change. Streaming
//! responses are echoed to stdout as the placeholder message grows.

use std::io::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing::info;

use varta_config::VartaConfig;
use varta_core::types::{Attachment, Role};
use varta_core::{CredentialGate, SessionId, StateStore, VartaError};
use varta_engine::{notices, TurnOrchestrator};
use varta_gemini::GeminiBackend;
use varta_storage::SqliteStateStore;

/// CredentialGate for the terminal: selection is the configured API key,
/// reselection prints guidance instead of opening a picker.
struct CliCredentialGate;

#[async_trait]
impl CredentialGate for CliCredentialGate {
    async fn has_selected_key(&self) -> Result<bool, VartaError> {
        // Backend construction already required a configured key.
        Ok(true)
    }

    async fn request_reselect(&self) -> Result<(), VartaError> {
        eprintln!(
            "{}",
            "Video generation needs a valid paid API key. Update gemini.api_key in \
             varta.toml (or VARTA_GEMINI_API_KEY) and try again."
                .yellow()
        );
        Ok(())
    }
}

/// Runs the interactive shell until EOF or `/quit`.
pub async fn run_shell(config: VartaConfig) -> Result<(), VartaError> {
    let store: Arc<dyn StateStore> = Arc::new(SqliteStateStore::new(config.storage.clone()));

    let backend = GeminiBackend::new(&config.gemini, &config.storage).inspect_err(|_| {
        eprintln!(
            "error: Gemini API key required. Set gemini.api_key in varta.toml or the \
             VARTA_GEMINI_API_KEY env var."
        );
    })?;

    let orchestrator = Arc::new(
        TurnOrchestrator::load(
            Arc::new(backend),
            store.clone(),
            Some(Arc::new(CliCredentialGate)),
            &config.limits,
        )
        .await?,
    );

    let mut active = orchestrator.sessions()[0].id.clone();
    info!(session_id = %active, "shell session ready");

    let mut rl = DefaultEditor::new()
        .map_err(|e| VartaError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", format!("{} shell", config.agent.name).bold().green());
    println!(
        "Type a message, or {} for commands, {} to exit.\n",
        "/help".yellow(),
        "/quit".yellow()
    );

    let prompt = format!("{}> ", config.agent.name.green());
    loop {
        match rl.readline(&prompt) {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                match handle_line(&orchestrator, &mut active, trimmed).await {
                    Ok(ShellFlow::Continue) => {}
                    Ok(ShellFlow::Quit) => break,
                    Err(error) => eprintln!("{}: {error}", "error".red()),
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(error) => {
                eprintln!("{}: {error}", "error".red());
                break;
            }
        }
    }

    store.close().await?;
    println!("{}", "goodbye".dimmed());
    Ok(())
}

enum ShellFlow {
    Continue,
    Quit,
}

/// Dispatches one input line: slash commands or a chat submission.
async fn handle_line(
    orchestrator: &Arc<TurnOrchestrator>,
    active: &mut SessionId,
    line: &str,
) -> Result<ShellFlow, VartaError> {
    match line.split_whitespace().next() {
        Some("/quit") | Some("/exit") => return Ok(ShellFlow::Quit),
        Some("/help") => {
            print_help();
        }
        Some("/new") => {
            *active = orchestrator.create_session().await?;
            println!("{}", "started a new chat".dimmed());
        }
        Some("/sessions") => {
            for (index, session) in orchestrator.sessions().iter().enumerate() {
                let marker = if &session.id == active { "*" } else { " " };
                println!(
                    "{marker} [{index}] {} ({} messages, {})",
                    session.title,
                    session.messages.len(),
                    session.updated_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        Some("/open") => {
            let index: usize = line
                .split_whitespace()
                .nth(1)
                .and_then(|s| s.parse().ok())
                .ok_or_else(|| VartaError::Internal("usage: /open <index>".to_string()))?;
            let sessions = orchestrator.sessions();
            let session = sessions
                .get(index)
                .ok_or_else(|| VartaError::Internal(format!("no session at index {index}")))?;
            *active = session.id.clone();
            render_session_tail(orchestrator, active, 6);
        }
        Some("/delete") => {
            orchestrator.delete_session(active).await?;
            if orchestrator.sessions().is_empty() {
                *active = orchestrator.create_session().await?;
            } else {
                *active = orchestrator.sessions()[0].id.clone();
            }
            println!("{}", "chat deleted".dimmed());
        }
        Some("/summarize") => {
            run_turn(orchestrator, active, move |o, sid| async move {
                o.summarize(&sid).await
            })
            .await?;
        }
        Some("/search") => {
            let on = line.split_whitespace().nth(1) == Some("on");
            orchestrator.set_use_search(on);
            println!("{}", format!("web search {}", if on { "on" } else { "off" }).dimmed());
        }
        Some("/pro") => {
            let on = line.split_whitespace().nth(1) == Some("on");
            orchestrator.set_use_pro(on);
            println!("{}", format!("pro model {}", if on { "on" } else { "off" }).dimmed());
        }
        Some("/subscribe") => {
            orchestrator.set_subscribed(true).await;
            println!("{}", "subscription enabled".dimmed());
        }
        Some("/attach") => {
            let mut parts = line.splitn(3, char::is_whitespace);
            parts.next();
            let path = parts
                .next()
                .ok_or_else(|| VartaError::Internal("usage: /attach <file> [prompt]".to_string()))?;
            let text = parts.next().unwrap_or("").to_string();
            let attachment = read_attachment(path)?;
            run_turn(orchestrator, active, move |o, sid| async move {
                o.submit_turn(&sid, &text, Some(attachment), None).await
            })
            .await?;
        }
        Some("/edit") => {
            let new_text = line
                .strip_prefix("/edit")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| VartaError::Internal("usage: /edit <new text>".to_string()))?
                .to_string();
            let target = orchestrator
                .session(active)
                .and_then(|s| s.messages.iter().rev().find(|m| m.role == Role::User).cloned())
                .ok_or_else(|| VartaError::Internal("no user message to edit".to_string()))?;
            run_turn(orchestrator, active, move |o, sid| async move {
                o.edit_and_resubmit(&sid, &target.id, &new_text).await
            })
            .await?;
        }
        Some("/editvideo") => {
            let edit_prompt = line
                .strip_prefix("/editvideo")
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .ok_or_else(|| VartaError::Internal("usage: /editvideo <prompt>".to_string()))?
                .to_string();
            let target = orchestrator
                .session(active)
                .and_then(|s| {
                    s.messages
                        .iter()
                        .rev()
                        .find(|m| m.generated_video.is_some())
                        .cloned()
                })
                .ok_or_else(|| VartaError::Internal("no video in this chat to edit".to_string()))?;
            run_turn(orchestrator, active, move |o, sid| async move {
                o.submit_video_edit(&sid, &target.id, &edit_prompt, None).await
            })
            .await?;
        }
        _ => {
            let text = line.to_string();
            run_turn(orchestrator, active, move |o, sid| async move {
                o.submit_turn(&sid, &text, None, None).await
            })
            .await?;
        }
    }
    Ok(ShellFlow::Continue)
}

/// Runs one orchestrator entry point while echoing the growing placeholder
/// message to stdout, then renders the final assistant state.
async fn run_turn<F, Fut>(
    orchestrator: &Arc<TurnOrchestrator>,
    active: &SessionId,
    submit: F,
) -> Result<(), VartaError>
where
    F: FnOnce(Arc<TurnOrchestrator>, SessionId) -> Fut,
    Fut: std::future::Future<Output = Result<(), VartaError>>,
{
    let echo = spawn_echo(orchestrator.clone(), active.clone());
    let result = submit(orchestrator.clone(), active.clone()).await;
    if result.is_err() {
        // Rejected before the turn started; no state change will wake the echo.
        echo.abort();
    }
    let _ = echo.await;
    println!();

    if result.is_ok() {
        render_media(orchestrator, active);
    }
    result
}

/// Echoes placeholder content as it grows. Accumulating content (chat
/// streaming) prints the suffix; overwritten content (video progress)
/// reprints the line.
fn spawn_echo(
    orchestrator: Arc<TurnOrchestrator>,
    session_id: SessionId,
) -> tokio::task::JoinHandle<()> {
    let mut changes = orchestrator.subscribe();
    tokio::spawn(async move {
        let mut printed = String::new();
        loop {
            if changes.changed().await.is_err() {
                break;
            }
            if let Some(session) = orchestrator.session(&session_id)
                && let Some(message) =
                    session.messages.iter().rev().find(|m| m.role == Role::Assistant)
                && message.content != notices::THINKING
            {
                let content = message.content.clone();
                if content.starts_with(&printed) {
                    print!("{}", &content[printed.len()..]);
                } else {
                    print!("\n{content}");
                }
                let _ = std::io::stdout().flush();
                printed = content;
            }
            if !orchestrator.is_loading() {
                break;
            }
        }
    })
}

/// Prints media references and grounding sources of the newest assistant
/// message, if any.
fn render_media(orchestrator: &Arc<TurnOrchestrator>, session_id: &SessionId) {
    let Some(session) = orchestrator.session(session_id) else {
        return;
    };
    let Some(message) = session.messages.iter().rev().find(|m| m.role == Role::Assistant) else {
        return;
    };
    if let Some(video) = &message.generated_video {
        println!("{}", format!("[video: {video}]").cyan());
    }
    if let Some(image) = &message.generated_image {
        let preview: String = image.0.chars().take(48).collect();
        println!("{}", format!("[image: {preview}...]").cyan());
    }
    for source in &message.sources {
        println!("{}", format!("[source: {} <{}>]", source.title, source.uri).dimmed());
    }
}

/// Renders the last `count` messages of a session.
fn render_session_tail(
    orchestrator: &Arc<TurnOrchestrator>,
    session_id: &SessionId,
    count: usize,
) {
    let Some(session) = orchestrator.session(session_id) else {
        return;
    };
    println!("{}", session.title.bold());
    let start = session.messages.len().saturating_sub(count);
    for message in &session.messages[start..] {
        let role = match message.role {
            Role::User => "you".green(),
            Role::Assistant => "varta".cyan(),
        };
        println!("{role}: {}", message.content);
    }
}

/// Reads a file into an attachment, guessing the MIME type from the
/// extension.
fn read_attachment(path: &str) -> Result<Attachment, VartaError> {
    let bytes = std::fs::read(path)
        .map_err(|e| VartaError::Internal(format!("cannot read {path}: {e}")))?;
    let mime_type = match std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
    .to_string();
    Ok(Attachment { bytes, mime_type })
}

fn print_help() {
    println!(
        "{}",
        "/new            start a new chat\n\
         /sessions       list chats\n\
         /open <n>       switch to chat n\n\
         /delete         delete the active chat\n\
         /summarize      summarize the active chat\n\
         /search on|off  toggle web-search grounding\n\
         /pro on|off     toggle the pro model\n\
         /subscribe      enable the premium subscription\n\
         /attach <file> [prompt]   send an image\n\
         /edit <text>    edit your last message and regenerate\n\
         /editvideo <prompt>       re-render the last video with changes\n\
         /image, /video prefixes force a generation path\n\
         /quit           exit"
            .dimmed()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attachment_mime_guessing() {
        // read_attachment requires a real file; exercise the extension
        // mapping through a temp file.
        let dir = std::env::temp_dir();
        let path = dir.join("varta-shell-test.png");
        std::fs::write(&path, b"png-bytes").unwrap();
        let attachment = read_attachment(path.to_str().unwrap()).unwrap();
        assert_eq!(attachment.mime_type, "image/png");
        assert_eq!(attachment.bytes, b"png-bytes");
        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn cli_credential_gate_reports_selected() {
        let gate = CliCredentialGate;
        assert!(gate.has_selected_key().await.unwrap());
        assert!(gate.request_reselect().await.is_ok());
    }
}
