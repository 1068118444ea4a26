//! Session CLI commands: list stored sessions, print a session's history.

use anyhow::Result;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;

use chatkeep_types::chat::{MessageRole, SessionId};

use crate::state::AppState;

/// List stored sessions, newest first, with label and preview.
///
/// # Examples
///
/// ```bash
/// chatkeep sessions
/// chatkeep sessions --json
/// ```
pub async fn list_sessions(state: &AppState, json: bool) -> Result<()> {
    let sessions = state.chat_service.summarize_sessions(&[]).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!();
        println!(
            "  {} No chats stored yet. Start one with: {}",
            style("i").blue().bold(),
            style("chatkeep serve").yellow()
        );
        println!();
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Started").fg(Color::White),
        Cell::new("Session").fg(Color::White),
        Cell::new("Preview").fg(Color::White),
    ]);

    for session in &sessions {
        table.add_row(vec![
            Cell::new(&session.label).fg(Color::White),
            Cell::new(session.session_id.as_str()).fg(Color::Cyan),
            Cell::new(&session.preview).fg(Color::DarkGrey),
        ]);
    }

    println!();
    println!("{table}");
    println!();
    println!(
        "  {} session{}",
        style(sessions.len()).bold(),
        if sessions.len() == 1 { "" } else { "s" }
    );
    println!();

    Ok(())
}

/// Print the stored turns of a session in order.
///
/// Unknown sessions print as empty chats.
///
/// # Examples
///
/// ```bash
/// chatkeep history 20250131_142501
/// chatkeep history 20250131_142501 --json
/// ```
pub async fn show_history(state: &AppState, session_id: &str, json: bool) -> Result<()> {
    let session_id = SessionId::new(session_id);
    let messages = state.chat_service.load_history(&session_id).await?;

    if json {
        let output = serde_json::json!({
            "session_id": session_id,
            "label": session_id.label(),
            "messages": messages,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!(
        "  {} {}",
        style("Chat").bold(),
        style(session_id.label()).cyan().bold()
    );
    println!();

    if messages.is_empty() {
        println!("  {}", style("Empty chat").dim());
        println!();
        return Ok(());
    }

    for message in &messages {
        let speaker = match message.role {
            MessageRole::User => style("You").green().bold(),
            MessageRole::Assistant => style("Assistant").magenta().bold(),
            MessageRole::System => style("System").dim(),
        };
        println!("  {speaker}");
        for line in message.content.lines() {
            println!("    {line}");
        }
        println!();
    }

    Ok(())
}
