//! Terminal chat client.
//!
//! ```text
//! PARLEY_USER=alice PARLEY_ORIGIN=http://localhost:5173 cargo run -p terminal-chat
//! ```
//!
//! Environment:
//! - `PARLEY_USER`: display name (required)
//! - `PARLEY_URL`: WebSocket URL to connect to, or
//! - `PARLEY_ORIGIN`: page origin to derive the URL from (default
//!   `http://localhost:8080`)
//! - `PARLEY_CONFIG`: optional path to a JSON `ClientConfig`
//! - `RUST_LOG`: log filter (default `info`)
//!
//! Type a line to send it. `/room NAME` switches rooms (`/room` alone goes
//! back to the global room), `/quit` logs out.

use std::path::Path;

use parley::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Say(String),
    Room(RoomId),
    Quit,
    Nothing,
}

fn parse_input(line: &str) -> Input {
    let line = line.trim_end_matches(['\r', '\n']);
    if line.trim().is_empty() {
        return Input::Nothing;
    }
    match line.split_once(' ').unwrap_or((line, "")) {
        ("/quit", _) => Input::Quit,
        ("/room", name) => Input::Room(RoomId::new(name.trim())),
        _ => Input::Say(line.to_owned()),
    }
}

fn load_config(path: Option<&Path>) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(ClientConfig::default());
    };
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn render(event: &SessionEvent) -> Option<String> {
    match event {
        SessionEvent::Activated(identity) => Some(format!("* signed in as {identity}")),
        SessionEvent::MessageAppended(message) => {
            let sender = message
                .sender
                .as_ref()
                .map_or("?", |s| s.as_str());
            let marker = if message.provisional { " (sending)" } else { "" };
            Some(format!("[{}] <{sender}> {}{marker}", message.room, message.body))
        }
        SessionEvent::MessageConfirmed(_) => None,
        SessionEvent::SendFailed { reason, .. } => Some(format!("! not sent: {reason}")),
        SessionEvent::EchoOverdue(_) => Some("! server has not confirmed a message yet".into()),
        SessionEvent::Closed(reason) => Some(format!("* {reason}")),
    }
}

async fn print_events(mut events: mpsc::Receiver<SessionEvent>) {
    while let Some(event) = events.recv().await {
        if let Some(line) = render(&event) {
            println!("{line}");
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path = std::env::var_os("PARLEY_CONFIG");
    let config = load_config(config_path.as_deref().map(Path::new))?;
    let identity = Identity::new(std::env::var("PARLEY_USER").unwrap_or_default())?;

    let manager = ConnectionManager::new(WebSocketConnector).with_config(config);
    tracing::debug!(config = ?manager.config(), "client config");
    let (mut session, events) = match std::env::var("PARLEY_URL") {
        Ok(url) => manager.connect(&FixedEndpoint::new(url), identity).await?,
        Err(_) => {
            let origin = std::env::var("PARLEY_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:8080".to_owned());
            manager.connect(&PageOrigin::parse(&origin)?, identity).await?
        }
    };
    tracing::info!(tag = session.session_tag(), "connected");
    let printer = tokio::spawn(print_events(events));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if !session.state().is_active() {
            break;
        }
        let result = match parse_input(&line) {
            Input::Say(body) => session.send(body),
            Input::Room(room) => session.select_room(room),
            Input::Quit => break,
            Input::Nothing => Ok(()),
        };
        if let Err(e) = result {
            eprintln!("! {e}");
        }
    }

    session.close().await;
    let _ = printer.await;
    Ok(())
}
