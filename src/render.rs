// src/render.rs

//! Headless UI: prints orchestrator events to stdout.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::{SlotStatus, UiEvent};

/// Print every event until the sending side goes away.
pub fn spawn_renderer(mut rx: mpsc::UnboundedReceiver<UiEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            println!("{}", render_event(&event));
        }
    })
}

pub fn render_event(event: &UiEvent) -> String {
    match event {
        UiEvent::Status(update) => {
            let text = match update.status {
                SlotStatus::Idle => "-",
                _ => update.message.as_str(),
            };
            format!("[{}] {}", update.kind, text)
        }
        UiEvent::BestGuess { text: Some(text), .. } => {
            let mut out = String::from("[best-guess]");
            for line in text.lines() {
                out.push_str("\n    ");
                out.push_str(line);
            }
            out
        }
        UiEvent::BestGuess { text: None, .. } => "[best-guess] -".to_string(),
        UiEvent::Fatal(message) => format!("[fatal] {message}"),
    }
}
