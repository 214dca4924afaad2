//! Player sink and viewer command parsing
//!
//! The video widget lives outside this process. `LogPlayer` stands in for it
//! on a headless display: every command is logged, and player/viewer events
//! arrive as text lines (see `parse_command`).

use kq_common::QueueEntry;
use tracing::info;

use crate::controller::{Input, PlaybackErrorKind};

/// Commands the controller sends to the video widget
pub trait Player: Send {
    fn load(&mut self, entry: &QueueEntry);
    fn stop(&mut self);
    fn show_fallback(&mut self, entry: &QueueEntry, kind: PlaybackErrorKind);
    fn open_external(&mut self, source_url: &str);
}

/// Player that logs each command
#[derive(Debug, Default)]
pub struct LogPlayer;

impl Player for LogPlayer {
    fn load(&mut self, entry: &QueueEntry) {
        info!(
            media_id = %entry.media_id,
            submitter = %entry.submitter_name,
            "▶ Load \"{}\"",
            entry.title
        );
    }

    fn stop(&mut self) {
        info!("■ Stop. No videos in queue. Add some songs!");
    }

    fn show_fallback(&mut self, entry: &QueueEntry, kind: PlaybackErrorKind) {
        info!(
            media_id = %entry.media_id,
            submitter = %entry.submitter_name,
            "⚠ {}: type `open` to watch externally or `next` to skip",
            kind.headline()
        );
    }

    fn open_external(&mut self, source_url: &str) {
        info!("↗ Open externally: {}", source_url);
    }
}

/// One parsed stdin line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerCommand {
    Input(Input),
    Quit,
}

/// Parse a command line
///
/// `ended`, `error <code>`, `next`, `open`, `delete <id>`, `confirm <id>`,
/// `cancel`, `quit`. Blank lines yield `Ok(None)`.
pub fn parse_command(line: &str) -> Result<Option<ViewerCommand>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let command = match (verb.to_ascii_lowercase().as_str(), arg) {
        ("ended", None) => ViewerCommand::Input(Input::Ended),
        ("next", None) => ViewerCommand::Input(Input::Next),
        ("open", None) => ViewerCommand::Input(Input::OpenExternal),
        ("cancel", None) => ViewerCommand::Input(Input::CancelDelete),
        ("quit", None) => ViewerCommand::Quit,
        ("error", Some(code)) => {
            let code = code
                .parse::<i32>()
                .map_err(|_| format!("error code must be a number, got '{}'", code))?;
            ViewerCommand::Input(Input::Error(code))
        }
        ("delete", Some(id)) => ViewerCommand::Input(Input::RequestDelete(id.to_string())),
        ("confirm", Some(id)) => ViewerCommand::Input(Input::ConfirmDelete(id.to_string())),
        ("error" | "delete" | "confirm", None) => {
            return Err(format!("'{}' needs an argument", verb));
        }
        _ => return Err(format!("unknown command '{}'", line.trim())),
    };

    if words.next().is_some() {
        return Err(format!("too many arguments in '{}'", line.trim()));
    }
    Ok(Some(command))
}
