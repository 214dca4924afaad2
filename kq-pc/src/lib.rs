//! Karaoke Playback Controller (kq-pc)
//!
//! Keeps one display in step with the Queue Store: polls for the head of the
//! queue (and re-polls on queue events), drives the player, advances on end
//! or viewer request, and asks for an auto-fill when the queue has sat empty.

pub mod client;
pub mod controller;
pub mod live;
pub mod player;
pub mod runtime;

pub use client::{ClientError, HttpQueueClient, QueueClient};
pub use controller::{Action, Controller, ControllerState, Input, PlaybackErrorKind};
pub use live::{EventFollower, SseMessage, SseParser};
pub use player::{LogPlayer, Player};
pub use runtime::{spawn, ControllerHandle, QueueNotifier, RuntimeConfig};
