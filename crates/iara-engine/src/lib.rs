//! Conversation transcript engine for the IARA tutor.
//!
//! The engine owns the ordered log of interaction items, decides which
//! item is live, serializes network-bound protocols behind a single busy
//! lock, and runs the hint-offer countdown. It is split the same way the
//! rest of the workspace thinks about UIs:
//!
//! - `state` - `EngineState`, the composed mutable state
//! - `events` / `effects` - reducer input and output vocabularies
//! - `update` - the pure reducer (all state mutations happen here)
//! - `runtime` - the tokio boundary that executes effects
//!
//! Any front-end can bind to the engine by feeding `ChatEvent`s in and
//! rendering `TranscriptState::items()` out.

pub mod effects;
pub mod events;
pub mod hints;
pub mod runtime;
pub mod sequencer;
pub mod state;
pub mod transcript;
pub mod update;

pub use effects::{ApiCall, ChatEffect, DelayedEvent};
pub use events::{ChatEvent, MenuAction};
pub use runtime::EngineRuntime;
pub use state::EngineState;
pub use transcript::{ItemId, QuestionKind, Sender, TranscriptItem, TranscriptState};
pub use update::update;
