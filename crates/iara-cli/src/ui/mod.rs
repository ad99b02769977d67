//! Line-mode front-end: input parsing and transcript rendering.

pub mod chat;
mod render;
