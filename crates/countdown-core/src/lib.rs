//! Shared types for the countdown daemon and its clients: duration
//! conversion, input fields, timer events, configuration and the IPC wire
//! format.

pub mod config;
pub mod event;
pub mod fields;
pub mod ipc;
pub mod time;
