//! anim is a terminal client for a prompt-to-video backend.
//!
//! A prompt is sent over a per-chat WebSocket; the backend streams a prose
//! explanation followed by a fenced generation script, then queues a render
//! job whose completion is detected by polling a status endpoint.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session controller, phase tracking, message assembly,
//!   the completion poller, the socket transport, and the shared stores.
//! - [`api`] defines the REST payloads and the HTTP client used for history,
//!   status, credits, and video lookups.
//! - [`cli`] parses arguments and renders a running session to the terminal.
//! - [`utils`] holds URL helpers, diagnostics setup, and the transcript log.

pub mod api;
pub mod cli;
pub mod core;
pub mod utils;
