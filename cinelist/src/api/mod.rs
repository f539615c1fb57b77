//! HTTP API handlers
//!
//! Stands in for a chat transport: commands and button presses arrive as
//! JSON posts, outgoing chat messages leave through the SSE stream.

pub mod commands;
pub mod health;
pub mod movies;
pub mod sse;

pub use commands::command_routes;
pub use health::health_routes;
pub use movies::movie_routes;
pub use sse::chat_event_stream;
