//! Crosses library - multiplayer noughts-and-crosses sessions
//!
//! Coordinates many independent two-player matches under concurrent access
//! from HTTP handlers and long-lived SSE subscribers.
//!
//! # Architecture
//!
//! - **Game**: pure rules engine for one board, no concurrency, no I/O
//! - **Session**: session store; one lock serializes every mutation
//! - **Broadcast**: per-session subscriber sets with non-blocking fan-out
//!   and slow-subscriber eviction
//! - **Render**: injected snapshot-to-bytes capability, invoked outside
//!   any lock
//! - **Web**: axum transport rendering htmx pages and SSE board updates
//!
//! # Example
//!
//! ```no_run
//! use crosses::{Coord, GameService};
//!
//! let service = GameService::new();
//! let session = service.create();
//! let (seat, _) = service.join(&session.id, "alice").unwrap();
//! assert!(seat.is_some());
//! service.play(&session.id, "alice", Coord::new(0, 0)).unwrap();
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

// Private module declarations
mod broadcast;
mod game;
mod ids;
mod render;
mod session;

// Public modules
pub mod cli;
pub mod web;

// Crate-level exports - Broadcast
pub use broadcast::{Payload, Subscription};

// Crate-level exports - Rules engine
pub use game::{Board, Coord, Game, Mark, PlayError};

// Crate-level exports - Identifiers
pub use ids::new_id;

// Crate-level exports - Renderer capability
pub use render::{NoopRender, Render};

// Crate-level exports - Session store
pub use session::{GameService, PlayerId, ServiceError, Session, SessionId};
