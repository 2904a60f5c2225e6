//! Renderer capability: turns a session snapshot into broadcast bytes.

use crate::session::Session;

/// Pure function from a session snapshot to an opaque payload.
///
/// Injected into the [`GameService`](crate::GameService) at construction and
/// invoked outside any lock, so the state representation stays decoupled
/// from the transport format. Implementations must not block.
pub trait Render: Send + Sync {
    /// Renders the snapshot.
    fn render(&self, snapshot: &Session) -> Vec<u8>;
}

/// Default renderer for headless use: produces an empty payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRender;

impl Render for NoopRender {
    fn render(&self, _snapshot: &Session) -> Vec<u8> {
        Vec::new()
    }
}

impl<F> Render for F
where
    F: Fn(&Session) -> Vec<u8> + Send + Sync,
{
    fn render(&self, snapshot: &Session) -> Vec<u8> {
        self(snapshot)
    }
}
