//! Session store: owns per-session state and serializes all mutations.
//!
//! One mutex guards the session map and the subscriber registry. The
//! mutation path never awaits while holding the lock, and rendering plus
//! fan-out always happen after release, on a value snapshot captured under
//! the lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

use chrono::{DateTime, Utc};
use derive_more::{Display, Error, From};
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, info, instrument, warn};

use crate::broadcast::{self, Registry, Subscription, Unsubscriber};
use crate::game::{Coord, Game, Mark, PlayError};
use crate::ids;
use crate::render::{NoopRender, Render};

/// Unique identifier for a session.
pub type SessionId = String;

/// Opaque identity of a participant.
pub type PlayerId = String;

/// One match plus its metadata. Returned by value: a snapshot taken under
/// the store's lock, safe to read and render without further
/// synchronization.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    /// Session id.
    pub id: SessionId,
    /// Game state.
    pub game: Game,
    /// Identity holding the X seat, if claimed.
    pub player_x: Option<PlayerId>,
    /// Identity holding the O seat, if claimed.
    pub player_o: Option<PlayerId>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Time of the last accepted mutation or join.
    pub updated_at: DateTime<Utc>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        let now = Utc::now();
        Self {
            id,
            game: Game::new(),
            player_x: None,
            player_o: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Resolves an identity to the seat it holds, if any.
    pub fn seat_of(&self, player: &str) -> Option<Mark> {
        if self.player_x.as_deref() == Some(player) {
            Some(Mark::X)
        } else if self.player_o.as_deref() == Some(player) {
            Some(Mark::O)
        } else {
            None
        }
    }
}

/// Errors surfaced by the session store. All are expected, recoverable
/// conditions; rules violations pass through verbatim from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error, From)]
pub enum ServiceError {
    /// Unknown session id.
    #[display("game not found")]
    NotFound,
    /// A spectator attempted a mutation.
    #[display("not a player")]
    NotAPlayer,
    /// The seated player moved out of turn.
    #[display("not your turn")]
    NotYourTurn,
    /// Rejected by the rules engine.
    #[display("{_0}")]
    #[from]
    Rules(PlayError),
}

struct Inner {
    sessions: HashMap<SessionId, Session>,
    registry: Registry,
    renderer: Arc<dyn Render>,
}

/// Manages all sessions and their subscribers. Cloneable handle; explicit
/// construction, no ambient singleton.
#[derive(Clone)]
pub struct GameService {
    inner: Arc<Mutex<Inner>>,
}

impl GameService {
    /// Creates a service with a no-op renderer, for headless use.
    pub fn new() -> Self {
        Self::with_renderer(Arc::new(NoopRender))
    }

    /// Creates a service with an injected broadcast renderer.
    pub fn with_renderer(renderer: Arc<dyn Render>) -> Self {
        info!("creating game service");
        Self {
            inner: Arc::new(Mutex::new(Inner {
                sessions: HashMap::new(),
                registry: Registry::default(),
                renderer,
            })),
        }
    }

    /// Replaces the broadcast renderer. The web layer injects the board
    /// fragment renderer here after the routes are wired.
    pub fn set_renderer(&self, renderer: Arc<dyn Render>) {
        self.inner.lock().unwrap().renderer = renderer;
    }

    /// Creates and registers a new session, returning its snapshot.
    #[instrument(skip(self))]
    pub fn create(&self) -> Session {
        let id = ids::new_id();
        let session = Session::new(id.clone());
        let snapshot = session.clone();
        self.inner.lock().unwrap().sessions.insert(id.clone(), session);
        info!(session_id = %id, "created session");
        snapshot
    }

    /// Returns a snapshot of the session, if it exists.
    #[instrument(skip(self))]
    pub fn get(&self, id: &str) -> Option<Session> {
        let inner = self.inner.lock().unwrap();
        let session = inner.sessions.get(id).cloned();
        if session.is_none() {
            debug!(session_id = id, "session not found");
        }
        session
    }

    /// Claims a seat for `player`, or returns the seat it already holds.
    ///
    /// A returning identity keeps its seat. A new identity claims X, then O.
    /// When both seats are taken the identity is a spectator: seat `None`,
    /// no error.
    #[instrument(skip(self))]
    pub fn join(&self, id: &str, player: &str) -> Result<(Option<Mark>, Session), ServiceError> {
        let mut inner = self.inner.lock().unwrap();
        let session = inner.sessions.get_mut(id).ok_or(ServiceError::NotFound)?;

        let seat = match session.seat_of(player) {
            Some(seat) => Some(seat),
            None if session.player_x.is_none() => {
                session.player_x = Some(player.to_string());
                Some(Mark::X)
            }
            None if session.player_o.is_none() => {
                session.player_o = Some(player.to_string());
                Some(Mark::O)
            }
            None => None,
        };
        session.updated_at = Utc::now();

        match seat {
            Some(mark) => info!(session_id = id, player, seat = %mark, "player seated"),
            None => debug!(session_id = id, player, "joined as spectator"),
        }
        Ok((seat, session.clone()))
    }

    /// Applies a move for `player` and fans the new state out to
    /// subscribers.
    ///
    /// Seat and turn are validated under the lock, then the rules engine
    /// decides; its errors propagate verbatim and a rejected move changes
    /// nothing. On success the snapshot and the subscriber set are captured
    /// while the lock is still held, and rendering plus delivery run after
    /// release. The caller gets the snapshot back regardless of whether
    /// fan-out later drops subscribers.
    #[instrument(skip(self))]
    pub fn play(&self, id: &str, player: &str, coord: Coord) -> Result<Session, ServiceError> {
        let (snapshot, senders, renderer) = {
            let mut inner = self.inner.lock().unwrap();
            let session = inner.sessions.get_mut(id).ok_or(ServiceError::NotFound)?;

            let seat = session.seat_of(player).ok_or_else(|| {
                warn!(session_id = id, player, "spectator attempted move");
                ServiceError::NotAPlayer
            })?;
            if seat != session.game.turn() {
                warn!(session_id = id, player, seat = %seat, "move out of turn");
                return Err(ServiceError::NotYourTurn);
            }

            session.game.play(coord)?;
            session.updated_at = Utc::now();

            let snapshot = session.clone();
            let senders = inner.registry.senders(id);
            (snapshot, senders, inner.renderer.clone())
        };

        info!(
            session_id = id,
            player,
            moves = snapshot.game.moves(),
            over = snapshot.game.over(),
            "move accepted"
        );

        if !senders.is_empty() {
            let payload = renderer.render(&snapshot);
            let evicted = broadcast::fan_out(&senders, &payload);
            if !evicted.is_empty() {
                let mut inner = self.inner.lock().unwrap();
                for sub in evicted {
                    warn!(session_id = id, subscriber = sub, "evicting slow subscriber");
                    inner.registry.remove(id, sub);
                }
            }
        }

        Ok(snapshot)
    }

    /// Registers a subscriber for `id`, creating the session lazily when the
    /// id is unknown (streaming clients may connect before an explicit
    /// create).
    ///
    /// `cancel` is an external signal that fires at most once; when it does,
    /// a watcher task tears the subscriber down. Teardown is idempotent
    /// across the watcher, eviction, explicit unsubscribe, and handle drop.
    #[instrument(skip(self, cancel))]
    pub fn subscribe(
        &self,
        id: &str,
        cancel: impl Future<Output = ()> + Send + 'static,
    ) -> Subscription {
        let (sub_id, rx) = {
            let mut inner = self.inner.lock().unwrap();
            if !inner.sessions.contains_key(id) {
                debug!(session_id = id, "lazily creating session for subscriber");
                inner
                    .sessions
                    .insert(id.to_string(), Session::new(id.to_string()));
            }
            inner.registry.add(id)
        };

        let unsub = {
            let state: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
            let session_id = id.to_string();
            Unsubscriber::new(move || {
                if let Some(state) = state.upgrade() {
                    state.lock().unwrap().registry.remove(&session_id, sub_id);
                }
            })
        };

        let (closed_tx, closed_rx) = oneshot::channel();
        broadcast::spawn_cancel_watcher(cancel, closed_rx, unsub.clone());
        Subscription::new(rx, unsub, closed_tx)
    }

    /// Number of live subscribers for a session. Exposed for tests and
    /// logging.
    pub fn subscriber_count(&self, id: &str) -> usize {
        self.inner.lock().unwrap().registry.subscriber_count(id)
    }
}

impl Default for GameService {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GameService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameService").finish_non_exhaustive()
    }
}
