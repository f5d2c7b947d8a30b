//! Game session controller: turn cycle, opponent selection, clock and live
//! analysis for one game, run as an actor.
//!
//! [`spawn_session`] starts the actor and returns a [`SessionHandle`]. Every
//! transition is broadcast as a [`SessionEvent::StateChanged`] snapshot so a
//! front-end can re-render from it alone.

mod actor;
mod commands;
pub mod config;
mod events;
mod handle;
pub mod policy;
mod snapshot;
pub mod starter;
mod state;
pub mod timer;
mod types;

use engine::BrokerHandle;
use tokio::sync::{broadcast, mpsc};
use uuid::Uuid;

use actor::run_session_actor;
pub use commands::SessionError;
pub use config::{EngineSettings, GameSetup, SessionConfig};
pub use events::{AnalysisUpdate, SessionEvent};
pub use handle::SessionHandle;
pub use snapshot::{EvalPoint, MoveRecord, SessionSnapshot};
pub use starter::{StarterPolicy, StarterStore};
pub use timer::{format_clock, TimerSnapshot};
pub use types::{Difficulty, EndReason, GameMode, GameOutcome, SessionPhase};
use state::SessionState;

/// Start a session actor. The session is `Idle` until [`SessionHandle::new_game`]
/// or a load. `engine` is optional; without it the built-in opponent plays.
pub fn spawn_session(config: SessionConfig, engine: Option<BrokerHandle>) -> SessionHandle {
    let session_id = Uuid::new_v4().to_string();
    let (cmd_tx, cmd_rx) = mpsc::channel(32);
    let (event_tx, _) = broadcast::channel(256);

    let state = SessionState::new(session_id.clone(), config, engine);
    tokio::spawn(run_session_actor(state, cmd_rx, event_tx));

    SessionHandle::new(session_id, cmd_tx)
}
