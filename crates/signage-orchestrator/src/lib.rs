//! The collection-loop state machine, push-channel handling, and the
//! `Orchestrator` façade tying the cache and schedule crates together
//! (§4.7, §4.8, §6).

mod collection;
mod error;
mod events;
mod orchestrator;
mod priority_order;
mod push;
mod state;
mod transport;

pub use collection::CollectionLoop;
pub use error::{Error, Result};
pub use events::{event_channel, Event, EventReceiver, EventSender};
pub use orchestrator::{Orchestrator, OrchestratorDeps};
pub use priority_order::order_downloads;
pub use push::{CommandReceiver, CommandSender, PushChannel, PushCommand, PushConnection, PushTransport, XmrChannel};
pub use state::PlayerState;
pub use transport::{PlatformSink, PlayerSettings, RegisterResponse, RendererFacing, Transport};
