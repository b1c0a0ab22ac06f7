//! Pure schedule resolution (§4.6): given a [`signage_model::ScheduleModel`],
//! the current time, and the runtime environment, compute which main layout
//! sequence and overlays should play. No I/O, no clock reads beyond the
//! caller-supplied `now`.

mod candidate;
mod env;
mod filterable;
mod filters;
mod interleave;
mod play_counter;
mod resolve;

pub use env::ResolveEnv;
pub use play_counter::PlayCounter;
pub use resolve::{resolve, ResolveOutput};

pub use candidate::Candidate;
pub use filterable::Filterable;
