//! Shared data model for the digital-signage player core.
//!
//! Every other crate in this workspace (`signage-blobstore`,
//! `signage-download`, `signage-schedule`, `signage-orchestrator`) depends
//! on this crate for the types the CMS wire protocol and the renderer
//! exchange with the core, the way `cascette-crypto` underlies the rest of
//! the cascette workspace.

mod criteria;
mod dayparting;
mod file_entry;
mod file_id;
mod geo;
mod layout;
mod required_file;
mod schedule;

pub use criteria::{Criterion, CriterionCondition, CriterionKind, CriterionValue, CriteriaEnv};
pub use dayparting::DayPart;
pub use file_entry::{Chunk, FileEntry, FileFormat};
pub use file_id::{FileId, FileKind};
pub use geo::GeoFence;
pub use layout::LayoutDescriptor;
pub use required_file::{FileSource, RequiredFileDescriptor};
pub use schedule::{
    ActionEvent, ActionTarget, Campaign, OverlayLayout, ScheduleModel, ScheduledCommand,
    ScheduledLayout,
};
