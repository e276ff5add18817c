//! # SignalPost Workflow
//!
//! Everything between an inbound admin message and a committed publication:
//! the signal-list renderer, the IDLE → DRAFTED → {PUBLISHED | DISCARDED}
//! publish state machine, and the command router that maps authenticated
//! messages onto workflow entry points.

pub mod commands;
pub mod publish;
pub mod render;

pub use commands::CommandRouter;
pub use publish::{Preview, PublishWorkflow, ReplyOutcome};
pub use render::{RenderedList, render_list};
