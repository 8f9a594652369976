pub mod common;
pub mod completions;
pub mod conflicts;
pub mod images;
pub mod purge;
pub mod queue;
pub mod status;
pub mod sync;
pub mod watch;
