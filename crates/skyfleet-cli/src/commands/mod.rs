//! Command implementations for the CLI.

mod fleet;
mod timeline;
mod track;

pub use fleet::cmd_fleet;
pub use timeline::cmd_timeline;
pub use track::{TrackArgs, cmd_track};
