//! Core data models for the scouting engine.

mod benchmark;
mod event;
mod game;
mod ids;
mod label;
mod metric;
mod output;
mod play_context;
mod split;
mod stint;
mod zone;

pub use benchmark::*;
pub use event::*;
pub use game::*;
pub use ids::*;
pub use label::*;
pub use metric::*;
pub use output::*;
pub use play_context::*;
pub use split::*;
pub use stint::*;
pub use zone::*;

#[cfg(test)]
pub(crate) mod test_fixtures {
    pub(crate) use super::benchmark::fixtures as benchmark;
    pub(crate) use super::game::fixtures as game;
}
