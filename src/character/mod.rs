//! Character context and behavior script generation.

mod context;
mod script;

pub use context::{CharacterContext, Location, Mood, Theme};
pub use script::behavior_script;
