mod compose;
mod conversation;
mod help;
mod linking;
mod output;
mod pane;
mod sidebar;

pub use compose::*;
pub use conversation::*;
pub use help::*;
pub use linking::*;
pub use output::*;
pub use pane::*;
pub use sidebar::*;
