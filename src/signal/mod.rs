//! Running `signal-cli`: one-shot commands and the supervised daemon,
//! link and receive processes.

mod client;
mod error;
mod events;
mod link_state;
mod supervisor;
mod types;

pub use client::*;
pub use error::*;
pub use events::*;
pub use link_state::*;
pub use supervisor::*;
pub use types::*;
