//! Reconstructs conversations from the text output of `signal-cli`.

mod feed;
mod lines;
mod parser;
mod store;
mod types;

pub use feed::*;
pub use lines::*;
pub use parser::*;
pub use store::*;
pub use types::*;
