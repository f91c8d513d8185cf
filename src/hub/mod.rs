pub mod command;
pub mod connections;
pub mod lifecycle;
pub mod notifier;
pub mod rooms;
pub mod signaling;
pub mod state;

pub use command::*;
pub use connections::*;
pub use rooms::*;
pub use state::*;
