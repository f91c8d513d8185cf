pub mod error;
pub mod events;
pub mod health;
pub mod identity;
pub mod note;
pub mod notification;

pub use error::*;
pub use events::*;
pub use health::*;
pub use identity::*;
pub use note::*;
pub use notification::*;
