pub mod session;
pub mod sync;

pub use session::*;
pub use sync::*;
