pub mod autosave;
pub mod hub;
pub mod merge;

pub use autosave::*;
pub use hub::*;
pub use merge::*;
