pub mod dbnotes;
pub mod gateway;
pub mod memory;

pub use dbnotes::*;
pub use gateway::*;
pub use memory::*;
