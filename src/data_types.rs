// Data structures shared by the sync engine and the ruler

pub mod input;
pub mod measurement;
pub mod message;
pub mod period;
pub mod range;

pub use input::*;
pub use measurement::*;
pub use message::*;
pub use period::*;
pub use range::*;
