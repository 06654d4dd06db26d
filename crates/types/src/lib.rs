pub mod address;
pub mod call;
pub mod event;
pub mod math;

pub use address::*;
pub use call::*;
pub use event::*;
pub use math::{Amount, Overflow, Timestamp};
