pub mod alert;
pub mod frame;
pub mod mission;
pub mod report;

pub use alert::*;
pub use frame::*;
pub use mission::*;
pub use report::*;
