pub mod error;
pub mod format;
pub mod frame;
pub mod signal;

pub use error::*;
pub use format::*;
pub use frame::*;
pub use signal::*;
