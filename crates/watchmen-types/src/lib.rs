pub mod cadence;
pub mod error;
pub mod item;
pub mod outcome;

pub use cadence::*;
pub use error::{Error, Result};
pub use item::*;
pub use outcome::*;
