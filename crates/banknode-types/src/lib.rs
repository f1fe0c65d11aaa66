pub mod account;
pub mod amount;
pub mod error;

pub use account::*;
pub use amount::*;
pub use error::*;
