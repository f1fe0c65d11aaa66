pub mod command;
pub mod executor;
pub mod response;

pub use command::*;
pub use executor::*;
pub use response::*;
