pub mod persist;
pub mod snapshot;
pub mod store;
pub mod traits;

pub use persist::*;
pub use snapshot::*;
pub use store::*;
pub use traits::*;
