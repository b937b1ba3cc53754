pub mod fitting;
pub mod params;
pub mod snapshot;

pub use fitting::*;
pub use params::*;
pub use snapshot::*;
