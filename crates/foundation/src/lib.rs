pub mod mercator;
pub mod point;
pub mod region;

// Foundation crate: small, well-tested primitives only.
pub use point::*;
pub use region::*;
