pub mod cache;
pub mod fetch;
pub mod source;

pub use cache::*;
pub use fetch::*;
pub use source::*;
