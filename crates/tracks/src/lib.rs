pub mod conditioning;
pub mod matcher;
pub mod track;

pub use conditioning::*;
pub use matcher::*;
pub use track::*;
