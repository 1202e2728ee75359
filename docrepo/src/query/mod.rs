mod builder;
mod grouping;

pub use builder::*;
pub use grouping::*;
