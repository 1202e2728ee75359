mod convertible;

pub use convertible::*;
