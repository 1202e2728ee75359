mod constants;
mod convertible;
mod sort_order;
mod util;
mod value;

pub use constants::*;
pub use convertible::*;
pub use sort_order::*;
pub use util::*;
pub use value::*;
