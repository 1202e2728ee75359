mod builder;
mod collection;
mod connection;
mod connection_string;
mod options;
mod secret;

pub use builder::*;
pub use collection::*;
pub use connection::*;
pub use connection_string::*;
pub use options::*;
pub use secret::*;
