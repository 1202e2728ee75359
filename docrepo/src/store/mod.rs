mod document_store;
pub mod memory;
mod options;
mod pipeline;
mod session;

pub use document_store::*;
pub use options::*;
pub use pipeline::*;
pub use session::*;
