// Application layer - use cases and orchestration over the card store.

pub mod error;
mod identity;
mod locks;
mod service;
mod session;

pub use error::*;
pub use identity::*;
pub use locks::*;
pub use service::*;
pub use session::*;
