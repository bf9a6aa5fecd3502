//! Request handlers.

pub mod answers;
pub mod health;
pub mod publish;

pub use answers::*;
pub use health::*;
pub use publish::*;
