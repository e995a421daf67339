//! vee/crates/vee-core/src/lib.rs
//!
//! The domain models, record store port and shared rules of the Vee client.

pub mod error;
pub mod models;
pub mod query;
pub mod session;
pub mod traits;
pub mod validation;

// Re-exporting for easier access in other crates
pub use error::*;
pub use models::*;
pub use query::*;
pub use session::Session;
pub use traits::*;
