//! sceneport core library
//!
//! This crate provides the math types and error handling shared by the
//! scene model and the glTF exporter.

pub mod error;
pub mod types;

pub use error::{Error, Result, ResultExt};
pub use types::*;

/// Re-export commonly used items
pub mod prelude {
    pub use crate::error::{Error, Result, ResultExt};
    pub use crate::types::*;
}
