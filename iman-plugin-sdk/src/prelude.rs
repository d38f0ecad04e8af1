//! Common imports for extension authors.

pub use crate::error::ExtensionError;
pub use crate::types::*;
pub use crate::{Extension, ExtensionEntry, ExtensionFactory, Host};
pub use std::sync::Arc;
