//! Reference collaborators for rowgraph hydration.
//!
//! - [`EntityStore`]: identity-map aware entity arena implementing
//!   [`EntityFactory`](rowgraph_core::EntityFactory)
//! - [`OriginalData`]: loaded-state register implementing
//!   [`ChangeRegister`](rowgraph_core::ChangeRegister)

pub mod original;
pub mod store;

pub use original::OriginalData;
pub use store::{Constructor, EntityStore};
