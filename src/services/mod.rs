//! Services invoking the persistence core on behalf of outside callers.

mod entity;

pub use entity::{Command, EntityKind, EntityService};
