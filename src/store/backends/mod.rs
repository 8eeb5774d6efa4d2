//! Backend implementations of the remote store contract.
//!
//! Each backend implements [`RemoteStore`](crate::store::RemoteStore).
//!
//! # Available Backends
//!
//! | Backend | Module | Use |
//! |---------|--------|-----|
//! | REST over HTTP | [`http`] | Production |
//! | In-process | [`memory`] | Tests, local runs |

pub mod http;
pub mod memory;
