//! sixthscreen - persistence core of The 6th Screen
//!
//! A lazy-loading Active-Record layer over a remote REST store: entities with
//! CRUD, to-one/to-many associations, completeness checks and a recursive
//! display form.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod models;
pub mod services;
pub mod store;
