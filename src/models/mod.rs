//! Domain models backed by the remote store.
//!
//! Each entity embeds a [`Persisted`] (id, bookkeeping, scalar fields) and one
//! lazily-loaded slot per association. CRUD comes from [`Persist`]; association
//! changes go through the functions in [`association`].

pub mod association;
pub mod display;
mod entity;
mod persisted;
pub mod slot;

mod call;
mod info_type;
mod profile;
mod renderer;
mod sdi;
mod timeline;
mod user;
mod zone;

pub use association::Link;
pub use display::Visiting;
pub use entity::{Entity, Linkable, Persist};
pub use persisted::{Fields, Persisted};
pub use slot::{ToMany, ToOne};

pub use call::{Call, CallFields, CallUpdate};
pub use info_type::{InfoType, InfoTypeFields, InfoTypeUpdate};
pub use profile::{Profile, ProfileFields, ProfileUpdate};
pub use renderer::{Renderer, RendererFields, RendererUpdate};
pub use sdi::{Sdi, SdiFields, SdiUpdate};
pub use timeline::{Timeline, TimelineFields, TimelineUpdate};
pub use user::{User, UserFields, UserUpdate};
pub use zone::{Zone, ZoneFields, ZoneUpdate};
