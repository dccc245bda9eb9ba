//! Texture sampling parameters attached to material texture bindings.
//!
//! Provides [`Sampler`] along with the [`FilterMode`] and [`AddressMode`]
//! enums it is built from.

mod types;

pub use types::{AddressMode, FilterMode, Sampler};
