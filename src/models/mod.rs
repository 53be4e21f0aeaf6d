//! Data carried through one upload/render cycle.
//!
//! Nothing here is persisted: the storage backend owns every stored object,
//! and each listing is recomputed from it on demand.

pub mod page;
pub mod upload;
