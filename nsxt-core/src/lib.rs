//! NSX-T Core
//!
//! Core library for managing NSX-T Policy objects: the resource model,
//! schemas, the provider trait, and the lookup and upsert logic shared by
//! every resource kind.

pub mod differ;
pub mod provider;
pub mod remote;
pub mod resolver;
pub mod resource;
pub mod schema;
pub mod upsert;
