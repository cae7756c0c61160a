//! Storage topology domain module.
//!
//! Defines where goods physically live (storage areas) and who consumes or
//! receives them (departments/outlets). Every other crate references these by
//! id; the registry itself holds no inventory.

pub mod registry;

pub use registry::{
    AreaId, AreaKind, Department, DepartmentId, DepartmentKind, StorageArea, StorageTopology,
};
