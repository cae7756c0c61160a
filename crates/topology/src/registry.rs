use serde::{Deserialize, Serialize};

use larder_core::{DomainError, DomainResult, RecordId};

/// Storage area identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AreaId(pub RecordId);

impl AreaId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for AreaId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Department identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DepartmentId(pub RecordId);

impl DepartmentId {
    pub fn new(id: RecordId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for DepartmentId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Physical storage classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AreaKind {
    Dry,
    Cooler,
    Freezer,
    FishFile,
    WineCellar,
    Other,
}

/// A physical storage area. Immutable once items reference it; removal is a
/// service-level policy decision (cascade or refuse).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageArea {
    pub id: AreaId,
    pub name: String,
    pub kind: AreaKind,
}

/// Outlet (revenue center) vs. back-of-house department.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DepartmentKind {
    Outlet,
    Department,
}

/// A transfer endpoint / chargeback target. Departments own no inventory;
/// stock always belongs to a storage area.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub name: String,
    pub kind: DepartmentKind,
}

/// Registry of storage areas and departments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageTopology {
    areas: std::collections::HashMap<AreaId, StorageArea>,
    departments: std::collections::HashMap<DepartmentId, Department>,
}

impl StorageTopology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_area(&mut self, name: impl Into<String>, kind: AreaKind) -> DomainResult<AreaId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("area name cannot be empty"));
        }
        let id = AreaId::new(RecordId::new());
        self.areas.insert(id, StorageArea { id, name, kind });
        Ok(id)
    }

    pub fn add_department(
        &mut self,
        name: impl Into<String>,
        kind: DepartmentKind,
    ) -> DomainResult<DepartmentId> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("department name cannot be empty"));
        }
        let id = DepartmentId::new(RecordId::new());
        self.departments.insert(id, Department { id, name, kind });
        Ok(id)
    }

    pub fn area(&self, id: AreaId) -> Option<&StorageArea> {
        self.areas.get(&id)
    }

    pub fn department(&self, id: DepartmentId) -> Option<&Department> {
        self.departments.get(&id)
    }

    pub fn contains_area(&self, id: AreaId) -> bool {
        self.areas.contains_key(&id)
    }

    pub fn contains_department(&self, id: DepartmentId) -> bool {
        self.departments.contains_key(&id)
    }

    pub fn areas(&self) -> impl Iterator<Item = &StorageArea> {
        self.areas.values()
    }

    pub fn departments(&self) -> impl Iterator<Item = &Department> {
        self.departments.values()
    }

    /// Remove an area. Whether orphaned items cascade is decided by the
    /// service layer; the registry only removes the record.
    pub fn remove_area(&mut self, id: AreaId) -> DomainResult<StorageArea> {
        self.areas.remove(&id).ok_or(DomainError::NotFound)
    }
}
