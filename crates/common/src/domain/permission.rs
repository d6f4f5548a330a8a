use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Flat capability map keyed by service name only.
///
/// A service name appearing under multiple factories or departments collapses
/// to a single key. That collapse is long-standing behavior the login flow
/// depends on and is preserved as-is.
pub type PermissionSet = BTreeMap<String, bool>;

/// Hierarchical permission metadata: which factories a user can see, which
/// departments within each factory, and which services within each
/// factory/department pair.
///
/// `departments` is keyed by the raw factory key and holds prefixed department
/// names (`<short_form>_<department>`); `services` is keyed by
/// `"factory.department"` with the department unprefixed.
///
/// Ordered maps keep the structure deterministic, so resolving the same user
/// against the same catalog twice serializes identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionTree {
    #[serde(default)]
    pub factories: Vec<String>,
    #[serde(default)]
    pub departments: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub services: BTreeMap<String, Vec<String>>,
}

impl PermissionTree {
    /// True when no factory, department, or service has been recorded.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty() && self.departments.is_empty() && self.services.is_empty()
    }
}
