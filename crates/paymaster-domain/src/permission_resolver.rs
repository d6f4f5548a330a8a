use common::auth::RbacCatalog;
use common::domain::{PermissionSet, PermissionTree, User};
use tracing::debug;

/// Which representation a user's permissions were resolved from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSource {
    /// Catalog-driven role; structures regenerated from the RBAC catalog.
    Catalog,
    /// Stored metadata was present and returned as-is.
    StoredMetadata,
    /// Structures derived from the user's tree-shaped grants.
    DerivedFromTree,
    /// Nothing to resolve from; empty structures.
    Empty,
}

impl PermissionSource {
    /// Single dispatch point for the resolution precedence order.
    ///
    /// Catalog-driven roles win outright, stored metadata beats tree
    /// derivation, and a user with neither resolves to empty structures.
    pub fn for_user(user: &User) -> Self {
        if user.role.is_catalog_driven() {
            PermissionSource::Catalog
        } else if !user.permission_metadata.is_empty() {
            PermissionSource::StoredMetadata
        } else if !user.tree_permissions.is_empty() {
            PermissionSource::DerivedFromTree
        } else {
            PermissionSource::Empty
        }
    }
}

/// Output of [`resolve`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPermissions {
    pub permissions: PermissionSet,
    pub metadata: PermissionTree,
    pub source: PermissionSource,
}

/// Resolve a user's flat capability map and hierarchical metadata.
///
/// Pure function of its inputs. When the source is
/// [`PermissionSource::DerivedFromTree`] the caller is expected to persist the
/// result back onto the user record, best effort.
pub fn resolve(user: &User, catalog: &RbacCatalog) -> ResolvedPermissions {
    let source = PermissionSource::for_user(user);
    let (permissions, metadata) = match source {
        PermissionSource::Catalog => from_catalog(catalog),
        PermissionSource::StoredMetadata => {
            (user.permissions.clone(), user.permission_metadata.clone())
        }
        PermissionSource::DerivedFromTree => derive_from_tree(user, catalog),
        PermissionSource::Empty => (PermissionSet::new(), PermissionTree::default()),
    };
    ResolvedPermissions {
        permissions,
        metadata,
        source,
    }
}

/// Full enumeration of the catalog, for catalog-driven roles.
fn from_catalog(catalog: &RbacCatalog) -> (PermissionSet, PermissionTree) {
    let mut permissions = PermissionSet::new();
    let mut metadata = PermissionTree::default();

    for (factory, entry) in catalog.entries() {
        metadata.factories.push(factory.clone());
        let short_form = catalog.short_form(factory);
        let mut departments = Vec::new();
        for (department, services) in &entry.services {
            departments.push(format!("{short_form}_{department}"));
            let slot = metadata
                .services
                .entry(format!("{factory}.{department}"))
                .or_default();
            for service in services {
                slot.push(service.clone());
                permissions.insert(service.clone(), true);
            }
        }
        metadata.departments.insert(factory.clone(), departments);
    }

    (permissions, metadata)
}

/// Rebuild the structures from tree-shaped grants.
///
/// Keys split on `.` into factory/department/service; segments past the third
/// are ignored. Keys with fewer than three segments are skipped, and only a
/// leaf that is exactly `true` grants anything.
fn derive_from_tree(user: &User, catalog: &RbacCatalog) -> (PermissionSet, PermissionTree) {
    let mut permissions = PermissionSet::new();
    let mut metadata = PermissionTree::default();

    for (key, granted) in &user.tree_permissions {
        if !*granted {
            continue;
        }
        let parts: Vec<&str> = key.split('.').collect();
        if parts.len() < 3 {
            debug!(key = %key, "skipping malformed permission key");
            continue;
        }
        let (factory, department, service) = (parts[0], parts[1], parts[2]);

        if !metadata.factories.iter().any(|f| f == factory) {
            metadata.factories.push(factory.to_string());
        }

        let prefixed = format!("{}_{department}", catalog.short_form(factory));
        let departments = metadata.departments.entry(factory.to_string()).or_default();
        if !departments.contains(&prefixed) {
            departments.push(prefixed);
        }

        let services = metadata
            .services
            .entry(format!("{factory}.{department}"))
            .or_default();
        if !services.iter().any(|s| s == service) {
            services.push(service.to_string());
        }

        permissions.insert(service.to_string(), true);
    }

    (permissions, metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::auth::FactoryRbacEntry;
    use common::domain::UserRole;
    use std::collections::BTreeMap;

    fn test_user(role: UserRole) -> User {
        User {
            id: "user-1".to_string(),
            email: "user@example.com".to_string(),
            password_hash: "hashed".to_string(),
            name: "Test User".to_string(),
            role,
            tree_permissions: BTreeMap::new(),
            permissions: PermissionSet::new(),
            permission_metadata: PermissionTree::default(),
            created_at: None,
            updated_at: None,
        }
    }

    fn test_catalog() -> RbacCatalog {
        let mut entries = BTreeMap::new();
        entries.insert(
            "gulbarga".to_string(),
            FactoryRbacEntry {
                document_name: "GLB".to_string(),
                services: BTreeMap::from([(
                    "humanresource".to_string(),
                    vec![
                        "single_processing".to_string(),
                        "batch_processing".to_string(),
                    ],
                )]),
            },
        );
        entries.insert(
            "bellary".to_string(),
            FactoryRbacEntry {
                document_name: "BLY".to_string(),
                services: BTreeMap::from([
                    ("accounts".to_string(), vec!["ledger".to_string()]),
                    (
                        "humanresource".to_string(),
                        vec!["single_processing".to_string()],
                    ),
                ]),
            },
        );
        RbacCatalog::new(entries)
    }

    #[test]
    fn test_admin_enumerates_entire_catalog() {
        let user = test_user(UserRole::Admin);
        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::Catalog);
        assert_eq!(
            resolved.metadata.factories,
            vec!["bellary".to_string(), "gulbarga".to_string()]
        );
        assert_eq!(
            resolved.metadata.departments["bellary"],
            vec!["bly_accounts".to_string(), "bly_humanresource".to_string()]
        );
        assert_eq!(
            resolved.metadata.departments["gulbarga"],
            vec!["glb_humanresource".to_string()]
        );
        assert_eq!(
            resolved.metadata.services["gulbarga.humanresource"],
            vec![
                "single_processing".to_string(),
                "batch_processing".to_string()
            ]
        );
        // single_processing exists under two factories but collapses to one
        // flat key.
        assert_eq!(resolved.permissions.len(), 3);
        assert_eq!(resolved.permissions.get("single_processing"), Some(&true));
        assert_eq!(resolved.permissions.get("batch_processing"), Some(&true));
        assert_eq!(resolved.permissions.get("ledger"), Some(&true));
    }

    #[test]
    fn test_admin_ignores_stored_grants() {
        let mut user = test_user(UserRole::Admin);
        user.permissions.insert("stale_service".to_string(), true);
        user.permission_metadata
            .factories
            .push("stale_factory".to_string());
        user.tree_permissions
            .insert("stale.tree.grant".to_string(), true);

        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::Catalog);
        assert!(!resolved.permissions.contains_key("stale_service"));
        assert!(!resolved
            .metadata
            .factories
            .contains(&"stale_factory".to_string()));
    }

    #[test]
    fn test_super_admin_resolves_like_admin() {
        let admin = resolve(&test_user(UserRole::Admin), &test_catalog());
        let super_admin = resolve(&test_user(UserRole::SuperAdmin), &test_catalog());

        assert_eq!(admin.permissions, super_admin.permissions);
        assert_eq!(admin.metadata, super_admin.metadata);
    }

    #[test]
    fn test_admin_resolution_is_deterministic() {
        let user = test_user(UserRole::Admin);
        let catalog = test_catalog();

        let first = resolve(&user, &catalog);
        let second = resolve(&user, &catalog);

        assert_eq!(first, second);
        // Serialized forms are byte-identical, not merely equal.
        assert_eq!(
            serde_json::to_string(&first.permissions).unwrap(),
            serde_json::to_string(&second.permissions).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&first.metadata).unwrap(),
            serde_json::to_string(&second.metadata).unwrap()
        );
    }

    #[test]
    fn test_stored_metadata_returned_as_is() {
        let mut user = test_user(UserRole::User);
        user.permissions.insert("ledger".to_string(), true);
        user.permission_metadata.factories.push("bellary".to_string());
        user.permission_metadata
            .departments
            .insert("bellary".to_string(), vec!["bly_accounts".to_string()]);
        // Tree grants that disagree with the stored structures must lose.
        user.tree_permissions
            .insert("gulbarga.humanresource.single_processing".to_string(), true);

        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::StoredMetadata);
        assert_eq!(resolved.permissions, user.permissions);
        assert_eq!(resolved.metadata, user.permission_metadata);
        assert!(!resolved.permissions.contains_key("single_processing"));
    }

    #[test]
    fn test_tree_derivation_builds_gulbarga_structures() {
        let mut user = test_user(UserRole::User);
        user.tree_permissions
            .insert("gulbarga.humanresource.single_processing".to_string(), true);
        user.tree_permissions
            .insert("gulbarga.humanresource.batch_processing".to_string(), false);

        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::DerivedFromTree);
        assert_eq!(resolved.metadata.factories, vec!["gulbarga".to_string()]);
        assert_eq!(
            resolved.metadata.departments["gulbarga"],
            vec!["glb_humanresource".to_string()]
        );
        assert_eq!(
            resolved.metadata.services["gulbarga.humanresource"],
            vec!["single_processing".to_string()]
        );
        assert_eq!(resolved.permissions.get("single_processing"), Some(&true));
        assert!(!resolved.permissions.contains_key("batch_processing"));
    }

    #[test]
    fn test_tree_derivation_unknown_factory_uses_raw_key() {
        let mut user = test_user(UserRole::User);
        user.tree_permissions
            .insert("Hampi.accounts.ledger".to_string(), true);

        let resolved = resolve(&user, &RbacCatalog::default());

        assert_eq!(
            resolved.metadata.departments["Hampi"],
            vec!["hampi_accounts".to_string()]
        );
        assert_eq!(resolved.permissions.get("ledger"), Some(&true));
    }

    #[test]
    fn test_tree_derivation_skips_malformed_keys() {
        let mut user = test_user(UserRole::User);
        user.tree_permissions.insert("noseparator".to_string(), true);
        user.tree_permissions
            .insert("two.segments".to_string(), true);
        user.tree_permissions
            .insert("gulbarga.humanresource.single_processing".to_string(), true);

        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::DerivedFromTree);
        assert_eq!(resolved.permissions.len(), 1);
        assert_eq!(resolved.permissions.get("single_processing"), Some(&true));
        assert_eq!(resolved.metadata.factories, vec!["gulbarga".to_string()]);
    }

    #[test]
    fn test_tree_derivation_of_only_malformed_keys_yields_empty_structures() {
        let mut user = test_user(UserRole::User);
        user.tree_permissions.insert("noseparator".to_string(), true);
        user.tree_permissions
            .insert("two.segments".to_string(), true);

        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::DerivedFromTree);
        assert!(resolved.permissions.is_empty());
        assert!(resolved.metadata.is_empty());
    }

    #[test]
    fn test_tree_derivation_ignores_segments_past_the_third() {
        let mut user = test_user(UserRole::User);
        user.tree_permissions
            .insert("gulbarga.humanresource.payslips.archive".to_string(), true);

        let resolved = resolve(&user, &test_catalog());

        assert_eq!(
            resolved.metadata.services["gulbarga.humanresource"],
            vec!["payslips".to_string()]
        );
        assert_eq!(resolved.permissions.get("payslips"), Some(&true));
        assert!(!resolved.permissions.contains_key("archive"));
    }

    #[test]
    fn test_tree_derivation_collapses_service_name_collisions() {
        let mut user = test_user(UserRole::User);
        user.tree_permissions
            .insert("gulbarga.humanresource.single_processing".to_string(), true);
        user.tree_permissions
            .insert("bellary.humanresource.single_processing".to_string(), true);

        let resolved = resolve(&user, &test_catalog());

        // One flat key, both metadata paths.
        assert_eq!(resolved.permissions.len(), 1);
        assert_eq!(resolved.permissions.get("single_processing"), Some(&true));
        assert_eq!(resolved.metadata.factories.len(), 2);
        assert_eq!(
            resolved.metadata.services["gulbarga.humanresource"],
            vec!["single_processing".to_string()]
        );
        assert_eq!(
            resolved.metadata.services["bellary.humanresource"],
            vec!["single_processing".to_string()]
        );
    }

    #[test]
    fn test_user_without_grants_resolves_empty() {
        let user = test_user(UserRole::User);
        let resolved = resolve(&user, &test_catalog());

        assert_eq!(resolved.source, PermissionSource::Empty);
        assert!(resolved.permissions.is_empty());
        assert!(resolved.metadata.is_empty());
    }

    #[test]
    fn test_catalog_factory_without_services_keeps_empty_department_list() {
        let mut entries = BTreeMap::new();
        entries.insert(
            "hampi".to_string(),
            FactoryRbacEntry {
                document_name: "HMP".to_string(),
                services: BTreeMap::new(),
            },
        );
        let catalog = RbacCatalog::new(entries);

        let resolved = resolve(&test_user(UserRole::Admin), &catalog);

        assert_eq!(resolved.metadata.factories, vec!["hampi".to_string()]);
        assert_eq!(resolved.metadata.departments["hampi"], Vec::<String>::new());
        assert!(resolved.permissions.is_empty());
    }
}
