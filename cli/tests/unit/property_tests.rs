//! Property tests over generated inputs: package-id round-trips, the
//! version comparator, and install-order topology.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use proptest::prelude::*;

use agora_cli::domain::resolver::{install_order, satisfies_version, ResolvedNode};
use agora_common::{PackageId, PackageKind};

fn kind_strategy() -> impl Strategy<Value = PackageKind> {
    prop::sample::select(PackageKind::ALL.to_vec())
}

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z0-9-]{1,24}"
}

proptest! {
    /// `parse(create(k, n)) == (k, n)` for every valid kind and name.
    #[test]
    fn prop_package_id_round_trips(kind in kind_strategy(), name in name_strategy()) {
        let id = PackageId::new(kind, &name).expect("valid name");
        let back = PackageId::parse(&id.to_string()).expect("round trip");
        prop_assert_eq!(back.kind, kind);
        prop_assert_eq!(back.name, name);
    }

    /// Equality constraints are reflexive over well-formed triples.
    #[test]
    fn prop_version_equality_reflexive(
        major in 0u64..100, minor in 0u64..100, patch in 0u64..100
    ) {
        let version = format!("{major}.{minor}.{patch}");
        let at_least = format!(">={version}");
        let at_most = format!("<={version}");
        prop_assert!(satisfies_version(&version, Some(version.as_str())));
        prop_assert!(satisfies_version(&version, Some(at_least.as_str())));
        prop_assert!(satisfies_version(&version, Some(at_most.as_str())));
    }

    /// Unparseable constraints never block (deliberately permissive).
    #[test]
    fn prop_garbage_constraints_are_permissive(
        version in "[a-z0-9.]{0,12}", constraint in "[a-z ]{1,12}"
    ) {
        prop_assert!(satisfies_version(&version, Some(constraint.as_str())));
    }

    /// Install order is a valid topological order without duplicates:
    /// every dependency appears before its dependent.
    #[test]
    fn prop_install_order_is_topological(
        dep_names in prop::collection::vec("[a-z]{1,8}", 0..6),
        installed_mask in prop::collection::vec(any::<bool>(), 6)
    ) {
        let dependencies: Vec<ResolvedNode> = dep_names
            .iter()
            .enumerate()
            .map(|(i, name)| ResolvedNode {
                id: format!("runtime:{name}"),
                kind: PackageKind::Runtime,
                name: name.clone(),
                version: None,
                installed: installed_mask.get(i).copied().unwrap_or(false),
                dependencies: Vec::new(),
            })
            .collect();
        let root = ResolvedNode {
            id: "stack:root".to_string(),
            kind: PackageKind::Stack,
            name: "root".to_string(),
            version: None,
            installed: false,
            dependencies,
        };

        let order = install_order(&root);
        let ids: Vec<&str> = order.iter().map(|n| n.id.as_str()).collect();

        // No duplicates.
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), ids.len());

        // Root is last, nothing installed sneaks in.
        prop_assert_eq!(*ids.last().expect("root always present"), "stack:root");
        for node in &order {
            prop_assert!(!node.installed);
        }
        for (i, dep) in root.dependencies.iter().enumerate() {
            if !dep.installed && !root.dependencies[..i].iter().any(|d| d.id == dep.id) {
                let dep_pos = ids.iter().position(|id| *id == dep.id).expect("dep present");
                prop_assert!(dep_pos < ids.len() - 1);
            }
        }
    }
}
