use std::fmt::Write;

use ahash::{AHashMap, AHashSet};

use crate::ElmtId;

/// Per-property record of which UI elements depend on it.
///
/// A variable read during render adds the rendering element's [`ElmtId`].
/// A variable assignment causes those elements to need a re-render.
/// When the backend deletes an element, its id has to be removed from all
/// records: see [`purge_dependencies_for_elmt_id`](Self::purge_dependencies_for_elmt_id).
///
/// Elements that read the whole value (or read an object value in
/// compatibility mode) land in the whole-value set. Elements that read one
/// tracked field of an object value land in that field's own set, so a
/// field-scoped mutation can invalidate fewer elements.
#[derive(Debug, Default)]
pub struct PropertyDependencies {
    property_dependencies: AHashSet<ElmtId>,
    tracked_property_dependencies: AHashMap<String, AHashSet<ElmtId>>,
}

impl PropertyDependencies {
    pub fn new() -> PropertyDependencies {
        return PropertyDependencies {
            property_dependencies: AHashSet::new(),
            tracked_property_dependencies: AHashMap::new(),
        };
    }

    /// Record that `elmt_id`'s last render read this property's whole value. Idempotent.
    pub fn add_property_dependency(&mut self, elmt_id: ElmtId) {
        self.property_dependencies.insert(elmt_id);
        log::debug!(
            "   ... variable value read: add dependent elmtId {} - {} dependent elmtIds total",
            elmt_id,
            self.property_dependencies.len()
        );
    }

    /// Record that `elmt_id`'s last render read the tracked field `read_property`.
    /// The per-field set is created lazily. Idempotent.
    pub fn add_tracked_property_dependency(&mut self, read_property: &str, elmt_id: ElmtId) {
        let dependent_elmt_ids = self
            .tracked_property_dependencies
            .entry(read_property.to_string())
            .or_default();
        dependent_elmt_ids.insert(elmt_id);
        log::debug!(
            "   ... object property '{}' read: add dependent elmtId {} - {} dependent elmtIds total",
            read_property,
            elmt_id,
            dependent_elmt_ids.len()
        );
    }

    /// The set of elements whose last render read the whole value.
    ///
    /// Callers must not mutate the ledger through this; they get a borrow,
    /// and clone if they need to keep it past the next mutation.
    pub fn all_property_dependencies(&self) -> &AHashSet<ElmtId> {
        return &self.property_dependencies;
    }

    /// The set of elements depending on the tracked field `changed_property`.
    ///
    /// A field that was never read returns an empty set, never an error.
    pub fn tracked_property_dependencies(&self, changed_property: &str) -> AHashSet<ElmtId> {
        return self
            .tracked_property_dependencies
            .get(changed_property)
            .cloned()
            .unwrap_or_default();
    }

    /// Remove `rm_elmt_id` from the whole-value set and from every field set.
    ///
    /// This is the only deletion path, called once per element teardown.
    /// Removing an id that is absent is a no-op.
    pub fn purge_dependencies_for_elmt_id(&mut self, rm_elmt_id: ElmtId) {
        log::debug!("   ... purge all dependencies for elmtId {}", rm_elmt_id);
        self.property_dependencies.remove(&rm_elmt_id);
        for dependent_elmt_ids in self.tracked_property_dependencies.values_mut() {
            dependent_elmt_ids.remove(&rm_elmt_id);
        }
    }

    /// Human-readable dump of all dependency sets. Debug output only, no stable format.
    pub fn dump_dependencies(&self) -> String {
        let mut ids: Vec<ElmtId> = self.property_dependencies.iter().copied().collect();
        ids.sort();
        let mut result = format!(
            "dependencies: variable assignment (or object prop change in compat mode) affects elmtIds: {:?}\n",
            ids
        );
        for (property_name, dependent_elmt_ids) in &self.tracked_property_dependencies {
            let mut ids: Vec<ElmtId> = dependent_elmt_ids.iter().copied().collect();
            ids.sort();
            let _ = writeln!(
                result,
                "  tracked property '{}' change affects elmtIds: {:?}",
                property_name, ids
            );
        }
        return result;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_is_idempotent() {
        let mut deps = PropertyDependencies::new();
        deps.add_property_dependency(ElmtId(7));
        deps.add_property_dependency(ElmtId(7));
        deps.add_property_dependency(ElmtId(7));
        assert_eq!(deps.all_property_dependencies().len(), 1);
        assert!(deps.all_property_dependencies().contains(&ElmtId(7)));
    }

    #[test]
    fn tracked_fields_are_isolated() {
        let mut deps = PropertyDependencies::new();
        deps.add_tracked_property_dependency("a", ElmtId(1));
        deps.add_tracked_property_dependency("a", ElmtId(2));
        deps.add_tracked_property_dependency("b", ElmtId(3));

        let a = deps.tracked_property_dependencies("a");
        assert_eq!(a.len(), 2);
        assert!(a.contains(&ElmtId(1)) && a.contains(&ElmtId(2)));

        let b = deps.tracked_property_dependencies("b");
        assert_eq!(b.len(), 1);
        assert!(!b.contains(&ElmtId(1)));
    }

    #[test]
    fn unknown_field_is_empty_not_error() {
        let deps = PropertyDependencies::new();
        assert!(deps.tracked_property_dependencies("never_seen").is_empty());
    }

    #[test]
    fn purge_is_total_and_idempotent() {
        let mut deps = PropertyDependencies::new();
        deps.add_property_dependency(ElmtId(1));
        deps.add_property_dependency(ElmtId(2));
        deps.add_tracked_property_dependency("x", ElmtId(1));
        deps.add_tracked_property_dependency("y", ElmtId(1));
        deps.add_tracked_property_dependency("y", ElmtId(2));

        deps.purge_dependencies_for_elmt_id(ElmtId(1));

        assert!(!deps.all_property_dependencies().contains(&ElmtId(1)));
        assert!(deps.all_property_dependencies().contains(&ElmtId(2)));
        assert!(!deps.tracked_property_dependencies("x").contains(&ElmtId(1)));
        assert!(!deps.tracked_property_dependencies("y").contains(&ElmtId(1)));
        assert!(deps.tracked_property_dependencies("y").contains(&ElmtId(2)));

        // a second purge for the same id changes nothing
        deps.purge_dependencies_for_elmt_id(ElmtId(1));
        assert_eq!(deps.all_property_dependencies().len(), 1);
        assert_eq!(deps.tracked_property_dependencies("y").len(), 1);

        // purging an id that was never added is fine too
        deps.purge_dependencies_for_elmt_id(ElmtId(999));
    }

    #[test]
    fn dump_mentions_every_field() {
        let mut deps = PropertyDependencies::new();
        deps.add_property_dependency(ElmtId(5));
        deps.add_tracked_property_dependency("name", ElmtId(6));
        let dump = deps.dump_dependencies();
        assert!(dump.contains("5"));
        assert!(dump.contains("'name'"));
    }
}
