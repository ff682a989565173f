use ahash::AHashSet;

use crate::ElmtId;

/// The capability an owning view exposes to its state variables.
///
/// This is the only interface through which the state layer talks to the
/// rendering side: a property asks which element is being built while it is
/// read, and pushes the set of affected elements when it is written. What
/// the view does with that set (scheduling, diffing, painting) is not this
/// crate's business.
///
/// Properties hold the view through a `Weak` handle: the view owns its
/// state variables, never the other way around. A property whose view is
/// gone simply stops notifying.
pub trait HostView {
    /// The element currently being (re)built, or `None` when no element
    /// construction is in progress.
    fn currently_rendered_elmt_id(&self) -> Option<ElmtId>;

    /// One of this view's state variables changed; `elmt_ids` is the set of
    /// elements whose last render read it and that need a re-render.
    fn view_property_has_changed(&mut self, property_info: &str, elmt_ids: &AHashSet<ElmtId>);

    /// Debug identity of the view, e.g. `MyComponent[3]`. Used in dumps and
    /// in [`ValueCheckError`](crate::ValueCheckError).
    fn debug_info(&self) -> String {
        return "owning view UNKNOWN".to_string();
    }
}
