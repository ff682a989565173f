use std::fmt::{self, Display};

/// A stable integer identity for one instantiated UI element.
///
/// The rendering backend assigns these when an element is built. This crate
/// never interprets them: they are pure dependency-tracking keys that flow
/// from [`HostView::currently_rendered_elmt_id`](crate::HostView::currently_rendered_elmt_id)
/// into the dependency ledgers and back out through
/// [`HostView::view_property_has_changed`](crate::HostView::view_property_has_changed).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ElmtId(pub u32);

impl Display for ElmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "{}", self.0);
    }
}

impl From<u32> for ElmtId {
    fn from(raw: u32) -> Self {
        return ElmtId(raw);
    }
}

/// The name of a state variable, used as notification payload and in debug dumps.
pub type PropertyInfo = String;
