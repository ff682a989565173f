//! Renda is an experimental reactive state layer for partial-update GUIs.
//!
//! ## Overview
//!
//! Declarative frameworks rerun UI-building code when state changes. Doing
//! that for the whole tree on every change is wasteful: most mutations only
//! affect a handful of elements. Renda keeps, for every piece of observed
//! state, a live record of exactly which UI elements read it, so a mutation
//! can invalidate those elements and nothing else.
//!
//! The building block is [`ObservedProperty`]:
//!
//! - while an element is being built, reading the property records that
//!   element as a dependent;
//! - writing the property pushes the set of dependent elements to the
//!   owning [`HostView`], which re-renders only those;
//! - object-valued state can be depended on per tracked field, for
//!   finer-grained invalidation than whole-value;
//! - peer properties chained through one-way or two-way bindings
//!   re-propagate the change to their own dependents.
//!
//! ```rust
//! # use renda::*;
//! let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
//!
//! // outside a render pass, reads record nothing
//! assert_eq!(count.get(), 0);
//!
//! // assignments are gated against the declared value kind before the
//! // dependency ledger or any subscriber is touched
//! count.set(1).unwrap();
//! assert_eq!(count.get_unmonitored(), 1);
//!
//! count.about_to_be_deleted();
//! ```
//!
//! ## Inactive views
//!
//! A view that is off-screen arms [`ObservedProperty::enable_delayed_notification`]
//! on its variables. Mutations are then collapsed into a single pending
//! flag, and the view catches up in one batch through
//! [`ObservedProperty::move_elmt_ids_for_delayed_update`] when it becomes
//! active again.
//!
//! ## What this crate is not
//!
//! There is no layout, painting, gesture or animation code here, and no
//! widget catalog. The rendering side is reached only through the
//! [`HostView`] trait, and elements exist here only as [`ElmtId`] keys.

mod elmt_id;
pub use elmt_id::*;

mod dependencies;
pub use dependencies::*;

mod delay;
pub use delay::*;

mod validate;
pub use validate::*;

mod subscriber;
pub use subscriber::*;

mod registry;
pub use registry::*;

mod view;
pub use view::*;

mod property;
pub use property::*;
