use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashSet;

use crate::dependencies::PropertyDependencies;
use crate::delay::DelayedNotify;
use crate::registry;
use crate::subscriber::{PeerCapability, PeerEvent, SyncPeer};
use crate::validate::{StateValue, ValueAcceptance, ValueCheckError};
use crate::view::HostView;
use crate::{ElmtId, PropertyInfo, SubscriberId};

pub(crate) const PROP_SOURCE_SUFFIX: &str = "_prop_fake_state_source___";

/// An observed state variable driving partial UI updates.
///
/// Wraps a value of type `T` together with a ledger of which UI elements
/// read it. Reading the value during a render pass records the element
/// being built as a dependent; writing it pushes the affected element set
/// to the owning [`HostView`] and fans the change out to peer subscribers
/// (one-way/two-way binding chains).
///
/// Cloning an `ObservedProperty` creates a second handle to the **same**
/// variable.
///
/// All state is single-threaded and mutated synchronously; there is no
/// locking and no notification ever crosses a thread.
pub struct ObservedProperty<T> {
    inner: Rc<RefCell<PropertyInner<T>>>,
}

impl<T> Clone for ObservedProperty<T> {
    fn clone(&self) -> Self {
        return ObservedProperty {
            inner: Rc::clone(&self.inner),
        };
    }
}

pub(crate) struct PropertyInner<T> {
    value: T,
    info: PropertyInfo,
    id: SubscriberId,
    decorator: &'static str,
    acceptance: ValueAcceptance,
    owning_view: Option<Weak<RefCell<dyn HostView>>>,
    peers: Vec<PeerEntry<T>>,
    delayed_notification: DelayedNotify,
    dependent_elmt_ids: PropertyDependencies,
}

struct PeerEntry<T> {
    peer: Weak<dyn SyncPeer<T>>,
    capability: PeerCapability,
    id: SubscriberId,
}

impl<T: StateValue + Clone + PartialEq + 'static> ObservedProperty<T> {
    /// Create a new observed variable named `info` with the given declared
    /// value acceptance.
    ///
    /// The initial value is stored as declared; the gate runs on every
    /// subsequent [`set`](Self::set).
    pub fn new(value: T, info: &str, acceptance: ValueAcceptance) -> ObservedProperty<T> {
        let id = registry::register(info);
        return ObservedProperty {
            inner: Rc::new(RefCell::new(PropertyInner {
                value,
                info: info.to_string(),
                id,
                decorator: "@State",
                acceptance,
                owning_view: None,
                peers: Vec::new(),
                delayed_notification: DelayedNotify::default(),
                dependent_elmt_ids: PropertyDependencies::new(),
            })),
        };
    }

    /// Factory choosing [`ValueAcceptance::Simple`] or
    /// [`ValueAcceptance::ObjectLike`] from the kind of the initial value.
    pub fn create_observed(value: T, info: &str) -> ObservedProperty<T> {
        let acceptance = match value.value_kind() {
            crate::ValueKind::Object | crate::ValueKind::Null => ValueAcceptance::ObjectLike,
            _ => ValueAcceptance::Simple,
        };
        return ObservedProperty::new(value, info, acceptance);
    }

    /// Set the decorator label used in diagnostics, e.g. `@Link`.
    pub fn with_decorator(self, decorator: &'static str) -> ObservedProperty<T> {
        self.inner.borrow_mut().decorator = decorator;
        return self;
    }

    pub fn id(&self) -> SubscriberId {
        return self.inner.borrow().id;
    }

    pub fn info(&self) -> PropertyInfo {
        return self.inner.borrow().info.clone();
    }

    pub fn decorator(&self) -> &'static str {
        return self.inner.borrow().decorator;
    }

    // ------------------------------------------------------------------
    // subscriber management
    // ------------------------------------------------------------------

    /// Attach the owning host view. The property keeps only a weak
    /// back-reference: it never keeps the view alive.
    ///
    /// Re-parenting (attaching a second view) replaces the first and is
    /// logged as a warning, since only one owner at a time is expected.
    pub fn set_owning_view<V: HostView + 'static>(&self, view: &Rc<RefCell<V>>) {
        let mut inner = self.inner.borrow_mut();
        if inner.owning_view.is_some() {
            log::warn!(
                "{}: set_owning_view: replacing an existing owning view",
                inner.debug_info()
            );
        }
        let view: Rc<RefCell<dyn HostView>> = view.clone();
        let weak: Weak<RefCell<dyn HostView>> = Rc::downgrade(&view);
        inner.owning_view = Some(weak);
    }

    /// Register a peer subscriber. Its [`PeerCapability`] is queried once,
    /// here, and never probed again at notification time.
    pub fn add_peer(&self, peer: &Rc<dyn SyncPeer<T>>) {
        let entry = PeerEntry {
            peer: Rc::downgrade(peer),
            capability: peer.capability(),
            id: peer.subscriber_id(),
        };
        let mut inner = self.inner.borrow_mut();
        log::debug!(
            "{}: add_peer: {} with capability {:?}",
            inner.debug_info(),
            peer.debug_info(),
            entry.capability
        );
        inner.peers.push(entry);
    }

    /// Unlink the peer registered under `id`, both from this property's
    /// peer set and from the global-by-id registry.
    pub fn remove_subscriber(&self, id: SubscriberId) {
        let mut inner = self.inner.borrow_mut();
        inner.peers.retain(|entry| entry.id != id);
        registry::unregister(id);
    }

    /// Peer-set size, plus one if an owning view is attached. Diagnostics
    /// only, never control flow.
    pub fn number_of_subscribers(&self) -> usize {
        let inner = self.inner.borrow();
        return inner.peers.len() + if inner.owning_view.is_some() { 1 } else { 0 };
    }

    /// Drop all subscriber references before this property is discarded,
    /// so no dangling notification can be delivered afterwards.
    pub fn about_to_be_deleted(&self) {
        let mut inner = self.inner.borrow_mut();
        log::debug!("{}: about_to_be_deleted", inner.debug_info());
        inner.peers.clear();
        inner.owning_view = None;
        registry::unregister(inner.id);
    }

    // ------------------------------------------------------------------
    // read path
    // ------------------------------------------------------------------

    /// Get a clone of the current value, recording the currently rendered
    /// element (if any) as a whole-value dependent.
    pub fn get(&self) -> T {
        let mut inner = self.inner.borrow_mut();
        inner.record_property_dependent_update();
        return inner.value.clone();
    }

    /// Access the current value by reference without cloning, recording
    /// the currently rendered element (if any) as a whole-value dependent.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let mut inner = self.inner.borrow_mut();
        inner.record_property_dependent_update();
        return f(&inner.value);
    }

    /// Get a clone of the current value without recording any dependency.
    pub fn get_unmonitored(&self) -> T {
        return self.inner.borrow().value.clone();
    }

    /// Record that `elmt_id` read the tracked field `read_property`.
    /// Callers obtain `elmt_id` from a render pass in progress.
    pub fn record_tracked_dependency(&self, elmt_id: ElmtId, read_property: &str) {
        let mut inner = self.inner.borrow_mut();
        log::debug!(
            "{}: record_tracked_dependency on elmtId {}",
            inner.debug_info(),
            elmt_id
        );
        inner
            .dependent_elmt_ids
            .add_tracked_property_dependency(read_property, elmt_id);
    }

    // ------------------------------------------------------------------
    // write path
    // ------------------------------------------------------------------

    /// Assign a new value.
    ///
    /// The value is gated against the declared acceptance first: an invalid
    /// assignment is rejected with [`ValueCheckError`], the stored value is
    /// untouched and nothing is notified. Assigning a value equal to the
    /// current one is a no-op.
    pub fn set(&self, new_value: T) -> Result<(), ValueCheckError> {
        {
            let mut inner = self.inner.borrow_mut();
            inner.check_new_value(&new_value, inner.acceptance)?;
            if inner.value == new_value {
                log::trace!("{}: set: unchanged value, no notification", inner.debug_info());
                return Ok(());
            }
            inner.value = new_value;
        }
        notify_property_has_changed(&self.inner, None);
        return Ok(());
    }

    /// Mutate the value in place, compatibility mode: the change is
    /// notified as if the whole value had been assigned. This is how
    /// array-like and date-like values report their mutations.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
        }
        notify_property_has_changed(&self.inner, None);
    }

    /// Mutate one tracked field of an object value in place. Only elements
    /// that depend on `changed_property` (and peers with the tracked-field
    /// capability) are told.
    pub fn update_tracked(&self, changed_property: &str, f: impl FnOnce(&mut T)) {
        {
            let mut inner = self.inner.borrow_mut();
            f(&mut inner.value);
        }
        notify_tracked_property_has_changed(&self.inner, changed_property, None);
    }

    // ------------------------------------------------------------------
    // value-kind gates
    // ------------------------------------------------------------------

    /// Gate `value` against the union of all supported kinds.
    pub fn check_is_supported_value(&self, value: &T) -> Result<(), ValueCheckError> {
        return self.inner.borrow().check_new_value(value, ValueAcceptance::Supported);
    }

    /// Gate `value` against the object-like kinds.
    pub fn check_is_object(&self, value: &T) -> Result<(), ValueCheckError> {
        return self.inner.borrow().check_new_value(value, ValueAcceptance::ObjectLike);
    }

    /// Gate `value` against the simple scalar kinds.
    pub fn check_is_simple(&self, value: &T) -> Result<(), ValueCheckError> {
        return self.inner.borrow().check_new_value(value, ValueAcceptance::Simple);
    }

    // ------------------------------------------------------------------
    // delayed notification
    // ------------------------------------------------------------------

    /// Put the property into delayed-notification mode. Used while the
    /// owning view is inactive, e.g. off-screen.
    pub fn enable_delayed_notification(&self) {
        let mut inner = self.inner.borrow_mut();
        log::debug!("{}: enable_delayed_notification", inner.debug_info());
        inner.delayed_notification.arm();
    }

    /// Called by the owning view when it moves from inactive to active.
    ///
    /// Returns the whole-value dependent set if a notification was owed,
    /// `None` if the variable did not change while delayed. The delay flag
    /// is reset either way. This is faster than the view polling each
    /// variable with one notification per missed mutation.
    pub fn move_elmt_ids_for_delayed_update(&self) -> Option<AHashSet<ElmtId>> {
        let mut inner = self.inner.borrow_mut();
        let result = if inner.delayed_notification.take_pending() {
            Some(inner.dependent_elmt_ids.all_property_dependencies().clone())
        } else {
            None
        };
        log::debug!(
            "{}: move_elmt_ids_for_delayed_update: {}",
            inner.debug_info(),
            match &result {
                Some(ids) => format!("{} elmtIds need delayed update", ids.len()),
                None => "no delayed notifications".to_string(),
            }
        );
        return result;
    }

    // ------------------------------------------------------------------
    // element teardown
    // ------------------------------------------------------------------

    /// Remove a torn-down element from all dependency records, so it never
    /// appears in a future notification set.
    pub fn purge_dependency_on_elmt_id(&self, rm_elmt_id: ElmtId) {
        let mut inner = self.inner.borrow_mut();
        log::debug!("{}: purge_dependency_on_elmt_id {}", inner.debug_info(), rm_elmt_id);
        inner.dependent_elmt_ids.purge_dependencies_for_elmt_id(rm_elmt_id);
    }

    // ------------------------------------------------------------------
    // legacy surface
    // ------------------------------------------------------------------

    /// No longer supported; kept for transpiler output from before the
    /// dependency ledger existed. Logs a warning and does nothing.
    pub fn mark_dependent_elements_dirty(&self) {
        log::warn!(
            "{}: mark_dependent_elements_dirty no longer supported. App will work ok, but please recompile it against the current toolchain",
            self.inner.borrow().debug_info()
        );
    }

    /// Retained no-op, still emitted by older transpiler output.
    pub fn set_property_unchanged(&self) {}

    // ------------------------------------------------------------------
    // peer linking and @Prop source naming
    // ------------------------------------------------------------------

    /// This property as a peer subscriber, for registering it on another
    /// property via [`add_peer`](Self::add_peer).
    pub fn as_peer(&self) -> Rc<dyn SyncPeer<T>> {
        return Rc::clone(&self.inner) as Rc<dyn SyncPeer<T>>;
    }

    /// The invented variable name for the internal source property that
    /// backs a one-way bound variable.
    pub fn prop_source_fake_name(&self) -> String {
        return format!("{}{}", self.inner.borrow().info, PROP_SOURCE_SUFFIX);
    }

    /// If this property is such an internal source, the name of the
    /// variable it backs.
    pub fn is_prop_source_fake_name(&self) -> Option<String> {
        let inner = self.inner.borrow();
        return inner.info.strip_suffix(PROP_SOURCE_SUFFIX).map(str::to_string);
    }

    // ------------------------------------------------------------------
    // debug dumps (informational only, no stable format)
    // ------------------------------------------------------------------

    /// Basic identity of this variable, non-recursive.
    pub fn debug_info(&self) -> String {
        return self.inner.borrow().debug_info();
    }

    /// Identity of the owning view, if known.
    pub fn debug_info_owning_view(&self) -> String {
        return self.inner.borrow().debug_info_owning_view();
    }

    /// One line about the owner.
    pub fn debug_info_subscribers(&self) -> String {
        let inner = self.inner.borrow();
        return if inner.owning_view.is_some() {
            format!("|--Owned by {}", inner.debug_info_owning_view())
        } else {
            "|--Owned by: owning view not known".to_string()
        };
    }

    /// The registered sync peers, one per line.
    pub fn debug_info_sync_peers(&self) -> String {
        let inner = self.inner.borrow();
        if inner.peers.is_empty() {
            return "|--Sync peers: none".to_string();
        }
        let mut result = "|--Sync peers: {".to_string();
        for entry in &inner.peers {
            match entry.peer.upgrade() {
                Some(peer) => result.push_str(&format!("\n    {}", peer.debug_info())),
                None => result.push_str(&format!("\n    (dead peer [{}])", entry.id)),
            }
        }
        result.push_str("\n  }");
        return result;
    }

    /// The dependency ledger.
    pub fn debug_info_dependent_elmt_ids(&self) -> String {
        return self.inner.borrow().dependent_elmt_ids.dump_dependencies();
    }
}

impl<T: StateValue + Clone + PartialEq + 'static> PropertyInner<T> {
    fn debug_info(&self) -> String {
        if let Some(prop_source) = self.info.strip_suffix(PROP_SOURCE_SUFFIX) {
            return format!("internal source of one-way bound '{}' [{}]", prop_source, self.id);
        }
        return format!(
            "{} '{}'[{}] <{}>",
            self.decorator,
            self.info,
            self.id,
            self.debug_info_owning_view()
        );
    }

    fn debug_info_owning_view(&self) -> String {
        return match self.owning_view.as_ref().and_then(|weak| weak.upgrade()) {
            Some(view) => view.borrow().debug_info(),
            None => "owning view UNKNOWN".to_string(),
        };
    }

    /// During a 'get', take note of the element being built and add it to
    /// the elements dependent on this property. No-op outside a render pass.
    fn record_property_dependent_update(&mut self) {
        let rendering_elmt_id = self
            .owning_view
            .as_ref()
            .and_then(|weak| weak.upgrade())
            .and_then(|view| view.borrow().currently_rendered_elmt_id());
        let Some(elmt_id) = rendering_elmt_id else {
            // not access recording
            return;
        };
        log::debug!(
            "{}: record_property_dependent_update: add variable dependency for elmtId {}",
            self.debug_info(),
            elmt_id
        );
        self.dependent_elmt_ids.add_property_dependency(elmt_id);
    }

    fn check_new_value(
        &self,
        new_value: &T,
        acceptance: ValueAcceptance,
    ) -> Result<(), ValueCheckError> {
        let kind = new_value.value_kind();
        if acceptance.allows(kind) {
            return Ok(());
        }
        return Err(ValueCheckError {
            owning_view: self.debug_info_owning_view(),
            decorator: self.decorator,
            property: self.info.clone(),
            expected: acceptance.expected(),
            actual: kind,
        });
    }
}

/// Collected under the borrow, delivered after releasing it, so peer and
/// view callbacks can freely touch their own properties.
struct PendingNotify<T> {
    view: Option<Weak<RefCell<dyn HostView>>>,
    elmt_ids: AHashSet<ElmtId>,
    peers: Vec<(Weak<dyn SyncPeer<T>>, PeerCapability)>,
    source_id: SubscriberId,
    info: PropertyInfo,
    value: T,
    debug_info: String,
}

/// Notify the owning view and all peers of a whole-value change.
///
/// `exclude` names the peer whose own change caused this one, to keep
/// two-way binding chains from ping-ponging.
pub(crate) fn notify_property_has_changed<T: StateValue + Clone + PartialEq + 'static>(
    cell: &RefCell<PropertyInner<T>>,
    exclude: Option<SubscriberId>,
) {
    let pending = collect_pending(cell, exclude, None);
    deliver(pending, None);
}

/// Same control flow as [`notify_property_has_changed`], but the element
/// set is the one recorded for `changed_property`, and peers are told
/// through their tracked-field capability.
pub(crate) fn notify_tracked_property_has_changed<T: StateValue + Clone + PartialEq + 'static>(
    cell: &RefCell<PropertyInner<T>>,
    changed_property: &str,
    exclude: Option<SubscriberId>,
) {
    let pending = collect_pending(cell, exclude, Some(changed_property));
    deliver(pending, Some(changed_property));
}

fn collect_pending<T: StateValue + Clone + PartialEq + 'static>(
    cell: &RefCell<PropertyInner<T>>,
    exclude: Option<SubscriberId>,
    changed_property: Option<&str>,
) -> PendingNotify<T> {
    let mut inner = cell.borrow_mut();
    let debug_info = inner.debug_info();
    log::debug!("{}: notify property has changed", debug_info);

    // The delay flag only matters when there is an owning view to delay
    // for; a viewless property always fans out to peers immediately.
    let mut view = None;
    if inner.owning_view.is_some() {
        if inner.delayed_notification.record_change() {
            view = inner.owning_view.clone();
        }
    }

    let elmt_ids = match changed_property {
        Some(changed_property) => inner.dependent_elmt_ids.tracked_property_dependencies(changed_property),
        None => inner.dependent_elmt_ids.all_property_dependencies().clone(),
    };

    // drop dead peers while we are here
    inner.peers.retain(|entry| entry.peer.strong_count() > 0);
    let peers = inner
        .peers
        .iter()
        .filter(|entry| Some(entry.id) != exclude)
        .map(|entry| (entry.peer.clone(), entry.capability))
        .collect();

    return PendingNotify {
        view,
        elmt_ids,
        peers,
        source_id: inner.id,
        info: inner.info.clone(),
        value: inner.value.clone(),
        debug_info,
    };
}

fn deliver<T>(pending: PendingNotify<T>, changed_property: Option<&str>) {
    if let Some(view) = pending.view.as_ref().and_then(|weak| weak.upgrade()) {
        view.borrow_mut()
            .view_property_has_changed(&pending.info, &pending.elmt_ids);
    }

    let needed = match changed_property {
        Some(_) => PeerCapability::TRACKED_FIELD,
        None => PeerCapability::WHOLE_VALUE,
    };
    let event = PeerEvent {
        source_id: pending.source_id,
        source_info: &pending.info,
        value: &pending.value,
    };
    for (peer, capability) in &pending.peers {
        let Some(peer) = peer.upgrade() else {
            continue;
        };
        if capability.contains(needed) == false {
            log::warn!(
                "{}: notify: subscriber {} lacks the {:?} capability, skipping",
                pending.debug_info,
                peer.debug_info(),
                needed
            );
            continue;
        }
        match changed_property {
            Some(changed_property) => {
                peer.sync_peer_tracked_property_has_changed(&event, changed_property)
            }
            None => peer.sync_peer_has_changed(&event),
        }
    }
}

/// A property is itself a peer: registering property B as a peer of
/// property A forms a one-way binding A -> B; registering both ways forms
/// a two-way binding.
impl<T: StateValue + Clone + PartialEq + 'static> SyncPeer<T> for RefCell<PropertyInner<T>> {
    fn subscriber_id(&self) -> SubscriberId {
        return self.borrow().id;
    }

    fn capability(&self) -> PeerCapability {
        return PeerCapability::WHOLE_VALUE | PeerCapability::TRACKED_FIELD;
    }

    fn sync_peer_has_changed(&self, event: &PeerEvent<'_, T>) {
        {
            let mut inner = self.borrow_mut();
            if inner.value == *event.value {
                // the sync that caused this one already converged; stop here,
                // this is what keeps two-way binding cycles finite
                return;
            }
            log::debug!(
                "{}: sync_peer_has_changed from '{}'",
                inner.debug_info(),
                event.source_info
            );
            inner.value = event.value.clone();
        }
        notify_property_has_changed(self, Some(event.source_id));
    }

    fn sync_peer_tracked_property_has_changed(&self, event: &PeerEvent<'_, T>, changed_property: &str) {
        {
            let mut inner = self.borrow_mut();
            if inner.value == *event.value {
                return;
            }
            log::debug!(
                "{}: sync_peer_tracked_property_has_changed '{}' from '{}'",
                inner.debug_info(),
                changed_property,
                event.source_info
            );
            inner.value = event.value.clone();
        }
        notify_tracked_property_has_changed(self, changed_property, Some(event.source_id));
    }

    fn debug_info(&self) -> String {
        return self.borrow().debug_info();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::ValueKind;

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    struct TestView {
        rendering: Option<ElmtId>,
        calls: Vec<(String, Vec<ElmtId>)>,
    }

    impl TestView {
        fn new() -> Rc<RefCell<TestView>> {
            return Rc::new(RefCell::new(TestView {
                rendering: None,
                calls: Vec::new(),
            }));
        }
    }

    impl HostView for TestView {
        fn currently_rendered_elmt_id(&self) -> Option<ElmtId> {
            return self.rendering;
        }

        fn view_property_has_changed(&mut self, property_info: &str, elmt_ids: &AHashSet<ElmtId>) {
            let mut ids: Vec<ElmtId> = elmt_ids.iter().copied().collect();
            ids.sort();
            self.calls.push((property_info.to_string(), ids));
        }

        fn debug_info(&self) -> String {
            return "TestView[1]".to_string();
        }
    }

    /// Simulate one element reading `prop` during its render pass.
    fn render_read<T: StateValue + Clone + PartialEq + 'static>(
        view: &Rc<RefCell<TestView>>,
        prop: &ObservedProperty<T>,
        elmt: u32,
    ) {
        view.borrow_mut().rendering = Some(ElmtId(elmt));
        let _ = prop.get();
        view.borrow_mut().rendering = None;
    }

    /// A peer test double that records every notification it receives.
    struct CountingPeer {
        id: SubscriberId,
        capability: PeerCapability,
        whole_value_calls: RefCell<Vec<SubscriberId>>,
        tracked_calls: RefCell<Vec<(SubscriberId, String)>>,
    }

    impl CountingPeer {
        fn new(capability: PeerCapability) -> Rc<CountingPeer> {
            return Rc::new(CountingPeer {
                id: registry::register("counting peer"),
                capability,
                whole_value_calls: RefCell::new(Vec::new()),
                tracked_calls: RefCell::new(Vec::new()),
            });
        }
    }

    impl SyncPeer<i32> for CountingPeer {
        fn subscriber_id(&self) -> SubscriberId {
            return self.id;
        }

        fn capability(&self) -> PeerCapability {
            return self.capability;
        }

        fn sync_peer_has_changed(&self, event: &PeerEvent<'_, i32>) {
            self.whole_value_calls.borrow_mut().push(event.source_id);
        }

        fn sync_peer_tracked_property_has_changed(&self, event: &PeerEvent<'_, i32>, changed_property: &str) {
            self.tracked_calls
                .borrow_mut()
                .push((event.source_id, changed_property.to_string()));
        }
    }

    /// A union-typed value, the kind of variable the `Supported` gate exists for.
    #[derive(Clone, PartialEq, Debug)]
    enum TestValue {
        Num(i32),
        Obj(Vec<i32>),
        Fun,
    }

    impl StateValue for TestValue {
        fn value_kind(&self) -> ValueKind {
            return match self {
                TestValue::Num(_) => ValueKind::Number,
                TestValue::Obj(_) => ValueKind::Object,
                TestValue::Fun => ValueKind::Function,
            };
        }
    }

    #[test]
    fn immediate_notify_sends_exact_dependent_set() {
        init_logger();
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);

        render_read(&view, &count, 10);
        render_read(&view, &count, 20);

        count.set(1).unwrap();

        let view = view.borrow();
        assert_eq!(view.calls.len(), 1);
        assert_eq!(view.calls[0].0, "count");
        assert_eq!(view.calls[0].1, vec![ElmtId(10), ElmtId(20)]);
    }

    #[test]
    fn read_outside_render_pass_records_nothing() {
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);

        // no element is being built
        let _ = count.get();
        count.set(1).unwrap();

        assert_eq!(view.borrow().calls[0].1, Vec::<ElmtId>::new());
    }

    #[test]
    fn unchanged_assignment_does_not_notify() {
        let view = TestView::new();
        let count = ObservedProperty::new(7i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);

        count.set(7).unwrap();
        assert!(view.borrow().calls.is_empty());
    }

    #[test]
    fn delay_batches_notifications() {
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);
        render_read(&view, &count, 10);

        count.enable_delayed_notification();
        count.set(1).unwrap();
        count.set(2).unwrap();
        assert!(view.borrow().calls.is_empty());

        let ids = count.move_elmt_ids_for_delayed_update();
        assert_eq!(ids.unwrap().len(), 1);

        // flag is back to do-not-delay: nothing further owed, and the next
        // mutation notifies immediately again
        assert!(count.move_elmt_ids_for_delayed_update().is_none());
        count.set(3).unwrap();
        assert_eq!(view.borrow().calls.len(), 1);
    }

    #[test]
    fn arming_again_does_not_lose_pending_change() {
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);

        count.enable_delayed_notification();
        count.set(1).unwrap();
        count.enable_delayed_notification();

        assert!(count.move_elmt_ids_for_delayed_update().is_some());
    }

    #[test]
    fn peer_fan_out_reaches_every_peer() {
        let source = ObservedProperty::new(0i32, "source", ValueAcceptance::Simple);
        let peers: Vec<Rc<CountingPeer>> = (0..3)
            .map(|_| CountingPeer::new(PeerCapability::all()))
            .collect();
        for peer in &peers {
            let as_dyn: Rc<dyn SyncPeer<i32>> = Rc::clone(peer) as Rc<dyn SyncPeer<i32>>;
            source.add_peer(&as_dyn);
        }

        source.set(1).unwrap();

        for peer in &peers {
            let calls = peer.whole_value_calls.borrow();
            assert_eq!(calls.len(), 1);
            assert_eq!(calls[0], source.id());
        }
    }

    #[test]
    fn tracked_change_goes_to_field_dependents_only() {
        let view = TestView::new();
        let cfg = ObservedProperty::new(vec![0i32], "cfg", ValueAcceptance::ObjectLike);
        cfg.set_owning_view(&view);

        cfg.record_tracked_dependency(ElmtId(1), "a");
        cfg.record_tracked_dependency(ElmtId(2), "b");

        cfg.update_tracked("a", |v| v.push(1));

        let view = view.borrow();
        assert_eq!(view.calls.len(), 1);
        assert_eq!(view.calls[0].1, vec![ElmtId(1)]);
    }

    #[test]
    fn peer_without_tracked_capability_is_skipped_with_warning() {
        init_logger();
        let source = ObservedProperty::new(0i32, "source", ValueAcceptance::Simple);
        let peer = CountingPeer::new(PeerCapability::WHOLE_VALUE);
        let as_dyn: Rc<dyn SyncPeer<i32>> = Rc::clone(&peer) as Rc<dyn SyncPeer<i32>>;
        source.add_peer(&as_dyn);

        source.update_tracked("field", |v| *v += 1);

        assert!(peer.tracked_calls.borrow().is_empty());

        // the whole-value path still reaches it
        source.set(5).unwrap();
        assert_eq!(peer.whole_value_calls.borrow().len(), 1);
    }

    #[test]
    fn rejected_assignment_leaves_value_and_ledger_untouched() {
        let view = TestView::new();
        let value = ObservedProperty::new(TestValue::Num(1), "value", ValueAcceptance::Simple);
        value.set_owning_view(&view);

        let err = value.set(TestValue::Obj(vec![1])).unwrap_err();
        assert_eq!(err.actual, ValueKind::Object);
        assert_eq!(err.property, "value");
        assert_eq!(err.decorator, "@State");

        assert_eq!(value.get_unmonitored(), TestValue::Num(1));
        assert!(view.borrow().calls.is_empty());
    }

    #[test]
    fn value_gates_accept_and_reject_per_kind() {
        let value = ObservedProperty::new(TestValue::Num(1), "value", ValueAcceptance::Supported);

        assert!(value.check_is_simple(&TestValue::Num(42)).is_ok());
        assert!(value.check_is_simple(&TestValue::Obj(vec![])).is_err());
        assert!(value.check_is_simple(&TestValue::Fun).is_err());

        assert!(value.check_is_object(&TestValue::Obj(vec![])).is_ok());
        assert!(value.check_is_object(&TestValue::Num(42)).is_err());

        assert!(value.check_is_supported_value(&TestValue::Obj(vec![])).is_ok());
        assert!(value.check_is_supported_value(&TestValue::Num(42)).is_ok());
        assert!(value.check_is_supported_value(&TestValue::Fun).is_err());
    }

    #[test]
    fn teardown_stops_all_notification() {
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);
        let peer = CountingPeer::new(PeerCapability::all());
        let as_dyn: Rc<dyn SyncPeer<i32>> = Rc::clone(&peer) as Rc<dyn SyncPeer<i32>>;
        count.add_peer(&as_dyn);

        count.about_to_be_deleted();

        // update() always notifies, so reaching nobody here proves the
        // references are really gone
        count.update(|v| *v += 1);

        assert!(view.borrow().calls.is_empty());
        assert!(peer.whole_value_calls.borrow().is_empty());
        assert_eq!(count.number_of_subscribers(), 0);
    }

    #[test]
    fn element_lifecycle_scenario() {
        let view = TestView::new();
        let p = ObservedProperty::new(0i32, "P", ValueAcceptance::Simple);
        p.set_owning_view(&view);

        render_read(&view, &p, 10);
        render_read(&view, &p, 20);

        p.set(1).unwrap();
        assert_eq!(view.borrow().calls.last().unwrap().1, vec![ElmtId(10), ElmtId(20)]);

        p.purge_dependency_on_elmt_id(ElmtId(10));

        p.set(2).unwrap();
        assert_eq!(view.borrow().calls.last().unwrap().1, vec![ElmtId(20)]);
    }

    #[test]
    fn one_way_binding_propagates_to_peer_view() {
        let source = ObservedProperty::new(0i32, "source", ValueAcceptance::Simple);
        let target = ObservedProperty::new(0i32, "target", ValueAcceptance::Simple)
            .with_decorator("@Prop");
        let target_view = TestView::new();
        target.set_owning_view(&target_view);
        render_read(&target_view, &target, 30);

        source.add_peer(&target.as_peer());
        source.set(9).unwrap();

        assert_eq!(target.get_unmonitored(), 9);
        assert_eq!(target_view.borrow().calls.len(), 1);
        assert_eq!(target_view.borrow().calls[0].1, vec![ElmtId(30)]);
    }

    #[test]
    fn two_way_binding_converges_without_ping_pong() {
        let a = ObservedProperty::new(0i32, "a", ValueAcceptance::Simple);
        let b = ObservedProperty::new(0i32, "b", ValueAcceptance::Simple).with_decorator("@Link");
        a.add_peer(&b.as_peer());
        b.add_peer(&a.as_peer());

        let b_view = TestView::new();
        b.set_owning_view(&b_view);

        a.set(5).unwrap();

        assert_eq!(a.get_unmonitored(), 5);
        assert_eq!(b.get_unmonitored(), 5);
        assert_eq!(b_view.borrow().calls.len(), 1);

        b.set(6).unwrap();
        assert_eq!(a.get_unmonitored(), 6);
    }

    #[test]
    fn remove_subscriber_unlinks_peer() {
        let source = ObservedProperty::new(0i32, "source", ValueAcceptance::Simple);
        let peer = CountingPeer::new(PeerCapability::all());
        let as_dyn: Rc<dyn SyncPeer<i32>> = Rc::clone(&peer) as Rc<dyn SyncPeer<i32>>;
        source.add_peer(&as_dyn);
        assert_eq!(source.number_of_subscribers(), 1);

        source.remove_subscriber(peer.id);
        assert_eq!(source.number_of_subscribers(), 0);

        source.set(1).unwrap();
        assert!(peer.whole_value_calls.borrow().is_empty());
    }

    #[test]
    fn dropped_peer_is_pruned_not_notified() {
        let source = ObservedProperty::new(0i32, "source", ValueAcceptance::Simple);
        {
            let peer = CountingPeer::new(PeerCapability::all());
            let as_dyn: Rc<dyn SyncPeer<i32>> = Rc::clone(&peer) as Rc<dyn SyncPeer<i32>>;
            source.add_peer(&as_dyn);
            registry::unregister(peer.id);
        }
        // peer Rc dropped; notify prunes the dead weak reference
        source.set(1).unwrap();
        assert_eq!(source.number_of_subscribers(), 0);
    }

    #[test]
    fn create_observed_picks_acceptance_from_kind() {
        let simple = ObservedProperty::create_observed(1i32, "n");
        assert!(simple.check_is_simple(&2).is_ok());

        let object = ObservedProperty::create_observed(vec![1i32], "list");
        assert!(object.set(vec![2]).is_ok());
    }

    #[test]
    fn debug_dumps_name_the_variable() {
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);
        render_read(&view, &count, 10);

        assert!(count.debug_info().contains("'count'"));
        assert!(count.debug_info().contains("TestView[1]"));
        assert!(count.debug_info_subscribers().contains("Owned by"));
        assert!(count.debug_info_sync_peers().contains("none"));
        assert!(count.debug_info_dependent_elmt_ids().contains("10"));
    }

    #[test]
    fn prop_source_fake_name_round_trip() {
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        assert!(count.is_prop_source_fake_name().is_none());

        let source = ObservedProperty::new(0i32, &count.prop_source_fake_name(), ValueAcceptance::Simple);
        assert_eq!(source.is_prop_source_fake_name().as_deref(), Some("count"));
        assert!(source.debug_info().contains("internal source"));
    }

    #[test]
    fn legacy_methods_are_inert() {
        let view = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&view);
        render_read(&view, &count, 10);

        count.mark_dependent_elements_dirty();
        count.set_property_unchanged();
        assert!(view.borrow().calls.is_empty());
    }

    #[test]
    fn reparenting_replaces_the_owner() {
        let first = TestView::new();
        let second = TestView::new();
        let count = ObservedProperty::new(0i32, "count", ValueAcceptance::Simple);
        count.set_owning_view(&first);
        count.set_owning_view(&second);

        count.set(1).unwrap();
        assert!(first.borrow().calls.is_empty());
        assert_eq!(second.borrow().calls.len(), 1);
    }
}
