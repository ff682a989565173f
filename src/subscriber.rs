use bitflags::bitflags;

use crate::SubscriberId;

bitflags! {
    /// Which notifications a peer subscriber can receive.
    ///
    /// Declared once when the peer is registered, instead of probing the
    /// peer's shape on every notification. A notification that needs a
    /// capability the peer did not declare skips that peer with a warning.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct PeerCapability: u8 {
        /// The peer handles whole-value change notifications.
        const WHOLE_VALUE = 1 << 0;
        /// The peer handles tracked-field change notifications.
        const TRACKED_FIELD = 1 << 1;
    }
}

/// What a peer gets told when its source property changes.
pub struct PeerEvent<'a, T> {
    /// Registry id of the source property.
    pub source_id: SubscriberId,
    /// Variable name of the source property.
    pub source_info: &'a str,
    /// The source's value after the change.
    pub value: &'a T,
}

/// A peer subscriber: another observed property (or property-like object)
/// chained to this one through a one-way or two-way binding, which must
/// re-propagate changes to its own dependents.
///
/// Peer-to-peer links are plain mutual references managed by explicit
/// add/remove; they are held weakly and can legitimately form cycles, so a
/// peer must never be kept alive through its subscription alone.
pub trait SyncPeer<T> {
    /// Registry id of this peer, used to unlink it and to break
    /// notification cycles.
    fn subscriber_id(&self) -> SubscriberId;

    /// The notifications this peer wants. Queried once at registration.
    fn capability(&self) -> PeerCapability;

    /// The source property's value was reassigned (or mutated in
    /// compatibility mode).
    fn sync_peer_has_changed(&self, event: &PeerEvent<'_, T>) {
        let _ = event;
    }

    /// One tracked field of the source property's object value was mutated.
    fn sync_peer_tracked_property_has_changed(&self, event: &PeerEvent<'_, T>, changed_property: &str) {
        let _ = (event, changed_property);
    }

    /// Debug identity for dumps.
    fn debug_info(&self) -> String {
        return format!("sync peer [{}]", self.subscriber_id());
    }
}
