//! Room registry: room code to connected peer sessions.
//!
//! Rooms exist only while they have members. `join` creates the entry on
//! first member and `leave` removes it with the last, both under the same
//! per-code entry lock, so no caller ever observes an empty room.
//!
//! Operations on one code are serialized by that lock; different codes live
//! in different shards and proceed independently.

use crate::errors::RegistryError;
use crate::observability::metrics;
use crate::relay::session::PeerSession;
use common::types::{PeerId, RoomCode};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type Members = HashMap<PeerId, Arc<PeerSession>>;

/// Process-wide room membership.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomCode, Members>,
    peers: AtomicUsize,
    /// Serializes gauge publication (read counts, then set).
    gauge_lock: Mutex<()>,
}

impl RoomRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `session` to its room, creating the room if needed.
    ///
    /// Returns the members present before the join (never includes
    /// `session` itself).
    pub fn join(&self, session: &Arc<PeerSession>) -> Vec<Arc<PeerSession>> {
        let code = session.room().clone();

        let peers_before = match self.rooms.entry(code.clone()) {
            Entry::Occupied(mut entry) => {
                let members = entry.get_mut();
                let before: Vec<_> = members.values().cloned().collect();
                members.insert(session.id(), Arc::clone(session));
                before
            }
            Entry::Vacant(entry) => {
                let mut members = HashMap::new();
                members.insert(session.id(), Arc::clone(session));
                entry.insert(members);
                Vec::new()
            }
        };

        // Entry guard is dropped above; reading `len()` under it would deadlock.
        self.peers.fetch_add(1, Ordering::Relaxed);
        self.publish_gauges();

        tracing::debug!(
            target: "relay.registry",
            room = %code,
            peer_id = %session.id(),
            peers_before = peers_before.len(),
            "Peer joined room"
        );

        peers_before
    }

    /// Remove `session` from its room, deleting the room if it empties.
    ///
    /// Returns the members remaining after the leave.
    ///
    /// # Errors
    ///
    /// `RegistryError::NotMember` if the session is not in its room.
    pub fn leave(&self, session: &PeerSession) -> Result<Vec<Arc<PeerSession>>, RegistryError> {
        let code = session.room();
        let not_member = || RegistryError::NotMember {
            room: code.clone(),
            peer: session.id(),
        };

        let remaining = match self.rooms.entry(code.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get_mut().remove(&session.id()).is_none() {
                    return Err(not_member());
                }
                if entry.get().is_empty() {
                    entry.remove();
                    Vec::new()
                } else {
                    entry.get().values().cloned().collect()
                }
            }
            Entry::Vacant(_) => return Err(not_member()),
        };

        self.peers.fetch_sub(1, Ordering::Relaxed);
        self.publish_gauges();

        tracing::debug!(
            target: "relay.registry",
            room = %code,
            peer_id = %session.id(),
            peers_after = remaining.len(),
            "Peer left room"
        );

        Ok(remaining)
    }

    /// Current members of a room; empty if the room does not exist.
    #[must_use]
    pub fn snapshot(&self, code: &RoomCode) -> Vec<Arc<PeerSession>> {
        self.rooms
            .get(code)
            .map(|members| members.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of rooms with at least one member.
    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Number of members in a room (0 if absent).
    #[must_use]
    pub fn peer_count(&self, code: &RoomCode) -> usize {
        self.rooms.get(code).map_or(0, |members| members.len())
    }

    /// Total peers across all rooms.
    #[must_use]
    pub fn total_peers(&self) -> usize {
        self.peers.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn contains(&self, code: &RoomCode) -> bool {
        self.rooms.contains_key(code)
    }

    /// Publish room and peer gauges.
    ///
    /// Each mutation publishes after it lands, and read-then-set happens under
    /// `gauge_lock`, so the last publish always carries the latest counts.
    fn publish_gauges(&self) {
        let _guard = self.gauge_lock.lock().unwrap_or_else(PoisonError::into_inner);
        metrics::set_rooms_active(self.room_count());
        metrics::set_peers_active(self.total_peers());
    }
}
