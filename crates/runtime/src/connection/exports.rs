//! Thread-safe table of capabilities exported to the peer.
//!
//! Uses [`DashMap`] so exports can be added from any task sending a call while
//! the dispatch loop concurrently serves and releases them.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::capability::Capability;
use crate::error::{Error, Result};

struct ExportEntry {
	cap: Capability,
	refs: u32,
	/// Lives until the connection closes, whatever the peer releases.
	pinned: bool,
}

/// Capabilities this side hosts on behalf of the peer, by export id.
pub struct ExportTable {
	entries: DashMap<u64, ExportEntry>,
	next_id: AtomicU64,
}

impl Default for ExportTable {
	fn default() -> Self {
		Self::new()
	}
}

impl ExportTable {
	pub fn new() -> Self {
		Self {
			entries: DashMap::new(),
			// 0 is reserved for a bootstrap capability
			next_id: AtomicU64::new(1),
		}
	}

	/// Exports `cap` with one peer reference and returns its id.
	pub fn insert(&self, cap: Capability) -> u64 {
		let id = self.next_id.fetch_add(1, Ordering::SeqCst);
		self.entries.insert(
			id,
			ExportEntry {
				cap,
				refs: 1,
				pinned: false,
			},
		);
		id
	}

	/// Serves `cap` as this side's bootstrap object.
	///
	/// Every `bootstrap()` on the peer is a separate import that sends its own
	/// release, so the bootstrap export is pinned rather than counted.
	pub fn insert_bootstrap(&self, cap: Capability) {
		self.entries.insert(
			tempest_protocol::BOOTSTRAP_TARGET,
			ExportEntry {
				cap,
				refs: 1,
				pinned: true,
			},
		);
	}

	/// Duplicates the exported capability for local use.
	pub fn get(&self, id: u64) -> Result<Capability> {
		self.entries
			.get(&id)
			.map(|entry| entry.cap.add_ref())
			.ok_or(Error::UnknownCapability(id))
	}

	/// Drops `count` peer references; the export goes away at zero.
	pub fn release(&self, id: u64, count: u32) {
		let removed = self
			.entries
			.remove_if_mut(&id, |_, entry| {
				if entry.pinned {
					return false;
				}
				entry.refs = entry.refs.saturating_sub(count);
				entry.refs == 0
			})
			.is_some();

		if removed {
			tracing::debug!(export = id, "export released");
		} else if !self.entries.contains_key(&id) {
			tracing::debug!(export = id, "release for unknown export (ignored)");
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Drops every export, releasing the local capabilities.
	pub fn clear(&self) {
		self.entries.clear();
	}
}
