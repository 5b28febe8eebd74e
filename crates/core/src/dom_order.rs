//! Insertion-ordered sequence with removal by stable token.
//!
//! Entries live in an [`IndexMap`] keyed by a monotonically increasing token
//! and are threaded into a doubly linked list, so removal is a `swap_remove`
//! plus relinking the two neighbours. Tokens handed out for siblings never
//! change.

use indexmap::IndexMap;

/// Position token returned by [`DomOrder::push`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomIndex(u64);

#[derive(Debug, Clone)]
struct Node<T> {
	value: T,
	prev: Option<DomIndex>,
	next: Option<DomIndex>,
}

/// Ordered list of values that supports O(1) removal by previously returned token.
#[derive(Debug, Clone)]
pub struct DomOrder<T> {
	nodes: IndexMap<DomIndex, Node<T>>,
	head: Option<DomIndex>,
	tail: Option<DomIndex>,
	next: u64,
}

impl<T> Default for DomOrder<T> {
	fn default() -> Self {
		Self {
			nodes: IndexMap::new(),
			head: None,
			tail: None,
			next: 0,
		}
	}
}

impl<T> DomOrder<T> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Appends `value` and returns its token. Tokens are never reused.
	pub fn push(&mut self, value: T) -> DomIndex {
		let index = DomIndex(self.next);
		self.next += 1;
		let prev = self.tail;
		match prev.and_then(|tail| self.nodes.get_mut(&tail)) {
			Some(tail) => tail.next = Some(index),
			None => self.head = Some(index),
		}
		self.tail = Some(index);
		self.nodes.insert(index, Node { value, prev, next: None });
		index
	}

	/// Removes the entry for `index`, keeping the order of the rest.
	pub fn remove(&mut self, index: DomIndex) -> Option<T> {
		let Node { value, prev, next } = self.nodes.swap_remove(&index)?;
		match prev.and_then(|prev| self.nodes.get_mut(&prev)) {
			Some(node) => node.next = next,
			None => self.head = next,
		}
		match next.and_then(|next| self.nodes.get_mut(&next)) {
			Some(node) => node.prev = prev,
			None => self.tail = prev,
		}
		Some(value)
	}

	pub fn get(&self, index: DomIndex) -> Option<&T> {
		self.nodes.get(&index).map(|node| &node.value)
	}

	pub fn len(&self) -> usize {
		self.nodes.len()
	}

	pub fn is_empty(&self) -> bool {
		self.nodes.is_empty()
	}

	/// Values in insertion order.
	pub fn iter(&self) -> impl Iterator<Item = &T> {
		self.entries().map(|(_, value)| value)
	}

	/// Tokens and values in insertion order.
	pub fn entries(&self) -> impl Iterator<Item = (DomIndex, &T)> {
		let mut cursor = self.head;
		std::iter::from_fn(move || {
			let index = cursor?;
			let node = self.nodes.get(&index)?;
			cursor = node.next;
			Some((index, &node.value))
		})
	}
}
