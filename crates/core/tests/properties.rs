//! Property tests for collection sync, capability release and focus handling.

use std::collections::{BTreeMap, HashSet};

use futures_util::FutureExt;
use proptest::prelude::*;
use serde_json::json;
use tempest::api::{ExternalApi, UiViewController};
use tempest::testing::MockObject;
use tempest::{Focus, Grain, GrainId, GrainPusher, Message, MessageSender, Model, Pusher, update};
use tempest_protocol::methods::pusher;
use tempest_runtime::{Capability, Payload};
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
enum PushOp {
	Upsert(u8, u8),
	Remove(u8),
	Clear,
}

fn push_op() -> impl Strategy<Value = PushOp> {
	prop_oneof![
		4 => (0u8..6, any::<u8>()).prop_map(|(k, v)| PushOp::Upsert(k, v)),
		2 => (0u8..6).prop_map(PushOp::Remove),
		1 => Just(PushOp::Clear),
	]
}

#[derive(Debug, Clone)]
enum FocusOp {
	Focus(u8),
	Close(u8),
	List,
}

fn focus_op() -> impl Strategy<Value = FocusOp> {
	prop_oneof![
		(0u8..5).prop_map(FocusOp::Focus),
		(0u8..5).prop_map(FocusOp::Close),
		Just(FocusOp::List),
	]
}

fn model() -> Model {
	Model::new(ExternalApi::new(MockObject::new().capability()))
}

fn key(k: u8) -> GrainId {
	GrainId::new(format!("g{k}"))
}

fn apply(model: &mut Model, msg: Message) {
	assert!(update(model, msg).is_none());
}

fn focus_msg(op: &FocusOp) -> Message {
	match op {
		FocusOp::Focus(k) => Message::FocusGrain { id: key(*k) },
		FocusOp::Close(k) => Message::CloseGrain { id: key(*k) },
		FocusOp::List => Message::ChangeFocus(Focus::GrainList),
	}
}

fn push(sink: &Capability, method: &str, payload: Payload) {
	sink.call_raw(method, payload)
		.now_or_never()
		.expect("pusher answers synchronously")
		.expect("notification accepted");
}

fn grain(controller: &MockObject, title: String) -> Grain {
	Grain {
		title,
		session_token: String::new(),
		controller: UiViewController::new(controller.capability()),
	}
}

proptest! {
	/// Replaying notifications through a pusher matches a reference map, and
	/// every controller handle ends up released exactly when it left the model.
	#[test]
	fn pusher_replay_matches_reference(ops in prop::collection::vec(push_op(), 0..40)) {
		let (tx, mut rx) = mpsc::unbounded_channel();
		let sink = Pusher::new(MessageSender::new(tx), GrainPusher).into_capability();

		let mut reference: BTreeMap<GrainId, (String, usize)> = BTreeMap::new();
		let mut controllers = Vec::new();
		for op in &ops {
			match op {
				PushOp::Upsert(k, v) => {
					let controller = MockObject::new();
					let title = format!("t{v}");
					let payload = Payload::with_caps(
						json!({
							"key": key(*k),
							"value": {"title": title, "sessionToken": "s", "controller": {"$cap": 0}},
						}),
						vec![controller.capability()],
					);
					push(&sink, pusher::UPSERT, payload);
					reference.insert(key(*k), (title, controllers.len()));
					controllers.push(controller);
				}
				PushOp::Remove(k) => {
					push(&sink, pusher::REMOVE, Payload::new(json!({"key": key(*k)})));
					reference.remove(&key(*k));
				}
				PushOp::Clear => {
					push(&sink, pusher::CLEAR, Payload::empty());
					reference.clear();
				}
			}
		}

		let mut m = model();
		let mut applied = 0;
		while let Ok(msg) = rx.try_recv() {
			apply(&mut m, msg);
			applied += 1;
		}
		prop_assert_eq!(applied, ops.len());

		let expected: BTreeMap<_, _> = reference
			.iter()
			.map(|(id, (title, _))| (id.clone(), title.clone()))
			.collect();
		prop_assert_eq!(m.summary().grains, expected);

		let live: HashSet<usize> = reference.values().map(|(_, i)| *i).collect();
		for (i, controller) in controllers.iter().enumerate() {
			let expected_releases = if live.contains(&i) { 0 } else { 1 };
			prop_assert_eq!(controller.releases(), expected_releases, "controller {}", i);
		}
	}

	#[test]
	fn focus_grain_is_idempotent(ops in prop::collection::vec(focus_op(), 0..30), k in 0u8..5) {
		let mut once = model();
		let mut twice = model();
		for op in &ops {
			apply(&mut once, focus_msg(op));
			apply(&mut twice, focus_msg(op));
		}
		apply(&mut once, Message::FocusGrain { id: key(k) });
		apply(&mut twice, Message::FocusGrain { id: key(k) });
		apply(&mut twice, Message::FocusGrain { id: key(k) });

		prop_assert_eq!(once.summary(), twice.summary());
		prop_assert_eq!(once.focus, Focus::OpenGrain(key(k)));
	}

	/// Open grains and the display order always agree, and a focused grain is open.
	#[test]
	fn open_grains_match_display_order(ops in prop::collection::vec(focus_op(), 0..40)) {
		let mut m = model();
		for op in &ops {
			let was_focused = m.focused_grain().cloned();
			apply(&mut m, focus_msg(op));

			if let FocusOp::Close(k) = op {
				if was_focused.as_ref() == Some(&key(*k)) {
					prop_assert_eq!(&m.focus, &Focus::GrainList);
				} else {
					prop_assert_eq!(m.focused_grain().cloned(), was_focused);
				}
			}

			let order = m.open_grain_order();
			let unique: HashSet<_> = order.iter().cloned().collect();
			prop_assert_eq!(unique.len(), order.len());
			let open: HashSet<_> = m.open_grains.keys().cloned().collect();
			prop_assert_eq!(unique, open);
			if let Some(id) = m.focused_grain() {
				prop_assert!(m.open_grains.contains_key(id));
			}
		}
	}

	/// Messages from two commands touching disjoint keys commute.
	#[test]
	fn disjoint_streams_commute(
		a in prop::collection::vec((0u8..4, any::<bool>()), 0..15),
		b in prop::collection::vec((0u8..4, any::<bool>()), 0..15),
		picks in prop::collection::vec(any::<bool>(), 0..30),
	) {
		let stream = |prefix: &str, ops: &[(u8, bool)]| -> Vec<Message> {
			ops.iter()
				.map(|(k, upsert)| {
					let id = GrainId::new(format!("{prefix}{k}"));
					if *upsert {
						Message::UpsertGrain { grain: grain(&MockObject::new(), format!("{id}")), id }
					} else {
						Message::RemoveGrain { id }
					}
				})
				.collect()
		};

		let mut sequential = model();
		for msg in stream("a", &a).into_iter().chain(stream("b", &b)) {
			apply(&mut sequential, msg);
		}

		let mut interleaved = model();
		let mut a_msgs = stream("a", &a).into_iter().peekable();
		let mut b_msgs = stream("b", &b).into_iter().peekable();
		let mut picks = picks.into_iter();
		loop {
			let take_a = match (a_msgs.peek().is_some(), b_msgs.peek().is_some()) {
				(false, false) => break,
				(true, false) => true,
				(false, true) => false,
				(true, true) => picks.next().unwrap_or(true),
			};
			let msg = if take_a { a_msgs.next() } else { b_msgs.next() };
			if let Some(msg) = msg {
				apply(&mut interleaved, msg);
			}
		}

		prop_assert_eq!(sequential.summary(), interleaved.summary());
	}
}
