#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Integration tests for the event bus: last-value queries, live
//! subscriptions, ordering, and the room-scoped handler registry.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use common::{other_room_id, room_id, sample_room};
use flag_frenzy_client::protocol::{RoomClosedPayload, ServerEvent, Topic};
use flag_frenzy_client::EventBus;

fn room_update(guest: Option<&str>) -> ServerEvent {
    ServerEvent::RoomUpdate(Box::new(sample_room(guest)))
}

#[tokio::test]
async fn latest_is_none_before_any_event() {
    let bus = EventBus::new();
    for topic in Topic::ALL {
        assert!(bus.latest(topic).is_none());
    }
}

#[tokio::test]
async fn late_subscriber_sees_last_value() {
    let bus = EventBus::new();
    bus.publish(room_update(Some("bob")));

    // Subscribed after the event arrived: the live channel has nothing,
    // but the last-value slot does.
    let mut rx = bus.subscribe(Topic::RoomUpdates);
    assert!(rx.try_recv().is_err());
    match bus.latest(Topic::RoomUpdates) {
        Some(ServerEvent::RoomUpdate(room)) => {
            assert_eq!(room.guest_name.as_deref(), Some("bob"));
        }
        other => panic!("expected stored RoomUpdate, got {other:?}"),
    }
}

#[tokio::test]
async fn last_value_is_per_topic() {
    let bus = EventBus::new();
    bus.publish(room_update(None));
    assert!(bus.latest(Topic::RoomUpdates).is_some());
    assert!(bus.latest(Topic::RoomClosed).is_none());
    assert!(bus.latest(Topic::RoundStarted).is_none());
}

#[tokio::test]
async fn delivery_order_is_preserved_within_a_topic() {
    let bus = EventBus::new();
    let mut rx = bus.subscribe(Topic::RoomUpdates);

    let mut first = sample_room(None);
    first.number_of_rounds = 1;
    let mut second = sample_room(None);
    second.number_of_rounds = 2;
    let mut third = sample_room(None);
    third.number_of_rounds = 3;

    bus.publish(ServerEvent::RoomUpdate(Box::new(first)));
    bus.publish(ServerEvent::RoomUpdate(Box::new(second)));
    bus.publish(ServerEvent::RoomUpdate(Box::new(third)));

    let mut seen = Vec::new();
    for _ in 0..3 {
        if let ServerEvent::RoomUpdate(room) = rx.try_recv().unwrap() {
            seen.push(room.number_of_rounds);
        }
    }
    assert_eq!(seen, vec![1, 2, 3]);
}

#[tokio::test]
async fn room_scoped_handler_receives_matching_events_only() {
    let bus = EventBus::new();
    let hits = Arc::new(AtomicUsize::new(0));

    let hits_clone = Arc::clone(&hits);
    bus.register_room_handler(
        room_id(),
        Arc::new(move |_event| {
            hits_clone.fetch_add(1, Ordering::Relaxed);
        }),
    );

    // Matching room.
    bus.publish(room_update(None));
    assert_eq!(hits.load(Ordering::Relaxed), 1);

    // Different room.
    let mut other = sample_room(None);
    other.id = other_room_id();
    bus.publish(ServerEvent::RoomUpdate(Box::new(other)));
    assert_eq!(hits.load(Ordering::Relaxed), 1);

    // Room-closed for the same room also dispatches.
    bus.publish(ServerEvent::RoomClosed(RoomClosedPayload {
        room_id: room_id(),
        message: "host left".into(),
    }));
    assert_eq!(hits.load(Ordering::Relaxed), 2);
}

#[tokio::test]
async fn multiple_handlers_per_room_run_in_registration_order() {
    let bus = EventBus::new();
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    for tag in ["first", "second"] {
        let order = Arc::clone(&order);
        bus.register_room_handler(
            room_id(),
            Arc::new(move |_event| {
                order.lock().unwrap().push(tag);
            }),
        );
    }

    bus.publish(room_update(None));
    assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
}

#[tokio::test]
async fn unregister_removes_only_that_handler() {
    let bus = EventBus::new();
    let first_hits = Arc::new(AtomicUsize::new(0));
    let second_hits = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&first_hits);
    let first = bus.register_room_handler(
        room_id(),
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::Relaxed);
        }),
    );
    let counter = Arc::clone(&second_hits);
    let _second = bus.register_room_handler(
        room_id(),
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::Relaxed);
        }),
    );

    bus.unregister_room_handler(room_id(), first);
    bus.publish(room_update(None));

    assert_eq!(first_hits.load(Ordering::Relaxed), 0);
    assert_eq!(second_hits.load(Ordering::Relaxed), 1);
}

#[tokio::test]
async fn unregister_unknown_handler_is_noop() {
    let bus = EventBus::new();
    let id = bus.register_room_handler(room_id(), Arc::new(|_event| {}));
    bus.unregister_room_handler(room_id(), id);
    // Removing again, and removing against a room with no registry entry,
    // must both be harmless.
    bus.unregister_room_handler(room_id(), id);
    bus.unregister_room_handler(other_room_id(), id);
    bus.publish(room_update(None));
}

#[tokio::test]
async fn friend_events_have_no_room_scope() {
    let bus = EventBus::new();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);
    bus.register_room_handler(
        room_id(),
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::Relaxed);
        }),
    );

    bus.publish(ServerEvent::FriendRequest(
        flag_frenzy_client::protocol::FriendRequestPayload {
            from_user_name: "carol".into(),
        },
    ));

    assert_eq!(hits.load(Ordering::Relaxed), 0);
    assert!(bus.latest(Topic::FriendRequest).is_some());
}
