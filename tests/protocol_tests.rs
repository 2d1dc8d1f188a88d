#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::indexing_slicing
)]
//! Wire-format tests for the protocol types.
//!
//! The server speaks camelCase JSON with SCREAMING_SNAKE_CASE enum
//! constants and kebab-case topic tags; these tests pin the exact shapes so
//! a refactor cannot silently break compatibility.

mod common;

use common::{room_id, sample_game, sample_room};
use flag_frenzy_client::protocol::{
    ClientFrame, Game, GuessOutcome, GuessRequest, PlayerStats, Room, RoomClosedPayload,
    RoundRecord, ServerEvent, Topic,
};

// ── Entities ────────────────────────────────────────────────────────

#[test]
fn room_serializes_to_camel_case() {
    let room = sample_room(Some("bob"));
    let value = serde_json::to_value(&room).unwrap();

    assert_eq!(value["hostName"], "alice");
    assert_eq!(value["guestName"], "bob");
    assert_eq!(value["numberOfRounds"], 10);
    assert_eq!(value["status"], "OPEN");
    assert!(value.get("createdAt").is_some());
    assert!(
        value.get("host_name").is_none(),
        "snake_case keys must not appear on the wire"
    );
}

#[test]
fn room_without_guest_omits_the_field() {
    let room = sample_room(None);
    let value = serde_json::to_value(&room).unwrap();
    assert!(value.get("guestName").is_none());
}

#[test]
fn room_round_trip() {
    let room = sample_room(Some("bob"));
    let json = serde_json::to_string(&room).unwrap();
    let back: Room = serde_json::from_str(&json).unwrap();
    assert_eq!(back, room);
}

#[test]
fn room_tolerates_unknown_fields() {
    let mut value = serde_json::to_value(sample_room(None)).unwrap();
    value["deleted"] = serde_json::json!(false);
    value["gameStartedAt"] = serde_json::json!(null);
    let room: Room = serde_json::from_value(value).unwrap();
    assert_eq!(room.id, room_id());
}

#[test]
fn game_serializes_status_and_round_data() {
    let game = sample_game(3, 20);
    let value = serde_json::to_value(&game).unwrap();

    assert_eq!(value["status"], "IN_PROGRESS");
    assert_eq!(value["hostScore"], 2);
    assert_eq!(value["guestScore"], 1);
    assert_eq!(value["currentRound"], 3);
    assert_eq!(value["currentRoundData"]["roundNumber"], 3);
    assert_eq!(value["currentRoundData"]["timeRemaining"], 20);
    assert_eq!(value["currentRoundData"]["roundActive"], true);
    assert_eq!(value["currentRoundData"]["countryId"], "FR");
}

#[test]
fn completed_game_without_round_data_parses() {
    let json = format!(
        r#"{{
            "id": "{game}",
            "roomId": "{room}",
            "hostName": "alice",
            "hostScore": 5,
            "totalRounds": 10,
            "currentRound": 10,
            "status": "COMPLETED"
        }}"#,
        game = common::game_id(),
        room = room_id()
    );
    let game: Game = serde_json::from_str(&json).unwrap();
    assert!(game.current_round_data.is_none());
    assert!(game.guest_score.is_none());
    assert!(game.time_remaining().is_none());
}

#[test]
fn is_final_round_compares_against_total() {
    let mut game = sample_game(9, 10);
    assert!(!game.is_final_round());
    game.current_round = 10;
    assert!(game.is_final_round());
}

// ── Pushed events ───────────────────────────────────────────────────

#[test]
fn server_event_is_tagged_by_topic() {
    let event = ServerEvent::RoundStarted(Box::new(sample_game(2, 15)));
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["topic"], "round-started");
    assert_eq!(value["data"]["currentRound"], 2);
}

#[test]
fn server_event_round_trips_every_topic() {
    let events = vec![
        ServerEvent::Invite(flag_frenzy_client::protocol::InvitePayload {
            initiator_user_name: "alice".into(),
            target_user_name: "bob".into(),
            room_id: room_id(),
        }),
        ServerEvent::RoomUpdate(Box::new(sample_room(None))),
        ServerEvent::RoomClosed(RoomClosedPayload {
            room_id: room_id(),
            message: "closed".into(),
        }),
        ServerEvent::GameStarted(Box::new(sample_game(1, 30))),
        ServerEvent::RoundStarted(Box::new(sample_game(2, 15))),
        ServerEvent::GameEnded(Box::new(sample_game(10, 0))),
        ServerEvent::FriendRequest(flag_frenzy_client::protocol::FriendRequestPayload {
            from_user_name: "carol".into(),
        }),
        ServerEvent::FriendResponse(flag_frenzy_client::protocol::FriendResponsePayload {
            from_user_name: "carol".into(),
            accepted: true,
        }),
        ServerEvent::FriendRemoved(flag_frenzy_client::protocol::FriendRemovedPayload {
            user_name: "carol".into(),
        }),
    ];

    for event in events {
        let json = serde_json::to_string(&event).unwrap();
        let back: ServerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
        assert_eq!(back.topic(), event.topic());
    }
}

#[test]
fn event_topic_mapping_matches_queue_paths() {
    let event = ServerEvent::RoomUpdate(Box::new(sample_room(None)));
    assert_eq!(event.topic(), Topic::RoomUpdates);
    assert_eq!(event.topic().queue(), "/user/queue/room-updates");

    let event = ServerEvent::GameEnded(Box::new(sample_game(1, 0)));
    assert_eq!(event.topic().queue(), "/user/queue/game-ended");
}

#[test]
fn room_scoped_events_expose_their_room_id() {
    assert_eq!(
        ServerEvent::RoomUpdate(Box::new(sample_room(None))).room_id(),
        Some(room_id())
    );
    assert_eq!(
        ServerEvent::GameStarted(Box::new(sample_game(1, 30))).room_id(),
        Some(room_id())
    );
    assert_eq!(
        ServerEvent::FriendRemoved(flag_frenzy_client::protocol::FriendRemovedPayload {
            user_name: "carol".into(),
        })
        .room_id(),
        None
    );
}

#[test]
fn unknown_topic_fails_to_decode() {
    let result = serde_json::from_str::<ServerEvent>(r#"{"topic":"mystery","data":{}}"#);
    assert!(result.is_err());
}

#[test]
fn malformed_payload_fails_to_decode() {
    // Right topic, wrong payload shape.
    let result =
        serde_json::from_str::<ServerEvent>(r#"{"topic":"round-started","data":{"bogus":1}}"#);
    assert!(result.is_err());
}

// ── Client frames ───────────────────────────────────────────────────

#[test]
fn subscribe_frame_shape() {
    let frame = ClientFrame::Subscribe {
        topic: Topic::RoomUpdates,
    };
    let value = serde_json::to_value(&frame).unwrap();
    assert_eq!(value["type"], "Subscribe");
    assert_eq!(value["data"]["topic"], "room-updates");
}

#[test]
fn client_frame_round_trip() {
    for topic in Topic::ALL {
        let frame = ClientFrame::Subscribe { topic };
        let json = serde_json::to_string(&frame).unwrap();
        let back: ClientFrame = serde_json::from_str(&json).unwrap();
        assert_eq!(back, frame);
    }
}

// ── HTTP DTOs ───────────────────────────────────────────────────────

#[test]
fn guess_request_uses_camel_case() {
    let request = GuessRequest {
        game_id: common::game_id(),
        round_number: 4,
        guess_text: "France".into(),
    };
    let value = serde_json::to_value(&request).unwrap();
    assert_eq!(value["roundNumber"], 4);
    assert_eq!(value["guessText"], "France");
    assert!(value.get("gameId").is_some());
}

#[test]
fn guess_outcome_message_is_optional() {
    let json = format!(
        r#"{{"game": {}, "correct": true, "pointsAwarded": 1}}"#,
        serde_json::to_string(&sample_game(1, 10)).unwrap()
    );
    let outcome: GuessOutcome = serde_json::from_str(&json).unwrap();
    assert!(outcome.correct);
    assert_eq!(outcome.points_awarded, 1);
    assert!(outcome.message.is_none());
}

#[test]
fn player_stats_tolerates_sparse_responses() {
    // The stats endpoint omits the name, any unplayed aggregates, and may
    // grow fields this client does not know about.
    let stats: PlayerStats = serde_json::from_str(r#"{"rank": 3}"#).unwrap();
    assert!(stats.user_name.is_empty());
    assert!(stats.games_won.is_none());
    assert!(stats.accuracy_percentage.is_none());
}

#[test]
fn player_stats_placeholder_carries_only_the_name() {
    let stats = PlayerStats::placeholder("bob");
    assert_eq!(stats.user_name, "bob");
    assert!(stats.games_won.is_none());
    assert!(stats.accuracy_percentage.is_none());
    assert!(stats.average_time_secs.is_none());
}

#[test]
fn round_record_defaults_empty_guesses() {
    let json = r#"{
        "roundNumber": 1,
        "countryId": "FR",
        "countryName": "France"
    }"#;
    let record: RoundRecord = serde_json::from_str(json).unwrap();
    assert!(record.guesses.is_empty());
}
