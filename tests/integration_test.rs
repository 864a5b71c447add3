use planpoker::config::ServerConfig;
use planpoker::protocol::{ClientMessage, ServerMessage};
use planpoker::state::AppState;
use planpoker::types::{Role, VotingState};
use planpoker::ws::handlers::{handle_message, handle_text};
use planpoker::ws::Session;
use std::sync::Arc;

fn join(room_id: &str, name: &str, role: Role) -> ClientMessage {
    ClientMessage::JoinRoom {
        room_id: room_id.to_string(),
        name: name.to_string(),
        role,
    }
}

/// End-to-end: moderator and team member estimate one story
#[tokio::test]
async fn test_full_estimation_round() {
    let state = Arc::new(AppState::new());
    let mut a = Session::new();
    let mut b = Session::new();

    // 1. A joins r1 as scrum master and gets the room snapshot
    match handle_message(join("r1", "Alice", Role::ScrumMaster), &mut a, &state).await {
        Some(ServerMessage::RoomJoined {
            room_id,
            participant_id,
            participants,
            votes_revealed,
            ..
        }) => {
            assert_eq!(room_id, "r1");
            assert_eq!(participant_id, a.id);
            assert_eq!(participants.len(), 1);
            assert!(!votes_revealed);
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }

    // 2. B joins as team member; A is told, B is not
    match handle_message(join("r1", "Bob", Role::TeamMember), &mut b, &state).await {
        Some(ServerMessage::RoomJoined { participants, .. }) => {
            assert_eq!(participants.len(), 2);
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }
    match a.drain(&state).await.as_slice() {
        [ServerMessage::ParticipantJoined { participant }] => {
            assert_eq!(participant.id, b.id);
            assert_eq!(participant.role, Role::TeamMember);
        }
        other => panic!("Expected ParticipantJoined, got {:?}", other),
    }
    assert!(b.drain(&state).await.is_empty());

    // 3. A sets the story
    let reply = handle_message(
        ClientMessage::AddStory {
            title: "Password reset".to_string(),
            description: Some("Email based".to_string()),
            link: Some("".to_string()),
        },
        &mut a,
        &state,
    )
    .await;
    assert!(reply.is_none());
    for session in [&mut a, &mut b] {
        match session.drain(&state).await.as_slice() {
            [ServerMessage::StoryAdded { story }] => {
                assert_eq!(story.title, "Password reset");
                assert_eq!(story.link, None);
            }
            other => panic!("Expected StoryAdded, got {:?}", other),
        }
    }

    // 4. B votes 5; A only learns that B voted
    let reply = handle_message(
        ClientMessage::SubmitVote {
            vote: "5".to_string(),
        },
        &mut b,
        &state,
    )
    .await;
    assert!(reply.is_none());

    let a_events = a.drain(&state).await;
    assert_eq!(
        a_events,
        vec![ServerMessage::VoteSubmitted {
            participant_id: b.id.clone(),
            has_voted: true,
        }]
    );
    let json = serde_json::to_string(&a_events[0]).unwrap();
    assert!(!json.contains("\"5\""), "vote value leaked: {}", json);
    assert_eq!(b.drain(&state).await.len(), 1);

    // 5. A reveals; both see B's vote
    handle_message(ClientMessage::RevealVotes, &mut a, &state).await;
    for session in [&mut a, &mut b] {
        match session.drain(&state).await.as_slice() {
            [ServerMessage::VotesRevealed {
                participants,
                consensus,
            }] => {
                let bob = participants.iter().find(|p| p.name == "Bob").unwrap();
                assert_eq!(bob.vote.as_deref(), Some("5"));
                assert_eq!(consensus.total_votes, 1);
                assert_eq!(consensus.median, Some(5.0));
            }
            other => panic!("Expected VotesRevealed, got {:?}", other),
        }
    }

    // 6. A resets; votes cleared, countdown reset too
    handle_message(
        ClientMessage::ResetVoting {
            room_id: Some("r1".to_string()),
        },
        &mut a,
        &state,
    )
    .await;
    for session in [&mut a, &mut b] {
        match session.drain(&state).await.as_slice() {
            [ServerMessage::VotingReset { participants }, ServerMessage::TimerReset { room_id, .. }] =>
            {
                assert!(participants.iter().all(|p| p.vote.is_none() && !p.has_voted));
                assert_eq!(room_id, "r1");
            }
            other => panic!("Expected VotingReset + TimerReset, got {:?}", other),
        }
    }

    let room = state.get_room("r1").await.expect("Room should exist");
    assert_eq!(room.state, VotingState::Collecting);
}

#[tokio::test]
async fn test_non_moderators_cannot_moderate() {
    let state = Arc::new(AppState::new());
    let mut sm = Session::new();
    let mut dev = Session::new();
    let mut obs = Session::new();
    handle_message(join("r1", "Sam", Role::ScrumMaster), &mut sm, &state).await;
    handle_message(join("r1", "Dee", Role::TeamMember), &mut dev, &state).await;
    handle_message(join("r1", "Oz", Role::Observer), &mut obs, &state).await;
    handle_message(
        ClientMessage::SubmitVote {
            vote: "8".to_string(),
        },
        &mut dev,
        &state,
    )
    .await;
    for session in [&mut sm, &mut dev, &mut obs] {
        session.drain(&state).await;
    }
    let before = state.get_room("r1").await.unwrap();

    for session in [&mut dev, &mut obs] {
        for msg in [
            ClientMessage::RevealVotes,
            ClientMessage::ResetVoting { room_id: None },
            ClientMessage::TimerStart {
                room_id: Some("r1".to_string()),
            },
            ClientMessage::TimerReset {
                room_id: Some("r1".to_string()),
            },
        ] {
            match handle_message(msg, session, &state).await {
                Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAUTHORIZED"),
                other => panic!("Expected UNAUTHORIZED, got {:?}", other),
            }
        }
    }

    assert_eq!(state.get_room("r1").await.unwrap(), before);
    for session in [&mut sm, &mut dev, &mut obs] {
        assert!(
            session.drain(&state).await.is_empty(),
            "room saw an unauthorized action"
        );
    }
}

#[tokio::test]
async fn test_timer_start_reaches_whole_room() {
    let state = Arc::new(AppState::new());
    let mut po = Session::new();
    let mut obs = Session::new();
    handle_message(join("r1", "Pat", Role::ProductOwner), &mut po, &state).await;
    handle_message(join("r1", "Olu", Role::Observer), &mut obs, &state).await;
    po.drain(&state).await;

    handle_message(
        ClientMessage::TimerStart {
            room_id: Some("r1".to_string()),
        },
        &mut po,
        &state,
    )
    .await;

    for session in [&mut po, &mut obs] {
        match session.drain(&state).await.as_slice() {
            [ServerMessage::TimerStarted {
                duration_secs,
                epoch,
                ..
            }] => {
                assert_eq!(*duration_secs, 10);
                assert_eq!(*epoch, 1);
            }
            other => panic!("Expected TimerStarted, got {:?}", other),
        }
    }

    // Late joiner sees the running timer in its snapshot
    let mut late = Session::new();
    match handle_message(join("r1", "Lee", Role::TeamMember), &mut late, &state).await {
        Some(ServerMessage::RoomJoined { timer, .. }) => {
            assert_eq!(timer.epoch, 1);
            assert!(timer.started_at.is_some());
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }
}

#[tokio::test]
async fn test_room_lifecycle() {
    let state = Arc::new(AppState::new());
    let mut sessions: Vec<Session> = (0..3).map(|_| Session::new()).collect();

    for (i, session) in sessions.iter_mut().enumerate() {
        let role = if i == 0 {
            Role::ScrumMaster
        } else {
            Role::TeamMember
        };
        handle_message(join("r1", &format!("p{}", i), role), session, &state).await;
        handle_message(
            ClientMessage::SubmitVote {
                vote: "3".to_string(),
            },
            session,
            &state,
        )
        .await;
    }
    assert_eq!(state.participant_count("r1").await, Some(3));

    for session in &sessions {
        state.disconnect(&session.id).await;
    }
    assert!(state.get_room("r1").await.is_none());
    assert_eq!(state.room_count().await, 0);

    // Same id afterwards is a brand new room
    let mut fresh = Session::new();
    match handle_message(join("r1", "New", Role::TeamMember), &mut fresh, &state).await {
        Some(ServerMessage::RoomJoined {
            participants,
            story,
            votes_revealed,
            ..
        }) => {
            assert_eq!(participants.len(), 1);
            assert!(!participants[0].has_voted);
            assert!(story.is_none());
            assert!(!votes_revealed);
        }
        other => panic!("Expected RoomJoined, got {:?}", other),
    }
}

#[tokio::test]
async fn test_disconnect_notifies_remaining() {
    let state = Arc::new(AppState::new());
    let mut a = Session::new();
    let mut b = Session::new();
    handle_message(join("r1", "A", Role::ScrumMaster), &mut a, &state).await;
    handle_message(join("r1", "B", Role::TeamMember), &mut b, &state).await;
    a.drain(&state).await;

    state.disconnect(&b.id).await;

    assert_eq!(
        a.drain(&state).await,
        vec![ServerMessage::ParticipantLeft { id: b.id.clone() }]
    );
    assert_eq!(state.participant_count("r1").await, Some(1));
}

#[tokio::test]
async fn test_rooms_are_isolated() {
    let state = Arc::new(AppState::new());
    let mut a = Session::new();
    let mut b = Session::new();
    handle_message(join("r1", "A", Role::ScrumMaster), &mut a, &state).await;
    handle_message(join("r2", "B", Role::ScrumMaster), &mut b, &state).await;

    handle_message(
        ClientMessage::SubmitVote {
            vote: "2".to_string(),
        },
        &mut a,
        &state,
    )
    .await;
    handle_message(ClientMessage::RevealVotes, &mut a, &state).await;

    assert_eq!(a.drain(&state).await.len(), 2);
    assert!(b.drain(&state).await.is_empty());
    assert_eq!(
        state.get_room("r2").await.unwrap().state,
        VotingState::Collecting
    );
}

#[tokio::test]
async fn test_reveal_consensus_over_wire_frames() {
    let state = Arc::new(AppState::new());
    let mut sm = Session::new();
    handle_text(
        r#"{"t":"join-room","roomId":"r1","name":"Sam","role":"scrum-master"}"#,
        &mut sm,
        &state,
    )
    .await;

    let mut voters = Vec::new();
    for (i, vote) in ["1", "2", "2", "3", "?"].iter().enumerate() {
        let mut session = Session::new();
        handle_text(
            &format!(
                r#"{{"t":"join-room","roomId":"r1","name":"v{}","role":"team-member"}}"#,
                i
            ),
            &mut session,
            &state,
        )
        .await;
        handle_text(
            &format!(r#"{{"t":"submit-vote","vote":"{}"}}"#, vote),
            &mut session,
            &state,
        )
        .await;
        voters.push(session);
    }
    sm.drain(&state).await;

    assert!(handle_text(r#"{"t":"reveal-votes"}"#, &mut sm, &state)
        .await
        .is_none());

    match sm.drain(&state).await.as_slice() {
        [ServerMessage::VotesRevealed { consensus, .. }] => {
            assert_eq!(consensus.total_votes, 5);
            assert_eq!(consensus.numeric_votes, 4);
            assert_eq!(consensus.average, Some(2.0));
            assert_eq!(consensus.median, Some(2.0));
            assert_eq!(consensus.mode, vec![2.0]);
            assert_eq!(consensus.groups.last().map(|g| g.value.as_str()), Some("?"));
        }
        other => panic!("Expected VotesRevealed, got {:?}", other),
    }
}

/// A connection that falls behind its room buffer gets a fresh snapshot
/// instead of silently missing the reveal
#[tokio::test]
async fn test_slow_subscriber_is_resynced_after_lag() {
    let state = Arc::new(AppState::with_config(ServerConfig {
        room_channel_capacity: 2,
        ..ServerConfig::default()
    }));
    let mut sm = Session::new();
    let mut dev = Session::new();
    handle_message(join("r1", "Sam", Role::ScrumMaster), &mut sm, &state).await;
    handle_message(join("r1", "Dee", Role::TeamMember), &mut dev, &state).await;

    handle_message(
        ClientMessage::SubmitVote {
            vote: "5".to_string(),
        },
        &mut dev,
        &state,
    )
    .await;
    handle_message(ClientMessage::RevealVotes, &mut sm, &state).await;
    for title in ["First", "Second"] {
        handle_message(
            ClientMessage::AddStory {
                title: title.to_string(),
                description: None,
                link: None,
            },
            &mut sm,
            &state,
        )
        .await;
    }

    match dev.drain(&state).await.as_slice() {
        [ServerMessage::RoomJoined {
            participant_id,
            participants,
            story,
            votes_revealed,
            ..
        }] => {
            assert_eq!(*participant_id, dev.id);
            assert!(*votes_revealed);
            let dee = participants.iter().find(|p| p.name == "Dee").unwrap();
            assert_eq!(dee.vote.as_deref(), Some("5"));
            assert_eq!(story.as_ref().map(|s| s.title.as_str()), Some("Second"));
        }
        other => panic!("Expected a resync snapshot, got {:?}", other),
    }

    // Back in step: the next broadcast arrives normally
    handle_message(
        ClientMessage::ResetVoting { room_id: None },
        &mut sm,
        &state,
    )
    .await;
    match dev.drain(&state).await.as_slice() {
        [ServerMessage::VotingReset { .. }, ServerMessage::TimerReset { .. }] => {}
        other => panic!("Expected VotingReset + TimerReset, got {:?}", other),
    }
}
