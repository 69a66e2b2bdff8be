use pubquiz::protocol::{ClientMessage, ServerMessage};
use pubquiz::state::AppState;
use pubquiz::types::{GameState, QuestionKind, Role, RoundType, TransitionReason};
use pubquiz::ws::handlers::handle_message;
use std::sync::Arc;

async fn host(state: &Arc<AppState>, msg: ClientMessage) -> Option<ServerMessage> {
    handle_message(msg, &Role::Host, state).await
}

async fn team(state: &Arc<AppState>, msg: ClientMessage) -> Option<ServerMessage> {
    handle_message(msg, &Role::Team, state).await
}

fn expect_transition(response: Option<ServerMessage>, next_state: GameState) {
    match response {
        Some(ServerMessage::Transition { result, .. }) => {
            assert!(result.success, "transition blocked: {:?}", result.reason);
            assert_eq!(result.next_state, Some(next_state));
        }
        other => panic!("Expected Transition message, got {other:?}"),
    }
}

/// End-to-end integration test for a complete quiz night
#[tokio::test]
async fn test_full_game_flow() {
    let state = Arc::new(AppState::new());

    // 1. Host builds the game
    let game = match host(
        &state,
        ClientMessage::HostCreateGame {
            title: Some("Tuesday Quiz".to_string()),
            description: None,
        },
    )
    .await
    {
        Some(ServerMessage::GameCreated { game }) => game,
        other => panic!("Expected GameCreated, got {other:?}"),
    };
    assert_eq!(game.state, GameState::Lobby);

    let round1 = match host(
        &state,
        ClientMessage::HostCreateRound {
            game_id: game.id.clone(),
            title: "Music".to_string(),
            round_type: RoundType::Standard,
        },
    )
    .await
    {
        Some(ServerMessage::RoundCreated { round }) => round,
        other => panic!("Expected RoundCreated, got {other:?}"),
    };
    assert_eq!(round1.round_number, 1);

    let round2 = match host(
        &state,
        ClientMessage::HostCreateRound {
            game_id: game.id.clone(),
            title: "Geography".to_string(),
            round_type: RoundType::Standard,
        },
    )
    .await
    {
        Some(ServerMessage::RoundCreated { round }) => round,
        other => panic!("Expected RoundCreated, got {other:?}"),
    };

    let q1 = match host(
        &state,
        ClientMessage::HostCreateQuestion {
            round_id: round1.id.clone(),
            prompt: "Who composed the Moonlight Sonata?".to_string(),
            points: 10,
            kind: QuestionKind::Text {
                correct_answer: "Ludwig van Beethoven".to_string(),
                accepted_answers: vec!["Beethoven".to_string()],
            },
        },
    )
    .await
    {
        Some(ServerMessage::QuestionCreated { question }) => question,
        other => panic!("Expected QuestionCreated, got {other:?}"),
    };

    let q2 = match host(
        &state,
        ClientMessage::HostCreateQuestion {
            round_id: round1.id.clone(),
            prompt: "Which band released Abbey Road?".to_string(),
            points: 5,
            kind: QuestionKind::MultipleChoice {
                options: vec![
                    "The Beatles".to_string(),
                    "The Rolling Stones".to_string(),
                    "The Kinks".to_string(),
                ],
                correct_answer: "The Beatles".to_string(),
            },
        },
    )
    .await
    {
        Some(ServerMessage::QuestionCreated { question }) => question,
        other => panic!("Expected QuestionCreated, got {other:?}"),
    };

    let q3 = match host(
        &state,
        ClientMessage::HostCreateQuestion {
            round_id: round2.id.clone(),
            prompt: "What is the capital of Australia?".to_string(),
            points: 10,
            kind: QuestionKind::Text {
                correct_answer: "Canberra".to_string(),
                accepted_answers: vec![],
            },
        },
    )
    .await
    {
        Some(ServerMessage::QuestionCreated { question }) => question,
        other => panic!("Expected QuestionCreated, got {other:?}"),
    };

    // 2. Teams find the game by join code and register
    match team(
        &state,
        ClientMessage::Join {
            join_code: game.join_code.to_lowercase(),
        },
    )
    .await
    {
        Some(ServerMessage::Welcome { game: g, .. }) => assert_eq!(g.id, game.id),
        other => panic!("Expected Welcome, got {other:?}"),
    }

    let alpha = match team(
        &state,
        ClientMessage::RegisterTeam {
            game_id: game.id.clone(),
            team_name: "Quizzly Bears".to_string(),
        },
    )
    .await
    {
        Some(ServerMessage::TeamRegistered { team }) => team,
        other => panic!("Expected TeamRegistered, got {other:?}"),
    };

    let beta = match team(
        &state,
        ClientMessage::RegisterTeam {
            game_id: game.id.clone(),
            team_name: "Agatha Quiztie".to_string(),
        },
    )
    .await
    {
        Some(ServerMessage::TeamRegistered { team }) => team,
        other => panic!("Expected TeamRegistered, got {other:?}"),
    };

    // 3. Play question 1
    expect_transition(
        host(
            &state,
            ClientMessage::HostStartRound {
                game_id: game.id.clone(),
                round_id: round1.id.clone(),
            },
        )
        .await,
        GameState::InRound,
    );

    // Exact answer and a flaggable partial answer
    match team(
        &state,
        ClientMessage::SubmitAnswer {
            question_id: q1.id.clone(),
            team_id: alpha.id.clone(),
            raw_answer: Some("beethoven".to_string()),
            answers: None,
        },
    )
    .await
    {
        Some(ServerMessage::SubmissionConfirmed { .. }) => {}
        other => panic!("Expected SubmissionConfirmed, got {other:?}"),
    }
    let beta_answer = match team(
        &state,
        ClientMessage::SubmitAnswer {
            question_id: q1.id.clone(),
            team_id: beta.id.clone(),
            raw_answer: Some("van beethoven".to_string()),
            answers: None,
        },
    )
    .await
    {
        Some(ServerMessage::SubmissionConfirmed { answer_id }) => answer_id,
        other => panic!("Expected SubmissionConfirmed, got {other:?}"),
    };

    expect_transition(
        host(
            &state,
            ClientMessage::HostCloseSubmissions {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::Grading,
    );

    match host(
        &state,
        ClientMessage::HostAutoGrade {
            question_id: q1.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::AutoGraded { graded, .. }) => assert_eq!(graded, 2),
        other => panic!("Expected AutoGraded, got {other:?}"),
    }

    // Beta's partial match sits in the review queue; host awards half marks
    match host(
        &state,
        ClientMessage::HostGetNeedsReview {
            question_id: q1.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::HostAnswers { list, .. }) => {
            assert_eq!(list.len(), 1);
            assert_eq!(list[0].team_name, "Agatha Quiztie");
        }
        other => panic!("Expected HostAnswers, got {other:?}"),
    }
    match host(
        &state,
        ClientMessage::HostSetFinalScore {
            answer_id: beta_answer.clone(),
            score: 5,
        },
    )
    .await
    {
        Some(ServerMessage::Ack { .. }) => {}
        other => panic!("Expected Ack, got {other:?}"),
    }

    expect_transition(
        host(
            &state,
            ClientMessage::HostFinalizeAndAdvance {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::InRound,
    );

    // 4. Play question 2 (multiple choice)
    team(
        &state,
        ClientMessage::SubmitAnswer {
            question_id: q2.id.clone(),
            team_id: alpha.id.clone(),
            raw_answer: Some("The Beatles".to_string()),
            answers: None,
        },
    )
    .await;
    team(
        &state,
        ClientMessage::SubmitAnswer {
            question_id: q2.id.clone(),
            team_id: beta.id.clone(),
            raw_answer: Some("The Kinks".to_string()),
            answers: None,
        },
    )
    .await;

    expect_transition(
        host(
            &state,
            ClientMessage::HostCloseSubmissions {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::Grading,
    );
    host(
        &state,
        ClientMessage::HostAutoGrade {
            question_id: q2.id.clone(),
        },
    )
    .await;

    // Last question of round 1: finalize lands between rounds
    expect_transition(
        host(
            &state,
            ClientMessage::HostFinalizeAndAdvance {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::BetweenRounds,
    );

    // Standings after round 1: alpha 15 (10 + 5), beta 5 (override only)
    match team(
        &state,
        ClientMessage::GetStandings {
            game_id: game.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::Standings { entries }) => {
            assert_eq!(entries.len(), 2);
            assert_eq!(entries[0].team_name, "Quizzly Bears");
            assert_eq!(entries[0].total_score, 15);
            assert_eq!(entries[0].rank, 1);
            assert_eq!(entries[1].total_score, 5);
        }
        other => panic!("Expected Standings, got {other:?}"),
    }

    match team(
        &state,
        ClientMessage::GetRoundSummary {
            game_id: game.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::RoundSummary { summary }) => {
            assert_eq!(summary.round_number, 1);
            assert_eq!(summary.top_team_id, Some(alpha.id.clone()));
        }
        other => panic!("Expected RoundSummary, got {other:?}"),
    }

    // 5. Round 2 to the finish
    expect_transition(
        host(
            &state,
            ClientMessage::HostStartNextRound {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::InRound,
    );

    team(
        &state,
        ClientMessage::SubmitAnswer {
            question_id: q3.id.clone(),
            team_id: beta.id.clone(),
            raw_answer: Some("Canberra!".to_string()),
            answers: None,
        },
    )
    .await;

    expect_transition(
        host(
            &state,
            ClientMessage::HostCloseSubmissions {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::Grading,
    );
    host(
        &state,
        ClientMessage::HostAutoGrade {
            question_id: q3.id.clone(),
        },
    )
    .await;

    // Last question of the last round: the game is over
    expect_transition(
        host(
            &state,
            ClientMessage::HostFinalizeAndAdvance {
                game_id: game.id.clone(),
            },
        )
        .await,
        GameState::Finished,
    );

    // Final standings: alpha 15, beta 15, ties broken by name
    match team(
        &state,
        ClientMessage::GetStandings {
            game_id: game.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::Standings { entries }) => {
            assert_eq!(entries[0].team_name, "Agatha Quiztie");
            assert_eq!(entries[0].total_score, 15);
            assert_eq!(entries[1].team_name, "Quizzly Bears");
            assert_eq!(entries[1].total_score, 15);
            assert_eq!(entries[1].rank, 2);
        }
        other => panic!("Expected Standings, got {other:?}"),
    }
}

#[tokio::test]
async fn test_join_gates_and_late_registration() {
    let state = Arc::new(AppState::new());
    let game = state.create_game(None, None).await;
    let round = state
        .create_round(&game.id, "Only Round".into(), RoundType::Standard)
        .await
        .unwrap();
    state
        .create_question(
            &round.id,
            "2 + 2?".into(),
            5,
            QuestionKind::Numeric {
                correct_answer: "4".into(),
            },
        )
        .await
        .unwrap();

    // Locked lobby turns teams away with a distinct code
    state.toggle_lobby_lock(&game.id).await.unwrap();
    match team(
        &state,
        ClientMessage::RegisterTeam {
            game_id: game.id.clone(),
            team_name: "Latecomers".to_string(),
        },
    )
    .await
    {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "LOBBY_LOCKED"),
        other => panic!("Expected Error, got {other:?}"),
    }
    state.toggle_lobby_lock(&game.id).await.unwrap();

    state.start_round(&game.id, &round.id).await;

    // Once play starts, registration is closed for good
    match team(
        &state,
        ClientMessage::RegisterTeam {
            game_id: game.id.clone(),
            team_name: "Latecomers".to_string(),
        },
    )
    .await
    {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "GAME_STARTED"),
        other => panic!("Expected Error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_blocked_transitions_are_results_not_errors() {
    let state = Arc::new(AppState::new());
    let game = state.create_game(None, None).await;

    // No rounds authored yet: advancing is blocked, not an error
    match host(
        &state,
        ClientMessage::HostAdvanceRound {
            game_id: game.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::Transition { result, .. }) => {
            assert!(!result.success);
            assert_eq!(result.reason, Some(TransitionReason::NoRounds));
        }
        other => panic!("Expected Transition, got {other:?}"),
    }

    // Finalizing from the lobby is blocked on state
    match host(
        &state,
        ClientMessage::HostFinalizeAndAdvance {
            game_id: game.id.clone(),
        },
    )
    .await
    {
        Some(ServerMessage::Transition { result, .. }) => {
            assert!(!result.success);
            assert_eq!(result.reason, Some(TransitionReason::WrongState));
        }
        other => panic!("Expected Transition, got {other:?}"),
    }
}

#[tokio::test]
async fn test_spectators_cannot_drive_the_game() {
    let state = Arc::new(AppState::new());
    let game = state.create_game(None, None).await;

    let response = handle_message(
        ClientMessage::HostEndGame {
            game_id: game.id.clone(),
        },
        &Role::Spectator,
        &state,
    )
    .await;
    match response {
        Some(ServerMessage::Error { code, .. }) => assert_eq!(code, "UNAUTHORIZED"),
        other => panic!("Expected Error, got {other:?}"),
    }
    assert_eq!(
        state.get_game(&game.id).await.unwrap().state,
        GameState::Lobby
    );
}
