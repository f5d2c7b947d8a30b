mod support;

use std::time::Duration;

use chess::{PieceColor, PieceKind};
use cozy_chess::Square;
use session::{
    spawn_session, EndReason, GameMode, GameOutcome, SessionError, SessionEvent, SessionPhase,
};
use support::{config, fake_broker, wait_for, wait_for_moves, within, Behaviour};

fn human_white() -> GameMode {
    GameMode::HumanVsComputer {
        human_side: PieceColor::White,
    }
}

mod human_vs_human {
    use super::*;

    #[tokio::test]
    async fn moves_alternate_and_are_broadcast() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        let (initial, mut events) = session.subscribe().await.unwrap();
        assert_eq!(initial.phase, SessionPhase::Idle);

        session.new_game(None).await.unwrap();
        let snap = session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();
        assert_eq!(snap.side_to_move, PieceColor::Black);
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);

        wait_for_moves(&mut events, 1).await;
        let snap = session
            .submit_move(Square::E7, Square::E5, None)
            .await
            .unwrap();
        assert_eq!(snap.move_count, 2);
        assert_eq!(snap.opening.as_deref(), Some("C20 · King's Pawn Game"));
    }

    #[tokio::test]
    async fn illegal_move_is_rejected_without_changing_phase() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        session.new_game(None).await.unwrap();

        let err = session
            .submit_move(Square::E2, Square::E5, None)
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::IllegalMove(_)));

        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
        assert_eq!(snap.move_count, 0);
    }

    #[tokio::test]
    async fn promotion_needs_a_piece() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        session
            .load_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1")
            .await
            .unwrap();

        assert_eq!(
            session.submit_move(Square::A7, Square::A8, None).await,
            Err(SessionError::PromotionRequired)
        );
        let snap = session
            .submit_move(Square::A7, Square::A8, Some(PieceKind::Queen))
            .await
            .unwrap();
        assert_eq!(snap.history[0].uci, "a7a8q");
    }

    #[tokio::test]
    async fn fools_mate_ends_the_game() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        session.new_game(None).await.unwrap();
        for (from, to) in [
            (Square::F2, Square::F3),
            (Square::E7, Square::E5),
            (Square::G2, Square::G4),
        ] {
            session.submit_move(from, to, None).await.unwrap();
        }
        let snap = session
            .submit_move(Square::D8, Square::H4, None)
            .await
            .unwrap();

        let SessionPhase::GameOver { outcome } = snap.phase else {
            panic!("expected game over, got {:?}", snap.phase);
        };
        assert_eq!(outcome.reason, EndReason::Checkmate);
        assert_eq!(outcome.winner, Some(PieceColor::Black));
        assert!(snap.in_check);
        assert!(session.legal_moves(None).await.unwrap().is_empty());
        assert!(session.export_pgn().await.unwrap().contains("0-1"));
    }

    #[tokio::test]
    async fn invalid_position_and_record_leave_state_alone() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        session.new_game(None).await.unwrap();
        session
            .submit_move(Square::D2, Square::D4, None)
            .await
            .unwrap();

        assert!(matches!(
            session.load_fen("rnbqkbnr/pppppppp w").await,
            Err(SessionError::InvalidPosition(_))
        ));
        assert!(matches!(
            session.load_pgn("1. e4 e5 2. Ke3").await,
            Err(SessionError::InvalidRecord(_))
        ));

        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.move_count, 1);
        assert_eq!(snap.history[0].uci, "d2d4");
    }

    #[tokio::test]
    async fn exported_game_loads_back() {
        let first = spawn_session(config(GameMode::HumanVsHuman), None);
        first.new_game(None).await.unwrap();
        for (from, to) in [
            (Square::E2, Square::E4),
            (Square::C7, Square::C5),
            (Square::G1, Square::F3),
        ] {
            first.submit_move(from, to, None).await.unwrap();
        }
        let pgn = first.export_pgn().await.unwrap();
        let fen = first.snapshot().await.unwrap().fen;

        let second = spawn_session(config(GameMode::HumanVsHuman), None);
        let snap = second.load_pgn(pgn).await.unwrap();
        assert_eq!(snap.fen, fen);
        assert_eq!(snap.move_count, 3);
        assert_eq!(snap.opening.as_deref(), Some("B20 · Sicilian Defense"));
    }

    #[tokio::test]
    async fn flag_falls_for_the_side_to_move() {
        let mut cfg = config(GameMode::HumanVsHuman);
        cfg.setup.move_timer = Some(Duration::from_secs(1));
        let session = spawn_session(cfg, None);
        let snap = session.new_game(None).await.unwrap();
        assert_eq!(snap.timer.map(|t| t.active_side), Some(Some(PieceColor::White)));

        tokio::time::sleep(Duration::from_millis(1250)).await;
        let snap = session.snapshot().await.unwrap();
        assert_eq!(
            snap.phase,
            SessionPhase::GameOver {
                outcome: GameOutcome::flag_fall(PieceColor::White)
            }
        );
        assert_eq!(
            session.submit_move(Square::E2, Square::E4, None).await,
            Err(SessionError::GameOver)
        );
    }

    #[tokio::test]
    async fn moves_before_a_game_are_refused() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        assert_eq!(
            session.submit_move(Square::E2, Square::E4, None).await,
            Err(SessionError::NoGame)
        );
        assert_eq!(session.undo().await, Err(SessionError::NoGame));
    }

    #[tokio::test]
    async fn shutdown_closes_the_session() {
        let session = spawn_session(config(GameMode::HumanVsHuman), None);
        session.shutdown().await;
        assert!(matches!(
            session.snapshot().await,
            Err(SessionError::Internal(_))
        ));
    }
}

mod against_builtin_opponent {
    use super::*;

    #[tokio::test]
    async fn opponent_replies_without_an_engine() {
        let session = spawn_session(config(human_white()), None);
        session.new_game(None).await.unwrap();
        session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();

        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.move_count, 2);
        assert_eq!(snap.history[1].color, PieceColor::Black);
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
        assert!(!snap.engine_available);
    }

    #[tokio::test]
    async fn opponent_opens_when_human_plays_black() {
        let mode = GameMode::HumanVsComputer {
            human_side: PieceColor::Black,
        };
        let session = spawn_session(config(mode), None);
        session.new_game(None).await.unwrap();

        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.move_count, 1);
        assert_eq!(snap.side_to_move, PieceColor::Black);
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
    }

    #[tokio::test]
    async fn undo_takes_back_the_reply_too() {
        let session = spawn_session(config(human_white()), None);
        session.new_game(None).await.unwrap();
        session
            .submit_move(Square::G1, Square::F3, None)
            .await
            .unwrap();
        assert_eq!(session.snapshot().await.unwrap().move_count, 2);

        let snap = session.undo().await.unwrap();
        assert_eq!(snap.move_count, 0);
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
        assert_eq!(session.undo().await, Err(SessionError::NothingToUndo));
    }

    #[tokio::test]
    async fn loaded_position_hands_over_to_the_opponent() {
        let mode = GameMode::HumanVsComputer {
            human_side: PieceColor::Black,
        };
        let session = spawn_session(config(mode), None);
        let snap = session
            .load_fen("4k3/8/8/8/8/8/4P3/4K3 b - - 0 1")
            .await
            .unwrap();
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
        session
            .submit_move(Square::E8, Square::D8, None)
            .await
            .unwrap();
        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.move_count, 2);
        assert_eq!(snap.history[1].color, PieceColor::White);
    }
}

mod against_engine {
    use super::*;

    fn answer_e5(_: &str) -> &'static str {
        "e7e5"
    }

    fn answer_illegal(_: &str) -> &'static str {
        "e2e4"
    }

    /// Mirrors White's first pawn move, so a reply reveals which position it
    /// was computed for.
    fn mirror_pawn(fen: &str) -> &'static str {
        if fen.starts_with("rnbqkbnr/pppppppp/8/8/4P3/") {
            "e7e5"
        } else {
            "d7d5"
        }
    }

    #[tokio::test]
    async fn engine_reply_is_applied() {
        let broker = fake_broker(Behaviour::Play {
            pick: answer_e5,
            delay: Duration::ZERO,
        })
        .await;
        let session = spawn_session(config(human_white()), Some(broker));
        let (_, mut events) = session.subscribe().await.unwrap();
        let snap = session.new_game(None).await.unwrap();
        assert!(snap.engine_available);

        session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();
        wait_for_moves(&mut events, 2).await;

        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.history[1].uci, "e7e5");
        assert!(!snap.engine_thinking);
        assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
    }

    #[tokio::test]
    async fn timed_out_engine_falls_back_for_that_move_only() {
        let broker = fake_broker(Behaviour::Silent).await;
        let mut cfg = config(human_white());
        cfg.engine.timeout = Duration::from_millis(100);
        let session = spawn_session(cfg, Some(broker));
        let (_, mut events) = session.subscribe().await.unwrap();
        session.new_game(None).await.unwrap();

        for (from, to, plies) in [(Square::E2, Square::E4, 2), (Square::D2, Square::D4, 4)] {
            session.submit_move(from, to, None).await.unwrap();
            wait_for(&mut events, |e| {
                assert!(
                    !matches!(e, SessionEvent::Error(_)),
                    "timeout reported as an error: {:?}",
                    e
                );
                matches!(e, SessionEvent::StateChanged(s) if s.move_count == plies)
            })
            .await;

            let snap = session.snapshot().await.unwrap();
            assert_eq!(snap.history[plies - 1].color, PieceColor::Black);
            assert_eq!(snap.phase, SessionPhase::AwaitingHumanMove);
            assert!(!snap.engine_thinking);
            assert!(snap.engine_available, "engine dropped after a timeout");
        }
    }

    #[tokio::test]
    async fn illegal_engine_move_falls_back() {
        let broker = fake_broker(Behaviour::Play {
            pick: answer_illegal,
            delay: Duration::ZERO,
        })
        .await;
        let session = spawn_session(config(human_white()), Some(broker));
        let (_, mut events) = session.subscribe().await.unwrap();
        session.new_game(None).await.unwrap();

        session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();
        wait_for_moves(&mut events, 2).await;

        let snap = session.snapshot().await.unwrap();
        assert_ne!(snap.history[1].uci, "e2e4");
        assert_eq!(snap.history[1].color, PieceColor::Black);
        assert!(snap.engine_available);
    }

    #[tokio::test]
    async fn crashed_engine_is_dropped_for_the_session() {
        let broker = fake_broker(Behaviour::Crash).await;
        let session = spawn_session(config(human_white()), Some(broker));
        let (_, mut events) = session.subscribe().await.unwrap();
        session.new_game(None).await.unwrap();

        session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();
        wait_for(&mut events, |e| matches!(e, SessionEvent::Error(_))).await;
        wait_for_moves(&mut events, 2).await;

        let snap = session.snapshot().await.unwrap();
        assert!(!snap.engine_available);

        // Later turns go straight to the built-in opponent.
        session
            .submit_move(Square::D2, Square::D4, None)
            .await
            .unwrap();
        assert_eq!(session.snapshot().await.unwrap().move_count, 4);
    }

    #[tokio::test]
    async fn reply_for_an_undone_position_is_discarded() {
        let broker = fake_broker(Behaviour::Play {
            pick: mirror_pawn,
            delay: Duration::from_millis(300),
        })
        .await;
        let session = spawn_session(config(human_white()), Some(broker));
        let (_, mut events) = session.subscribe().await.unwrap();
        session.new_game(None).await.unwrap();

        let snap = session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();
        assert_eq!(snap.phase, SessionPhase::AwaitingOpponentMove);
        let snap = session.undo().await.unwrap();
        assert_eq!(snap.move_count, 0);

        session
            .submit_move(Square::D2, Square::D4, None)
            .await
            .unwrap();
        wait_for_moves(&mut events, 2).await;

        let snap = session.snapshot().await.unwrap();
        assert_eq!(snap.history[0].uci, "d2d4");
        assert_eq!(snap.history[1].uci, "d7d5");
    }

    #[tokio::test]
    async fn analysis_follows_the_position() {
        let broker = fake_broker(Behaviour::Play {
            pick: answer_e5,
            delay: Duration::ZERO,
        })
        .await;
        let session = spawn_session(config(GameMode::HumanVsHuman), Some(broker));
        let (_, mut events) = session.subscribe().await.unwrap();
        session.new_game(None).await.unwrap();

        let snap = session.set_analysis(true).await.unwrap();
        assert!(snap.analysis_on);
        let SessionEvent::Analysis(update) =
            wait_for(&mut events, |e| matches!(e, SessionEvent::Analysis(_))).await
        else {
            unreachable!()
        };
        assert_eq!(update.ply, 0);
        assert_eq!(update.depth, Some(1));
        assert_eq!(update.score_text, "0.30");

        session
            .submit_move(Square::E2, Square::E4, None)
            .await
            .unwrap();
        let SessionEvent::Analysis(update) = wait_for(&mut events, |e| {
            matches!(e, SessionEvent::Analysis(u) if u.ply == 1 && u.depth == Some(2))
        })
        .await
        else {
            unreachable!()
        };
        assert_eq!(update.ply, 1);
        assert_eq!(update.pv, vec!["e2e4".to_string(), "e7e5".to_string()]);

        let snap = within(session.snapshot()).await.unwrap();
        assert_eq!(snap.eval_history.len(), 2);

        let snap = session.set_analysis(false).await.unwrap();
        assert!(!snap.analysis_on);
        assert!(snap.analysis.is_none());
    }
}
