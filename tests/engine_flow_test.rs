//! End-to-end tests of the engine: joining, rounds, termination and events.

use std::sync::Arc;

use hard_to_get::{
    Corpus, Dilemma, EngineError, GameEngine, GameEvent, GameRules, MemoryNotifier,
    MemoryRecorder, MoveError, Outcome, RandomSource, Role, SessionStatus, TurnView,
};

struct Table {
    engine: GameEngine,
    notifier: Arc<MemoryNotifier>,
    recorder: Arc<MemoryRecorder>,
    session_id: String,
    witness: String,
    detective: String,
}

impl Table {
    /// Registers two clients and seats them as Witness and Detective.
    fn seat(seed: u64) -> Self {
        let notifier = Arc::new(MemoryNotifier::new());
        let recorder = Arc::new(MemoryRecorder::new());
        let engine = GameEngine::new(
            Corpus::builtin(),
            GameRules::default(),
            RandomSource::seeded(seed),
            notifier.clone(),
            recorder.clone(),
        )
        .expect("Engine failed");

        let witness = engine.register("model-w".to_string()).id().clone();
        let detective = engine.register("model-d".to_string()).id().clone();

        let first = engine.join(&witness, Some(Role::Witness)).unwrap();
        assert!(!first.session_ready);
        let second = engine.join(&detective, Some(Role::Detective)).unwrap();
        assert!(second.session_ready);
        assert_eq!(first.session_id, second.session_id);

        Self {
            engine,
            notifier,
            recorder,
            session_id: first.session_id,
            witness,
            detective,
        }
    }

    fn witness_turn(&self) -> (u8, String, Dilemma) {
        match self.engine.turn(&self.session_id, &self.witness).unwrap() {
            TurnView::Witness {
                round,
                key_word,
                dilemma,
            } => (round, key_word, dilemma),
            other => panic!("expected the Witness to move, got {:?}", other),
        }
    }

    fn answer(&self) -> (String, Dilemma) {
        let (_, key_word, dilemma) = self.witness_turn();
        self.engine
            .submit_witness_choice(&self.session_id, &self.witness, dilemma.right())
            .unwrap();
        (key_word, dilemma)
    }

    fn board(&self) -> Vec<String> {
        self.engine.session(&self.session_id).unwrap().board
    }

    fn decoys(&self, key_word: &str, count: usize) -> Vec<String> {
        self.board()
            .into_iter()
            .filter(|w| w != key_word)
            .take(count)
            .collect()
    }
}

#[test]
fn test_first_round_flow() {
    let table = Table::seat(1);

    let view = table.engine.session(&table.session_id).unwrap();
    assert_eq!(view.status, SessionStatus::Active);
    assert_eq!(view.current_round, 1);
    assert_eq!(view.board.len(), 16);

    let (round, key_word, dilemma) = table.witness_turn();
    assert_eq!(round, 1);
    assert!(view.board.contains(&key_word));

    // session_started to both, witness_turn to the Witness only
    let to_witness = table.notifier.events_for(&table.witness);
    let to_detective = table.notifier.events_for(&table.detective);
    assert_eq!(
        to_witness[0],
        GameEvent::SessionStarted {
            session_id: table.session_id.clone()
        }
    );
    assert_eq!(
        to_witness[1],
        GameEvent::WitnessTurn {
            session_id: table.session_id.clone(),
            key_word: key_word.clone(),
            dilemma: dilemma.clone(),
            round: 1,
        }
    );
    assert_eq!(to_detective.len(), 1);

    let receipt = table
        .engine
        .submit_witness_choice(&table.session_id, &table.witness, dilemma.left())
        .unwrap();
    assert_eq!(receipt.status, "success");
    assert_eq!(receipt.round, 1);

    // The Detective sees the same dilemma the Witness answered.
    assert_eq!(
        table.notifier.events_for(&table.detective).last().unwrap(),
        &GameEvent::DetectiveTurn {
            session_id: table.session_id.clone(),
            round: 1,
            dilemma: dilemma.clone(),
            witness_choice: dilemma.left().to_string(),
        }
    );
    assert_eq!(
        table.engine.turn(&table.session_id, &table.detective).unwrap(),
        TurnView::Detective {
            round: 1,
            dilemma: dilemma.clone(),
            witness_choice: dilemma.left().to_string(),
        }
    );

    let decoy = table.decoys(&key_word, 1);
    let report = table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &decoy)
        .unwrap();
    assert!(!report.game_over);
    assert_eq!(report.win, None);
    assert!(!report.key_word_eliminated);
    assert_eq!(report.remaining_words.len(), 15);
    assert!(!report.remaining_words.contains(&decoy[0]));

    let (round, same_key, _) = table.witness_turn();
    assert_eq!(round, 2);
    assert_eq!(same_key, key_word);
    assert_eq!(table.board().len(), 15);
    assert!(matches!(
        table.notifier.events_for(&table.witness).last().unwrap(),
        GameEvent::WitnessTurn { round: 2, .. }
    ));
}

#[test]
fn test_isolating_key_word_wins() {
    let table = Table::seat(2);
    let (key_word, _) = table.answer();
    let decoys = table.decoys(&key_word, 15);

    let report = table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &decoys)
        .unwrap();
    assert!(report.game_over);
    assert_eq!(report.win, Some(true));
    assert_eq!(report.remaining_words, vec![key_word.clone()]);

    let ended = GameEvent::SessionEnded {
        session_id: table.session_id.clone(),
        win: true,
        key_word: key_word.clone(),
        final_board: vec![key_word.clone()],
    };
    assert_eq!(table.notifier.events_for(&table.witness).last(), Some(&ended));
    assert_eq!(table.notifier.events_for(&table.detective).last(), Some(&ended));

    let results = table.recorder.results();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].outcome, Outcome::Win);
    assert_eq!(results[0].rounds_played, 1);
    assert_eq!(results[0].witness_model, "model-w");
    assert_eq!(results[0].detective_model, "model-d");

    let view = table.engine.session(&table.session_id).unwrap();
    assert_eq!(view.status, SessionStatus::Completed);
    assert_eq!(view.key_word, Some(key_word.clone()));
    assert_eq!(
        table.engine.turn(&table.session_id, &table.witness).unwrap(),
        TurnView::Finished {
            win: true,
            key_word,
            final_board: view.board,
        }
    );
}

#[test]
fn test_eliminating_key_word_loses_immediately() {
    let table = Table::seat(3);
    let (key_word, _) = table.answer();
    let mut words = table.decoys(&key_word, 2);
    words.push(key_word.clone());

    let report = table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &words)
        .unwrap();
    assert!(report.game_over);
    assert_eq!(report.win, Some(false));
    assert!(report.key_word_eliminated);
    assert_eq!(report.remaining_words.len(), 13);
    assert_eq!(table.recorder.results()[0].outcome, Outcome::Loss);
}

#[test]
fn test_round_cap_ends_the_game() {
    let table = Table::seat(4);
    let mut report = None;
    for expected_round in 1..=5 {
        let (round, _, _) = table.witness_turn();
        assert_eq!(round, expected_round);
        let (key_word, _) = table.answer();
        let decoy = table.decoys(&key_word, 1);
        report = Some(
            table
                .engine
                .submit_detective_elimination(&table.session_id, &table.detective, &decoy)
                .unwrap(),
        );
    }

    let report = report.unwrap();
    assert!(report.game_over);
    assert_eq!(report.win, Some(false));
    assert_eq!(report.remaining_words.len(), 11);

    let view = table.engine.session(&table.session_id).unwrap();
    assert_eq!(view.current_round, 5);
    assert_eq!(view.status, SessionStatus::Completed);
    assert_eq!(table.recorder.results()[0].rounds_played, 5);
}

#[test]
fn test_empty_elimination_changes_nothing() {
    let table = Table::seat(5);
    table.answer();
    let before = table.engine.session(&table.session_id).unwrap();

    let err = table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &[])
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidMove(MoveError::EmptyElimination));
    assert_eq!(table.engine.session(&table.session_id).unwrap(), before);
    assert!(matches!(
        table.engine.turn(&table.session_id, &table.detective).unwrap(),
        TurnView::Detective { .. }
    ));
}

#[test]
fn test_whole_board_plus_extras_matches_whole_board() {
    let with_extras = Table::seat(6);
    let (key_word, _) = with_extras.answer();
    let mut words = with_extras.board();
    words.push("Zeppelin-not-on-board".to_string());
    words.push("Another-stray-word".to_string());
    let padded = with_extras
        .engine
        .submit_detective_elimination(&with_extras.session_id, &with_extras.detective, &words)
        .unwrap();

    let plain = Table::seat(6);
    plain.answer();
    let words = plain.board();
    let exact = plain
        .engine
        .submit_detective_elimination(&plain.session_id, &plain.detective, &words)
        .unwrap();

    assert_eq!(padded, exact);
    assert!(padded.game_over);
    assert_eq!(padded.win, Some(false));
    assert!(padded.key_word_eliminated);
    assert!(padded.remaining_words.is_empty());
    let view = with_extras.engine.session(&with_extras.session_id).unwrap();
    assert_eq!(view.key_word.as_deref(), Some(key_word.as_str()));
}

#[test]
fn test_extraneous_words_are_ignored() {
    let table = Table::seat(7);
    let (key_word, _) = table.answer();
    let mut words = table.decoys(&key_word, 1);
    words.push("not-a-board-word".to_string());

    let report = table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &words)
        .unwrap();
    assert_eq!(report.remaining_words.len(), 15);
}

#[test]
fn test_elimination_without_board_words_rejected() {
    let table = Table::seat(8);
    table.answer();
    let err = table
        .engine
        .submit_detective_elimination(
            &table.session_id,
            &table.detective,
            &["not-a-board-word".to_string()],
        )
        .unwrap_err();
    assert_eq!(err, EngineError::InvalidMove(MoveError::NoBoardWords));
}

#[test]
fn test_choice_must_be_offered() {
    let table = Table::seat(9);
    let err = table
        .engine
        .submit_witness_choice(&table.session_id, &table.witness, "Neither")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidMove(MoveError::ChoiceNotOffered { .. })));
    let (round, _, _) = table.witness_turn();
    assert_eq!(round, 1);
}

#[test]
fn test_out_of_turn_submissions_rejected() {
    let table = Table::seat(10);
    let (_, _, dilemma) = table.witness_turn();

    // Detective before the Witness has answered
    let board = table.board();
    let err = table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &board[..1])
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSessionState { .. }));

    // Witness answering twice
    table
        .engine
        .submit_witness_choice(&table.session_id, &table.witness, dilemma.left())
        .unwrap();
    let err = table
        .engine
        .submit_witness_choice(&table.session_id, &table.witness, dilemma.left())
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSessionState { .. }));
}

#[test]
fn test_completed_session_accepts_nothing() {
    let table = Table::seat(11);
    let (key_word, _) = table.answer();
    table
        .engine
        .submit_detective_elimination(&table.session_id, &table.detective, &[key_word])
        .unwrap();

    let err = table
        .engine
        .submit_witness_choice(&table.session_id, &table.witness, "anything")
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSessionState { .. }));
    assert_eq!(table.recorder.results().len(), 1);
}

#[test]
fn test_client_cannot_join_twice() {
    let table = Table::seat(12);
    let err = table.engine.join(&table.witness, None).unwrap_err();
    assert!(matches!(err, EngineError::InvalidClient { .. }));
}

#[test]
fn test_small_rules_are_honored() {
    let engine = GameEngine::new(
        Corpus::builtin(),
        GameRules {
            board_size: 4,
            max_rounds: 1,
        },
        RandomSource::seeded(13),
        Arc::new(MemoryNotifier::new()),
        Arc::new(MemoryRecorder::new()),
    )
    .unwrap();
    let w = engine.register("w".to_string());
    let d = engine.register("d".to_string());
    let joined = engine.join(w.id(), None).unwrap();
    let other = engine.join(d.id(), None).unwrap();
    assert_eq!(joined.board.len(), 4);
    assert_eq!(other.role, joined.role.opposite());

    let (witness, detective) = match joined.role {
        Role::Witness => (w.id(), d.id()),
        Role::Detective => (d.id(), w.id()),
    };
    let TurnView::Witness { key_word, dilemma, .. } =
        engine.turn(&joined.session_id, witness).unwrap()
    else {
        panic!("expected the Witness to move");
    };
    engine
        .submit_witness_choice(&joined.session_id, witness, dilemma.left())
        .unwrap();
    let decoy: Vec<String> = joined
        .board
        .iter()
        .filter(|w| **w != key_word)
        .take(1)
        .cloned()
        .collect();
    let report = engine
        .submit_detective_elimination(&joined.session_id, detective, &decoy)
        .unwrap();
    assert!(report.game_over);
    assert_eq!(report.win, Some(false));
}
