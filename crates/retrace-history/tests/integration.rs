// Integration tests for the history engine.
//
// These tests exercise full workflows spanning the Session, the history
// log, and the portable record serializer together, simulating realistic
// editing patterns.

use retrace_history::{
    GroupingPolicy, HistoryConfig, HistoryError, Replacement, Selection, Session, SessionRecord,
};

fn test_config() -> HistoryConfig {
    HistoryConfig {
        policy: GroupingPolicy::AlwaysNewEvent, // deterministic event boundaries
        max_depth: 1_000,
    }
}

fn new_session() -> Session {
    Session::with_config(test_config())
}

fn type_text(session: &mut Session, at: usize, text: &str) {
    let end = at + text.chars().count();
    session
        .edit(&[Replacement::new(at, at, text)], Selection::single(end, end))
        .unwrap();
}

// ── Full Workflow ──────────────────────────────────────────────────────

#[test]
fn test_full_workflow_edit_undo_all_redo_all() {
    let mut session = new_session();
    let words = ["alpha", " beta", " gamma", " delta"];
    let mut snapshots = vec![session.text()];
    for (i, word) in words.iter().enumerate() {
        let at = snapshots[i].chars().count();
        type_text(&mut session, at, word);
        snapshots.push(session.text());
    }
    assert_eq!(session.text(), "alpha beta gamma delta");

    // Walk all the way back, checking each intermediate document.
    for expected in snapshots.iter().rev().skip(1) {
        assert!(session.undo().unwrap());
        assert_eq!(&session.text(), expected);
    }
    assert!(!session.can_undo());
    assert!(!session.undo().unwrap());

    // And all the way forward again.
    for expected in snapshots.iter().skip(1) {
        assert!(session.redo().unwrap());
        assert_eq!(&session.text(), expected);
    }
    assert!(!session.can_redo());
    assert_eq!(session.selection().main().head, session.text().chars().count());
}

#[test]
fn test_coalesced_typing_undoes_as_one_event() {
    let mut session = Session::with_config(HistoryConfig {
        policy: GroupingPolicy::MergeAdjacent,
        max_depth: 1_000,
    });
    for (i, ch) in ["h", "e", "l", "l", "o"].iter().enumerate() {
        type_text(&mut session, i, ch);
    }
    assert_eq!(session.text(), "hello");

    assert!(session.undo().unwrap());
    assert_eq!(session.text(), "");
    assert!(!session.can_undo());

    assert!(session.redo().unwrap());
    assert_eq!(session.text(), "hello");
    assert_eq!(session.selection().main().head, 5);
}

#[test]
fn test_force_event_break_splits_coalesced_run() {
    let mut session = Session::with_config(HistoryConfig {
        policy: GroupingPolicy::MergeAdjacent,
        max_depth: 1_000,
    });
    type_text(&mut session, 0, "one");
    session.force_event_break();
    type_text(&mut session, 3, "two");

    session.undo().unwrap();
    assert_eq!(session.text(), "one");
    session.undo().unwrap();
    assert_eq!(session.text(), "");
}

#[test]
fn test_new_edit_after_undo_drops_redo_branch() {
    let mut session = new_session();
    type_text(&mut session, 0, "first");
    session.undo().unwrap();
    assert!(session.can_redo());

    type_text(&mut session, 0, "second");
    assert!(!session.can_redo());
    assert!(!session.redo().unwrap());
    assert_eq!(session.text(), "second");
}

#[test]
fn test_selection_moves_survive_undo_chain() {
    let mut session = new_session();
    type_text(&mut session, 0, "hello world");
    session.set_selection(Selection::single(6, 11)).unwrap();
    session
        .edit(&[Replacement::new(6, 11, "there")], Selection::single(11, 11))
        .unwrap();
    assert_eq!(session.text(), "hello there");

    session.undo().unwrap();
    assert_eq!(session.text(), "hello world");
    // The edit started from the recorded word selection.
    assert_eq!(session.selection().main().anchor, 6);
    assert_eq!(session.selection().main().head, 11);
}

// ── Portable Records ───────────────────────────────────────────────────

#[test]
fn test_record_round_trip_preserves_undo_behavior() {
    let mut session = new_session();
    type_text(&mut session, 0, "draft one");
    session
        .edit(&[Replacement::new(6, 9, "two")], Selection::single(9, 9))
        .unwrap();
    session.set_selection(Selection::single(0, 5)).unwrap();

    let record = session.serialize();
    let json = record.to_json().unwrap();
    let parsed = SessionRecord::from_json(&json).unwrap();

    let mut restored = new_session();
    restored.replace_session(&parsed).unwrap();
    assert_eq!(restored.text(), session.text());
    assert_eq!(restored.selection(), session.selection());

    // Both sessions must now agree step for step.
    loop {
        let a = session.undo().unwrap();
        let b = restored.undo().unwrap();
        assert_eq!(a, b);
        assert_eq!(session.text(), restored.text());
        assert_eq!(session.selection(), restored.selection());
        if !a {
            break;
        }
    }
}

#[test]
fn test_record_round_trip_preserves_redo_stack() {
    let mut session = new_session();
    type_text(&mut session, 0, "abc");
    type_text(&mut session, 3, "def");
    session.undo().unwrap();

    let record = session.serialize();
    let mut restored = new_session();
    restored.replace_session(&record).unwrap();

    assert!(restored.can_redo());
    assert!(restored.redo().unwrap());
    assert_eq!(restored.text(), "abcdef");
}

#[test]
fn test_foreign_record_restores_session_with_history() {
    // A record produced elsewhere: "" became "initial content", which then
    // became "new content". Both steps live on the done stack.
    let json = r#"{
        "doc": "new content",
        "selection": {"ranges": [{"anchor": 0, "head": 3}], "main": 0},
        "history": {
            "done": [
                {"selectionsAfter": [
                    {"ranges": [{"anchor": 0, "head": 0}], "main": 0},
                    {"ranges": [{"anchor": 15, "head": 15}], "main": 0}
                ]},
                {
                    "changes": [[1, "initial content"], [10]],
                    "startSelection": {"ranges": [{"anchor": 0, "head": 15}], "main": 0},
                    "selectionsAfter": [
                        {"ranges": [{"anchor": 11, "head": 11}], "main": 0},
                        {"ranges": [{"anchor": 0, "head": 1}], "main": 0}
                    ]
                }
            ],
            "undone": []
        }
    }"#;
    let record = SessionRecord::from_json(json).unwrap();

    let mut session = new_session();
    session.replace_session(&record).unwrap();
    assert_eq!(session.text(), "new content");
    assert_eq!(session.selection().main().head, 3);

    assert!(session.undo().unwrap());
    assert_eq!(session.text(), "initial content");
    assert_eq!(session.selection().main().head, 15);

    assert!(session.redo().unwrap());
    assert_eq!(session.text(), "new content");
}

#[test]
fn test_invalid_record_rejected_and_session_kept() {
    let mut session = new_session();
    type_text(&mut session, 0, "precious state");

    // main points past the range list.
    let bad = SessionRecord::from_json(
        r#"{"doc":"x","selection":{"ranges":[{"anchor":0,"head":0}],"main":5},"history":{"done":[],"undone":[]}}"#,
    )
    .unwrap();
    assert!(matches!(
        session.replace_session(&bad),
        Err(HistoryError::InvalidRecord(_))
    ));

    // A change span overrunning the document it replays against.
    let bad = SessionRecord::from_json(
        r#"{"doc":"ab","selection":{"ranges":[{"anchor":0,"head":0}],"main":0},"history":{"done":[{"changes":[[99]],"selectionsAfter":[{"ranges":[{"anchor":0,"head":0}],"main":0}]}],"undone":[]}}"#,
    )
    .unwrap();
    assert!(matches!(
        session.replace_session(&bad),
        Err(HistoryError::InvalidRecord(_))
    ));

    assert_eq!(session.text(), "precious state");
    assert!(session.can_undo());
    session.undo().unwrap();
    assert_eq!(session.text(), "");
}

#[test]
fn test_limit_sized_change_lengths_rejected_and_session_kept() {
    let mut session = new_session();
    type_text(&mut session, 0, "precious state");

    // usize::MAX delete and retain lengths: position arithmetic must reject
    // these instead of wrapping past the bounds checks.
    let hostile = [
        r#"{"doc":"ab","selection":{"ranges":[{"anchor":0,"head":0}],"main":0},"history":{"done":[{"changes":[1,[18446744073709551615]],"selectionsAfter":[{"ranges":[{"anchor":0,"head":0}],"main":0}]}],"undone":[]}}"#,
        r#"{"doc":"ab","selection":{"ranges":[{"anchor":0,"head":0}],"main":0},"history":{"done":[{"changes":[1,18446744073709551615,[1]],"selectionsAfter":[{"ranges":[{"anchor":0,"head":0}],"main":0}]}],"undone":[]}}"#,
    ];
    for json in hostile {
        let record = SessionRecord::from_json(json).unwrap();
        assert!(matches!(
            session.replace_session(&record),
            Err(HistoryError::InvalidRecord(_))
        ));
    }

    assert_eq!(session.text(), "precious state");
    assert!(session.can_undo());
}

#[test]
fn test_max_depth_bounds_restored_history() {
    let mut session = new_session();
    for i in 0..20 {
        type_text(&mut session, i, "x");
    }
    let record = session.serialize();

    let mut shallow = Session::with_config(HistoryConfig {
        policy: GroupingPolicy::AlwaysNewEvent,
        max_depth: 5,
    });
    shallow.replace_session(&record).unwrap();

    let mut undos = 0;
    while shallow.undo().unwrap() {
        undos += 1;
    }
    assert_eq!(undos, 5);
    assert_eq!(shallow.text(), "xxxxxxxxxxxxxxx");
}

#[test]
fn test_multibyte_text_round_trips() {
    let mut session = new_session();
    type_text(&mut session, 0, "héllo wörld");
    session
        .edit(&[Replacement::new(6, 11, "mönde")], Selection::single(11, 11))
        .unwrap();
    assert_eq!(session.text(), "héllo mönde");

    let record = session.serialize();
    let mut restored = new_session();
    restored.replace_session(&record).unwrap();
    restored.undo().unwrap();
    assert_eq!(restored.text(), "héllo wörld");
    restored.undo().unwrap();
    assert_eq!(restored.text(), "");
}
