use chrono::{Duration, TimeZone, Utc};
use td_domain::error::Error;
use td_domain::record::{FunctionResult, ToolArgs, TurnRecord};
use td_history::{HistoryStore, JsonlHistoryStore};

fn t(secs: i64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 10, 19, 7, 0, 0).unwrap() + Duration::seconds(secs)
}

#[tokio::test]
async fn missing_file_loads_as_empty_history() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlHistoryStore::new(dir.path().join("history.jsonl"));
    assert!(store.load().await.unwrap().is_empty());
}

#[tokio::test]
async fn append_creates_parent_dirs_and_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("data").join("history.jsonl");
    let store = JsonlHistoryStore::new(&path);

    let mut args = ToolArgs::new();
    args.insert("subject".into(), "Good morning".into());
    args.insert("body".into(), "Line one\nLine two".into());

    let written = vec![
        TurnRecord::user("SEND_MORNING", t(0)),
        TurnRecord::function_call("send_email", args, t(1)),
        TurnRecord::function_response(
            "send_email",
            FunctionResult::new("Email sent successfully."),
            t(2),
        ),
        TurnRecord::model("Done for today.", t(3)),
    ];
    for rec in &written {
        store.append(rec).await.unwrap();
    }

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 4);
    assert!(raw.lines().all(|l| l.contains(r#""kind":"#)));

    // A second handle on the same file sees the same history.
    let reopened = JsonlHistoryStore::new(&path);
    assert_eq!(reopened.load().await.unwrap(), written);
    assert_eq!(reopened.identity(), store.identity());
}

#[tokio::test]
async fn load_orders_by_time() {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonlHistoryStore::new(dir.path().join("h.jsonl"));
    store.append(&TurnRecord::model("later", t(10))).await.unwrap();
    store.append(&TurnRecord::user("earlier", t(5))).await.unwrap();

    let loaded = store.load().await.unwrap();
    assert_eq!(loaded[0].kind(), "user");
    assert_eq!(loaded[1].kind(), "model");
}

#[tokio::test]
async fn corrupt_line_halts_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("h.jsonl");
    std::fs::write(
        &path,
        concat!(
            r#"{"time":"2026-10-19T07:00:00Z","kind":"user","text":"SEND_MORNING"}"#,
            "\n",
            r#"{"time":"2026-10-19T07:00:01Z","model":"untagged"}"#,
            "\n",
        ),
    )
    .unwrap();

    let store = JsonlHistoryStore::new(&path);
    match store.load().await {
        Err(Error::Classification { line, .. }) => assert_eq!(line, 2),
        other => panic!("expected classification fault, got {other:?}"),
    }
}
