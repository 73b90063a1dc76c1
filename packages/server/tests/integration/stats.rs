use crate::common::{TestApp, routes};

#[tokio::test]
async fn stats_start_at_zero() {
    let app = TestApp::spawn().await;

    let res = app.get_as(routes::STORAGE_STATS, "alice").await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["user_id"], "alice");
    assert_eq!(res.body["total_storage_used"], 0);
    assert_eq!(res.body["original_storage_used"], 0);
    assert_eq!(res.body["storage_savings"], 0);
    assert_eq!(res.body["savings_percentage"], 0.0);
}

#[tokio::test]
async fn stats_report_dedup_savings() {
    let app = TestApp::spawn().await;

    // 10 bytes stored once, held by three records: 30 logical, 10 deduped.
    let payload = [0u8; 10];
    app.upload_ok("alice", "a.bin", &payload).await;
    app.upload_ok("alice", "b.bin", &payload).await;
    app.upload_ok("alice", "c.bin", &payload).await;

    let res = app.get_as(routes::STORAGE_STATS, "alice").await;

    assert_eq!(res.status, 200);
    assert_eq!(res.body["original_storage_used"], 30);
    assert_eq!(res.body["total_storage_used"], 10);
    assert_eq!(res.body["storage_savings"], 20);
    assert_eq!(res.body["savings_percentage"], 66.67);
}

#[tokio::test]
async fn stats_are_per_user() {
    let app = TestApp::spawn().await;

    let payload = [1u8; 8];
    app.upload_ok("alice", "a.bin", &payload).await;
    app.upload_ok("bob", "b.bin", &payload).await;

    // Bob's reference counts as a full original in his own stats.
    let res = app.get_as(routes::STORAGE_STATS, "bob").await;
    assert_eq!(res.body["total_storage_used"], 8);
    assert_eq!(res.body["original_storage_used"], 8);
    assert_eq!(res.body["storage_savings"], 0);
}

#[tokio::test]
async fn file_types_lists_distinct_mime_types() {
    let app = TestApp::spawn().await;

    let res = app
        .upload_as("alice", "a.txt", b"a".to_vec(), "text/plain")
        .await;
    assert_eq!(res.status, 201);
    let res = app
        .upload_as("alice", "b.txt", b"b".to_vec(), "text/plain")
        .await;
    assert_eq!(res.status, 201);
    let res = app
        .upload_as("alice", "c.json", b"{}".to_vec(), "application/json")
        .await;
    assert_eq!(res.status, 201);
    let res = app
        .upload_as("bob", "d.csv", b"x,y".to_vec(), "text/csv")
        .await;
    assert_eq!(res.status, 201);

    let res = app.get_as(routes::FILE_TYPES, "alice").await;

    assert_eq!(res.status, 200);
    let types: Vec<&str> = res
        .body
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["application/json", "text/plain"]);
}
