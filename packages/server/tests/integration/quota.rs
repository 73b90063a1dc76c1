use crate::common::{TestApp, routes};

#[tokio::test]
async fn upload_over_quota_is_rejected() {
    let app = TestApp::spawn_with(16, 0).await;

    let res = app
        .upload_as("alice", "big.bin", vec![0u8; 32], "application/octet-stream")
        .await;

    assert_eq!(res.status, 429, "{}", res.text);
    assert_eq!(res.body["code"], "QUOTA_EXCEEDED");

    // Nothing was recorded for the rejected upload.
    let res = app.get_as(routes::FILES, "alice").await;
    assert_eq!(res.body["total"], 0);
    let res = app.get_as(routes::STORAGE_STATS, "alice").await;
    assert_eq!(res.body["total_storage_used"], 0);
}

#[tokio::test]
async fn quota_fills_exactly_to_the_limit() {
    let app = TestApp::spawn_with(16, 0).await;

    let res = app
        .upload_as("alice", "fit.bin", vec![1u8; 16], "application/octet-stream")
        .await;
    assert_eq!(res.status, 201, "{}", res.text);

    let res = app
        .upload_as("alice", "over.bin", vec![2u8; 1], "application/octet-stream")
        .await;
    assert_eq!(res.status, 429);
    assert_eq!(res.body["code"], "QUOTA_EXCEEDED");
}

#[tokio::test]
async fn duplicate_of_own_content_is_free() {
    let app = TestApp::spawn_with(16, 0).await;

    let payload = vec![3u8; 16];
    let res = app
        .upload_as("alice", "one.bin", payload.clone(), "application/octet-stream")
        .await;
    assert_eq!(res.status, 201);

    // Quota is full, but re-uploading the same bytes costs nothing.
    let res = app
        .upload_as("alice", "two.bin", payload, "application/octet-stream")
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
    assert_eq!(res.body["is_reference"], true);

    let res = app.get_as(routes::STORAGE_STATS, "alice").await;
    assert_eq!(res.body["storage_savings"], 16);
}

#[tokio::test]
async fn each_owner_is_charged_independently() {
    let app = TestApp::spawn_with(16, 0).await;

    let payload = vec![4u8; 16];
    let res = app
        .upload_as("alice", "a.bin", payload.clone(), "application/octet-stream")
        .await;
    assert_eq!(res.status, 201);

    // Bob holds a reference to the same blob but pays full price.
    let res = app
        .upload_as("bob", "b.bin", payload, "application/octet-stream")
        .await;
    assert_eq!(res.status, 201);

    let res = app
        .upload_as("bob", "extra.bin", vec![5u8; 1], "application/octet-stream")
        .await;
    assert_eq!(res.status, 429);
    assert_eq!(res.body["code"], "QUOTA_EXCEEDED");
}

#[tokio::test]
async fn delete_releases_quota() {
    let app = TestApp::spawn_with(16, 0).await;

    let id = app.upload_ok("alice", "temp.txt", &[6u8; 16]).await;

    let res = app
        .upload_as("alice", "next.bin", vec![7u8; 16], "application/octet-stream")
        .await;
    assert_eq!(res.status, 429);

    let res = app.delete_as(&routes::file(&id), "alice").await;
    assert_eq!(res.status, 204);

    let res = app
        .upload_as("alice", "next.bin", vec![7u8; 16], "application/octet-stream")
        .await;
    assert_eq!(res.status, 201, "{}", res.text);
}

#[tokio::test]
async fn quota_is_held_until_the_last_copy_goes() {
    let app = TestApp::spawn_with(16, 0).await;

    let payload = [8u8; 16];
    let first = app.upload_ok("alice", "one.txt", &payload).await;
    let _second = app.upload_ok("alice", "two.txt", &payload).await;

    // One copy remains, so the blob is still charged.
    let res = app.delete_as(&routes::file(&first), "alice").await;
    assert_eq!(res.status, 204);
    let res = app
        .upload_as("alice", "other.bin", vec![9u8; 16], "application/octet-stream")
        .await;
    assert_eq!(res.status, 429);
}
