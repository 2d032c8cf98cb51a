//! Sync coordinator against a mock store: load/merge, detached writes,
//! and the completion scenarios.

use crate::common::*;
use escape_progress::client::LocalSnapshotStore;
use escape_progress::shared::state_machine::StageStatus;
use escape_progress::shared::ProgressPatch;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use wiremock::{MockServer, ResponseTemplate};

#[tokio::test]
async fn test_load_keeps_local_completions_missing_remotely() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let local = record_with_rooms("Alpha", &[1, 2]);
    LocalSnapshotStore::new(dir.path()).save(&local);
    let remote = record_with_rooms("Alpha", &[1]);
    mount_found(&server, "Alpha", &remote).await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    let record = coordinator.load().await.clone();

    assert_eq!(record.rooms_completed, vec![1, 2]);
    crate::assert_prefix!(remote.rooms_completed, record.rooms_completed);
    assert_eq!(record.stage_entry_time(2), local.stage_entry_time(2));
    assert!(!coordinator.is_loading());

    // The remote store was behind, so the reconciled record is pushed back.
    coordinator.flush().await;
    assert_eq!(written_records(&server).await, vec![record]);
}

#[tokio::test]
async fn test_load_takes_remote_when_ahead() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    LocalSnapshotStore::new(dir.path()).save(&record_with_rooms("Alpha", &[1]));
    let remote = record_with_rooms("Alpha", &[1, 2, 3]);
    mount_found(&server, "Alpha", &remote).await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    assert_eq!(coordinator.load().await, &remote);

    coordinator.flush().await;
    assert!(update_bodies(&server).await.is_empty());
    assert_eq!(LocalSnapshotStore::new(dir.path()).load(), Some(remote));
}

#[tokio::test]
async fn test_loading_flag_set_while_fetch_outstanding() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    LocalSnapshotStore::new(dir.path()).save(&record_with_rooms("Alpha", &[1]));
    let body = json!({ "found": false });
    mount_read(
        &server,
        "Alpha",
        ResponseTemplate::new(200)
            .set_body_json(body)
            .set_delay(Duration::from_millis(300)),
    )
    .await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    let mut loading = coordinator.loading();
    assert!(!*loading.borrow());

    let saw_loading = async { loading.wait_for(|flag| *flag).await.is_ok() };
    let (saw_loading, _) = tokio::join!(saw_loading, coordinator.load());

    assert!(saw_loading);
    assert!(!coordinator.is_loading());
    assert!(!coordinator.record().is_loading);
    coordinator.flush().await;
}

#[tokio::test]
async fn test_load_survives_remote_outage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let local = record_with_rooms("Alpha", &[1, 2]);
    LocalSnapshotStore::new(dir.path()).save(&local);
    mount_read(&server, "Alpha", ResponseTemplate::new(503)).await;
    mount_write(&server, ResponseTemplate::new(503)).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    assert_eq!(coordinator.load().await, &local);
    coordinator.flush().await;
}

#[tokio::test]
async fn test_begin_resumes_progress_from_another_device() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let remote = record_with_rooms("Alpha", &[1, 2]);
    mount_found(&server, "Alpha", &remote).await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.load().await;
    let record = coordinator.begin("Alpha").await.unwrap().clone();

    assert_eq!(record.rooms_completed, vec![1, 2]);
    assert_eq!(record.start_time, Some(at(0)));
    assert_eq!(coordinator.status(), StageStatus::AwaitingStage(3));
}

#[tokio::test]
async fn test_begin_new_team_pushes_started_record() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_not_found(&server, "Alpha").await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.begin("Alpha").await.unwrap();
    coordinator.flush().await;

    let written = written_records(&server).await;
    assert_eq!(written.len(), 1);
    assert_eq!(written[0].identity, "Alpha");
    assert!(written[0].start_time.is_some());
}

#[tokio::test]
async fn test_begin_never_merges_previous_team() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    LocalSnapshotStore::new(dir.path()).save(&record_with_rooms("Alpha", &[1, 2, 3]));
    mount_found(&server, "Alpha", &record_with_rooms("Alpha", &[1, 2, 3])).await;
    mount_not_found(&server, "Beta").await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.load().await;
    coordinator.restart();
    let record = coordinator.begin("Beta").await.unwrap().clone();

    assert_eq!(record.identity, "Beta");
    assert!(record.rooms_completed.is_empty());
    assert_eq!(record.current_room, 0);
    coordinator.flush().await;
}

#[tokio::test]
async fn test_complete_room_first_stage() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_not_found(&server, "Alpha").await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.begin("Alpha").await.unwrap();
    let record = coordinator.complete_room(1).unwrap().clone();

    assert_eq!(record.rooms_completed, vec![1]);
    assert_eq!(record.current_room, 1);
    assert!(record.stage_entry_time(1).is_some());
    assert_eq!(record.end_time, None);

    // Saved locally before any network round-trip completes.
    assert_eq!(LocalSnapshotStore::new(dir.path()).load(), Some(record.clone()));

    // Detached writes may land in any order; the latest state is among them.
    coordinator.flush().await;
    assert!(written_records(&server).await.contains(&record));
}

#[tokio::test]
async fn test_terminal_stage_sets_end_time_once() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_not_found(&server, "Alpha").await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.begin("Alpha").await.unwrap();
    let terminal = coordinator.layout().terminal_stage();

    let first = coordinator.complete_room(terminal).unwrap().end_time;
    let second = coordinator.complete_room(terminal).unwrap().end_time;

    assert!(first.is_some());
    assert_eq!(first, second);
    assert_eq!(coordinator.status(), StageStatus::Finished);
    coordinator.flush().await;
}

#[tokio::test]
async fn test_write_failures_do_not_block_progress() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_not_found(&server, "Alpha").await;
    mount_write(&server, ResponseTemplate::new(500).set_body_string("unavailable")).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.begin("Alpha").await.unwrap();
    coordinator.complete_room(1).unwrap();
    coordinator.complete_room(2).unwrap();
    coordinator.flush().await;

    assert_eq!(coordinator.record().rooms_completed, vec![1, 2]);
    assert_eq!(
        LocalSnapshotStore::new(dir.path()).load().unwrap().rooms_completed,
        vec![1, 2]
    );
    assert_eq!(coordinator.pending_writes(), 0);
}

#[tokio::test]
async fn test_every_write_carries_full_state() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_not_found(&server, "Alpha").await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.begin("Alpha").await.unwrap();
    coordinator.complete_room(1).unwrap();
    coordinator.update(&ProgressPatch::new().field("room2Answer", json!("LANTERN")));
    coordinator.complete_room(2).unwrap();
    coordinator.flush().await;

    let written = written_records(&server).await;
    assert_eq!(written.len(), 4);
    for record in &written {
        crate::assert_no_duplicates!(record.rooms_completed);
    }
    let latest = written
        .iter()
        .max_by_key(|record| record.rooms_completed.len())
        .unwrap();
    assert_eq!(latest, coordinator.record());
    assert_eq!(latest.extra.get("room2Answer"), Some(&json!("LANTERN")));
}

#[tokio::test]
async fn test_update_cannot_rewrite_fixed_timestamps() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();
    mount_not_found(&server, "Alpha").await;
    mount_write_ok(&server).await;

    let mut coordinator = coordinator_for(&server, dir.path());
    coordinator.begin("Alpha").await.unwrap();
    let entered = coordinator.complete_room(1).unwrap().stage_entry_time(1);
    let started = coordinator.record().start_time;

    let patch = ProgressPatch::new()
        .stage_entry_time(1, at(59))
        .start_time(at(59));
    let record = coordinator.update(&patch).clone();

    assert_eq!(record.stage_entry_time(1), entered);
    assert_eq!(record.start_time, started);
    coordinator.flush().await;
}
