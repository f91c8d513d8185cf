//! Convergence through the document sync surface: two simulated clients
//! applying disjoint edits end with identical merged content once both
//! update streams are exchanged, in any interleaving.

use std::sync::Arc;
use std::time::Duration;

use loro::{ExportMode, LoroDoc};
use tokio::sync::mpsc::unbounded_channel;
use tokio::time::timeout;
use uuid::Uuid;

use talentflow_live::db::{MemoryGateway, PersistenceGateway};
use talentflow_live::hub::{Hub, HubHandle};

fn start_hub(gateway: Arc<MemoryGateway>) -> HubHandle {
    let (hub, handle) = Hub::new(
        gateway as Arc<dyn PersistenceGateway>,
        Duration::from_millis(40),
    );
    tokio::spawn(hub.run());
    handle
}

fn edited_client(snapshot: &[u8], edit: impl FnOnce(&LoroDoc)) -> (LoroDoc, Vec<u8>) {
    let doc = LoroDoc::new();
    doc.import(snapshot).unwrap();
    edit(&doc);
    let frame = doc.export(ExportMode::Snapshot).unwrap();
    (doc, frame)
}

#[tokio::test]
async fn disjoint_edits_converge_across_two_streams() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed_note("note-9", "shared notes", "Debrief");
    let hub = start_hub(gateway.clone());

    let s1 = Uuid::new_v4();
    let s2 = Uuid::new_v4();
    let (tx1, mut rx1) = unbounded_channel();
    let (tx2, mut rx2) = unbounded_channel();

    let base1 = hub.sync_join("note-9", s1, "u-1", tx1).await.unwrap();
    let base2 = hub.sync_join("note-9", s2, "u-2", tx2).await.unwrap();

    // Both joiners get the materialized state, not a replay.
    let probe = LoroDoc::new();
    probe.import(&base1).unwrap();
    assert_eq!(probe.get_text("content").to_string(), "shared notes");

    // Disjoint edits: one at the front, one at the back.
    let (c1, frame1) = edited_client(&base1, |doc| {
        doc.get_text("content").insert(0, ">> ").unwrap();
    });
    let (c2, frame2) = edited_client(&base2, |doc| {
        let text = doc.get_text("content");
        let len = text.len_unicode();
        text.insert(len, " <<").unwrap();
    });

    hub.sync_update("note-9", s1, "u-1", frame1);
    hub.sync_update("note-9", s2, "u-2", frame2);

    // Each stream receives the other's frame verbatim, never its own.
    let relayed_to_2 = timeout(Duration::from_secs(1), rx2.recv())
        .await
        .unwrap()
        .unwrap();
    let relayed_to_1 = timeout(Duration::from_secs(1), rx1.recv())
        .await
        .unwrap()
        .unwrap();
    c2.import(&relayed_to_2).unwrap();
    c1.import(&relayed_to_1).unwrap();

    let text1 = c1.get_text("content").to_string();
    let text2 = c2.get_text("content").to_string();
    assert_eq!(text1, text2);
    assert!(text1.starts_with(">> "));
    assert!(text1.ends_with(" <<"));

    // A late joiner receives the fully merged state in one snapshot.
    let s3 = Uuid::new_v4();
    let (tx3, _rx3) = unbounded_channel();
    let merged = hub.sync_join("note-9", s3, "u-3", tx3).await.unwrap();
    let late = LoroDoc::new();
    late.import(&merged).unwrap();
    assert_eq!(late.get_text("content").to_string(), text1);
}

#[tokio::test]
async fn sync_edits_feed_the_autosave_debounce() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed_note("note-9", "draft", "Debrief");
    let hub = start_hub(gateway.clone());

    let s1 = Uuid::new_v4();
    let (tx1, _rx1) = unbounded_channel();
    let base = hub.sync_join("note-9", s1, "u-1", tx1).await.unwrap();

    let (_c1, frame) = edited_client(&base, |doc| {
        doc.get_text("content").insert(0, "reviewed ").unwrap();
    });
    hub.sync_update("note-9", s1, "u-1", frame);

    // One quiet period later the merged text is durable.
    tokio::time::sleep(Duration::from_millis(250)).await;
    let edits = gateway.edits_for("note-9");
    assert_eq!(edits.len(), 1);
    assert_eq!(edits[0].content_snapshot, "reviewed draft");
    assert_eq!(edits[0].user_id, "u-1");

    let note = gateway.read_note("note-9").await.unwrap().unwrap();
    assert_eq!(note.content, "reviewed draft");
}

#[tokio::test]
async fn malformed_frames_never_reach_other_streams() {
    let gateway = Arc::new(MemoryGateway::new());
    gateway.seed_note("note-9", "x", "T");
    let hub = start_hub(gateway.clone());

    let s1 = Uuid::new_v4();
    let s2 = Uuid::new_v4();
    let (tx1, _rx1) = unbounded_channel();
    let (tx2, mut rx2) = unbounded_channel();
    hub.sync_join("note-9", s1, "u-1", tx1).await.unwrap();
    hub.sync_join("note-9", s2, "u-2", tx2).await.unwrap();

    hub.sync_update("note-9", s1, "u-1", b"not a crdt frame".to_vec());

    // A query barrier: everything above has been processed once it returns.
    let _ = hub.members_of("note:note-9").await;
    assert!(rx2.try_recv().is_err());
}
