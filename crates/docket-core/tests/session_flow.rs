use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::NaiveDate;
use docket_core::identity::Identity;
use docket_core::session::Session;
use docket_core::store::RecordStore;
use docket_core::task::Task;

// In-memory record store that counts every issued request, so the tests can
// assert not just the resulting state but the traffic that produced it.
#[derive(Debug)]
struct CountingStore {
    records: Mutex<Vec<Task>>,
    next_id: AtomicUsize,
    list_calls: AtomicUsize,
    create_calls: AtomicUsize,
    patch_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    fail_next: AtomicBool,
}

impl Default for CountingStore {
    fn default() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
            next_id: AtomicUsize::new(100),
            list_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            patch_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
            fail_next: AtomicBool::new(false),
        }
    }
}

impl CountingStore {
    fn seeded(records: Vec<Task>) -> Self {
        Self {
            records: Mutex::new(records),
            next_id: AtomicUsize::new(100),
            ..Self::default()
        }
    }

    fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn take_failure(&self) -> anyhow::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(anyhow!("record store unavailable"));
        }
        Ok(())
    }

    fn record_count(&self) -> usize {
        self.records.lock().expect("records lock").len()
    }
}

#[async_trait]
impl<'a> RecordStore for &'a CountingStore {
    async fn list_tasks(&self, owner_id: &str) -> anyhow::Result<Vec<Task>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let records = self.records.lock().expect("records lock");
        Ok(records
            .iter()
            .filter(|task| task.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn create_task(&self, draft: &Task) -> anyhow::Result<Task> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut created = draft.clone();
        created.id = Some(id.to_string());
        self.records
            .lock()
            .expect("records lock")
            .push(created.clone());
        Ok(created)
    }

    async fn set_completed(&self, id: &str, completed: bool) -> anyhow::Result<()> {
        self.patch_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut records = self.records.lock().expect("records lock");
        let record = records
            .iter_mut()
            .find(|task| task.id.as_deref() == Some(id))
            .ok_or_else(|| anyhow!("no record with id {id}"))?;
        record.completed = completed;
        Ok(())
    }

    async fn delete_task(&self, id: &str) -> anyhow::Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut records = self.records.lock().expect("records lock");
        let before = records.len();
        records.retain(|task| task.id.as_deref() != Some(id));
        if records.len() == before {
            return Err(anyhow!("no record with id {id}"));
        }
        Ok(())
    }
}

fn identity(uid: &str) -> Identity {
    Identity {
        uid: uid.to_string(),
        display_name: format!("User {uid}"),
    }
}

fn june(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).expect("valid date")
}

fn record(id: &str, owner: &str, day: u32) -> Task {
    Task {
        id: Some(id.to_string()),
        text: Some(format!("task {id}")),
        date: june(day),
        completed: false,
        owner_id: owner.to_string(),
    }
}

#[tokio::test]
async fn sign_in_loads_only_the_owners_tasks() {
    let store = CountingStore::seeded(vec![
        record("1", "alice", 9),
        record("2", "bob", 11),
        record("3", "alice", 20),
    ]);
    let mut session = Session::new(&store);

    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in");

    let ids: Vec<&str> = session
        .tasks()
        .iter()
        .filter_map(|t| t.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn identity_switch_discards_and_refetches_never_merges() {
    let store = CountingStore::seeded(vec![record("1", "alice", 9), record("2", "bob", 11)]);
    let mut session = Session::new(&store);

    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in alice");
    session
        .set_identity(Some(identity("bob")))
        .await
        .expect("switch to bob");

    let ids: Vec<&str> = session
        .tasks()
        .iter()
        .filter_map(|t| t.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["2"]);
    assert_eq!(store.list_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn add_round_trips_through_the_store() {
    let store = CountingStore::default();
    let mut session = Session::new(&store);
    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in");

    let created = session
        .add("Buy milk", Some(june(11)))
        .await
        .expect("create");

    assert_eq!(created.id.as_deref(), Some("100"));
    assert_eq!(created.owner_id, "alice");
    assert_eq!(session.tasks().len(), 1);
    assert_eq!(store.record_count(), 1);
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn rejected_adds_issue_no_store_traffic() {
    let store = CountingStore::default();
    let mut session = Session::new(&store);
    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in");

    assert!(session.add("", Some(june(11))).await.is_err());
    assert!(session.add("Buy milk", None).await.is_err());
    assert!(session.add(&"x".repeat(101), Some(june(11))).await.is_err());

    assert_eq!(session.tasks().len(), 0);
    assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.record_count(), 0);
}

#[tokio::test]
async fn delete_removes_exactly_one_entry_with_one_request() {
    let store = CountingStore::seeded(vec![
        record("1", "alice", 9),
        record("2", "alice", 11),
        record("3", "alice", 20),
    ]);
    let mut session = Session::new(&store);
    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in");

    let removed = session.delete("2").await.expect("delete");
    assert_eq!(removed.id.as_deref(), Some("2"));

    let ids: Vec<&str> = session
        .tasks()
        .iter()
        .filter_map(|t| t.id.as_deref())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.record_count(), 2);
}

#[tokio::test]
async fn toggle_updates_remote_and_local_together() {
    let store = CountingStore::seeded(vec![record("1", "alice", 9)]);
    let mut session = Session::new(&store);
    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in");

    session.set_completed("1", true).await.expect("toggle on");
    assert!(session.tasks()[0].completed);
    assert!(store.records.lock().expect("records lock")[0].completed);

    session.set_completed("1", false).await.expect("toggle off");
    assert!(!session.tasks()[0].completed);
    assert_eq!(store.patch_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_remote_calls_leave_local_state_untouched() {
    let store = CountingStore::seeded(vec![record("1", "alice", 9)]);
    let mut session = Session::new(&store);
    session
        .set_identity(Some(identity("alice")))
        .await
        .expect("sign in");

    store.fail_next();
    assert!(session.set_completed("1", true).await.is_err());
    assert!(!session.tasks()[0].completed);

    store.fail_next();
    assert!(session.delete("1").await.is_err());
    assert_eq!(session.tasks().len(), 1);

    store.fail_next();
    assert!(session.add("Buy milk", Some(june(11))).await.is_err());
    assert_eq!(session.tasks().len(), 1);
}

#[tokio::test]
async fn unauthenticated_mutations_are_rejected_without_traffic() {
    let store = CountingStore::default();
    let mut session = Session::new(&store);

    assert!(session.add("Buy milk", Some(june(11))).await.is_err());
    assert!(session.set_completed("1", true).await.is_err());
    assert!(session.delete("1").await.is_err());

    assert_eq!(store.create_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.patch_calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.delete_calls.load(Ordering::SeqCst), 0);
}
