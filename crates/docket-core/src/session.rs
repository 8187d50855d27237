use anyhow::Context;
use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, instrument};

use crate::identity::Identity;
use crate::store::RecordStore;
use crate::task::{MAX_TEXT_LEN, Task};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("task text is required")]
    EmptyText,
    #[error("task date is required")]
    EmptyDate,
    #[error("task text exceeds {MAX_TEXT_LEN} characters (got {len})")]
    TextTooLong { len: usize },
    #[error("not signed in")]
    NotSignedIn,
    #[error("no task with id {id}")]
    UnknownId { id: String },
}

// Owns the in-memory task collection for the signed-in user and mediates
// every mutation against the remote store. Local state is only touched after
// the corresponding remote call succeeds, so the two cannot silently drift.
#[derive(Debug)]
pub struct Session<S> {
    store: S,
    identity: Option<Identity>,
    tasks: Vec<Task>,
}

impl<S: RecordStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            identity: None,
            tasks: Vec::new(),
        }
    }

    pub fn identity(&self) -> Option<&Identity> {
        self.identity.as_ref()
    }

    // Insertion order; sorting always happens on a derived copy elsewhere.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    // Identity becoming available replaces local state wholesale with the
    // owner-scoped fetch; identity going away clears it. Never a merge.
    #[instrument(skip(self, identity), fields(uid = ?identity.as_ref().map(|i| i.uid.as_str())))]
    pub async fn set_identity(&mut self, identity: Option<Identity>) -> anyhow::Result<()> {
        match identity {
            Some(next) => {
                let fetched = self
                    .store
                    .list_tasks(&next.uid)
                    .await
                    .with_context(|| format!("failed loading tasks for {}", next.uid))?;
                info!(uid = %next.uid, count = fetched.len(), "loaded task list");
                self.tasks = fetched;
                self.identity = Some(next);
            }
            None => {
                debug!(dropped = self.tasks.len(), "signed out; clearing task list");
                self.tasks.clear();
                self.identity = None;
            }
        }
        Ok(())
    }

    #[instrument(skip(self, text), fields(len = text.len(), date = ?date))]
    pub async fn add(&mut self, text: &str, date: Option<NaiveDate>) -> anyhow::Result<Task> {
        let identity = self
            .identity
            .as_ref()
            .ok_or(SessionError::NotSignedIn)?;

        if text.is_empty() {
            return Err(SessionError::EmptyText.into());
        }
        let Some(date) = date else {
            return Err(SessionError::EmptyDate.into());
        };
        let len = text.chars().count();
        if len > MAX_TEXT_LEN {
            return Err(SessionError::TextTooLong { len }.into());
        }

        let draft = Task::draft(text, date, &identity.uid);
        let created = self
            .store
            .create_task(&draft)
            .await
            .context("failed creating task")?;

        info!(id = ?created.id, "task created");
        self.tasks.push(created.clone());
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn set_completed(&mut self, id: &str, completed: bool) -> anyhow::Result<()> {
        if self.identity.is_none() {
            return Err(SessionError::NotSignedIn.into());
        }

        let Some(position) = self.tasks.iter().position(|task| task.has_id(id)) else {
            return Err(SessionError::UnknownId { id: id.to_string() }.into());
        };

        self.store
            .set_completed(id, completed)
            .await
            .with_context(|| format!("failed updating task {id}"))?;

        self.tasks[position].completed = completed;
        info!(completed, "toggled task");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn delete(&mut self, id: &str) -> anyhow::Result<Task> {
        if self.identity.is_none() {
            return Err(SessionError::NotSignedIn.into());
        }

        // Unsaved drafts never reach local state, so an id match is also the
        // "has been persisted" check.
        let Some(position) = self.tasks.iter().position(|task| task.has_id(id)) else {
            return Err(SessionError::UnknownId { id: id.to_string() }.into());
        };

        self.store
            .delete_task(id)
            .await
            .with_context(|| format!("failed deleting task {id}"))?;

        let removed = self.tasks.remove(position);
        info!(remaining = self.tasks.len(), "task deleted");
        Ok(removed)
    }
}
