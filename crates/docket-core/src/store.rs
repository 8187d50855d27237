use std::time::Duration;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use tracing::{debug, info};

use crate::task::{Task, TaskPatch};

// The remote side is a generic JSON record store exposing a `todos`
// collection; everything we need from it fits in four operations.
#[async_trait]
pub trait RecordStore {
    async fn list_tasks(&self, owner_id: &str) -> anyhow::Result<Vec<Task>>;
    async fn create_task(&self, draft: &Task) -> anyhow::Result<Task>;
    async fn set_completed(&self, id: &str, completed: bool) -> anyhow::Result<()>;
    async fn delete_task(&self, id: &str) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpRecordStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRecordStore {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let trimmed = base_url.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(anyhow!("service URL is empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for the record store")?;

        info!(base_url = %trimmed, timeout_secs = timeout.as_secs(), "configured record store client");
        Ok(Self {
            base_url: trimmed.to_string(),
            client,
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/todos", self.base_url)
    }

    fn record_url(&self, id: &str) -> String {
        format!("{}/todos/{id}", self.base_url)
    }
}

#[async_trait]
impl RecordStore for HttpRecordStore {
    #[tracing::instrument(skip(self))]
    async fn list_tasks(&self, owner_id: &str) -> anyhow::Result<Vec<Task>> {
        let url = self.collection_url();
        let response = self
            .client
            .get(&url)
            .query(&[("ownerId", owner_id)])
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("record store returned HTTP {status} for {url}"));
        }

        let tasks: Vec<Task> = response
            .json()
            .await
            .context("failed parsing task list response")?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    #[tracing::instrument(skip(self, draft), fields(date = %draft.date))]
    async fn create_task(&self, draft: &Task) -> anyhow::Result<Task> {
        let url = self.collection_url();
        let response = self
            .client
            .post(&url)
            .json(draft)
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("record store returned HTTP {status} for {url}"));
        }

        let created: Task = response
            .json()
            .await
            .context("failed parsing created task response")?;
        debug!(id = ?created.id, "created task");
        Ok(created)
    }

    #[tracing::instrument(skip(self))]
    async fn set_completed(&self, id: &str, completed: bool) -> anyhow::Result<()> {
        let url = self.record_url(id);
        let patch = TaskPatch {
            completed: Some(completed),
        };
        let response = self
            .client
            .patch(&url)
            .json(&patch)
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("record store returned HTTP {status} for {url}"));
        }

        debug!("patched completion flag");
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_task(&self, id: &str) -> anyhow::Result<()> {
        let url = self.record_url(id);
        let response = self
            .client
            .delete(&url)
            .send()
            .await
            .with_context(|| format!("failed requesting {url}"))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("record store returned HTTP {status} for {url}"));
        }

        debug!("deleted record");
        Ok(())
    }
}
