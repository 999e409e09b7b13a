use chrono::{DateTime, Utc};
use serde::Deserialize;

/// A GitLab project, resolved from its namespaced path.
#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: u64,
    pub path_with_namespace: String,
}

/// One execution of one named CI step.
///
/// Retrying a job creates a new record with a fresh `id` while the old
/// record stays in the pipeline's job list, so several records may share the
/// same (stage, name) slot. The record with the highest `id` is current.
#[derive(Debug, Clone, Deserialize)]
pub struct Job {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub stage: String,
    pub status: String,
    pub pipeline: PipelineRef,
}

/// Back-reference from a job to the pipeline that owns it.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PipelineRef {
    pub id: u64,
}

/// One execution of the full job graph for a commit.
///
/// Timestamps are populated progressively as the pipeline advances;
/// `duration` only once it reaches a terminal status.
#[derive(Debug, Clone, Deserialize)]
pub struct Pipeline {
    pub id: u64,
    pub status: String,
    pub created_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration: Option<i64>,
}

/// The slice of a merge request this client needs: the head pipeline.
#[derive(Debug, Clone, Deserialize)]
pub struct MergeRequest {
    pub iid: u64,
    pub source_branch: String,
    #[serde(default)]
    pub head_pipeline: Option<Pipeline>,
}
