use std::io::Write;

use async_trait::async_trait;
use chrono::Utc;
use log::info;

use crate::error::Result;
use crate::gitlab::{GitLabClient, Job, Pipeline};
use crate::render::Renderer;
use crate::report::{latest_jobs, render_report, ReportOptions};

/// Seam between the poll loop and the forge, so tests can script a status
/// sequence without a server.
#[async_trait]
pub trait PipelineSource {
    async fn pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<Job>>;
    async fn pipeline(&self, pipeline_id: u64) -> Result<Pipeline>;
}

/// Production source: one project's pipelines via the REST client.
pub struct ProjectPipelines<'a> {
    client: &'a GitLabClient,
    project_id: u64,
}

impl<'a> ProjectPipelines<'a> {
    pub fn new(client: &'a GitLabClient, project_id: u64) -> Self {
        Self { client, project_id }
    }
}

#[async_trait]
impl PipelineSource for ProjectPipelines<'_> {
    async fn pipeline_jobs(&self, pipeline_id: u64) -> Result<Vec<Job>> {
        self.client.pipeline_jobs(self.project_id, pipeline_id).await
    }

    async fn pipeline(&self, pipeline_id: u64) -> Result<Pipeline> {
        self.client.get_pipeline(self.project_id, pipeline_id).await
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The pipeline had no jobs; nothing was printed.
    NoJobs,
    /// The loop finished; `status` is the last pipeline status observed.
    Completed { status: String },
}

fn is_terminal(status: &str) -> bool {
    status != "pending" && status != "running"
}

/// Fetch -> render loop over a pipeline.
///
/// Each iteration performs exactly one jobs fetch and one pipeline fetch,
/// renders the report, and flushes. Without wait mode one pass is rendered
/// unconditionally; with wait mode iterations repeat, separated by a blank
/// line, until the pipeline status is terminal. Fetch errors abort
/// immediately, leaving whatever was already printed on stdout.
pub async fn watch_pipeline<S: PipelineSource, W: Write>(
    source: &S,
    out: &mut W,
    head_pipeline_id: u64,
    options: &ReportOptions,
    renderer: &Renderer,
    wait: bool,
) -> Result<WatchOutcome> {
    let mut first = true;

    loop {
        let jobs = latest_jobs(source.pipeline_jobs(head_pipeline_id).await?);
        if jobs.is_empty() {
            out.flush()?;
            return Ok(WatchOutcome::NoJobs);
        }

        let pipeline_id = jobs[0].pipeline.id;
        let pipeline = source.pipeline(pipeline_id).await?;

        if !first {
            writeln!(out)?;
        }
        first = false;
        render_report(out, &jobs, &pipeline, options, renderer, Utc::now())?;
        out.flush()?;

        if !wait || is_terminal(&pipeline.status) {
            info!("pipeline {pipeline_id} status: {}", pipeline.status);
            return Ok(WatchOutcome::Completed {
                status: pipeline.status,
            });
        }
    }
}
