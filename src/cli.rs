use std::io;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use log::info;

use crate::auth::Token;
use crate::config::Config;
use crate::error::{CiWatchError, Result};
use crate::git;
use crate::gitlab::GitLabClient;
use crate::render::Renderer;
use crate::report::ReportOptions;
use crate::status::DisplayFilters;
use crate::watch::{watch_pipeline, ProjectPipelines, WatchOutcome};

#[derive(Parser)]
#[command(name = "ciwatch")]
#[command(author, version, about = "GitLab CI pipeline status watcher", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// GitLab instance base URL
    #[arg(long, global = true)]
    url: Option<String>,

    /// GitLab personal access token
    #[arg(short, long, global = true, env = "GITLAB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Project path (e.g. 'group/project'); derived from the git remote when
    /// omitted
    #[arg(short = 'P', long, global = true)]
    project: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Textual representation of a CI pipeline
    #[command(alias = "run")]
    Status {
        /// Branch whose merge request to inspect (defaults to the current
        /// branch)
        branch: Option<String>,

        /// Keep polling and re-rendering until the pipeline finishes; the
        /// exit code then reflects the pipeline status
        #[arg(short, long)]
        wait: bool,

        /// Ignore skipped jobs - do not print them
        #[arg(long)]
        no_skipped: bool,

        /// Use color for success and failure
        #[arg(short, long)]
        color: bool,

        /// Only print failures
        #[arg(short, long, alias = "failed")]
        failures: bool,

        /// Only show completed and running jobs - do not report queued jobs
        #[arg(short, long)]
        results_only: bool,

        /// Do not show individual jobs, just the pipeline summary
        #[arg(short, long)]
        summary: bool,
    },

    /// Re-run a CI job, or start it when it is waiting on manual action
    #[command(alias = "retry")]
    Job {
        /// Numeric id of the job
        id: u64,
    },
}

impl Cli {
    pub async fn execute(&self) -> Result<ExitCode> {
        let config = Config::load()?;

        let base_url = self
            .url
            .clone()
            .unwrap_or_else(|| config.gitlab.base_url.clone());
        let token = self
            .token
            .clone()
            .or_else(|| config.gitlab.token.clone())
            .map(|t| Token::from(t.as_str()));
        let client = GitLabClient::new(&base_url, token)?;

        let project_path = match self.project.clone().or_else(|| config.gitlab.project.clone()) {
            Some(path) => path,
            None => git::remote_project_path(&config.gitlab.remote)?,
        };

        match &self.command {
            Commands::Status {
                branch,
                wait,
                no_skipped,
                color,
                failures,
                results_only,
                summary,
            } => {
                let options = ReportOptions {
                    filters: DisplayFilters {
                        no_skipped: *no_skipped,
                        failures: *failures,
                        results_only: *results_only,
                    },
                    summary_only: *summary,
                };
                self.execute_status(&client, &project_path, branch.as_deref(), *wait, *color, options)
                    .await
            }
            Commands::Job { id } => self.execute_job(&client, &project_path, *id).await,
        }
    }

    async fn execute_status(
        &self,
        client: &GitLabClient,
        project_path: &str,
        branch: Option<&str>,
        wait: bool,
        color: bool,
        options: ReportOptions,
    ) -> Result<ExitCode> {
        let project = client.find_project(project_path).await?;

        let branch = match branch {
            Some(b) => b.to_owned(),
            None => git::current_branch()?,
        };
        info!(
            "Looking up open merge request for {}@{branch}",
            project.path_with_namespace
        );

        let mr = client.merge_request_for_branch(project.id, &branch).await?;
        info!("Found merge request !{} for {}", mr.iid, mr.source_branch);
        let head_pipeline = mr
            .head_pipeline
            .ok_or(CiWatchError::NoPipeline(mr.iid))?;

        let renderer = Renderer::new(color);
        let source = ProjectPipelines::new(client, project.id);
        let mut stdout = io::stdout();
        let outcome = watch_pipeline(
            &source,
            &mut stdout,
            head_pipeline.id,
            &options,
            &renderer,
            wait,
        )
        .await?;

        Ok(exit_code(wait, &outcome))
    }

    async fn execute_job(
        &self,
        client: &GitLabClient,
        project_path: &str,
        job_id: u64,
    ) -> Result<ExitCode> {
        let project = client.find_project(project_path).await?;
        let job = client.get_job(project.id, job_id).await?;

        info!("{} job {} ({}: {})",
            if job.status == "manual" { "Starting" } else { "Retrying" },
            job.id, job.stage, job.name
        );
        let started = client.play_or_retry_job(project.id, &job).await?;
        println!("{}: {} - {} id: {}", started.stage, started.name, started.status, started.id);

        Ok(ExitCode::SUCCESS)
    }
}

/// Only wait mode puts the pipeline outcome into the exit code; a plain
/// one-shot report succeeds whatever the pipeline did.
fn signals_failure(wait: bool, outcome: &WatchOutcome) -> bool {
    matches!(outcome, WatchOutcome::Completed { status } if wait && status != "success")
}

fn exit_code(wait: bool, outcome: &WatchOutcome) -> ExitCode {
    if signals_failure(wait, outcome) {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
