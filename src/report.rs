use std::io::Write;

use chrono::{DateTime, Utc};
use indexmap::map::Entry;
use indexmap::IndexMap;

use crate::error::{CiWatchError, Result};
use crate::gitlab::{Job, Pipeline};
use crate::render::Renderer;
use crate::status::{hidden_by_filters, DisplayFilters, StatusKind};

/// Width the status column is right-aligned to.
const STATUS_WIDTH: usize = 10;

#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    pub filters: DisplayFilters,
    /// Suppress the per-job table and print only the trailing summary.
    pub summary_only: bool,
}

#[derive(Debug, Hash, PartialEq, Eq)]
enum JobSlot {
    Named(String, String),
    /// Record without a name or stage; kept as its own row keyed by id.
    Unnamed(u64),
}

impl JobSlot {
    fn of(job: &Job) -> Self {
        if job.name.is_empty() && job.stage.is_empty() {
            Self::Unnamed(job.id)
        } else {
            Self::Named(job.stage.clone(), job.name.clone())
        }
    }
}

/// Collapses a raw job list down to the latest attempt per (stage, name)
/// slot.
///
/// Retrying a failed job leaves the old record in the pipeline's job list
/// next to the new one; without this pass a failed+retried-success pair would
/// render as two rows and skew the summary counts. Slots keep the relative
/// order of their first appearance in the input.
pub fn latest_jobs(jobs: Vec<Job>) -> Vec<Job> {
    let mut slots: IndexMap<JobSlot, Job> = IndexMap::with_capacity(jobs.len());
    for job in jobs {
        match slots.entry(JobSlot::of(&job)) {
            Entry::Occupied(mut entry) => {
                if job.id > entry.get().id {
                    entry.insert(job);
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(job);
            }
        }
    }
    slots.into_values().collect()
}

/// Ground-truth counts over the full deduplicated job list; display filters
/// never affect these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub queued: usize,
}

impl JobSummary {
    pub fn tally(jobs: &[Job]) -> Self {
        Self {
            total: jobs.len(),
            passed: jobs.iter().filter(|j| j.status == "success").count(),
            failed: jobs.iter().filter(|j| j.status == "failed").count(),
            queued: jobs.iter().filter(|j| j.status == "created").count(),
        }
    }
}

/// Writes the full report for a deduplicated job list and its pipeline.
///
/// `now` is injected so the relative-time annotations are deterministic under
/// test; production callers pass `Utc::now()`.
pub fn render_report<W: Write>(
    out: &mut W,
    jobs: &[Job],
    pipeline: &Pipeline,
    options: &ReportOptions,
    renderer: &Renderer,
    now: DateTime<Utc>,
) -> Result<()> {
    if !options.summary_only {
        let stage_width = jobs.iter().map(|j| j.stage.len()).max().unwrap_or(0);
        let name_width = jobs.iter().map(|j| j.name.len()).max().unwrap_or(0);

        for job in jobs {
            if hidden_by_filters(&job.status, &options.filters) {
                continue;
            }
            let kind = StatusKind::classify(&job.status);
            let line = format!(
                "{:>stage_width$}: {:<name_width$} - {:>STATUS_WIDTH$} id: {}",
                job.stage, job.name, job.status, job.id
            );
            writeln!(out, "{}", renderer.paint(kind, &line))?;
        }
    }

    writeln!(out)?;
    let kind = StatusKind::classify(&pipeline.status);
    writeln!(
        out,
        "Pipeline Status: {}",
        renderer.paint(kind, &pipeline.status)
    )?;
    write_time_lines(out, pipeline, now)?;

    let summary = JobSummary::tally(jobs);
    writeln!(out)?;
    writeln!(
        out,
        "total {} passed {} failed {} queued {}",
        summary.total, summary.passed, summary.failed, summary.queued
    )?;

    Ok(())
}

/// The timestamp a status claims to have must be present; a hole here means
/// the forge returned a pipeline inconsistent with its own status.
fn require(
    pipeline: &Pipeline,
    field: Option<DateTime<Utc>>,
    name: &str,
) -> Result<DateTime<Utc>> {
    field.ok_or_else(|| {
        CiWatchError::DataIntegrity(format!(
            "pipeline {} is {} but has no {name}",
            pipeline.id, pipeline.status
        ))
    })
}

fn write_time_lines<W: Write>(out: &mut W, pipeline: &Pipeline, now: DateTime<Utc>) -> Result<()> {
    match pipeline.status.as_str() {
        "pending" => {
            let created = require(pipeline, pipeline.created_at, "created_at")?;
            writeln!(out, "created at {}", layout_time(created, now))?;
        }
        "running" => {
            let started = require(pipeline, pipeline.started_at, "started_at")?;
            writeln!(out, "started at {}", layout_time(started, now))?;
        }
        _ => {
            let finished = require(pipeline, pipeline.finished_at, "finished_at")?;
            let duration = pipeline.duration.ok_or_else(|| {
                CiWatchError::DataIntegrity(format!(
                    "pipeline {} is {} but has no duration",
                    pipeline.id, pipeline.status
                ))
            })?;
            writeln!(out, "finished at {}", layout_time(finished, now))?;
            writeln!(out, "duration: {}", format_duration(duration))?;
        }
    }
    Ok(())
}

/// `H.M:S` above an hour, `M:S` above a minute, `N secs` below; all floor
/// arithmetic, no rounding.
pub fn format_duration(duration: i64) -> String {
    let hours = duration / 3600;
    let minutes = duration / 60 - hours * 60;
    let seconds = duration % 60;
    if hours > 0 {
        format!("{hours}.{minutes}:{seconds}")
    } else if minutes > 0 {
        format!("{minutes}:{seconds}")
    } else {
        format!("{duration} secs")
    }
}

fn pluralize(noun: &str, quantity: i64) -> String {
    match quantity {
        0 => String::new(),
        1 => format!("1 {noun}"),
        n => format!("{n} {noun}s"),
    }
}

/// Relative annotation from the two most significant non-zero units:
/// minutes+seconds under an hour, hours+minutes under a day, days+hours
/// beyond. Empty when the moment is `now` (or in the future).
fn since_annotation(when: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let ago = (now - when).num_seconds().max(0);

    let (first, second) = if ago < 3600 {
        (pluralize("minute", ago / 60), pluralize("second", ago % 60))
    } else if ago < 86_400 {
        (
            pluralize("hour", ago / 3600),
            pluralize("minute", (ago / 60) % 60),
        )
    } else {
        (
            pluralize("day", ago / 86_400),
            pluralize("hour", (ago / 3600) % 24),
        )
    };

    let parts: Vec<&str> = [first.as_str(), second.as_str()]
        .into_iter()
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("({} ago)", parts.join(", "))
    }
}

/// Kitchen-clock format for moments earlier the same day, a fuller stamp
/// otherwise, plus the relative annotation when it is non-empty.
fn layout_time(when: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let recent = (now - when).num_hours() < 12 && now.date_naive() == when.date_naive();
    let formatted = if recent {
        when.format("%-I:%M%p")
    } else {
        when.format("%b %e %H:%M:%S")
    };
    let annotation = since_annotation(when, now);
    if annotation.is_empty() {
        formatted.to_string()
    } else {
        format!("{formatted} {annotation}")
    }
}
