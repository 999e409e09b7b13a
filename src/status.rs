use console::Style;

/// Semantic bucket for a raw GitLab job/pipeline status string.
///
/// Classification is a total function: strings GitLab may add in the future
/// land in [`StatusKind::Other`] and are always displayed, never hidden by a
/// filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Failed,
    InProgress,
    Queued,
    Skipped,
    Other,
}

impl StatusKind {
    pub fn classify(status: &str) -> Self {
        match status {
            "success" => Self::Success,
            "failed" => Self::Failed,
            "running" => Self::InProgress,
            "created" | "pending" => Self::Queued,
            "skipped" => Self::Skipped,
            _ => Self::Other,
        }
    }

    /// Display style applied to report lines of this kind.
    pub fn style(self) -> Style {
        match self {
            Self::Success => Style::new().green(),
            Self::Failed => Style::new().red(),
            Self::InProgress => Style::new().yellow(),
            Self::Queued => Style::new().cyan(),
            Self::Skipped => Style::new().dim(),
            Self::Other => Style::new(),
        }
    }
}

/// Row filters for the job table. Each active filter independently removes
/// matching rows; a row hidden by any filter is omitted.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisplayFilters {
    /// Hide jobs whose status is exactly `skipped`.
    pub no_skipped: bool,
    /// Show only jobs whose status is exactly `failed`.
    pub failures: bool,
    /// Hide queued jobs (status exactly `created`).
    pub results_only: bool,
}

/// Filters match on the raw status string, the same comparison the summary
/// counts use, so retro-added statuses are never silently excluded.
pub fn hidden_by_filters(status: &str, filters: &DisplayFilters) -> bool {
    (filters.no_skipped && status == "skipped")
        || (filters.failures && status != "failed")
        || (filters.results_only && status == "created")
}
