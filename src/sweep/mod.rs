//! The stale-worker sweep.
//!
//! A run moves through these stages, each consuming the previous one's
//! output in full:
//!
//! 1. Confirm the target account with the operator
//! 2. List every worker and keep the stale ones ([`staleness`])
//! 3. Project them into export columns ([`projection`])
//! 4. Sort and cap ([`ranking`])
//! 5. Export the selection and ask the operator to proceed
//! 6. Update attributes, then delete ([`mutation`], [`executor`])
//! 7. Export failures ([`report`]) and summarize

pub mod executor;
pub mod mutation;
pub mod projection;
pub mod ranking;
pub mod report;
pub mod staleness;

use std::{fmt, path::PathBuf};

use chrono::{DateTime, Utc};

use self::{
    executor::{ExecutionReport, execute},
    mutation::MutationPlan,
    projection::{ProjectionError, column_names, project_all, selection_table},
    ranking::rank,
    report::failure_table,
    staleness::{cutoff, filter_stale},
};
use crate::{
    config::SweeperConfig,
    export::{ExportError, ExportKind, ExportSink},
    prompt::{Confirm, PromptError},
    registry::{RegistryClient, RemoteError},
};

const PROCEED_PROMPT: &str = "The workers in the export will now be updated and deleted. \
                              Please review the CSV file first.\nWould you like to proceed?";

#[derive(Debug, thiserror::Error)]
pub enum SweepError {
    #[error("Failed to look up the target account: {0}")]
    Account(#[source] RemoteError),

    #[error("Failed to list workers: {0}")]
    List(#[source] RemoteError),

    #[error(transparent)]
    Projection(#[from] ProjectionError),

    #[error(transparent)]
    Export(#[from] ExportError),

    #[error(transparent)]
    Prompt(#[from] PromptError),

    /// Workers were already updated and removed when this happened.
    #[error("Failed to write the failure export after the run completed: {source}")]
    FailureExport {
        summary: SweepSummary,
        #[source]
        source: ExportError,
    },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum SweepOutcome {
    /// The operator did not confirm the target account.
    AccountDeclined,
    /// The workspace has no workers.
    NoWorkers,
    /// No worker is older than the threshold.
    NoStaleWorkers { checked: usize },
    /// Dry run: the selection was exported and nothing changed.
    DryRun { selected: usize, export: PathBuf },
    /// The operator declined after reviewing the export.
    Declined { selected: usize, export: PathBuf },
    Completed(SweepSummary),
}

impl fmt::Display for SweepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AccountDeclined => write!(f, "Target account not confirmed. Nothing was changed."),
            Self::NoWorkers => write!(f, "No workers found."),
            Self::NoStaleWorkers { checked } => write!(
                f,
                "There are no workers to delete ({checked} checked). Nothing further to do."
            ),
            Self::DryRun { selected, export } => write!(
                f,
                "Dry run: exported {selected} workers to {}. Nothing was changed.",
                export.display()
            ),
            Self::Declined { selected, export } => write!(
                f,
                "Exported {selected} workers to {}. Nothing was changed.",
                export.display()
            ),
            Self::Completed(summary) => fmt::Display::fmt(summary, f),
        }
    }
}

/// Counts and artifacts of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepSummary {
    pub processed: usize,
    pub removed: usize,
    pub failed: usize,
    pub export: PathBuf,
    pub failure_export: Option<PathBuf>,
}

impl fmt::Display for SweepSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Sweep complete. Summary:")?;
        write!(f, "- Updated and removed {} inactive workers.", self.removed)?;
        if self.failed > 0 {
            write!(
                f,
                "\n- Failed to update {} workers. Those workers were not deleted.",
                self.failed
            )?;
            if let Some(path) = &self.failure_export {
                write!(f, " See {}", path.display())?;
            }
        }
        Ok(())
    }
}

/// One sweep over a workspace.
pub struct Sweep<'a> {
    config: &'a SweeperConfig,
    registry: &'a dyn RegistryClient,
    sink: &'a dyn ExportSink,
    prompt: &'a dyn Confirm,
}

impl<'a> Sweep<'a> {
    pub fn new(
        config: &'a SweeperConfig,
        registry: &'a dyn RegistryClient,
        sink: &'a dyn ExportSink,
        prompt: &'a dyn Confirm,
    ) -> Self {
        Self {
            config,
            registry,
            sink,
            prompt,
        }
    }

    pub async fn run(&self) -> Result<SweepOutcome, SweepError> {
        self.run_at(Utc::now()).await
    }

    /// Run with `now` as the reference time for staleness.
    pub async fn run_at(&self, now: DateTime<Utc>) -> Result<SweepOutcome, SweepError> {
        let selection = &self.config.selection;
        let export = &self.config.export;
        let dry_run = self.config.safety.dry_run;

        let account = self.registry.account().await.map_err(SweepError::Account)?;
        let question = format!(
            "Target account: {} ({})\nIs this correct?",
            account.friendly_name, account.sid
        );
        if !self.prompt.confirm(&question)? {
            return Ok(SweepOutcome::AccountDeclined);
        }

        tracing::info!("Fetching all workers");
        let records = self.registry.list_all().await.map_err(SweepError::List)?;
        if records.is_empty() {
            return Ok(SweepOutcome::NoWorkers);
        }
        let checked = records.len();

        let cutoff = cutoff(now, selection.max_days_since_last_status_change);
        let stale = filter_stale(records, cutoff);
        tracing::info!(
            checked,
            stale = stale.len(),
            max_days = %selection.max_days_since_last_status_change,
            cutoff = %cutoff,
            "Selected workers by last status change"
        );
        if stale.is_empty() {
            return Ok(SweepOutcome::NoStaleWorkers { checked });
        }

        let candidates = project_all(stale, export)?;
        if let Some(field) = &selection.sort_field {
            tracing::info!(
                sort_field = %field,
                direction = %selection.sort_direction,
                "Sorting workers"
            );
        }
        let ranked = rank(
            candidates,
            selection.sort_field.as_deref(),
            selection.sort_direction,
            selection.max_records,
        );
        let selected = ranked.len();

        let export_path = self
            .sink
            .write(ExportKind::Selected, &selection_table(&ranked, export))?;

        if dry_run {
            tracing::info!(selected, "Dry run, not updating or deleting workers");
            return Ok(SweepOutcome::DryRun {
                selected,
                export: export_path,
            });
        }

        if !self.prompt.confirm(PROCEED_PROMPT)? {
            return Ok(SweepOutcome::Declined {
                selected,
                export: export_path,
            });
        }

        let plan = MutationPlan::new(&self.config.mutation);
        let report = execute(self.registry, ranked, &plan).await;

        self.finish(report, export_path)
    }

    fn finish(
        &self,
        report: ExecutionReport,
        export: PathBuf,
    ) -> Result<SweepOutcome, SweepError> {
        let mut summary = SweepSummary {
            processed: report.processed,
            removed: report.removed.len(),
            failed: report.failed(),
            export,
            failure_export: None,
        };

        if let Some(table) = failure_table(&column_names(&self.config.export), report.failure_records())
        {
            tracing::warn!(failed = summary.failed, "Some workers failed to update or delete");
            match self.sink.write(ExportKind::Failures, &table) {
                Ok(path) => summary.failure_export = Some(path),
                Err(source) => {
                    tracing::info!(
                        processed = summary.processed,
                        removed = summary.removed,
                        failed = summary.failed,
                        "Sweep complete"
                    );
                    return Err(SweepError::FailureExport { summary, source });
                }
            }
        }

        tracing::info!(
            processed = summary.processed,
            removed = summary.removed,
            failed = summary.failed,
            "Sweep complete"
        );
        Ok(SweepOutcome::Completed(summary))
    }
}
