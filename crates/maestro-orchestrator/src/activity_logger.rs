//! Activity Logger - Human-readable run logging to `.maestro/activity.md`
//!
//! Records, per workflow run:
//! - The task and the plan shape
//! - Each attempted phase with its outcome and a preview of its output
//! - Budget warnings and the final run summary

use chrono::Utc;
use maestro_core::fail_open::fail_open;
use maestro_core::{PhaseResult, Result, WorkflowPlan, WorkflowState};
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Maximum character length for phase output in the activity log preview
const ACTIVITY_LOG_PREVIEW_CHARS: usize = 300;

/// Activity logger for workflow runs
#[derive(Debug, Clone)]
pub struct ActivityLogger {
    output_path: PathBuf,
}

impl ActivityLogger {
    pub fn new(maestro_dir: PathBuf) -> Self {
        Self {
            output_path: maestro_dir.join("activity.md"),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.output_path
    }

    /// Log the start of a run
    ///
    /// This operation is fail-open - logging failures won't stop the run
    pub async fn log_run_start(&self, state: &WorkflowState, task: &str, plan: &WorkflowPlan) {
        fail_open("activity_logger::log_run_start", || async {
            let phases: Vec<&str> = plan.phases.iter().map(|p| p.name.as_str()).collect();
            let content = format!(
                "## Run {}\n\
                **Task**: {}\n\
                **Started**: {}\n\
                **Strategy**: {}\n\
                **Phases**: {}\n\n",
                state.id,
                task.lines().next().unwrap_or(task),
                state.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                plan.strategy,
                if phases.is_empty() {
                    "none".to_string()
                } else {
                    phases.join(" → ")
                }
            );
            self.append_internal(&content).await
        })
        .await;
    }

    /// Log one attempted phase
    ///
    /// This operation is fail-open - logging failures won't stop the run
    pub async fn log_phase(&self, iteration: usize, result: &PhaseResult) {
        fail_open("activity_logger::log_phase", || async {
            let mut content = format!(
                "### Phase {}: {}\n**Outcome**: {} ({} step(s), {} ms)\n",
                iteration,
                result.phase_name,
                if result.success { "✓ success" } else { "✗ failed" },
                result.completed_steps,
                result.execution_time_ms
            );

            if result.degraded {
                content.push_str("**Degraded**: a prerequisite phase did not succeed\n");
            }
            if let Some(error) = &result.error {
                content.push_str(&format!("**Error**: {}\n", error));
            }
            content.push('\n');

            for (step, output) in &result.outputs {
                content.push_str(&format!("**{}**:\n> ", step));
                content.push_str(&preview(output).replace('\n', "\n> "));
                content.push_str("\n\n");
            }

            self.append_internal(&content).await
        })
        .await;
    }

    /// Log run completion summary
    ///
    /// This operation is fail-open - logging failures won't stop the run
    pub async fn log_run_complete(&self, state: &WorkflowState) {
        fail_open("activity_logger::log_run_complete", || async {
            let succeeded = state.phase_results.iter().filter(|r| r.success).count();
            let mut content = format!(
                "### Summary\n\
                **Finished**: {}\n\
                **Status**: {}\n\
                **Phases**: {} attempted, {} succeeded\n",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                state.status,
                state.phase_results.len(),
                succeeded
            );
            for warning in &state.warnings {
                content.push_str(&format!("**Warning**: {}\n", warning));
            }
            content.push_str("\n---\n\n");

            self.append_internal(&content).await
        })
        .await;
    }

    /// Append content to the activity log (internal, returns Result for fail_open)
    async fn append_internal(&self, content: &str) -> Result<()> {
        if let Some(parent) = self.output_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let is_new = !tokio::fs::try_exists(&self.output_path).await?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)
            .await?;

        if is_new {
            file.write_all(b"# Maestro Activity Log\n\n").await?;
        }
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;

        Ok(())
    }
}

fn preview(output: &str) -> String {
    if output.chars().count() > ACTIVITY_LOG_PREVIEW_CHARS {
        let truncated: String = output.chars().take(ACTIVITY_LOG_PREVIEW_CHARS).collect();
        format!("{truncated}...")
    } else {
        output.to_string()
    }
}
