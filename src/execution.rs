use std::path::Path;

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};

use crate::db::json_col;
use crate::engine::{ReportEngine, ReportResult};
use crate::error::{DocketError, Result};
use crate::filters::{merge_params, FilterSpec, ParamMap};
use crate::models::{text_enum, User};
use crate::templates::ReportTemplate;

text_enum!(ExecutionStatus {
    Pending => "pending",
    Completed => "completed",
    Failed => "failed",
    Cancelled => "cancelled",
});

impl ExecutionStatus {
    pub fn is_terminal(self) -> bool {
        self != ExecutionStatus::Pending
    }
}

/// One attempt at running a template. `params` is the resolved filter
/// snapshot and never changes after creation.
#[derive(Debug, Clone)]
pub struct ReportExecution {
    pub id: i64,
    pub template_id: i64,
    pub template_name: String,
    pub user_id: i64,
    pub params: ParamMap,
    pub status: ExecutionStatus,
    pub started_at: NaiveDateTime,
    pub completed_at: Option<NaiveDateTime>,
    pub duration_ms: Option<i64>,
    pub row_count: Option<i64>,
    pub artifact_size: Option<i64>,
    pub artifact_path: Option<String>,
    pub error_message: Option<String>,
    pub notes: Option<String>,
}

impl ReportExecution {
    pub fn formatted_size(&self) -> String {
        crate::fmt::file_size(self.artifact_size.and_then(|s| u64::try_from(s).ok()))
    }
}

const SELECT_EXECUTION: &str = "SELECT e.id, e.template_id, COALESCE(t.name, ''), e.user_id, e.params, \
     e.status, e.started_at, e.completed_at, e.duration_ms, e.row_count, e.artifact_size, \
     e.artifact_path, e.error_message, e.notes \
     FROM report_executions e LEFT JOIN report_templates t ON e.template_id = t.id";

fn map_execution(row: &Row) -> rusqlite::Result<ReportExecution> {
    Ok(ReportExecution {
        id: row.get(0)?,
        template_id: row.get(1)?,
        template_name: row.get(2)?,
        user_id: row.get(3)?,
        params: json_col(row, 4)?,
        status: row.get(5)?,
        started_at: row.get(6)?,
        completed_at: row.get(7)?,
        duration_ms: row.get(8)?,
        row_count: row.get(9)?,
        artifact_size: row.get(10)?,
        artifact_path: row.get(11)?,
        error_message: row.get(12)?,
        notes: row.get(13)?,
    })
}

/// Persists execution attempts and guards their state machine: pending moves
/// once to completed, failed or cancelled, and never leaves a terminal state.
pub struct ExecutionTracker<'c> {
    conn: &'c Connection,
}

impl<'c> ExecutionTracker<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    pub fn start(&self, template: &ReportTemplate, user: &User, filter: &FilterSpec) -> Result<ReportExecution> {
        let params = filter.to_params();
        let started_at = Local::now().naive_local();
        self.conn.execute(
            "INSERT INTO report_executions (template_id, user_id, params, status, started_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                template.id,
                user.id,
                serde_json::to_string(&params)?,
                ExecutionStatus::Pending,
                started_at
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(execution_id = id, template_id = template.id, user = %user.username, "execution started");
        Ok(ReportExecution {
            id,
            template_id: template.id,
            template_name: template.name.clone(),
            user_id: user.id,
            params,
            status: ExecutionStatus::Pending,
            started_at,
            completed_at: None,
            duration_ms: None,
            row_count: None,
            artifact_size: None,
            artifact_path: None,
            error_message: None,
            notes: None,
        })
    }

    pub fn complete(&self, execution: &mut ReportExecution, row_count: usize) -> Result<()> {
        let rows = i64::try_from(row_count).unwrap_or(i64::MAX);
        self.finish(execution, ExecutionStatus::Completed, Some(rows), None)
    }

    pub fn fail(&self, execution: &mut ReportExecution, message: &str) -> Result<()> {
        self.finish(execution, ExecutionStatus::Failed, None, Some(message))
    }

    pub fn cancel(&self, execution: &mut ReportExecution) -> Result<()> {
        self.finish(execution, ExecutionStatus::Cancelled, None, None)
    }

    /// Cancel execution `id` on behalf of the user who started it.
    pub fn cancel_owned(&self, id: i64, user: &User) -> Result<ReportExecution> {
        let mut execution = self.get(id)?;
        if execution.user_id != user.id {
            return Err(DocketError::PermissionDenied(format!("execution {id} belongs to another user")));
        }
        self.cancel(&mut execution)?;
        Ok(execution)
    }

    fn finish(
        &self,
        execution: &mut ReportExecution,
        to: ExecutionStatus,
        row_count: Option<i64>,
        error_message: Option<&str>,
    ) -> Result<()> {
        if execution.status.is_terminal() {
            return Err(DocketError::InvalidTransition {
                id: execution.id,
                from: execution.status.as_str(),
                to: to.as_str(),
            });
        }
        let completed_at = Local::now().naive_local();
        let duration_ms = (completed_at - execution.started_at).num_milliseconds().max(0);
        let changed = self.conn.execute(
            "UPDATE report_executions SET status = ?1, completed_at = ?2, duration_ms = ?3, \
             row_count = ?4, error_message = ?5 WHERE id = ?6 AND status = 'pending'",
            params![to, completed_at, duration_ms, row_count, error_message, execution.id],
        )?;
        if changed == 0 {
            // Another handle already finished this row; report what it holds.
            let current = self.get(execution.id)?;
            return Err(DocketError::InvalidTransition {
                id: execution.id,
                from: current.status.as_str(),
                to: to.as_str(),
            });
        }
        execution.status = to;
        execution.completed_at = Some(completed_at);
        execution.duration_ms = Some(duration_ms);
        execution.row_count = row_count;
        execution.error_message = error_message.map(str::to_string);
        match to {
            ExecutionStatus::Failed => {
                tracing::warn!(execution_id = execution.id, error = error_message, "execution failed")
            }
            _ => tracing::info!(execution_id = execution.id, status = %to, duration_ms, rows = row_count, "execution finished"),
        }
        Ok(())
    }

    /// Attach a written export to a completed execution.
    pub fn record_artifact(&self, execution: &mut ReportExecution, path: &Path, size: u64) -> Result<()> {
        if execution.status != ExecutionStatus::Completed {
            return Err(DocketError::Validation(format!(
                "Execution {} is {}; only completed executions can be exported.",
                execution.id, execution.status
            )));
        }
        let size = i64::try_from(size).unwrap_or(i64::MAX);
        let path = path.to_string_lossy().to_string();
        self.conn.execute(
            "UPDATE report_executions SET artifact_path = ?1, artifact_size = ?2 WHERE id = ?3",
            params![path, size, execution.id],
        )?;
        tracing::debug!(execution_id = execution.id, size, path = %path, "artifact recorded");
        execution.artifact_path = Some(path);
        execution.artifact_size = Some(size);
        Ok(())
    }

    pub fn set_notes(&self, execution: &mut ReportExecution, notes: &str) -> Result<()> {
        self.conn.execute(
            "UPDATE report_executions SET notes = ?1 WHERE id = ?2",
            params![notes, execution.id],
        )?;
        execution.notes = Some(notes.to_string());
        Ok(())
    }

    pub fn get(&self, id: i64) -> Result<ReportExecution> {
        let mut stmt = self.conn.prepare(&format!("{SELECT_EXECUTION} WHERE e.id = ?1"))?;
        let mut rows = stmt.query_map([id], map_execution)?;
        match rows.next() {
            Some(e) => Ok(e?),
            None => Err(DocketError::NotFound(format!("execution {id}"))),
        }
    }

    /// The user's executions, newest first.
    pub fn history(&self, user: &User, limit: usize) -> Result<Vec<ReportExecution>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let sql = format!("{SELECT_EXECUTION} WHERE e.user_id = ?1 ORDER BY e.started_at DESC, e.id DESC LIMIT ?2");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![user.id, limit], map_execution)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

/// Validate parameters, then run `template` under a tracked execution.
///
/// Validation failures return before any execution row exists. Once started,
/// any generation error is recorded on the execution and surfaced as
/// `ExecutionFailed` carrying the original message.
pub fn run_report(
    tracker: &ExecutionTracker,
    engine: &ReportEngine,
    template: &ReportTemplate,
    request: &ParamMap,
    user: &User,
    today: NaiveDate,
) -> Result<(ReportExecution, ReportResult)> {
    if !template.visible_to(user) {
        return Err(DocketError::NotFound(format!("template {}", template.id)));
    }
    if !template.is_active {
        return Err(DocketError::Validation(format!("Template '{}' is inactive.", template.name)));
    }
    let merged = merge_params(&template.default_filters, request);
    let filter = FilterSpec::from_params(&merged, today)?;

    let mut execution = tracker.start(template, user, &filter)?;
    match engine.generate(template, &filter, user) {
        Ok(result) => {
            tracker.complete(&mut execution, result.row_count())?;
            Ok((execution, result))
        }
        Err(e) => {
            let message = e.to_string();
            tracker.fail(&mut execution, &message)?;
            Err(DocketError::ExecutionFailed { id: execution.id, message })
        }
    }
}

/// Regenerate a completed execution's rowset from its parameter snapshot.
/// Only the user who ran it may do so.
pub fn reproduce(
    engine: &ReportEngine,
    template: &ReportTemplate,
    execution: &ReportExecution,
    user: &User,
) -> Result<ReportResult> {
    if execution.user_id != user.id {
        return Err(DocketError::PermissionDenied(format!(
            "execution {} belongs to another user",
            execution.id
        )));
    }
    if execution.status != ExecutionStatus::Completed {
        return Err(DocketError::Validation(format!(
            "Execution {} is {}; only completed executions can be exported.",
            execution.id, execution.status
        )));
    }
    let filter = FilterSpec::from_params(&execution.params, execution.started_at.date())?;
    engine.generate(template, &filter, user)
}
