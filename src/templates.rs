use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};

use crate::catalog::{is_valid, Category, FieldRef};
use crate::db::json_col;
use crate::error::{DocketError, Result};
use crate::filters::{FilterSpec, ParamMap};
use crate::models::{text_enum, User};

text_enum!(OutputFormat {
    Pdf => "pdf",
    Spreadsheet => "spreadsheet",
    Csv => "csv",
    Html => "html",
});

/// A reusable report definition.
#[derive(Debug, Clone)]
pub struct ReportTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub output_format: OutputFormat,
    pub selected_fields: Vec<FieldRef>,
    pub default_filters: ParamMap,
    /// Field ids, `-` prefix for descending.
    pub sort_spec: Vec<String>,
    pub group_spec: Vec<String>,
    pub layout_config: serde_json::Value,
    pub is_public: bool,
    pub is_active: bool,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ReportTemplate {
    pub fn visible_to(&self, user: &User) -> bool {
        user.is_staff || self.is_public || self.owner_id == user.id
    }
}

/// User input for a new template, before validation.
#[derive(Debug, Clone, Default)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub output_format: Option<OutputFormat>,
    pub fields: Vec<String>,
    pub default_filters: ParamMap,
    pub sort_spec: Vec<String>,
    pub group_spec: Vec<String>,
    pub is_public: bool,
}

/// Parse selected field ids, rejecting an empty selection and any id outside
/// `category`. Duplicates keep their first position.
pub fn validate_fields(category: Category, ids: &[String]) -> Result<Vec<FieldRef>> {
    let mut fields: Vec<FieldRef> = Vec::with_capacity(ids.len());
    for id in ids.iter().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        let field = FieldRef::parse(id)
            .filter(|_| is_valid(category, id))
            .ok_or_else(|| {
                DocketError::Validation(format!("Field '{id}' is not available for {category} reports."))
            })?;
        if !fields.contains(&field) {
            fields.push(field);
        }
    }
    if fields.is_empty() {
        return Err(DocketError::Validation("Select at least one field.".to_string()));
    }
    Ok(fields)
}

fn validate_sort(fields: &[FieldRef], sort_spec: &[String]) -> Result<()> {
    for key in sort_spec {
        let id = key.strip_prefix('-').unwrap_or(key);
        if !fields.iter().any(|f| f.id() == id) {
            return Err(DocketError::Validation(format!(
                "Sort key '{key}' must name a selected field."
            )));
        }
    }
    Ok(())
}

pub fn create_template(conn: &Connection, draft: &TemplateDraft, owner: &User, today: NaiveDate) -> Result<ReportTemplate> {
    let name = draft.name.trim();
    if name.is_empty() {
        return Err(DocketError::Validation("Template name is required.".to_string()));
    }
    let category = draft
        .category
        .ok_or_else(|| DocketError::Validation("Template category is required.".to_string()))?;
    let selected_fields = validate_fields(category, &draft.fields)?;
    validate_sort(&selected_fields, &draft.sort_spec)?;
    // Defaults must parse on their own so a run with no overrides can start.
    FilterSpec::from_params(&draft.default_filters, today)?;

    let now = Local::now().naive_local();
    let field_ids: Vec<&str> = selected_fields.iter().map(|f| f.id()).collect();
    let output_format = draft.output_format.unwrap_or(OutputFormat::Pdf);
    let layout_config = serde_json::json!({});
    conn.execute(
        "INSERT INTO report_templates (name, description, category, output_format, selected_fields, \
         default_filters, sort_spec, group_spec, layout_config, is_public, is_active, owner_id, \
         created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, 1, ?11, ?12, ?12)",
        params![
            name,
            draft.description,
            category,
            output_format,
            serde_json::to_string(&field_ids)?,
            serde_json::to_string(&draft.default_filters)?,
            serde_json::to_string(&draft.sort_spec)?,
            serde_json::to_string(&draft.group_spec)?,
            layout_config.to_string(),
            draft.is_public,
            owner.id,
            now,
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::info!(template_id = id, %category, fields = field_ids.len(), "template created");
    get_template(conn, id)
}

const SELECT_TEMPLATE: &str = "SELECT id, name, description, category, output_format, selected_fields, \
     default_filters, sort_spec, group_spec, layout_config, is_public, is_active, owner_id, \
     created_at, updated_at FROM report_templates";

fn map_template(row: &Row) -> rusqlite::Result<ReportTemplate> {
    let ids: Vec<String> = json_col(row, 5)?;
    // Stored ids that no longer parse are dropped rather than failing the load.
    let selected_fields = ids.iter().filter_map(|id| FieldRef::parse(id)).collect();
    Ok(ReportTemplate {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        output_format: row.get(4)?,
        selected_fields,
        default_filters: json_col(row, 6)?,
        sort_spec: json_col(row, 7)?,
        group_spec: json_col(row, 8)?,
        layout_config: json_col(row, 9)?,
        is_public: row.get(10)?,
        is_active: row.get(11)?,
        owner_id: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

pub fn get_template(conn: &Connection, id: i64) -> Result<ReportTemplate> {
    let mut stmt = conn.prepare(&format!("{SELECT_TEMPLATE} WHERE id = ?1"))?;
    let mut rows = stmt.query_map([id], map_template)?;
    match rows.next() {
        Some(t) => Ok(t?),
        None => Err(DocketError::NotFound(format!("template {id}"))),
    }
}

/// Load a template for execution: invisible templates are reported as
/// missing, inactive ones as a validation error.
pub fn template_for_run(conn: &Connection, id: i64, user: &User) -> Result<ReportTemplate> {
    let template = get_template(conn, id)?;
    if !template.visible_to(user) {
        return Err(DocketError::NotFound(format!("template {id}")));
    }
    if !template.is_active {
        return Err(DocketError::Validation(format!(
            "Template '{}' is inactive.",
            template.name
        )));
    }
    Ok(template)
}

/// Active templates the user may see, by name.
pub fn list_visible(conn: &Connection, user: &User) -> Result<Vec<ReportTemplate>> {
    let sql = format!(
        "{SELECT_TEMPLATE} WHERE is_active = 1 AND (?1 OR is_public = 1 OR owner_id = ?2) \
         ORDER BY name, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user.is_staff, user.id], map_template)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Soft-delete. Only the owner or a staff user may deactivate.
pub fn deactivate(conn: &Connection, id: i64, user: &User) -> Result<()> {
    let template = get_template(conn, id)?;
    if !(user.is_staff || template.owner_id == user.id) {
        return Err(DocketError::PermissionDenied(format!(
            "only the owner may delete template '{}'",
            template.name
        )));
    }
    conn.execute(
        "UPDATE report_templates SET is_active = 0, updated_at = ?1 WHERE id = ?2",
        params![Local::now().naive_local(), id],
    )?;
    tracing::info!(template_id = id, "template deactivated");
    Ok(())
}

/// Number of executions and the most recent start time.
pub fn usage(conn: &Connection, id: i64) -> Result<(i64, Option<NaiveDateTime>)> {
    Ok(conn.query_row(
        "SELECT COUNT(*), MAX(started_at) FROM report_executions WHERE template_id = ?1",
        [id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?)
}
