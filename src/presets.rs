//! Saved filter presets and dashboard layouts. Both are owned by a user and
//! optionally shared with everyone.

use chrono::{Local, NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::catalog::Category;
use crate::db::json_col;
use crate::error::{DocketError, Result};
use crate::filters::{FilterSpec, ParamMap};
use crate::models::User;
use crate::templates;

fn require_name(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DocketError::Validation("A name is required.".to_string()));
    }
    Ok(name)
}

// ---------------------------------------------------------------------------
// Saved filters
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct SavedFilter {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub category: Category,
    pub params: ParamMap,
    pub is_public: bool,
    pub is_favorite: bool,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct FilterDraft {
    pub name: String,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub params: ParamMap,
    pub is_public: bool,
    pub is_favorite: bool,
}

pub fn save_filter(conn: &Connection, draft: &FilterDraft, owner: &User, today: NaiveDate) -> Result<SavedFilter> {
    let name = require_name(&draft.name)?;
    let category = draft
        .category
        .ok_or_else(|| DocketError::Validation("Filter category is required.".to_string()))?;
    FilterSpec::from_params(&draft.params, today)?;
    conn.execute(
        "INSERT INTO saved_filters (name, description, category, params, is_public, is_favorite, owner_id, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            name,
            draft.description,
            category,
            serde_json::to_string(&draft.params)?,
            draft.is_public,
            draft.is_favorite,
            owner.id,
            Local::now().naive_local(),
        ],
    )?;
    let id = conn.last_insert_rowid();
    tracing::debug!(filter_id = id, %category, "filter saved");
    get_filter(conn, id)
}

const SELECT_FILTER: &str = "SELECT id, name, description, category, params, is_public, is_favorite, \
     owner_id, created_at FROM saved_filters";

fn map_filter(row: &Row) -> rusqlite::Result<SavedFilter> {
    Ok(SavedFilter {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        category: row.get(3)?,
        params: json_col(row, 4)?,
        is_public: row.get(5)?,
        is_favorite: row.get(6)?,
        owner_id: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn get_filter(conn: &Connection, id: i64) -> Result<SavedFilter> {
    let mut stmt = conn.prepare(&format!("{SELECT_FILTER} WHERE id = ?1"))?;
    let mut rows = stmt.query_map([id], map_filter)?;
    match rows.next() {
        Some(f) => Ok(f?),
        None => Err(DocketError::NotFound(format!("saved filter {id}"))),
    }
}

/// Own and public filters, favourites first.
pub fn list_filters(conn: &Connection, user: &User, category: Option<Category>) -> Result<Vec<SavedFilter>> {
    let sql = format!(
        "{SELECT_FILTER} WHERE (owner_id = ?1 OR is_public = 1) AND (?2 IS NULL OR category = ?2) \
         ORDER BY is_favorite DESC, name, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![user.id, category], map_filter)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

/// Parameters of a saved filter, if the user owns it or it is public.
/// Parameters of saved filter `id` for a run of a `category` template.
pub fn apply_filter(conn: &Connection, id: i64, user: &User, category: Category) -> Result<ParamMap> {
    let filter = get_filter(conn, id)?;
    if !(filter.is_public || filter.owner_id == user.id) {
        return Err(DocketError::PermissionDenied(format!(
            "filter '{}' belongs to another user",
            filter.name
        )));
    }
    if filter.category != category {
        return Err(DocketError::Validation(format!(
            "Filter '{}' is for {} reports, not {}.",
            filter.name, filter.category, category
        )));
    }
    Ok(filter.params)
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

/// One dashboard tile: a report template rendered as its chart series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Widget {
    pub template_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Dashboard {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub widgets: Vec<Widget>,
    pub layout: serde_json::Value,
    pub is_public: bool,
    pub is_default: bool,
    pub is_active: bool,
    pub owner_id: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default)]
pub struct DashboardDraft {
    pub name: String,
    pub description: Option<String>,
    pub widgets: Vec<Widget>,
    pub is_public: bool,
    pub is_default: bool,
}

/// Save a dashboard. Every widget must point at a template the owner can
/// run; marking it default clears the owner's previous default.
pub fn save_dashboard(conn: &Connection, draft: &DashboardDraft, owner: &User) -> Result<Dashboard> {
    let name = require_name(&draft.name)?;
    for widget in &draft.widgets {
        templates::template_for_run(conn, widget.template_id, owner)?;
    }
    let now = Local::now().naive_local();
    let tx = conn.unchecked_transaction()?;
    if draft.is_default {
        tx.execute(
            "UPDATE dashboards SET is_default = 0, updated_at = ?1 WHERE owner_id = ?2 AND is_default = 1",
            params![now, owner.id],
        )?;
    }
    tx.execute(
        "INSERT INTO dashboards (name, description, widgets, layout, is_public, is_default, is_active, \
         owner_id, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?8, ?8)",
        params![
            name,
            draft.description,
            serde_json::to_string(&draft.widgets)?,
            serde_json::json!({ "columns": 2 }).to_string(),
            draft.is_public,
            draft.is_default,
            owner.id,
            now,
        ],
    )?;
    let id = tx.last_insert_rowid();
    tx.commit()?;
    tracing::debug!(dashboard_id = id, widgets = draft.widgets.len(), "dashboard saved");
    let mut stmt = conn.prepare(&format!("{SELECT_DASHBOARD} WHERE id = ?1"))?;
    Ok(stmt.query_row([id], map_dashboard)?)
}

const SELECT_DASHBOARD: &str = "SELECT id, name, description, widgets, layout, is_public, is_default, \
     is_active, owner_id, created_at, updated_at FROM dashboards";

fn map_dashboard(row: &Row) -> rusqlite::Result<Dashboard> {
    Ok(Dashboard {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        widgets: json_col(row, 3)?,
        layout: json_col(row, 4)?,
        is_public: row.get(5)?,
        is_default: row.get(6)?,
        is_active: row.get(7)?,
        owner_id: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Active dashboards the user owns or that are public; the user's default first.
pub fn list_dashboards(conn: &Connection, user: &User) -> Result<Vec<Dashboard>> {
    let sql = format!(
        "{SELECT_DASHBOARD} WHERE is_active = 1 AND (owner_id = ?1 OR is_public = 1) \
         ORDER BY (owner_id = ?1 AND is_default = 1) DESC, name, id"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([user.id], map_dashboard)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::insert_user;
    use crate::db::tests::{date, test_db};
    use crate::templates::{create_template, TemplateDraft};

    fn user(conn: &Connection, name: &str) -> User {
        let id = insert_user(conn, name, "", false).unwrap();
        User { id, username: name.into(), full_name: String::new(), is_staff: false }
    }

    fn filter_draft(name: &str, public: bool) -> FilterDraft {
        let mut params = ParamMap::new();
        params.insert("period".into(), "last_month".into());
        params.insert("case_status".into(), "active".into());
        FilterDraft {
            name: name.into(),
            category: Some(Category::Cases),
            params,
            is_public: public,
            ..Default::default()
        }
    }

    #[test]
    fn test_saved_filter_visibility_and_apply() {
        let (_dir, conn) = test_db();
        let ana = user(&conn, "ana");
        let bruno = user(&conn, "bruno");
        let today = date("2025-06-12");

        let private = save_filter(&conn, &filter_draft("Mine", false), &ana, today).unwrap();
        let shared = save_filter(&conn, &filter_draft("Shared", true), &ana, today).unwrap();

        assert_eq!(list_filters(&conn, &ana, None).unwrap().len(), 2);
        assert_eq!(list_filters(&conn, &bruno, None).unwrap().len(), 1);
        assert!(list_filters(&conn, &ana, Some(Category::Clients)).unwrap().is_empty());
        assert_eq!(list_filters(&conn, &ana, Some(Category::Cases)).unwrap().len(), 2);

        let params = apply_filter(&conn, shared.id, &bruno, Category::Cases).unwrap();
        assert_eq!(params["case_status"], "active");
        assert!(matches!(
            apply_filter(&conn, private.id, &bruno, Category::Cases),
            Err(DocketError::PermissionDenied(_))
        ));
        assert!(matches!(apply_filter(&conn, 999, &ana, Category::Cases), Err(DocketError::NotFound(_))));
    }

    #[test]
    fn test_apply_filter_rejects_other_category() {
        let (_dir, conn) = test_db();
        let ana = user(&conn, "ana");
        let saved = save_filter(&conn, &filter_draft("Active", false), &ana, date("2025-06-12")).unwrap();
        let err = apply_filter(&conn, saved.id, &ana, Category::Clients).unwrap_err();
        assert!(matches!(err, DocketError::Validation(ref m) if m.contains("cases")), "{err}");
    }

    #[test]
    fn test_saved_filter_rejects_invalid_params() {
        let (_dir, conn) = test_db();
        let ana = user(&conn, "ana");
        let mut draft = filter_draft("Broken", false);
        draft.params.insert("min_value".into(), "ten".into());
        assert!(save_filter(&conn, &draft, &ana, date("2025-06-12")).is_err());
    }

    #[test]
    fn test_dashboard_default_is_unique_per_owner() {
        let (_dir, conn) = test_db();
        let ana = user(&conn, "ana");
        let template = create_template(
            &conn,
            &TemplateDraft {
                name: "Cases".into(),
                category: Some(Category::Cases),
                fields: vec!["case_status".into()],
                ..Default::default()
            },
            &ana,
            date("2025-06-12"),
        )
        .unwrap();
        let widget = Widget { template_id: template.id, title: Some("By status".into()) };

        let first = DashboardDraft { name: "Main".into(), widgets: vec![widget.clone()], is_default: true, ..Default::default() };
        let second = DashboardDraft { name: "Alt".into(), widgets: vec![widget.clone()], is_default: true, ..Default::default() };
        save_dashboard(&conn, &first, &ana).unwrap();
        let alt = save_dashboard(&conn, &second, &ana).unwrap();

        let listed = list_dashboards(&conn, &ana).unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, alt.id);
        assert!(listed[0].is_default);
        assert!(!listed[1].is_default);
        assert_eq!(listed[0].widgets, vec![widget]);
    }

    #[test]
    fn test_failed_default_dashboard_keeps_previous_default() {
        let (_dir, conn) = test_db();
        let ana = user(&conn, "ana");
        let template = create_template(
            &conn,
            &TemplateDraft {
                name: "Cases".into(),
                category: Some(Category::Cases),
                fields: vec!["case_status".into()],
                ..Default::default()
            },
            &ana,
            date("2025-06-12"),
        )
        .unwrap();
        let widget = Widget { template_id: template.id, title: None };
        let main = DashboardDraft { name: "Main".into(), widgets: vec![widget.clone()], is_default: true, ..Default::default() };
        save_dashboard(&conn, &main, &ana).unwrap();

        conn.execute_batch(
            "CREATE TRIGGER reject_broken BEFORE INSERT ON dashboards WHEN NEW.name = 'Broken' \
             BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
        )
        .unwrap();
        let broken = DashboardDraft { name: "Broken".into(), widgets: vec![widget], is_default: true, ..Default::default() };
        assert!(save_dashboard(&conn, &broken, &ana).is_err());

        let listed = list_dashboards(&conn, &ana).unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].is_default, "the earlier default survives the failed insert");
    }

    #[test]
    fn test_dashboard_rejects_unknown_template() {
        let (_dir, conn) = test_db();
        let ana = user(&conn, "ana");
        let draft = DashboardDraft {
            name: "Main".into(),
            widgets: vec![Widget { template_id: 42, title: None }],
            ..Default::default()
        };
        assert!(matches!(save_dashboard(&conn, &draft, &ana), Err(DocketError::NotFound(_))));
        assert!(list_dashboards(&conn, &ana).unwrap().is_empty());
    }
}
