use std::path::Path;

use rusqlite::{params, Connection, Row};

use crate::error::Result;
use crate::models::{Case, Client, ExpenseEntry, FeeEntry};

pub const DB_FILE: &str = "docket.db";

pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    username TEXT NOT NULL UNIQUE,
    full_name TEXT NOT NULL DEFAULT '',
    is_staff INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS clients (
    id INTEGER PRIMARY KEY,
    person_type TEXT NOT NULL,
    name TEXT NOT NULL,
    trade_name TEXT,
    tax_id TEXT NOT NULL,
    email TEXT,
    phone TEXT,
    city TEXT,
    state TEXT,
    is_active INTEGER NOT NULL DEFAULT 1,
    registered_on TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS cases (
    id INTEGER PRIMARY KEY,
    process_number TEXT NOT NULL,
    process_type TEXT NOT NULL,
    legal_area TEXT NOT NULL,
    status TEXT NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT,
    case_value REAL,
    court_district TEXT,
    court_division TEXT,
    notes TEXT,
    client_id INTEGER,
    responsible_id INTEGER NOT NULL,
    FOREIGN KEY (client_id) REFERENCES clients(id),
    FOREIGN KEY (responsible_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS fees (
    id INTEGER PRIMARY KEY,
    case_id INTEGER,
    client_id INTEGER,
    owner_id INTEGER NOT NULL,
    billing_type TEXT NOT NULL,
    amount REAL NOT NULL,
    payment_status TEXT NOT NULL,
    due_date TEXT NOT NULL,
    paid_on TEXT,
    FOREIGN KEY (case_id) REFERENCES cases(id),
    FOREIGN KEY (client_id) REFERENCES clients(id),
    FOREIGN KEY (owner_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS expenses (
    id INTEGER PRIMARY KEY,
    case_id INTEGER,
    owner_id INTEGER NOT NULL,
    expense_type TEXT NOT NULL,
    description TEXT NOT NULL,
    amount REAL NOT NULL,
    due_date TEXT NOT NULL,
    reimbursement_status TEXT NOT NULL,
    FOREIGN KEY (case_id) REFERENCES cases(id),
    FOREIGN KEY (owner_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS report_templates (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    output_format TEXT NOT NULL DEFAULT 'pdf',
    selected_fields TEXT NOT NULL DEFAULT '[]',
    default_filters TEXT NOT NULL DEFAULT '{}',
    sort_spec TEXT NOT NULL DEFAULT '[]',
    group_spec TEXT NOT NULL DEFAULT '[]',
    layout_config TEXT NOT NULL DEFAULT '{}',
    is_public INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    owner_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS report_executions (
    id INTEGER PRIMARY KEY,
    template_id INTEGER NOT NULL,
    user_id INTEGER NOT NULL,
    params TEXT NOT NULL DEFAULT '{}',
    status TEXT NOT NULL DEFAULT 'pending',
    started_at TEXT NOT NULL,
    completed_at TEXT,
    duration_ms INTEGER,
    row_count INTEGER,
    artifact_size INTEGER,
    artifact_path TEXT,
    error_message TEXT,
    notes TEXT,
    FOREIGN KEY (template_id) REFERENCES report_templates(id),
    FOREIGN KEY (user_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_executions_user ON report_executions(user_id, started_at);
CREATE INDEX IF NOT EXISTS idx_executions_template ON report_executions(template_id, started_at);

CREATE TABLE IF NOT EXISTS saved_filters (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    category TEXT NOT NULL,
    params TEXT NOT NULL DEFAULT '{}',
    is_public INTEGER NOT NULL DEFAULT 0,
    is_favorite INTEGER NOT NULL DEFAULT 0,
    owner_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id)
);

CREATE TABLE IF NOT EXISTS dashboards (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT,
    widgets TEXT NOT NULL DEFAULT '[]',
    layout TEXT NOT NULL DEFAULT '{}',
    is_public INTEGER NOT NULL DEFAULT 0,
    is_default INTEGER NOT NULL DEFAULT 0,
    is_active INTEGER NOT NULL DEFAULT 1,
    owner_id INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    FOREIGN KEY (owner_id) REFERENCES users(id)
);
";

pub fn get_connection(db_path: &Path) -> Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA)?;
    Ok(())
}

/// Read a JSON-encoded TEXT column.
pub(crate) fn json_col<T: serde::de::DeserializeOwned>(row: &Row, idx: usize) -> rusqlite::Result<T> {
    let raw: String = row.get(idx)?;
    serde_json::from_str(&raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

pub fn insert_user(conn: &Connection, username: &str, full_name: &str, is_staff: bool) -> Result<i64> {
    conn.execute(
        "INSERT INTO users (username, full_name, is_staff) VALUES (?1, ?2, ?3)",
        params![username, full_name, is_staff],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_client(conn: &Connection, c: &Client) -> Result<i64> {
    conn.execute(
        "INSERT INTO clients (person_type, name, trade_name, tax_id, email, phone, city, state, is_active, registered_on) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            c.person_type, c.name, c.trade_name, c.tax_id, c.email, c.phone, c.city, c.state,
            c.is_active, c.registered_on
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_case(conn: &Connection, c: &Case) -> Result<i64> {
    conn.execute(
        "INSERT INTO cases (process_number, process_type, legal_area, status, start_date, end_date, \
         case_value, court_district, court_division, notes, client_id, responsible_id) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            c.process_number, c.process_type, c.legal_area, c.status, c.start_date, c.end_date,
            c.value, c.court_district, c.court_division, c.notes, c.client_id, c.responsible_id
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// `client_id` is stored separately because `FeeEntry` only carries the
/// joined client name.
pub fn insert_fee(conn: &Connection, f: &FeeEntry, client_id: Option<i64>) -> Result<i64> {
    conn.execute(
        "INSERT INTO fees (case_id, client_id, owner_id, billing_type, amount, payment_status, due_date, paid_on) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            f.case_id, client_id, f.owner_id, f.billing_type, f.amount, f.payment_status,
            f.due_date, f.paid_on
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn insert_expense(conn: &Connection, e: &ExpenseEntry) -> Result<i64> {
    conn.execute(
        "INSERT INTO expenses (case_id, owner_id, expense_type, description, amount, due_date, reimbursement_status) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            e.case_id, e.owner_id, e.expense_type, e.description, e.amount, e.due_date,
            e.reimbursement_status
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::models::{BillingType, CaseStatus, PaymentStatus, PersonType, ReimbursementStatus};

    pub(crate) fn test_db() -> (tempfile::TempDir, Connection) {
        let dir = tempfile::tempdir().unwrap();
        let conn = get_connection(&dir.path().join("test.db")).unwrap();
        init_db(&conn).unwrap();
        (dir, conn)
    }

    pub(crate) fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    pub(crate) fn seed_case(conn: &Connection, status: CaseStatus, start: &str, responsible_id: i64, value: Option<f64>) -> i64 {
        let case = Case {
            id: 0,
            process_number: format!("{:07}-00.2025.8.26.0100", conn.last_insert_rowid() + 1),
            process_type: "judicial".into(),
            legal_area: "civil".into(),
            status,
            start_date: date(start),
            end_date: None,
            value,
            court_district: Some("São Paulo".into()),
            court_division: Some("2ª Vara Cível".into()),
            notes: None,
            client_id: None,
            client_name: None,
            responsible_id,
            responsible_name: String::new(),
        };
        insert_case(conn, &case).unwrap()
    }

    pub(crate) fn seed_client(conn: &Connection, name: &str, person_type: PersonType, state: &str, registered: &str) -> i64 {
        let client = Client {
            id: 0,
            person_type,
            name: name.into(),
            trade_name: None,
            tax_id: "123.456.789-00".into(),
            email: Some(format!("{}@example.com", name.to_lowercase().replace(' ', "."))),
            phone: None,
            city: Some("São Paulo".into()),
            state: Some(state.into()),
            is_active: true,
            registered_on: date(registered),
        };
        insert_client(conn, &client).unwrap()
    }

    pub(crate) fn seed_fee(conn: &Connection, owner_id: i64, amount: f64, status: PaymentStatus, due: &str) -> i64 {
        let fee = FeeEntry {
            id: 0,
            case_id: None,
            client_name: None,
            owner_id,
            billing_type: BillingType::Fixed,
            amount,
            payment_status: status,
            due_date: date(due),
            paid_on: None,
        };
        insert_fee(conn, &fee, None).unwrap()
    }

    pub(crate) fn seed_expense(conn: &Connection, owner_id: i64, amount: f64, status: ReimbursementStatus, due: &str) -> i64 {
        let expense = ExpenseEntry {
            id: 0,
            case_id: None,
            owner_id,
            expense_type: "court_fees".into(),
            description: "Filing fee".into(),
            amount,
            due_date: date(due),
            reimbursement_status: status,
        };
        insert_expense(conn, &expense).unwrap()
    }

    #[test]
    fn test_init_db_creates_tables() {
        let (_dir, conn) = test_db();
        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%'")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<Vec<_>, _>>()
            .unwrap();
        for expected in &[
            "users", "clients", "cases", "fees", "expenses", "report_templates",
            "report_executions", "saved_filters", "dashboards",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing table: {expected}");
        }
    }

    #[test]
    fn test_init_db_is_idempotent() {
        let (_dir, conn) = test_db();
        init_db(&conn).unwrap();
    }

    #[test]
    fn test_usernames_are_unique() {
        let (_dir, conn) = test_db();
        insert_user(&conn, "ana", "Ana Souza", false).unwrap();
        assert!(insert_user(&conn, "ana", "Other Ana", true).is_err());
    }
}
