use rusqlite::types::{ToSql, Value};
use rusqlite::{Connection, Row};

use crate::error::{DocketError, Result};
use crate::models::{Case, CaseStatus, Client, ExpenseEntry, FeeEntry, PaymentStatus, PersonType, User};
use crate::period::DateWindow;

/// Read access to the practice records a report can draw from.
pub trait RecordStore {
    fn cases(&self, query: &CaseQuery) -> Result<Vec<Case>>;
    fn clients(&self, query: &ClientQuery) -> Result<Vec<Client>>;
    fn fees(&self, query: &FinancialQuery) -> Result<Vec<FeeEntry>>;
    fn expenses(&self, query: &FinancialQuery) -> Result<Vec<ExpenseEntry>>;
}

// ---------------------------------------------------------------------------
// Query builders
// ---------------------------------------------------------------------------

/// Cases matched on start date.
#[derive(Debug, Clone, Default)]
pub struct CaseQuery {
    /// Restrict to cases this user is responsible for (non-staff scoping).
    pub scope: Option<i64>,
    pub window: DateWindow,
    pub process_type: Option<String>,
    pub legal_area: Option<String>,
    pub status: Option<CaseStatus>,
    pub responsible: Option<i64>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl CaseQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scoped_to(mut self, user_id: Option<i64>) -> Self {
        self.scope = user_id;
        self
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn process_type(mut self, value: Option<&str>) -> Self {
        self.process_type = value.map(str::to_string);
        self
    }

    pub fn legal_area(mut self, value: Option<&str>) -> Self {
        self.legal_area = value.map(str::to_string);
        self
    }

    pub fn status(mut self, status: Option<CaseStatus>) -> Self {
        self.status = status;
        self
    }

    pub fn responsible(mut self, user_id: Option<i64>) -> Self {
        self.responsible = user_id;
        self
    }

    pub fn value_between(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }
}

/// Clients matched on registration date. Never scoped by user.
#[derive(Debug, Clone, Default)]
pub struct ClientQuery {
    pub window: DateWindow,
    pub person_type: Option<PersonType>,
    pub state: Option<String>,
}

impl ClientQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn person_type(mut self, person_type: Option<PersonType>) -> Self {
        self.person_type = person_type;
        self
    }

    pub fn state(mut self, state: Option<&str>) -> Self {
        self.state = state.map(str::to_string);
        self
    }
}

/// Fees and expenses matched on due date. `payment_status` only narrows fees.
#[derive(Debug, Clone, Default)]
pub struct FinancialQuery {
    pub scope: Option<i64>,
    pub window: DateWindow,
    pub payment_status: Option<PaymentStatus>,
}

impl FinancialQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scoped_to(mut self, user_id: Option<i64>) -> Self {
        self.scope = user_id;
        self
    }

    pub fn within(mut self, window: DateWindow) -> Self {
        self.window = window;
        self
    }

    pub fn payment_status(mut self, status: Option<PaymentStatus>) -> Self {
        self.payment_status = status;
        self
    }
}

// ---------------------------------------------------------------------------
// WHERE clause assembly
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Clauses {
    sql: Vec<String>,
    params: Vec<Value>,
}

impl Clauses {
    fn push(&mut self, column: &str, op: &str, value: Value) {
        self.params.push(value);
        self.sql.push(format!("{column} {op} ?{}", self.params.len()));
    }

    fn eq(&mut self, column: &str, value: Option<Value>) {
        if let Some(v) = value {
            self.push(column, "=", v);
        }
    }

    fn window(&mut self, column: &str, window: &DateWindow) {
        if let Some(start) = window.start {
            self.push(column, ">=", Value::Text(start.format("%Y-%m-%d").to_string()));
        }
        if let Some(end) = window.end {
            self.push(column, "<=", Value::Text(end.format("%Y-%m-%d").to_string()));
        }
    }

    fn where_sql(&self) -> String {
        if self.sql.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.sql.join(" AND "))
        }
    }

    fn bind(&self) -> Vec<&dyn ToSql> {
        self.params.iter().map(|p| p as &dyn ToSql).collect()
    }
}

fn text(s: &str) -> Value {
    Value::Text(s.to_string())
}

// ---------------------------------------------------------------------------
// SQLite implementation
// ---------------------------------------------------------------------------

pub struct SqliteStore<'c> {
    conn: &'c Connection,
}

impl<'c> SqliteStore<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn query<T>(&self, sql: &str, clauses: &Clauses, map: fn(&Row) -> rusqlite::Result<T>) -> Result<Vec<T>> {
        tracing::trace!(sql, params = clauses.params.len(), "record query");
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(clauses.bind().as_slice(), map)?;
        Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
    }
}

impl RecordStore for SqliteStore<'_> {
    fn cases(&self, q: &CaseQuery) -> Result<Vec<Case>> {
        let mut c = Clauses::default();
        c.eq("c.responsible_id", q.scope.map(Value::Integer));
        c.window("c.start_date", &q.window);
        c.eq("c.process_type", q.process_type.as_deref().map(text));
        c.eq("c.legal_area", q.legal_area.as_deref().map(text));
        c.eq("c.status", q.status.map(|s| text(s.as_str())));
        c.eq("c.responsible_id", q.responsible.map(Value::Integer));
        if let Some(min) = q.min_value {
            c.push("c.case_value", ">=", Value::Real(min));
        }
        if let Some(max) = q.max_value {
            c.push("c.case_value", "<=", Value::Real(max));
        }
        let sql = format!(
            "SELECT c.id, c.process_number, c.process_type, c.legal_area, c.status, c.start_date, \
             c.end_date, c.case_value, c.court_district, c.court_division, c.notes, c.client_id, \
             cl.name, c.responsible_id, COALESCE(NULLIF(u.full_name, ''), u.username, '') \
             FROM cases c \
             LEFT JOIN clients cl ON c.client_id = cl.id \
             LEFT JOIN users u ON c.responsible_id = u.id{} \
             ORDER BY c.start_date, c.id",
            c.where_sql()
        );
        self.query(&sql, &c, |row| {
            Ok(Case {
                id: row.get(0)?,
                process_number: row.get(1)?,
                process_type: row.get(2)?,
                legal_area: row.get(3)?,
                status: row.get(4)?,
                start_date: row.get(5)?,
                end_date: row.get(6)?,
                value: row.get(7)?,
                court_district: row.get(8)?,
                court_division: row.get(9)?,
                notes: row.get(10)?,
                client_id: row.get(11)?,
                client_name: row.get(12)?,
                responsible_id: row.get(13)?,
                responsible_name: row.get(14)?,
            })
        })
    }

    fn clients(&self, q: &ClientQuery) -> Result<Vec<Client>> {
        let mut c = Clauses::default();
        c.window("registered_on", &q.window);
        c.eq("person_type", q.person_type.map(|p| text(p.as_str())));
        c.eq("UPPER(state)", q.state.as_deref().map(|s| text(&s.to_uppercase())));
        let sql = format!(
            "SELECT id, person_type, name, trade_name, tax_id, email, phone, city, state, \
             is_active, registered_on FROM clients{} ORDER BY name, id",
            c.where_sql()
        );
        self.query(&sql, &c, |row| {
            Ok(Client {
                id: row.get(0)?,
                person_type: row.get(1)?,
                name: row.get(2)?,
                trade_name: row.get(3)?,
                tax_id: row.get(4)?,
                email: row.get(5)?,
                phone: row.get(6)?,
                city: row.get(7)?,
                state: row.get(8)?,
                is_active: row.get(9)?,
                registered_on: row.get(10)?,
            })
        })
    }

    fn fees(&self, q: &FinancialQuery) -> Result<Vec<FeeEntry>> {
        let mut c = Clauses::default();
        c.eq("f.owner_id", q.scope.map(Value::Integer));
        c.window("f.due_date", &q.window);
        c.eq("f.payment_status", q.payment_status.map(|s| text(s.as_str())));
        let sql = format!(
            "SELECT f.id, f.case_id, COALESCE(fc.name, cc.name), f.owner_id, \
             f.billing_type, f.amount, f.payment_status, f.due_date, f.paid_on \
             FROM fees f \
             LEFT JOIN cases c ON f.case_id = c.id \
             LEFT JOIN clients fc ON f.client_id = fc.id \
             LEFT JOIN clients cc ON c.client_id = cc.id{} \
             ORDER BY f.due_date, f.id",
            c.where_sql()
        );
        self.query(&sql, &c, |row| {
            Ok(FeeEntry {
                id: row.get(0)?,
                case_id: row.get(1)?,
                client_name: row.get(2)?,
                owner_id: row.get(3)?,
                billing_type: row.get(4)?,
                amount: row.get(5)?,
                payment_status: row.get(6)?,
                due_date: row.get(7)?,
                paid_on: row.get(8)?,
            })
        })
    }

    fn expenses(&self, q: &FinancialQuery) -> Result<Vec<ExpenseEntry>> {
        let mut c = Clauses::default();
        c.eq("e.owner_id", q.scope.map(Value::Integer));
        c.window("e.due_date", &q.window);
        let sql = format!(
            "SELECT e.id, e.case_id, e.owner_id, e.expense_type, e.description, \
             e.amount, e.due_date, e.reimbursement_status \
             FROM expenses e{} \
             ORDER BY e.due_date, e.id",
            c.where_sql()
        );
        self.query(&sql, &c, |row| {
            Ok(ExpenseEntry {
                id: row.get(0)?,
                case_id: row.get(1)?,
                owner_id: row.get(2)?,
                expense_type: row.get(3)?,
                description: row.get(4)?,
                amount: row.get(5)?,
                due_date: row.get(6)?,
                reimbursement_status: row.get(7)?,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

fn map_user(row: &Row) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        full_name: row.get(2)?,
        is_staff: row.get(3)?,
    })
}

pub fn find_user(conn: &Connection, username: &str) -> Result<User> {
    let mut stmt = conn.prepare(
        "SELECT id, username, full_name, is_staff FROM users WHERE username = ?1 AND is_active = 1",
    )?;
    let mut rows = stmt.query_map([username], map_user)?;
    match rows.next() {
        Some(user) => Ok(user?),
        None => Err(DocketError::NotFound(format!("user '{username}'"))),
    }
}

pub fn list_users(conn: &Connection) -> Result<Vec<User>> {
    let mut stmt = conn.prepare(
        "SELECT id, username, full_name, is_staff FROM users WHERE is_active = 1 ORDER BY username",
    )?;
    let rows = stmt.query_map([], map_user)?;
    Ok(rows.collect::<std::result::Result<Vec<_>, _>>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::insert_user;
    use crate::db::tests::{date, seed_case, seed_client, seed_expense, seed_fee, test_db};
    use crate::models::ReimbursementStatus;

    #[test]
    fn test_case_window_is_inclusive() {
        let (_dir, conn) = test_db();
        let ana = insert_user(&conn, "ana", "Ana Souza", false).unwrap();
        seed_case(&conn, CaseStatus::Active, "2024-12-31", ana, None);
        seed_case(&conn, CaseStatus::Active, "2025-01-01", ana, None);
        seed_case(&conn, CaseStatus::Closed, "2025-01-31", ana, None);
        seed_case(&conn, CaseStatus::Closed, "2025-02-01", ana, None);

        let store = SqliteStore::new(&conn);
        let window = DateWindow::new(Some(date("2025-01-01")), Some(date("2025-01-31")));
        let cases = store.cases(&CaseQuery::new().within(window)).unwrap();
        let starts: Vec<_> = cases.iter().map(|c| c.start_date).collect();
        assert_eq!(starts, vec![date("2025-01-01"), date("2025-01-31")]);
        assert_eq!(cases[0].responsible_name, "Ana Souza");
    }

    #[test]
    fn test_case_scope_and_equality_filters() {
        let (_dir, conn) = test_db();
        let ana = insert_user(&conn, "ana", "Ana Souza", false).unwrap();
        let bruno = insert_user(&conn, "bruno", "", false).unwrap();
        seed_case(&conn, CaseStatus::Active, "2025-03-01", ana, None);
        seed_case(&conn, CaseStatus::Closed, "2025-03-02", ana, None);
        seed_case(&conn, CaseStatus::Active, "2025-03-03", bruno, None);

        let store = SqliteStore::new(&conn);
        assert_eq!(store.cases(&CaseQuery::new()).unwrap().len(), 3);
        assert_eq!(store.cases(&CaseQuery::new().scoped_to(Some(ana))).unwrap().len(), 2);

        let active = store.cases(&CaseQuery::new().status(Some(CaseStatus::Active))).unwrap();
        assert_eq!(active.len(), 2);

        let brunos = store.cases(&CaseQuery::new().responsible(Some(bruno))).unwrap();
        assert_eq!(brunos.len(), 1);
        assert_eq!(brunos[0].responsible_name, "bruno");

        // Scope and an explicit responsible filter must both hold.
        let none = store
            .cases(&CaseQuery::new().scoped_to(Some(ana)).responsible(Some(bruno)))
            .unwrap();
        assert!(none.is_empty());

        assert!(store.cases(&CaseQuery::new().legal_area(Some("labor"))).unwrap().is_empty());
        assert_eq!(store.cases(&CaseQuery::new().process_type(Some("judicial"))).unwrap().len(), 3);
    }

    #[test]
    fn test_case_value_bounds_apply_independently() {
        let (_dir, conn) = test_db();
        let ana = insert_user(&conn, "ana", "", true).unwrap();
        seed_case(&conn, CaseStatus::Active, "2025-03-01", ana, Some(100.0));
        seed_case(&conn, CaseStatus::Active, "2025-03-01", ana, Some(5000.0));
        seed_case(&conn, CaseStatus::Active, "2025-03-01", ana, None);

        let store = SqliteStore::new(&conn);
        let min_only = store.cases(&CaseQuery::new().value_between(Some(1000.0), None)).unwrap();
        assert_eq!(min_only.len(), 1);
        assert_eq!(min_only[0].value, Some(5000.0));

        let max_only = store.cases(&CaseQuery::new().value_between(None, Some(100.0))).unwrap();
        assert_eq!(max_only.len(), 1);

        let both = store.cases(&CaseQuery::new().value_between(Some(100.0), Some(5000.0))).unwrap();
        assert_eq!(both.len(), 2);
    }

    #[test]
    fn test_client_filters() {
        let (_dir, conn) = test_db();
        seed_client(&conn, "Acme Ltda", PersonType::Company, "SP", "2025-01-10");
        seed_client(&conn, "Beatriz Lima", PersonType::Individual, "RJ", "2025-02-10");
        seed_client(&conn, "Carlos Dias", PersonType::Individual, "sp", "2025-03-10");

        let store = SqliteStore::new(&conn);
        let sp = store.clients(&ClientQuery::new().state(Some("SP"))).unwrap();
        assert_eq!(sp.len(), 2);
        let people = store.clients(&ClientQuery::new().person_type(Some(PersonType::Individual))).unwrap();
        assert_eq!(people.len(), 2);
        let window = DateWindow::new(Some(date("2025-02-01")), Some(date("2025-02-28")));
        let feb = store.clients(&ClientQuery::new().within(window)).unwrap();
        assert_eq!(feb.len(), 1);
        assert_eq!(feb[0].name, "Beatriz Lima");
    }

    #[test]
    fn test_financial_scope_and_status() {
        let (_dir, conn) = test_db();
        let ana = insert_user(&conn, "ana", "", false).unwrap();
        let bruno = insert_user(&conn, "bruno", "", false).unwrap();
        seed_fee(&conn, ana, 1000.0, PaymentStatus::Paid, "2025-04-01");
        seed_fee(&conn, ana, 500.0, PaymentStatus::Pending, "2025-04-02");
        seed_fee(&conn, bruno, 700.0, PaymentStatus::Pending, "2025-04-03");
        seed_expense(&conn, ana, 80.0, ReimbursementStatus::Pending, "2025-04-04");
        seed_expense(&conn, bruno, 20.0, ReimbursementStatus::Reimbursed, "2025-04-05");

        let store = SqliteStore::new(&conn);
        let q = FinancialQuery::new().scoped_to(Some(ana));
        assert_eq!(store.fees(&q).unwrap().len(), 2);
        assert_eq!(store.expenses(&q).unwrap().len(), 1);

        let pending = FinancialQuery::new().payment_status(Some(PaymentStatus::Pending));
        assert_eq!(store.fees(&pending).unwrap().len(), 2);
        // Expenses carry a reimbursement status instead and are not narrowed.
        assert_eq!(store.expenses(&pending).unwrap().len(), 2);
    }

    #[test]
    fn test_find_user() {
        let (_dir, conn) = test_db();
        insert_user(&conn, "ana", "Ana Souza", true).unwrap();
        let ana = find_user(&conn, "ana").unwrap();
        assert!(ana.is_staff);
        assert!(matches!(find_user(&conn, "zoe"), Err(DocketError::NotFound(_))));
        assert_eq!(list_users(&conn).unwrap().len(), 1);
    }
}
