//! Report generation: query the store for a template's category, project the
//! selected fields, and compute statistics and chart series.

use std::collections::BTreeMap;
use std::fmt;
use std::time::{Duration, Instant};

use chrono::{Datelike, Months, NaiveDate};

use crate::catalog::{Category, FieldRef, FieldValue, FinancialEntry};
use crate::error::{DocketError, Result};
use crate::filters::FilterSpec;
use crate::models::{Case, CaseStatus, Client, PaymentStatus, PersonType, ReimbursementStatus, User};
use crate::period::{month_end, month_start, DateWindow};
use crate::rowset::{Column, Record, Rowset, KIND_COLUMN};
use crate::store::{CaseQuery, ClientQuery, FinancialQuery, RecordStore};
use crate::templates::ReportTemplate;

/// Windows whose bounds are at most this many days apart get daily
/// buckets, longer ones monthly.
const DAILY_BUCKET_MAX_DAYS: i64 = 31;
const TOP_CLIENTS: usize = 5;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: &'static str,
    pub points: Vec<(String, f64)>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseStats {
    pub total: usize,
    pub active: usize,
    pub suspended: usize,
    pub closed: usize,
    pub archived: usize,
    pub total_value: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientStats {
    pub total: usize,
    pub individuals: usize,
    pub companies: usize,
    pub active: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FinancialStats {
    pub total: usize,
    pub total_revenue: f64,
    pub total_expense: f64,
    pub balance: f64,
    pub pending_fees: usize,
    pub pending_expenses: usize,
    /// Balance as a percentage of revenue; zero without revenue.
    pub margin: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statistics {
    Cases(CaseStats),
    Clients(ClientStats),
    Financial(FinancialStats),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue {
    Count(usize),
    Money(f64),
    Percent(f64),
}

impl fmt::Display for StatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatValue::Count(n) => write!(f, "{n}"),
            StatValue::Money(v) => f.write_str(&crate::fmt::money(*v)),
            StatValue::Percent(p) => write!(f, "{p:.1}%"),
        }
    }
}

impl Statistics {
    #[cfg(test)]
    pub fn total(&self) -> usize {
        match self {
            Statistics::Cases(s) => s.total,
            Statistics::Clients(s) => s.total,
            Statistics::Financial(s) => s.total,
        }
    }

    /// Labelled values in display order.
    pub fn entries(&self) -> Vec<(&'static str, StatValue)> {
        use StatValue::*;
        match self {
            Statistics::Cases(s) => vec![
                ("Total", Count(s.total)),
                ("Active", Count(s.active)),
                ("Suspended", Count(s.suspended)),
                ("Closed", Count(s.closed)),
                ("Archived", Count(s.archived)),
                ("Total value", Money(s.total_value)),
            ],
            Statistics::Clients(s) => vec![
                ("Total", Count(s.total)),
                ("Individuals", Count(s.individuals)),
                ("Companies", Count(s.companies)),
                ("Active", Count(s.active)),
            ],
            Statistics::Financial(s) => vec![
                ("Entries", Count(s.total)),
                ("Revenue", Money(s.total_revenue)),
                ("Expenses", Money(s.total_expense)),
                ("Balance", Money(s.balance)),
                ("Pending fees", Count(s.pending_fees)),
                ("Pending expenses", Count(s.pending_expenses)),
                ("Margin", Percent(s.margin)),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportResult {
    pub rowset: Rowset,
    pub statistics: Statistics,
    pub chart_series: Vec<Series>,
}

impl ReportResult {
    pub fn row_count(&self) -> usize {
        self.rowset.len()
    }

    #[cfg(test)]
    pub fn series(&self, name: &str) -> Option<&Series> {
        self.chart_series.iter().find(|s| s.name == name)
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

struct Deadline {
    started: Instant,
    limit: Duration,
}

impl Deadline {
    fn new(limit: Duration) -> Self {
        Self { started: Instant::now(), limit }
    }

    fn check(&self) -> Result<()> {
        if self.started.elapsed() >= self.limit {
            return Err(DocketError::Timeout(self.limit.as_secs()));
        }
        Ok(())
    }
}

pub struct ReportEngine<'s> {
    store: &'s dyn RecordStore,
    timeout: Duration,
}

impl<'s> ReportEngine<'s> {
    pub fn new(store: &'s dyn RecordStore) -> Self {
        Self { store, timeout: Duration::from_secs(30) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run `template` against the store. Read-only; staff see every record,
    /// other users only those they are responsible for or own. Clients are
    /// never scoped.
    pub fn generate(&self, template: &ReportTemplate, filter: &FilterSpec, user: &User) -> Result<ReportResult> {
        let deadline = Deadline::new(self.timeout);
        let scope = (!user.is_staff).then_some(user.id);
        let mut result = match template.category {
            Category::Cases => self.cases(template, filter, scope)?,
            Category::Clients => self.clients(template, filter, &deadline)?,
            Category::Financial => self.financial(template, filter, scope, &deadline)?,
            other => {
                tracing::error!(template_id = template.id, category = %other, "no record accessor");
                return Err(DocketError::RecordAccess(other.to_string()));
            }
        };
        result.rowset.sort_by_keys(&template.sort_spec);
        tracing::debug!(
            template_id = template.id,
            category = %template.category,
            rows = result.row_count(),
            window = %filter.window.label(),
            "report generated"
        );
        Ok(result)
    }

    fn cases(&self, template: &ReportTemplate, filter: &FilterSpec, scope: Option<i64>) -> Result<ReportResult> {
        let query = CaseQuery::new()
            .scoped_to(scope)
            .within(filter.window)
            .process_type(filter.case_type.as_deref())
            .legal_area(filter.legal_area.as_deref())
            .status(filter.case_status)
            .responsible(filter.responsible)
            .value_between(filter.min_value, filter.max_value);
        let cases = self.store.cases(&query)?;

        let rowset = Rowset {
            columns: columns(template, false),
            records: cases.iter().map(|c| project(&template.selected_fields, c, case_cell)).collect(),
        };
        Ok(ReportResult {
            rowset,
            statistics: Statistics::Cases(case_stats(&cases)),
            chart_series: vec![
                Series { name: "cases_by_status", points: cases_by_status(&cases) },
                Series { name: "cases_by_legal_area", points: count_by(&cases, |c| c.legal_area.clone()) },
                Series { name: "cases_by_responsible", points: count_by(&cases, |c| c.responsible_name.clone()) },
            ],
        })
    }

    fn clients(&self, template: &ReportTemplate, filter: &FilterSpec, deadline: &Deadline) -> Result<ReportResult> {
        let query = ClientQuery::new()
            .within(filter.window)
            .person_type(filter.person_type)
            .state(filter.state.as_deref());
        let clients = self.store.clients(&query)?;

        // Registrations chart covers the twelve months up to the reference date,
        // independent of the report window.
        let last = month_start(filter.reference_date);
        let first = last.checked_sub_months(Months::new(11)).unwrap_or(last);
        let trailing = DateWindow::new(Some(first), Some(month_end(last)));
        let recent = self.store.clients(
            &ClientQuery::new()
                .within(trailing)
                .person_type(filter.person_type)
                .state(filter.state.as_deref()),
        )?;
        let buckets = buckets(first, month_end(last), Granularity::Monthly, deadline)?;
        let mut registrations = vec![0.0; buckets.len()];
        for c in &recent {
            if let Ok(i) = buckets.binary_search(&Granularity::Monthly.key(c.registered_on)) {
                registrations[i] += 1.0;
            }
        }

        let rowset = Rowset {
            columns: columns(template, false),
            records: clients.iter().map(|c| project(&template.selected_fields, c, client_cell)).collect(),
        };
        Ok(ReportResult {
            rowset,
            statistics: Statistics::Clients(client_stats(&clients)),
            chart_series: vec![
                Series {
                    name: "clients_by_state",
                    points: count_by(&clients, |c| c.state.clone().unwrap_or_else(|| "-".to_string())),
                },
                Series {
                    name: "client_registrations",
                    points: label_buckets(&buckets, Granularity::Monthly, registrations),
                },
            ],
        })
    }

    fn financial(
        &self,
        template: &ReportTemplate,
        filter: &FilterSpec,
        scope: Option<i64>,
        deadline: &Deadline,
    ) -> Result<ReportResult> {
        let query = FinancialQuery::new()
            .scoped_to(scope)
            .within(filter.window)
            .payment_status(filter.payment_status);
        let fees = self.store.fees(&query)?;
        let expenses = self.store.expenses(&query)?;

        let mut entries: Vec<FinancialEntry> = fees
            .into_iter()
            .map(FinancialEntry::Fee)
            .chain(expenses.into_iter().map(FinancialEntry::Expense))
            .collect();
        entries.sort_by_key(|e| e.due_date());

        let records = entries
            .iter()
            .map(|e| {
                let mut record = Record::new();
                record.insert(KIND_COLUMN, FieldValue::Text(e.kind().to_string()));
                for (key, value) in project(&template.selected_fields, e, financial_cell).into_cells() {
                    record.insert(key, value);
                }
                record
            })
            .collect();

        let mut chart_series = evolution(&entries, &filter.window, deadline)?;
        chart_series.push(Series { name: "expenses_by_type", points: expenses_by_type(&entries) });
        chart_series.push(Series { name: "top_clients", points: top_clients(&entries) });

        Ok(ReportResult {
            rowset: Rowset { columns: columns(template, true), records },
            statistics: Statistics::Financial(financial_stats(&entries)),
            chart_series,
        })
    }
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

fn columns(template: &ReportTemplate, with_kind: bool) -> Vec<Column> {
    let kind = with_kind.then_some(Column { id: KIND_COLUMN, label: "Kind" });
    kind.into_iter()
        .chain(template.selected_fields.iter().map(|f| Column { id: f.id(), label: f.label() }))
        .collect()
}

/// Keep only the selected fields that apply to `record`.
fn project<R>(fields: &[FieldRef], record: &R, cell: fn(FieldRef, &R) -> Option<FieldValue>) -> Record {
    let mut out = Record::new();
    for &field in fields {
        if let Some(value) = cell(field, record) {
            out.insert(field.id(), value);
        }
    }
    out
}

fn case_cell(field: FieldRef, case: &Case) -> Option<FieldValue> {
    match field {
        FieldRef::Case(f) => (f.def().extract)(case),
        _ => None,
    }
}

fn client_cell(field: FieldRef, client: &Client) -> Option<FieldValue> {
    match field {
        FieldRef::Client(f) => (f.def().extract)(client),
        _ => None,
    }
}

fn financial_cell(field: FieldRef, entry: &FinancialEntry) -> Option<FieldValue> {
    match field {
        FieldRef::Financial(f) => (f.def().extract)(entry),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

fn case_stats(cases: &[Case]) -> CaseStats {
    let mut stats = CaseStats { total: cases.len(), ..Default::default() };
    for c in cases {
        match c.status {
            CaseStatus::Active => stats.active += 1,
            CaseStatus::Suspended => stats.suspended += 1,
            CaseStatus::Closed => stats.closed += 1,
            CaseStatus::Archived => stats.archived += 1,
        }
        stats.total_value += c.value.unwrap_or(0.0);
    }
    stats
}

fn client_stats(clients: &[Client]) -> ClientStats {
    ClientStats {
        total: clients.len(),
        individuals: clients.iter().filter(|c| c.person_type == PersonType::Individual).count(),
        companies: clients.iter().filter(|c| c.person_type == PersonType::Company).count(),
        active: clients.iter().filter(|c| c.is_active).count(),
    }
}

fn financial_stats(entries: &[FinancialEntry]) -> FinancialStats {
    let mut stats = FinancialStats { total: entries.len(), ..Default::default() };
    for e in entries {
        match e {
            FinancialEntry::Fee(f) => {
                stats.total_revenue += f.amount;
                if f.payment_status == PaymentStatus::Pending {
                    stats.pending_fees += 1;
                }
            }
            FinancialEntry::Expense(x) => {
                stats.total_expense += x.amount;
                if x.reimbursement_status == ReimbursementStatus::Pending {
                    stats.pending_expenses += 1;
                }
            }
        }
    }
    stats.balance = stats.total_revenue - stats.total_expense;
    stats.margin = if stats.total_revenue > 0.0 {
        stats.balance / stats.total_revenue * 100.0
    } else {
        0.0
    };
    stats
}

// ---------------------------------------------------------------------------
// Chart series
// ---------------------------------------------------------------------------

fn cases_by_status(cases: &[Case]) -> Vec<(String, f64)> {
    CaseStatus::ALL
        .iter()
        .map(|s| (s.as_str().to_string(), cases.iter().filter(|c| c.status == *s).count() as f64))
        .collect()
}

/// Counts per key, largest first, ties by key.
fn count_by<R>(records: &[R], key: impl Fn(&R) -> String) -> Vec<(String, f64)> {
    sum_by(records.iter().map(|r| (key(r), 1.0)))
}

fn sum_by(pairs: impl Iterator<Item = (String, f64)>) -> Vec<(String, f64)> {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for (k, v) in pairs {
        *totals.entry(k).or_default() += v;
    }
    let mut points: Vec<(String, f64)> = totals.into_iter().collect();
    points.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    points
}

fn expenses_by_type(entries: &[FinancialEntry]) -> Vec<(String, f64)> {
    sum_by(entries.iter().filter_map(|e| match e {
        FinancialEntry::Expense(x) => Some((x.expense_type.clone(), x.amount)),
        FinancialEntry::Fee(_) => None,
    }))
}

fn top_clients(entries: &[FinancialEntry]) -> Vec<(String, f64)> {
    let mut points = sum_by(entries.iter().filter_map(|e| match e {
        FinancialEntry::Fee(f) => f.client_name.clone().map(|name| (name, f.amount)),
        FinancialEntry::Expense(_) => None,
    }));
    points.truncate(TOP_CLIENTS);
    points
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Granularity {
    Daily,
    Monthly,
}

impl Granularity {
    fn key(self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Daily => date,
            Granularity::Monthly => month_start(date),
        }
    }

    fn next(self, key: NaiveDate) -> Option<NaiveDate> {
        match self {
            Granularity::Daily => key.succ_opt(),
            Granularity::Monthly => key.checked_add_months(Months::new(1)),
        }
    }

    fn label(self, key: NaiveDate) -> String {
        match self {
            Granularity::Daily => key.format("%d/%m").to_string(),
            Granularity::Monthly => format!("{:02}/{}", key.month(), key.year()),
        }
    }
}

/// Bucket keys covering `start..=end`, checking the deadline per bucket.
fn buckets(start: NaiveDate, end: NaiveDate, granularity: Granularity, deadline: &Deadline) -> Result<Vec<NaiveDate>> {
    let mut keys = Vec::new();
    let last = granularity.key(end);
    let mut key = granularity.key(start);
    while key <= last {
        deadline.check()?;
        keys.push(key);
        match granularity.next(key) {
            Some(next) => key = next,
            None => break,
        }
    }
    Ok(keys)
}

fn label_buckets(keys: &[NaiveDate], granularity: Granularity, values: Vec<f64>) -> Vec<(String, f64)> {
    keys.iter().map(|k| granularity.label(*k)).zip(values).collect()
}

/// Revenue, expense and net per bucket. An open window takes its bounds
/// from the entries themselves.
fn evolution(entries: &[FinancialEntry], window: &DateWindow, deadline: &Deadline) -> Result<Vec<Series>> {
    let first = entries.iter().map(|e| e.due_date()).min();
    let last = entries.iter().map(|e| e.due_date()).max();
    let (Some(start), Some(end)) = (window.start.or(first), window.end.or(last)) else {
        return Ok(vec![
            Series { name: "revenue", points: Vec::new() },
            Series { name: "expense", points: Vec::new() },
            Series { name: "net", points: Vec::new() },
        ]);
    };
    let granularity = if (end - start).num_days() <= DAILY_BUCKET_MAX_DAYS {
        Granularity::Daily
    } else {
        Granularity::Monthly
    };
    let keys = buckets(start, end, granularity, deadline)?;
    let mut revenue = vec![0.0; keys.len()];
    let mut expense = vec![0.0; keys.len()];
    for e in entries {
        let Ok(i) = keys.binary_search(&granularity.key(e.due_date())) else {
            continue;
        };
        match e {
            FinancialEntry::Fee(f) => revenue[i] += f.amount,
            FinancialEntry::Expense(x) => expense[i] += x.amount,
        }
    }
    let net: Vec<f64> = revenue.iter().zip(&expense).map(|(r, x)| r - x).collect();
    Ok(vec![
        Series { name: "revenue", points: label_buckets(&keys, granularity, revenue) },
        Series { name: "expense", points: label_buckets(&keys, granularity, expense) },
        Series { name: "net", points: label_buckets(&keys, granularity, net) },
    ])
}

#[cfg(test)]
mod tests {
    use chrono::Local;
    use rusqlite::Connection;

    use super::*;
    use crate::catalog::{CaseField, ClientField, FinancialField};
    use crate::db::insert_user;
    use crate::db::tests::{date, seed_case, seed_client, seed_expense, seed_fee, test_db};
    use crate::filters::ParamMap;
    use crate::store::SqliteStore;
    use crate::templates::OutputFormat;

    fn template(category: Category, fields: Vec<FieldRef>) -> ReportTemplate {
        let now = Local::now().naive_local();
        ReportTemplate {
            id: 1,
            name: "Test".into(),
            description: None,
            category,
            output_format: OutputFormat::Csv,
            selected_fields: fields,
            default_filters: ParamMap::new(),
            sort_spec: Vec::new(),
            group_spec: Vec::new(),
            layout_config: serde_json::json!({}),
            is_public: false,
            is_active: true,
            owner_id: 1,
            created_at: now,
            updated_at: now,
        }
    }

    fn staff(conn: &Connection) -> User {
        let id = insert_user(conn, "boss", "Boss", true).unwrap();
        User { id, username: "boss".into(), full_name: "Boss".into(), is_staff: true }
    }

    fn filter(pairs: &[(&str, &str)]) -> FilterSpec {
        let params: ParamMap = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        FilterSpec::from_params(&params, date("2025-06-12")).unwrap()
    }

    #[test]
    fn test_cases_scenario_projects_only_selected_fields() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_case(&conn, CaseStatus::Active, "2025-06-02", boss.id, Some(1000.0));
        seed_case(&conn, CaseStatus::Closed, "2025-06-03", boss.id, None);

        let store = SqliteStore::new(&conn);
        let t = template(Category::Cases, vec![FieldRef::Case(CaseField::Status)]);
        let result = ReportEngine::new(&store).generate(&t, &filter(&[("period", "this_month")]), &boss).unwrap();

        let statuses: Vec<_> = result.rowset.records.iter().map(|r| r.get("case_status").cloned()).collect();
        assert_eq!(
            statuses,
            vec![Some(FieldValue::Text("active".into())), Some(FieldValue::Text("closed".into()))]
        );
        assert!(result.rowset.records.iter().all(|r| r.len() == 1));
        assert_eq!(
            result.statistics,
            Statistics::Cases(CaseStats { total: 2, active: 1, closed: 1, total_value: 1000.0, ..Default::default() })
        );
        let by_status = result.series("cases_by_status").unwrap();
        assert_eq!(by_status.points[0], ("active".to_string(), 1.0));
    }

    #[test]
    fn test_empty_result_has_zero_statistics() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        let store = SqliteStore::new(&conn);
        let engine = ReportEngine::new(&store);

        let t = template(Category::Cases, vec![FieldRef::Case(CaseField::Status)]);
        let result = engine.generate(&t, &filter(&[]), &boss).unwrap();
        assert!(result.rowset.is_empty());
        assert_eq!(result.statistics, Statistics::Cases(CaseStats::default()));

        let t = template(Category::Financial, vec![FieldRef::Financial(FinancialField::FeeAmount)]);
        let result = engine.generate(&t, &filter(&[]), &boss).unwrap();
        assert_eq!(result.statistics, Statistics::Financial(FinancialStats::default()));
        assert!(result.series("revenue").unwrap().points.is_empty());
    }

    #[test]
    fn test_records_stay_inside_window() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        for day in ["2025-04-30", "2025-05-01", "2025-05-15", "2025-05-31", "2025-06-01"] {
            seed_case(&conn, CaseStatus::Active, day, boss.id, None);
            seed_client(&conn, "Client", PersonType::Company, "SP", day);
            seed_fee(&conn, boss.id, 10.0, PaymentStatus::Paid, day);
        }
        let store = SqliteStore::new(&conn);
        let engine = ReportEngine::new(&store);
        let f = filter(&[("period", "last_month")]);
        let window = f.window;

        let t = template(Category::Cases, vec![FieldRef::Case(CaseField::StartDate)]);
        let r = engine.generate(&t, &f, &boss).unwrap();
        assert_eq!(r.row_count(), 3);
        for rec in &r.rowset.records {
            let Some(FieldValue::Date(d)) = rec.get("case_start_date") else { panic!("missing date") };
            assert!(window.contains(*d));
        }

        let t = template(Category::Clients, vec![FieldRef::Client(ClientField::RegisteredOn)]);
        assert_eq!(engine.generate(&t, &f, &boss).unwrap().row_count(), 3);

        let t = template(Category::Financial, vec![FieldRef::Financial(FinancialField::DueDate)]);
        assert_eq!(engine.generate(&t, &f, &boss).unwrap().row_count(), 3);
    }

    #[test]
    fn test_non_staff_sees_only_own_records_but_all_clients() {
        let (_dir, conn) = test_db();
        let ana_id = insert_user(&conn, "ana", "Ana", false).unwrap();
        let bruno_id = insert_user(&conn, "bruno", "Bruno", false).unwrap();
        let ana = User { id: ana_id, username: "ana".into(), full_name: "Ana".into(), is_staff: false };
        seed_case(&conn, CaseStatus::Active, "2025-05-01", ana_id, None);
        seed_case(&conn, CaseStatus::Active, "2025-05-02", bruno_id, None);
        seed_fee(&conn, bruno_id, 50.0, PaymentStatus::Paid, "2025-05-02");
        seed_client(&conn, "Acme", PersonType::Company, "SP", "2025-05-01");

        let store = SqliteStore::new(&conn);
        let engine = ReportEngine::new(&store);
        let f = filter(&[]);
        let cases = template(Category::Cases, vec![FieldRef::Case(CaseField::Responsible)]);
        let r = engine.generate(&cases, &f, &ana).unwrap();
        assert_eq!(r.row_count(), 1);
        assert_eq!(r.rowset.records[0].get("case_responsible"), Some(&FieldValue::Text("Ana".into())));

        let fin = template(Category::Financial, vec![FieldRef::Financial(FinancialField::FeeAmount)]);
        assert_eq!(engine.generate(&fin, &f, &ana).unwrap().row_count(), 0);

        let clients = template(Category::Clients, vec![FieldRef::Client(ClientField::Name)]);
        assert_eq!(engine.generate(&clients, &f, &ana).unwrap().row_count(), 1);
    }

    #[test]
    fn test_financial_merges_kinds_and_balances() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_fee(&conn, boss.id, 1000.0, PaymentStatus::Paid, "2025-05-01");
        seed_fee(&conn, boss.id, 500.0, PaymentStatus::Pending, "2025-05-10");
        seed_expense(&conn, boss.id, 300.0, ReimbursementStatus::Pending, "2025-05-05");

        let store = SqliteStore::new(&conn);
        let t = template(
            Category::Financial,
            vec![
                FieldRef::Financial(FinancialField::FeeAmount),
                FieldRef::Financial(FinancialField::ExpenseAmount),
            ],
        );
        let r = ReportEngine::new(&store).generate(&t, &filter(&[("period", "last_month")]), &boss).unwrap();

        let kinds: Vec<_> = r.rowset.records.iter().map(|rec| rec.get(KIND_COLUMN).unwrap().to_string()).collect();
        assert_eq!(kinds, vec!["revenue", "expense", "revenue"]);
        assert_eq!(r.rowset.columns[0].id, KIND_COLUMN);
        assert!(r.rowset.records[1].get("financial_fee_amount").is_none());

        let Statistics::Financial(stats) = &r.statistics else { panic!("wrong statistics") };
        assert_eq!(stats.total_revenue, 1500.0);
        assert_eq!(stats.total_expense, 300.0);
        assert_eq!(stats.balance, stats.total_revenue - stats.total_expense);
        assert_eq!(stats.pending_fees, 1);
        assert_eq!(stats.pending_expenses, 1);
        assert!((stats.margin - 80.0).abs() < 1e-9);

        // A 31-day window is bucketed daily.
        let revenue = r.series("revenue").unwrap();
        assert_eq!(revenue.points.len(), 31);
        assert_eq!(revenue.points[0], ("01/05".to_string(), 1000.0));
        let net = r.series("net").unwrap();
        assert_eq!(net.points[4], ("05/05".to_string(), -300.0));
    }

    #[test]
    fn test_bounds_31_days_apart_bucket_daily() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_fee(&conn, boss.id, 10.0, PaymentStatus::Paid, "2025-01-01");
        seed_fee(&conn, boss.id, 20.0, PaymentStatus::Paid, "2025-02-01");
        let store = SqliteStore::new(&conn);
        let t = template(Category::Financial, vec![FieldRef::Financial(FinancialField::FeeAmount)]);
        let f = filter(&[("period", "custom"), ("start_date", "2025-01-01"), ("end_date", "2025-02-01")]);
        let r = ReportEngine::new(&store).generate(&t, &f, &boss).unwrap();

        let revenue = r.series("revenue").unwrap();
        assert_eq!(revenue.points.len(), 32);
        assert_eq!(revenue.points[0], ("01/01".to_string(), 10.0));
        assert_eq!(revenue.points[31], ("01/02".to_string(), 20.0));
    }

    #[test]
    fn test_long_windows_bucket_monthly() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_fee(&conn, boss.id, 100.0, PaymentStatus::Paid, "2024-02-10");
        seed_fee(&conn, boss.id, 50.0, PaymentStatus::Paid, "2024-02-20");
        let store = SqliteStore::new(&conn);
        let t = template(Category::Financial, vec![FieldRef::Financial(FinancialField::FeeAmount)]);
        let r = ReportEngine::new(&store).generate(&t, &filter(&[("period", "last_year")]), &boss).unwrap();
        let revenue = r.series("revenue").unwrap();
        assert_eq!(revenue.points.len(), 12);
        assert_eq!(revenue.points[1], ("02/2024".to_string(), 150.0));
    }

    #[test]
    fn test_client_statistics_and_registrations() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_client(&conn, "Acme", PersonType::Company, "SP", "2025-06-01");
        seed_client(&conn, "Beatriz", PersonType::Individual, "RJ", "2025-05-10");
        seed_client(&conn, "Carlos", PersonType::Individual, "SP", "2023-01-10");

        let store = SqliteStore::new(&conn);
        let t = template(Category::Clients, vec![FieldRef::Client(ClientField::Name)]);
        let r = ReportEngine::new(&store).generate(&t, &filter(&[]), &boss).unwrap();
        assert_eq!(
            r.statistics,
            Statistics::Clients(ClientStats { total: 3, individuals: 2, companies: 1, active: 3 })
        );
        let by_state = r.series("clients_by_state").unwrap();
        assert_eq!(by_state.points[0], ("SP".to_string(), 2.0));
        let months = r.series("client_registrations").unwrap();
        assert_eq!(months.points.len(), 12);
        assert_eq!(months.points[0].0, "07/2024");
        assert_eq!(months.points[11], ("06/2025".to_string(), 1.0));
        assert_eq!(months.points.iter().map(|p| p.1).sum::<f64>(), 2.0);
    }

    #[test]
    fn test_top_clients_and_expense_types() {
        let entries: Vec<FinancialEntry> = (0..7)
            .map(|i| {
                FinancialEntry::Fee(crate::models::FeeEntry {
                    id: i,
                    case_id: None,
                    client_name: Some(format!("Client {i}")),
                    owner_id: 1,
                    billing_type: crate::models::BillingType::Fixed,
                    amount: 100.0 * (i + 1) as f64,
                    payment_status: PaymentStatus::Paid,
                    due_date: date("2025-01-01"),
                    paid_on: None,
                })
            })
            .collect();
        let top = top_clients(&entries);
        assert_eq!(top.len(), 5);
        assert_eq!(top[0], ("Client 6".to_string(), 700.0));
        assert!(expenses_by_type(&entries).is_empty());
    }

    #[test]
    fn test_sort_spec_orders_rows() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_case(&conn, CaseStatus::Active, "2025-05-01", boss.id, Some(10.0));
        seed_case(&conn, CaseStatus::Active, "2025-05-02", boss.id, Some(30.0));
        seed_case(&conn, CaseStatus::Active, "2025-05-03", boss.id, Some(20.0));
        let store = SqliteStore::new(&conn);
        let mut t = template(Category::Cases, vec![FieldRef::Case(CaseField::Value)]);
        t.sort_spec = vec!["-case_value".into()];
        let r = ReportEngine::new(&store).generate(&t, &filter(&[]), &boss).unwrap();
        let values: Vec<_> = r.rowset.to_table(None).rows.into_iter().map(|row| row[0].clone()).collect();
        assert_eq!(values, vec!["30.00", "20.00", "10.00"]);
    }

    #[test]
    fn test_category_without_accessor() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        let store = SqliteStore::new(&conn);
        let t = template(Category::Deadlines, vec![]);
        let err = ReportEngine::new(&store).generate(&t, &filter(&[]), &boss).unwrap_err();
        assert!(matches!(err, DocketError::RecordAccess(_)));
    }

    #[test]
    fn test_bucketed_series_respect_deadline() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_fee(&conn, boss.id, 10.0, PaymentStatus::Paid, "2025-05-01");
        let store = SqliteStore::new(&conn);
        let t = template(Category::Financial, vec![FieldRef::Financial(FinancialField::FeeAmount)]);
        let err = ReportEngine::new(&store)
            .with_timeout(Duration::ZERO)
            .generate(&t, &filter(&[]), &boss)
            .unwrap_err();
        assert!(matches!(err, DocketError::Timeout(0)));
    }

    #[test]
    fn test_generate_is_idempotent() {
        let (_dir, conn) = test_db();
        let boss = staff(&conn);
        seed_case(&conn, CaseStatus::Suspended, "2025-05-01", boss.id, Some(5.0));
        let store = SqliteStore::new(&conn);
        let engine = ReportEngine::new(&store);
        let t = template(Category::Cases, vec![FieldRef::Case(CaseField::Status), FieldRef::Case(CaseField::Value)]);
        let f = filter(&[("period", "this_year")]);
        assert_eq!(engine.generate(&t, &f, &boss).unwrap(), engine.generate(&t, &f, &boss).unwrap());
    }
}
