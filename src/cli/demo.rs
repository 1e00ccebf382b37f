use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use rusqlite::Connection;

use crate::catalog::Category;
use crate::cli::open_db;
use crate::db::{init_db, insert_case, insert_client, insert_expense, insert_fee, insert_user};
use crate::error::Result;
use crate::filters::ParamMap;
use crate::models::{
    BillingType, Case, CaseStatus, Client, ExpenseEntry, FeeEntry, PaymentStatus, PersonType,
    ReimbursementStatus, User,
};
use crate::settings::{load_settings, save_settings};
use crate::templates::{create_template, OutputFormat, TemplateDraft};

const ADMIN: &str = "admin";

/// (username, full name, staff)
const USERS: &[(&str, &str, bool)] = &[
    (ADMIN, "Administrator", true),
    ("ana", "Ana Souza", false),
    ("bruno", "Bruno Lima", false),
];

struct DemoClient {
    name: &'static str,
    person_type: PersonType,
    tax_id: &'static str,
    city: &'static str,
    state: &'static str,
}

const CLIENTS: &[DemoClient] = &[
    DemoClient { name: "Maria Oliveira", person_type: PersonType::Individual, tax_id: "123.456.789-09", city: "São Paulo", state: "SP" },
    DemoClient { name: "Construtora Horizonte Ltda", person_type: PersonType::Company, tax_id: "12.345.678/0001-90", city: "Campinas", state: "SP" },
    DemoClient { name: "João Pereira", person_type: PersonType::Individual, tax_id: "987.654.321-00", city: "Rio de Janeiro", state: "RJ" },
    DemoClient { name: "Padaria Pão Quente ME", person_type: PersonType::Company, tax_id: "23.456.789/0001-12", city: "Belo Horizonte", state: "MG" },
    DemoClient { name: "Carla Mendes", person_type: PersonType::Individual, tax_id: "456.789.123-45", city: "Curitiba", state: "PR" },
    DemoClient { name: "Transportes Sul S.A.", person_type: PersonType::Company, tax_id: "34.567.891/0001-23", city: "Porto Alegre", state: "RS" },
];

const LEGAL_AREAS: &[&str] = &["civil", "labor", "tax", "family", "consumer"];
const PROCESS_TYPES: &[&str] = &["judicial", "administrative"];
const EXPENSE_TYPES: &[(&str, &str, f64)] = &[
    ("court_fees", "Filing fee", 185.40),
    ("travel", "Hearing travel", 320.00),
    ("expert_fees", "Accounting expert", 1500.00),
    ("copies", "Certified copies", 42.75),
];
const BILLING: &[BillingType] = &[BillingType::Fixed, BillingType::Hourly, BillingType::SuccessFee, BillingType::Mixed];
const CASE_VALUES: &[f64] = &[15000.0, 82000.0, 4300.0, 230000.0, 12500.0, 56000.0];
const FEE_AMOUNTS: &[f64] = &[3500.0, 8200.0, 1200.0, 15000.0, 2400.0, 6100.0];

#[derive(Debug, Default, PartialEq)]
pub struct DemoCounts {
    pub clients: usize,
    pub cases: usize,
    pub fees: usize,
    pub expenses: usize,
    pub templates: usize,
}

/// Clamp a day to the last valid day of the given year/month.
fn clamp_day(year: i32, month: u32, day: u32) -> u32 {
    let first = NaiveDate::from_ymd_opt(year, month, 1).unwrap_or_default();
    let last_day = (first + Months::new(1))
        .pred_opt()
        .map(|d| d.day())
        .unwrap_or(28);
    day.min(last_day)
}

fn month_day(today: NaiveDate, months_ago: u32, day: u32) -> NaiveDate {
    let target = today - Months::new(months_ago);
    let d = clamp_day(target.year(), target.month(), day);
    NaiveDate::from_ymd_opt(target.year(), target.month(), d).unwrap_or(target)
}

fn fields(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

/// Twelve months of cases, fees and expenses ending at `today`, plus one
/// public template per category owned by `admin`.
fn insert_demo_data(conn: &Connection, admin: &User, staff_ids: &[i64], today: NaiveDate) -> Result<DemoCounts> {
    let mut counts = DemoCounts::default();

    let mut client_ids = Vec::new();
    for (i, c) in CLIENTS.iter().enumerate() {
        let client = Client {
            id: 0,
            person_type: c.person_type,
            name: c.name.to_string(),
            trade_name: None,
            tax_id: c.tax_id.to_string(),
            email: None,
            phone: None,
            city: Some(c.city.to_string()),
            state: Some(c.state.to_string()),
            is_active: i != CLIENTS.len() - 1,
            registered_on: month_day(today, 11 - (i as u32 * 2).min(11), 4),
        };
        client_ids.push(insert_client(conn, &client)?);
        counts.clients += 1;
    }

    for i in 0..12u32 {
        let months_ago = 11 - i;
        let idx = i as usize;
        let start = month_day(today, months_ago, 3 + (i % 20));
        let status = match months_ago {
            0..=3 => CaseStatus::Active,
            4 | 5 => CaseStatus::Suspended,
            6..=9 => CaseStatus::Closed,
            _ => CaseStatus::Archived,
        };
        let responsible_id = staff_ids[idx % staff_ids.len()];
        let client_id = client_ids[idx % client_ids.len()];
        let case = Case {
            id: 0,
            process_number: format!("{:07}-{:02}.{}.8.26.0100", 1000 + i, i % 97, start.year()),
            process_type: PROCESS_TYPES[idx % PROCESS_TYPES.len()].to_string(),
            legal_area: LEGAL_AREAS[idx % LEGAL_AREAS.len()].to_string(),
            status,
            start_date: start,
            end_date: matches!(status, CaseStatus::Closed | CaseStatus::Archived).then(|| start + Duration::days(120)),
            value: Some(CASE_VALUES[idx % CASE_VALUES.len()]),
            court_district: Some(CLIENTS[idx % CLIENTS.len()].city.to_string()),
            court_division: Some(format!("{}ª Vara", i % 5 + 1)),
            notes: None,
            client_id: Some(client_id),
            client_name: None,
            responsible_id,
            responsible_name: String::new(),
        };
        let case_id = insert_case(conn, &case)?;
        counts.cases += 1;

        let due = start + Duration::days(30);
        let paid = months_ago >= 2;
        let fee = FeeEntry {
            id: 0,
            case_id: Some(case_id),
            client_name: None,
            owner_id: responsible_id,
            billing_type: BILLING[idx % BILLING.len()],
            amount: FEE_AMOUNTS[idx % FEE_AMOUNTS.len()],
            payment_status: if paid { PaymentStatus::Paid } else { PaymentStatus::Pending },
            due_date: due,
            paid_on: paid.then(|| due - Duration::days(2)),
        };
        insert_fee(conn, &fee, Some(client_id))?;
        counts.fees += 1;

        let (expense_type, description, amount) = EXPENSE_TYPES[idx % EXPENSE_TYPES.len()];
        let expense = ExpenseEntry {
            id: 0,
            case_id: Some(case_id),
            owner_id: responsible_id,
            expense_type: expense_type.to_string(),
            description: description.to_string(),
            amount,
            due_date: start + Duration::days(10),
            reimbursement_status: if paid { ReimbursementStatus::Reimbursed } else { ReimbursementStatus::Pending },
        };
        insert_expense(conn, &expense)?;
        counts.expenses += 1;
    }

    let mut this_year = ParamMap::new();
    this_year.insert("period".into(), "this_year".into());
    let drafts = [
        TemplateDraft {
            name: "Case portfolio".into(),
            description: Some("Every case with value and responsible lawyer".into()),
            category: Some(Category::Cases),
            output_format: Some(OutputFormat::Pdf),
            fields: fields(&["case_process_number", "case_legal_area", "case_status", "case_start_date", "case_value", "case_responsible"]),
            sort_spec: vec!["-case_value".into()],
            is_public: true,
            ..Default::default()
        },
        TemplateDraft {
            name: "Client roster".into(),
            category: Some(Category::Clients),
            output_format: Some(OutputFormat::Spreadsheet),
            fields: fields(&["client_name", "client_person_type", "client_city", "client_state", "client_registered_on"]),
            sort_spec: vec!["client_name".into()],
            is_public: true,
            ..Default::default()
        },
        TemplateDraft {
            name: "Financial year to date".into(),
            category: Some(Category::Financial),
            output_format: Some(OutputFormat::Csv),
            fields: fields(&["financial_due_date", "financial_fee_amount", "financial_expense_amount", "financial_payment_status"]),
            default_filters: this_year,
            is_public: true,
            ..Default::default()
        },
    ];
    for draft in &drafts {
        create_template(conn, draft, admin, today)?;
        counts.templates += 1;
    }

    Ok(counts)
}

pub fn run() -> Result<()> {
    let mut settings = load_settings();
    let conn = open_db(&settings)?;
    init_db(&conn)?;

    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)",
        [ADMIN],
        |r| r.get(0),
    )?;
    if exists {
        println!("Demo data already loaded (user '{ADMIN}' exists).");
        return Ok(());
    }

    let mut admin = None;
    let mut lawyer_ids = Vec::new();
    for &(username, full_name, staff) in USERS {
        let id = insert_user(&conn, username, full_name, staff)?;
        if staff {
            admin = Some(User { id, username: username.into(), full_name: full_name.into(), is_staff: true });
        } else {
            lawyer_ids.push(id);
        }
    }
    let Some(admin) = admin else {
        return Ok(());
    };

    let counts = insert_demo_data(&conn, &admin, &lawyer_ids, Local::now().date_naive())?;
    if settings.user_name.is_empty() {
        settings.user_name = ADMIN.to_string();
        save_settings(&settings)?;
    }

    println!("Demo data loaded!");
    println!("  Users:      {}", USERS.len());
    println!("  Clients:    {}", counts.clients);
    println!("  Cases:      {}", counts.cases);
    println!("  Fees:       {}", counts.fees);
    println!("  Expenses:   {}", counts.expenses);
    println!("  Templates:  {}", counts.templates);
    println!();
    println!("Try these next:");
    println!("  docket templates list");
    println!("  docket run 1");
    println!("  docket run 3 period=last_month");
    println!("  docket --user ana executions");
    Ok(())
}
