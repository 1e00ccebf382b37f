//! Field catalog: which fields each report category can project, their
//! display labels, and the accessor that pulls each one out of a record.

use std::fmt;

use chrono::NaiveDate;

use crate::models::{text_enum, Case, Client, ExpenseEntry, FeeEntry};

text_enum!(Category {
    Cases => "cases",
    Clients => "clients",
    Financial => "financial",
    Productivity => "productivity",
    Deadlines => "deadlines",
    Documents => "documents",
    Custom => "custom",
});

impl Category {
    /// Prefix carried by every stored field identifier of this category.
    #[cfg(test)]
    pub fn field_prefix(self) -> Option<&'static str> {
        match self {
            Category::Cases => Some("case_"),
            Category::Clients => Some("client_"),
            Category::Financial => Some("financial_"),
            _ => None,
        }
    }
}

text_enum!(CaseField {
    ProcessNumber => "case_process_number",
    ProcessType => "case_process_type",
    LegalArea => "case_legal_area",
    Status => "case_status",
    StartDate => "case_start_date",
    EndDate => "case_end_date",
    Value => "case_value",
    CourtDistrict => "case_court_district",
    CourtDivision => "case_court_division",
    Responsible => "case_responsible",
    Notes => "case_notes",
});

text_enum!(ClientField {
    Name => "client_name",
    TradeName => "client_trade_name",
    PersonType => "client_person_type",
    TaxId => "client_tax_id",
    Email => "client_email",
    Phone => "client_phone",
    City => "client_city",
    State => "client_state",
    RegisteredOn => "client_registered_on",
});

text_enum!(FinancialField {
    FeeAmount => "financial_fee_amount",
    PaymentStatus => "financial_payment_status",
    DueDate => "financial_due_date",
    PaymentDate => "financial_payment_date",
    ExpenseAmount => "financial_expense_amount",
    BillingType => "financial_billing_type",
});

/// A projected cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Money(f64),
    Empty,
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            FieldValue::Money(v) => write!(f, "{v:.2}"),
            FieldValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<&Option<String>> for FieldValue {
    fn from(s: &Option<String>) -> Self {
        s.as_deref().map_or(FieldValue::Empty, FieldValue::from)
    }
}

impl From<Option<NaiveDate>> for FieldValue {
    fn from(d: Option<NaiveDate>) -> Self {
        d.map_or(FieldValue::Empty, FieldValue::Date)
    }
}

impl From<Option<f64>> for FieldValue {
    fn from(v: Option<f64>) -> Self {
        v.map_or(FieldValue::Empty, FieldValue::Money)
    }
}

/// Either side of the financial report, so one accessor table covers both.
#[derive(Debug, Clone)]
pub enum FinancialEntry {
    Fee(FeeEntry),
    Expense(ExpenseEntry),
}

impl FinancialEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            FinancialEntry::Fee(_) => "revenue",
            FinancialEntry::Expense(_) => "expense",
        }
    }

    pub fn due_date(&self) -> NaiveDate {
        match self {
            FinancialEntry::Fee(f) => f.due_date,
            FinancialEntry::Expense(e) => e.due_date,
        }
    }
}

/// One catalog entry. `extract` returns `None` when the field does not apply
/// to the record at hand (e.g. a fee amount on an expense row).
pub struct FieldDef<F: 'static, R> {
    pub field: F,
    pub label: &'static str,
    pub extract: fn(&R) -> Option<FieldValue>,
}

// Table order must match the enum declaration order; lookups index by discriminant.
static CASE_FIELDS: [FieldDef<CaseField, Case>; 11] = [
    FieldDef { field: CaseField::ProcessNumber, label: "Process Number", extract: |c| Some(c.process_number.as_str().into()) },
    FieldDef { field: CaseField::ProcessType, label: "Process Type", extract: |c| Some(c.process_type.as_str().into()) },
    FieldDef { field: CaseField::LegalArea, label: "Legal Area", extract: |c| Some(c.legal_area.as_str().into()) },
    FieldDef { field: CaseField::Status, label: "Status", extract: |c| Some(c.status.as_str().into()) },
    FieldDef { field: CaseField::StartDate, label: "Start Date", extract: |c| Some(FieldValue::Date(c.start_date)) },
    FieldDef { field: CaseField::EndDate, label: "End Date", extract: |c| Some(c.end_date.into()) },
    FieldDef { field: CaseField::Value, label: "Case Value", extract: |c| Some(c.value.into()) },
    FieldDef { field: CaseField::CourtDistrict, label: "Court District", extract: |c| Some((&c.court_district).into()) },
    FieldDef { field: CaseField::CourtDivision, label: "Court Division", extract: |c| Some((&c.court_division).into()) },
    FieldDef { field: CaseField::Responsible, label: "Responsible", extract: |c| Some(c.responsible_name.as_str().into()) },
    FieldDef { field: CaseField::Notes, label: "Notes", extract: |c| Some((&c.notes).into()) },
];

static CLIENT_FIELDS: [FieldDef<ClientField, Client>; 9] = [
    FieldDef { field: ClientField::Name, label: "Name / Company Name", extract: |c| Some(c.name.as_str().into()) },
    FieldDef { field: ClientField::TradeName, label: "Trade Name", extract: |c| Some((&c.trade_name).into()) },
    FieldDef { field: ClientField::PersonType, label: "Person Type", extract: |c| Some(c.person_type.as_str().into()) },
    FieldDef { field: ClientField::TaxId, label: "Tax ID", extract: |c| Some(c.tax_id.as_str().into()) },
    FieldDef { field: ClientField::Email, label: "E-mail", extract: |c| Some((&c.email).into()) },
    FieldDef { field: ClientField::Phone, label: "Phone", extract: |c| Some((&c.phone).into()) },
    FieldDef { field: ClientField::City, label: "City", extract: |c| Some((&c.city).into()) },
    FieldDef { field: ClientField::State, label: "State", extract: |c| Some((&c.state).into()) },
    FieldDef { field: ClientField::RegisteredOn, label: "Registration Date", extract: |c| Some(FieldValue::Date(c.registered_on)) },
];

static FINANCIAL_FIELDS: [FieldDef<FinancialField, FinancialEntry>; 6] = [
    FieldDef {
        field: FinancialField::FeeAmount,
        label: "Fee Amount",
        extract: |e| match e {
            FinancialEntry::Fee(f) => Some(FieldValue::Money(f.amount)),
            FinancialEntry::Expense(_) => None,
        },
    },
    FieldDef {
        field: FinancialField::PaymentStatus,
        label: "Payment Status",
        extract: |e| match e {
            FinancialEntry::Fee(f) => Some(f.payment_status.as_str().into()),
            FinancialEntry::Expense(x) => Some(x.reimbursement_status.as_str().into()),
        },
    },
    FieldDef {
        field: FinancialField::DueDate,
        label: "Due Date",
        extract: |e| Some(FieldValue::Date(e.due_date())),
    },
    FieldDef {
        field: FinancialField::PaymentDate,
        label: "Payment Date",
        extract: |e| match e {
            FinancialEntry::Fee(f) => Some(f.paid_on.into()),
            FinancialEntry::Expense(_) => None,
        },
    },
    FieldDef {
        field: FinancialField::ExpenseAmount,
        label: "Expense Amount",
        extract: |e| match e {
            FinancialEntry::Fee(_) => None,
            FinancialEntry::Expense(x) => Some(FieldValue::Money(x.amount)),
        },
    },
    FieldDef {
        field: FinancialField::BillingType,
        label: "Billing Type",
        extract: |e| match e {
            FinancialEntry::Fee(f) => Some(f.billing_type.as_str().into()),
            FinancialEntry::Expense(_) => None,
        },
    },
];

impl CaseField {
    pub fn def(self) -> &'static FieldDef<CaseField, Case> {
        &CASE_FIELDS[self as usize]
    }
}

impl ClientField {
    pub fn def(self) -> &'static FieldDef<ClientField, Client> {
        &CLIENT_FIELDS[self as usize]
    }
}

impl FinancialField {
    pub fn def(self) -> &'static FieldDef<FinancialField, FinancialEntry> {
        &FINANCIAL_FIELDS[self as usize]
    }
}

/// A (category, field) pair as selected on a template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRef {
    Case(CaseField),
    Client(ClientField),
    Financial(FinancialField),
}

impl FieldRef {
    /// Parse a prefixed identifier such as `case_status`.
    pub fn parse(id: &str) -> Option<Self> {
        CaseField::parse(id)
            .map(FieldRef::Case)
            .or_else(|| ClientField::parse(id).map(FieldRef::Client))
            .or_else(|| FinancialField::parse(id).map(FieldRef::Financial))
    }

    pub fn id(self) -> &'static str {
        match self {
            FieldRef::Case(f) => f.as_str(),
            FieldRef::Client(f) => f.as_str(),
            FieldRef::Financial(f) => f.as_str(),
        }
    }

    pub fn category(self) -> Category {
        match self {
            FieldRef::Case(_) => Category::Cases,
            FieldRef::Client(_) => Category::Clients,
            FieldRef::Financial(_) => Category::Financial,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            FieldRef::Case(f) => f.def().label,
            FieldRef::Client(f) => f.def().label,
            FieldRef::Financial(f) => f.def().label,
        }
    }
}

/// Ordered (field id, label) pairs available for `category`. Empty for
/// categories without a record accessor.
pub fn labels_for(category: Category) -> Vec<(&'static str, &'static str)> {
    match category {
        Category::Cases => CASE_FIELDS.iter().map(|d| (d.field.as_str(), d.label)).collect(),
        Category::Clients => CLIENT_FIELDS.iter().map(|d| (d.field.as_str(), d.label)).collect(),
        Category::Financial => FINANCIAL_FIELDS.iter().map(|d| (d.field.as_str(), d.label)).collect(),
        _ => Vec::new(),
    }
}

pub fn is_valid(category: Category, field_id: &str) -> bool {
    FieldRef::parse(field_id).is_some_and(|f| f.category() == category)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BillingType, CaseStatus, PaymentStatus, ReimbursementStatus};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_tables_follow_enum_order() {
        for f in CaseField::ALL {
            assert_eq!(f.def().field, *f);
        }
        for f in ClientField::ALL {
            assert_eq!(f.def().field, *f);
        }
        for f in FinancialField::ALL {
            assert_eq!(f.def().field, *f);
        }
    }

    #[test]
    fn test_catalog_sizes() {
        assert_eq!(labels_for(Category::Cases).len(), 11);
        assert_eq!(labels_for(Category::Clients).len(), 9);
        assert_eq!(labels_for(Category::Financial).len(), 6);
        assert!(labels_for(Category::Deadlines).is_empty());
    }

    #[test]
    fn test_ids_carry_category_prefix() {
        for category in [Category::Cases, Category::Clients, Category::Financial] {
            let prefix = category.field_prefix().unwrap();
            for (id, _) in labels_for(category) {
                assert!(id.starts_with(prefix), "{id} lacks {prefix}");
                assert!(is_valid(category, id));
            }
        }
    }

    #[test]
    fn test_cross_category_ids_are_invalid() {
        assert!(is_valid(Category::Cases, "case_status"));
        assert!(!is_valid(Category::Clients, "case_status"));
        assert!(!is_valid(Category::Cases, "status"));
        assert!(!is_valid(Category::Custom, "case_status"));
    }

    #[test]
    fn test_case_accessors() {
        let case = Case {
            id: 1,
            process_number: "0001234-56.2025.8.26.0100".into(),
            process_type: "judicial".into(),
            legal_area: "civil".into(),
            status: CaseStatus::Closed,
            start_date: d(2025, 2, 3),
            end_date: None,
            value: Some(1500.0),
            court_district: Some("São Paulo".into()),
            court_division: None,
            notes: None,
            client_id: None,
            client_name: None,
            responsible_id: 7,
            responsible_name: "Ana Souza".into(),
        };
        assert_eq!((CaseField::Status.def().extract)(&case), Some(FieldValue::Text("closed".into())));
        assert_eq!((CaseField::EndDate.def().extract)(&case), Some(FieldValue::Empty));
        assert_eq!((CaseField::Value.def().extract)(&case).unwrap().to_string(), "1500.00");
        assert_eq!((CaseField::StartDate.def().extract)(&case).unwrap().to_string(), "2025-02-03");
    }

    #[test]
    fn test_financial_accessors_skip_inapplicable_fields() {
        let fee = FinancialEntry::Fee(FeeEntry {
            id: 1,
            case_id: None,
            client_name: None,
            owner_id: 1,
            billing_type: BillingType::Fixed,
            amount: 900.0,
            payment_status: PaymentStatus::Pending,
            due_date: d(2025, 3, 1),
            paid_on: None,
        });
        let expense = FinancialEntry::Expense(ExpenseEntry {
            id: 2,
            case_id: None,
            owner_id: 1,
            expense_type: "court_fees".into(),
            description: "Filing fee".into(),
            amount: 120.5,
            due_date: d(2025, 3, 2),
            reimbursement_status: ReimbursementStatus::Pending,
        });
        let fee_amount = FinancialField::FeeAmount.def().extract;
        let expense_amount = FinancialField::ExpenseAmount.def().extract;
        assert_eq!(fee_amount(&fee), Some(FieldValue::Money(900.0)));
        assert_eq!(fee_amount(&expense), None);
        assert_eq!(expense_amount(&expense), Some(FieldValue::Money(120.5)));
        assert_eq!(expense_amount(&fee), None);
        assert_eq!(fee.kind(), "revenue");
        assert_eq!(expense.kind(), "expense");
    }
}
