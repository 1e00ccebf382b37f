use chrono::NaiveDate;

/// Declares a fieldless enum stored as lowercase text, with `as_str`/`parse`
/// and the rusqlite conversions.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum $name {
            $($variant),+
        }

        #[allow(dead_code)]
        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($text => Some($name::$variant),)+
                    _ => None,
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl rusqlite::types::ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<rusqlite::types::ToSqlOutput<'_>> {
                Ok(rusqlite::types::ToSqlOutput::from(self.as_str()))
            }
        }

        impl rusqlite::types::FromSql for $name {
            fn column_result(
                value: rusqlite::types::ValueRef<'_>,
            ) -> rusqlite::types::FromSqlResult<Self> {
                let s = value.as_str()?;
                $name::parse(s).ok_or_else(|| {
                    rusqlite::types::FromSqlError::Other(
                        format!("unknown {}: {s}", stringify!($name)).into(),
                    )
                })
            }
        }
    };
}

pub(crate) use text_enum;

text_enum!(CaseStatus {
    Active => "active",
    Suspended => "suspended",
    Closed => "closed",
    Archived => "archived",
});

text_enum!(PersonType {
    Individual => "individual",
    Company => "company",
});

text_enum!(PaymentStatus {
    Pending => "pending",
    Partial => "partial",
    Paid => "paid",
    Cancelled => "cancelled",
    InCollection => "in_collection",
});

text_enum!(ReimbursementStatus {
    NotReimbursable => "not_reimbursable",
    Pending => "pending",
    Reimbursed => "reimbursed",
    Cancelled => "cancelled",
});

text_enum!(BillingType {
    Fixed => "fixed",
    Hourly => "hourly",
    SuccessFee => "success_fee",
    Mixed => "mixed",
    ProBono => "pro_bono",
});

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub full_name: String,
    pub is_staff: bool,
}

impl User {
    #[cfg(test)]
    pub fn display_name(&self) -> &str {
        if self.full_name.is_empty() {
            &self.username
        } else {
            &self.full_name
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    pub id: i64,
    pub person_type: PersonType,
    pub name: String,
    pub trade_name: Option<String>,
    pub tax_id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub is_active: bool,
    pub registered_on: NaiveDate,
}

/// A legal case (process). `client_name` and `responsible_name` are joined
/// in by the store and ignored on insert.
#[derive(Debug, Clone)]
pub struct Case {
    pub id: i64,
    pub process_number: String,
    pub process_type: String,
    pub legal_area: String,
    pub status: CaseStatus,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub value: Option<f64>,
    pub court_district: Option<String>,
    pub court_division: Option<String>,
    pub notes: Option<String>,
    pub client_id: Option<i64>,
    pub client_name: Option<String>,
    pub responsible_id: i64,
    pub responsible_name: String,
}

/// Fee receivable (revenue side of the financial report).
#[derive(Debug, Clone)]
pub struct FeeEntry {
    pub id: i64,
    pub case_id: Option<i64>,
    pub client_name: Option<String>,
    pub owner_id: i64,
    pub billing_type: BillingType,
    pub amount: f64,
    pub payment_status: PaymentStatus,
    pub due_date: NaiveDate,
    pub paid_on: Option<NaiveDate>,
}

/// Case expense (cost side of the financial report).
#[derive(Debug, Clone)]
pub struct ExpenseEntry {
    pub id: i64,
    pub case_id: Option<i64>,
    pub owner_id: i64,
    pub expense_type: String,
    pub description: String,
    pub amount: f64,
    pub due_date: NaiveDate,
    pub reimbursement_status: ReimbursementStatus,
}
