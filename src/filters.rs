use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::{DocketError, Result};
use crate::models::{CaseStatus, PaymentStatus, PersonType};
use crate::period::{self, DateWindow, PeriodCode};

/// Raw submitted filter values, keyed by parameter name.
pub type ParamMap = BTreeMap<String, String>;

pub const PERIOD: &str = "period";
pub const START_DATE: &str = "start_date";
pub const END_DATE: &str = "end_date";
pub const REFERENCE_DATE: &str = "reference_date";
pub const CASE_TYPE: &str = "case_type";
pub const LEGAL_AREA: &str = "legal_area";
pub const CASE_STATUS: &str = "case_status";
pub const RESPONSIBLE: &str = "responsible";
pub const PERSON_TYPE: &str = "person_type";
pub const STATE: &str = "state";
pub const PAYMENT_STATUS: &str = "payment_status";
pub const MIN_VALUE: &str = "min_value";
pub const MAX_VALUE: &str = "max_value";

const DATE_FMT: &str = "%Y-%m-%d";

/// Validated filter selections for one report run.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub period: Option<PeriodCode>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// "Today" for relative periods; kept so a snapshot resolves identically later.
    pub reference_date: NaiveDate,
    pub window: DateWindow,
    pub case_type: Option<String>,
    pub legal_area: Option<String>,
    pub case_status: Option<CaseStatus>,
    pub responsible: Option<i64>,
    pub person_type: Option<PersonType>,
    pub state: Option<String>,
    pub payment_status: Option<PaymentStatus>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
}

impl FilterSpec {
    /// Parse and validate submitted parameters. Empty values count as absent;
    /// unknown keys are ignored.
    pub fn from_params(params: &ParamMap, today: NaiveDate) -> Result<Self> {
        let reference_date = parse_date(params, REFERENCE_DATE)?.unwrap_or(today);
        let raw_period = value(params, PERIOD);
        let start_date = parse_date(params, START_DATE)?;
        let end_date = parse_date(params, END_DATE)?;
        let window = period::resolve(raw_period, start_date, end_date, reference_date)?;

        let period = raw_period.and_then(PeriodCode::parse);
        if raw_period.is_some() && period.is_none() {
            tracing::debug!(period = raw_period, "unrecognized period code, leaving dates open");
        }

        let case_status = match value(params, CASE_STATUS) {
            Some(s) => Some(CaseStatus::parse(s).ok_or_else(|| invalid(CASE_STATUS, s))?),
            None => None,
        };
        let person_type = match value(params, PERSON_TYPE) {
            Some(s) => Some(PersonType::parse(s).ok_or_else(|| invalid(PERSON_TYPE, s))?),
            None => None,
        };
        let payment_status = match value(params, PAYMENT_STATUS) {
            Some(s) => Some(PaymentStatus::parse(s).ok_or_else(|| invalid(PAYMENT_STATUS, s))?),
            None => None,
        };
        let responsible = match value(params, RESPONSIBLE) {
            Some(s) => Some(s.parse::<i64>().map_err(|_| invalid(RESPONSIBLE, s))?),
            None => None,
        };
        let min_value = parse_amount(params, MIN_VALUE)?;
        let max_value = parse_amount(params, MAX_VALUE)?;
        if let (Some(min), Some(max)) = (min_value, max_value) {
            if min > max {
                return Err(DocketError::Validation(
                    "Minimum value must not exceed the maximum value.".to_string(),
                ));
            }
        }

        Ok(Self {
            period,
            start_date,
            end_date,
            reference_date,
            window,
            case_type: value(params, CASE_TYPE).map(str::to_string),
            legal_area: value(params, LEGAL_AREA).map(str::to_string),
            case_status,
            responsible,
            person_type,
            state: value(params, STATE).map(|s| s.to_uppercase()),
            payment_status,
            min_value,
            max_value,
        })
    }

    /// Snapshot of the parameters, including the reference date, so that
    /// `from_params` on the result yields an equal filter.
    pub fn to_params(&self) -> ParamMap {
        let mut params = ParamMap::new();
        let mut put = |k: &str, v: Option<String>| {
            if let Some(v) = v {
                params.insert(k.to_string(), v);
            }
        };
        put(PERIOD, self.period.map(|p| p.as_str().to_string()));
        put(START_DATE, self.start_date.map(|d| d.format(DATE_FMT).to_string()));
        put(END_DATE, self.end_date.map(|d| d.format(DATE_FMT).to_string()));
        put(REFERENCE_DATE, Some(self.reference_date.format(DATE_FMT).to_string()));
        put(CASE_TYPE, self.case_type.clone());
        put(LEGAL_AREA, self.legal_area.clone());
        put(CASE_STATUS, self.case_status.map(|s| s.as_str().to_string()));
        put(RESPONSIBLE, self.responsible.map(|r| r.to_string()));
        put(PERSON_TYPE, self.person_type.map(|p| p.as_str().to_string()));
        put(STATE, self.state.clone());
        put(PAYMENT_STATUS, self.payment_status.map(|p| p.as_str().to_string()));
        put(MIN_VALUE, self.min_value.map(|v| v.to_string()));
        put(MAX_VALUE, self.max_value.map(|v| v.to_string()));
        params
    }
}

/// Overlay request parameters on a template's stored defaults.
pub fn merge_params(defaults: &ParamMap, overrides: &ParamMap) -> ParamMap {
    let mut merged = defaults.clone();
    for (k, v) in overrides {
        merged.insert(k.clone(), v.clone());
    }
    merged
}

/// Parse `key=value` pairs as given on the command line.
pub fn parse_pairs(pairs: &[String]) -> Result<ParamMap> {
    let mut params = ParamMap::new();
    for pair in pairs {
        let (k, v) = pair.split_once('=').ok_or_else(|| {
            DocketError::Validation(format!("Expected key=value, got '{pair}'"))
        })?;
        params.insert(k.trim().to_string(), v.trim().to_string());
    }
    Ok(params)
}

fn value<'a>(params: &'a ParamMap, key: &str) -> Option<&'a str> {
    params.get(key).map(|s| s.trim()).filter(|s| !s.is_empty())
}

fn invalid(key: &str, raw: &str) -> DocketError {
    DocketError::Validation(format!("Invalid value for {key}: '{raw}'"))
}

fn parse_date(params: &ParamMap, key: &str) -> Result<Option<NaiveDate>> {
    match value(params, key) {
        Some(s) => NaiveDate::parse_from_str(s, DATE_FMT)
            .map(Some)
            .map_err(|_| invalid(key, s)),
        None => Ok(None),
    }
}

fn parse_amount(params: &ParamMap, key: &str) -> Result<Option<f64>> {
    match value(params, key) {
        Some(s) => {
            let v: f64 = s.parse().map_err(|_| invalid(key, s))?;
            if !v.is_finite() {
                return Err(invalid(key, s));
            }
            Ok(Some(v))
        }
        None => Ok(None),
    }
}
