use std::cmp::Ordering;

use crate::catalog::FieldValue;

/// Discriminator column prepended to financial rowsets.
pub const KIND_COLUMN: &str = "kind";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub id: &'static str,
    pub label: &'static str,
}

/// One projected record: field id → value, in column order. Fields that were
/// not selected (or do not apply to the record) are absent, not null.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    cells: Vec<(&'static str, FieldValue)>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: &'static str, value: FieldValue) {
        match self.cells.iter_mut().find(|(k, _)| *k == key) {
            Some(cell) => cell.1 = value,
            None => self.cells.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v)
    }

    #[cfg(test)]
    pub fn keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.cells.iter().map(|(k, _)| *k)
    }

    pub fn into_cells(self) -> Vec<(&'static str, FieldValue)> {
        self.cells
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Projected records plus the column list every export renders against.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Rowset {
    pub columns: Vec<Column>,
    pub records: Vec<Record>,
}

/// Fully stringified table, the common input of all exporters.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Rowset {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Stable sort by field ids, each optionally prefixed with `-` for
    /// descending order. Missing and empty cells sort first.
    pub fn sort_by_keys(&mut self, keys: &[String]) {
        if keys.is_empty() {
            return;
        }
        let keys: Vec<(&str, bool)> = keys
            .iter()
            .map(|k| match k.strip_prefix('-') {
                Some(id) => (id, true),
                None => (k.as_str(), false),
            })
            .collect();
        self.records.sort_by(|a, b| {
            for (id, descending) in &keys {
                let ord = compare_cells(a.get(id), b.get(id));
                let ord = if *descending { ord.reverse() } else { ord };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    /// Render to strings against the column list, keeping at most `limit`
    /// rows. Missing cells become empty strings.
    pub fn to_table(&self, limit: Option<usize>) -> ReportTable {
        let take = limit.unwrap_or(usize::MAX);
        let header = self.columns.iter().map(|c| c.id.to_string()).collect();
        let rows = self
            .records
            .iter()
            .take(take)
            .map(|r| {
                self.columns
                    .iter()
                    .map(|c| r.get(c.id).map(|v| v.to_string()).unwrap_or_default())
                    .collect()
            })
            .collect();
        ReportTable { header, rows }
    }
}

fn compare_cells(a: Option<&FieldValue>, b: Option<&FieldValue>) -> Ordering {
    fn rank(v: Option<&FieldValue>) -> u8 {
        match v {
            None | Some(FieldValue::Empty) => 0,
            Some(FieldValue::Date(_)) => 1,
            Some(FieldValue::Money(_)) => 2,
            Some(FieldValue::Text(_)) => 3,
        }
    }
    match (a, b) {
        (Some(FieldValue::Text(x)), Some(FieldValue::Text(y))) => x.cmp(y),
        (Some(FieldValue::Date(x)), Some(FieldValue::Date(y))) => x.cmp(y),
        (Some(FieldValue::Money(x)), Some(FieldValue::Money(y))) => x.total_cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}
