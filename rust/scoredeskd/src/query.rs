use crate::config::Catalog;
use crate::error::{Error, Result};
use crate::record::{coerce_instant, coerce_number, Grade, RecordField, ScoreRecord};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FilterField {
    Region,
    ExamYear,
    ChineseScore,
    MathScore,
    EnglishScore,
    SocialScore,
    ScienceScore,
}

impl FilterField {
    pub const ALL: [FilterField; 7] = [
        FilterField::Region,
        FilterField::ExamYear,
        FilterField::ChineseScore,
        FilterField::MathScore,
        FilterField::EnglishScore,
        FilterField::SocialScore,
        FilterField::ScienceScore,
    ];

    pub fn record_field(self) -> RecordField {
        match self {
            FilterField::Region => RecordField::Region,
            FilterField::ExamYear => RecordField::ExamYear,
            FilterField::ChineseScore => RecordField::ChineseScore,
            FilterField::MathScore => RecordField::MathScore,
            FilterField::EnglishScore => RecordField::EnglishScore,
            FilterField::SocialScore => RecordField::SocialScore,
            FilterField::ScienceScore => RecordField::ScienceScore,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.record_field().canonical_key()
    }

    fn is_grade(self) -> bool {
        !matches!(self, FilterField::Region | FilterField::ExamYear)
    }

    /// Checks a filter value against the catalog and returns its canonical form.
    fn canonical_value(self, raw: &str, catalog: &Catalog) -> Result<String> {
        let v = raw.trim();
        match self {
            FilterField::Region if catalog.has_region(v) => Ok(v.to_string()),
            FilterField::ExamYear if catalog.has_year(v) => Ok(v.to_string()),
            f if f.is_grade() => Grade::parse(v)
                .map(|g| g.as_str().to_string())
                .ok_or_else(|| {
                    Error::invalid(format!("filters.{} has unknown grade '{}'", f.as_str(), v))
                }),
            f => Err(Error::invalid(format!(
                "filters.{} has unknown value '{}'",
                f.as_str(),
                v
            ))),
        }
    }
}

impl FromStr for FilterField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "region" => Ok(FilterField::Region),
            "year" | "examYear" => Ok(FilterField::ExamYear),
            "chineseScore" => Ok(FilterField::ChineseScore),
            "mathScore" => Ok(FilterField::MathScore),
            "englishScore" => Ok(FilterField::EnglishScore),
            "socialScore" => Ok(FilterField::SocialScore),
            "scienceScore" => Ok(FilterField::ScienceScore),
            other => Err(Error::invalid(format!("unknown filter field '{}'", other))),
        }
    }
}

/// Per-field sets of acceptable values. A field without a set is unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    constraints: BTreeMap<FilterField, BTreeSet<String>>,
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the constraint on `field`; an empty value list clears it.
    pub fn set<I, S>(&mut self, field: FilterField, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| !v.is_empty())
            .collect();
        if set.is_empty() {
            self.constraints.remove(&field);
        } else {
            self.constraints.insert(field, set);
        }
    }

    pub fn set_exact(&mut self, field: FilterField, value: &str) {
        self.set(field, [value]);
    }

    #[cfg(test)]
    pub fn with_exact(mut self, field: FilterField, value: &str) -> Self {
        self.set_exact(field, value);
        self
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn constraint(&self, field: FilterField) -> Option<&BTreeSet<String>> {
        self.constraints.get(&field)
    }

    /// Fields constrained in `other` replace this one's.
    pub fn merge(&mut self, other: FilterCriteria) {
        self.constraints.extend(other.constraints);
    }

    pub fn matches(&self, r: &ScoreRecord) -> bool {
        self.constraints
            .iter()
            .all(|(field, allowed)| allowed.contains(field.record_field().value(r)))
    }

    /// Builds criteria from `{"region": "基北區", "mathScore": ["A", "A+"], ...}`.
    ///
    /// Empty strings, empty arrays and nulls mean "no constraint"; unknown
    /// fields and values outside the catalog are rejected.
    pub fn from_json(raw: Option<&serde_json::Value>, catalog: &Catalog) -> Result<Self> {
        let mut out = FilterCriteria::new();
        let Some(raw) = raw else {
            return Ok(out);
        };
        if raw.is_null() {
            return Ok(out);
        }
        let Some(obj) = raw.as_object() else {
            return Err(Error::invalid("filters must be an object"));
        };
        for (key, value) in obj {
            let field: FilterField = key.parse()?;
            let raw_values: Vec<&str> = match value {
                serde_json::Value::Null => Vec::new(),
                serde_json::Value::String(s) => vec![s.as_str()],
                serde_json::Value::Array(items) => {
                    let mut vals = Vec::with_capacity(items.len());
                    for item in items {
                        let Some(s) = item.as_str() else {
                            return Err(Error::invalid(format!(
                                "filters.{} must contain only strings",
                                key
                            )));
                        };
                        vals.push(s);
                    }
                    vals
                }
                _ => {
                    return Err(Error::invalid(format!(
                        "filters.{} must be a string, an array of strings or null",
                        key
                    )))
                }
            };
            let mut values = Vec::new();
            for v in raw_values {
                if v.trim().is_empty() {
                    continue;
                }
                values.push(field.canonical_value(v, catalog)?);
            }
            out.set(field, values);
        }
        Ok(out)
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (field, values) in &self.constraints {
            map.insert(field.as_str().to_string(), json!(values));
        }
        serde_json::Value::Object(map)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortField {
    Timestamp,
    Region,
    ExamYear,
    MinRatio,
    MaxRatio,
    MinRankInterval,
    MaxRankInterval,
}

enum SortKey<'a> {
    Instant(i64),
    Number(f64),
    Text(&'a str),
}

impl SortKey<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Instant(a), SortKey::Instant(b)) => a.cmp(b),
            (SortKey::Number(a), SortKey::Number(b)) => a.total_cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            _ => Ordering::Equal,
        }
    }
}

impl SortField {
    pub const ALL: [SortField; 7] = [
        SortField::Timestamp,
        SortField::Region,
        SortField::ExamYear,
        SortField::MinRatio,
        SortField::MaxRatio,
        SortField::MinRankInterval,
        SortField::MaxRankInterval,
    ];

    pub fn record_field(self) -> RecordField {
        match self {
            SortField::Timestamp => RecordField::Timestamp,
            SortField::Region => RecordField::Region,
            SortField::ExamYear => RecordField::ExamYear,
            SortField::MinRatio => RecordField::MinRatio,
            SortField::MaxRatio => RecordField::MaxRatio,
            SortField::MinRankInterval => RecordField::MinRankInterval,
            SortField::MaxRankInterval => RecordField::MaxRankInterval,
        }
    }

    pub fn as_str(self) -> &'static str {
        self.record_field().canonical_key()
    }

    fn key(self, r: &ScoreRecord) -> SortKey<'_> {
        let raw = self.record_field().value(r);
        match self {
            SortField::Timestamp => SortKey::Instant(coerce_instant(raw)),
            SortField::Region | SortField::ExamYear => SortKey::Text(raw),
            SortField::MinRatio
            | SortField::MaxRatio
            | SortField::MinRankInterval
            | SortField::MaxRankInterval => SortKey::Number(coerce_number(raw)),
        }
    }
}

impl FromStr for SortField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        SortField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| {
                let allowed = SortField::ALL.map(|f| f.as_str()).join(", ");
                Error::invalid(format!("sort field must be one of: {}", allowed))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("asc") || s.eq_ignore_ascii_case("ascending") {
            Ok(SortOrder::Asc)
        } else if s.eq_ignore_ascii_case("desc") || s.eq_ignore_ascii_case("descending") {
            Ok(SortOrder::Desc)
        } else {
            Err(Error::invalid("sort order must be one of: asc, desc"))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            field: SortField::Timestamp,
            order: SortOrder::Desc,
        }
    }
}

impl SortSpec {
    /// Re-selecting the active descending field flips it to ascending; any
    /// other selection (a new field, or the active one already ascending)
    /// sorts descending.
    pub fn toggled(self, field: SortField) -> SortSpec {
        let order = if self.field == field && self.order == SortOrder::Desc {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        };
        SortSpec { field, order }
    }

    pub fn to_json(self) -> serde_json::Value {
        json!({ "field": self.field.as_str(), "order": self.order.as_str() })
    }
}

/// Filters then sorts. Equal keys keep their input order in both directions.
pub fn query(records: &[ScoreRecord], filters: &FilterCriteria, sort: SortSpec) -> Vec<ScoreRecord> {
    let mut keyed: Vec<(SortKey<'_>, &ScoreRecord)> = records
        .iter()
        .filter(|r| filters.matches(r))
        .map(|r| (sort.field.key(r), r))
        .collect();
    keyed.sort_by(|a, b| {
        let ord = a.0.cmp(&b.0);
        match sort.order {
            SortOrder::Asc => ord,
            SortOrder::Desc => ord.reverse(),
        }
    });
    keyed.into_iter().map(|(_, r)| r.clone()).collect()
}
