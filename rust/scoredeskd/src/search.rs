//! Free-text search mapped onto structured filters.
//!
//! Best-effort only: each token is matched against region names, catalog
//! years and `<subject><grade>` pairs, and the first hit per category wins.
//! Anything else is reported back rather than matched loosely.

use crate::config::Catalog;
use crate::query::{FilterCriteria, FilterField};
use crate::record::Grade;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMatch {
    pub token: String,
    pub field: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchMapping {
    pub filters: FilterCriteria,
    pub matched: Vec<TokenMatch>,
    /// Tokens that matched something already claimed or several candidates.
    pub ambiguous: Vec<String>,
    pub ignored: Vec<String>,
}

const SUBJECT_ALIASES: [(&str, FilterField); 15] = [
    ("國文", FilterField::ChineseScore),
    ("國", FilterField::ChineseScore),
    ("chinese", FilterField::ChineseScore),
    ("數學", FilterField::MathScore),
    ("數", FilterField::MathScore),
    ("math", FilterField::MathScore),
    ("英文", FilterField::EnglishScore),
    ("英", FilterField::EnglishScore),
    ("english", FilterField::EnglishScore),
    ("社會", FilterField::SocialScore),
    ("社", FilterField::SocialScore),
    ("social", FilterField::SocialScore),
    ("自然", FilterField::ScienceScore),
    ("自", FilterField::ScienceScore),
    ("science", FilterField::ScienceScore),
];

fn subject_grade(token: &str) -> Option<(FilterField, Grade)> {
    let lower = token.to_lowercase();
    for (alias, field) in SUBJECT_ALIASES {
        let Some(rest) = lower.strip_prefix(alias) else {
            continue;
        };
        let rest = rest.trim_start_matches([':', '=']);
        if let Some(g) = Grade::parse(rest) {
            return Some((field, g));
        }
    }
    None
}

fn region_candidates<'a>(token: &str, catalog: &'a Catalog) -> Vec<&'a String> {
    let bare = token.trim_end_matches('區');
    if bare.is_empty() {
        return Vec::new();
    }
    catalog
        .regions
        .iter()
        .filter(|r| r.as_str() == token || r.contains(bare))
        .collect()
}

pub fn map_search(term: &str, catalog: &Catalog) -> SearchMapping {
    let mut out = SearchMapping::default();

    for token in term.split_whitespace() {
        if let Some((field, grade)) = subject_grade(token) {
            claim(&mut out, token, field, grade.as_str().to_string(), 1);
            continue;
        }
        if Grade::parse(token).is_some() {
            // A bare grade could belong to any of the five subjects.
            out.ambiguous.push(token.to_string());
            continue;
        }
        let regions = region_candidates(token, catalog);
        if let Some(first) = regions.first() {
            claim(&mut out, token, FilterField::Region, first.to_string(), regions.len());
            continue;
        }
        let years: Vec<&String> = catalog.years.iter().filter(|y| y.contains(token)).collect();
        if let Some(first) = years.first() {
            claim(&mut out, token, FilterField::ExamYear, first.to_string(), years.len());
            continue;
        }
        out.ignored.push(token.to_string());
    }
    out
}

fn claim(out: &mut SearchMapping, token: &str, field: FilterField, value: String, candidates: usize) {
    if out.filters.constraint(field).is_some() {
        out.ambiguous.push(token.to_string());
        return;
    }
    if candidates > 1 {
        out.ambiguous.push(token.to_string());
    }
    out.filters.set_exact(field, &value);
    out.matched.push(TokenMatch {
        token: token.to_string(),
        field: field.as_str(),
        value,
    });
}
