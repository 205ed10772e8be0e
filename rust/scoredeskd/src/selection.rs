use crate::record::ScoreRecord;
use serde::Serialize;
use serde_json::json;

pub const DEFAULT_PIN_CAPACITY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Added,
    Removed,
    /// Set already full; nothing changed.
    Rejected { capacity: usize },
}

/// Ordered, duplicate-free ids pinned for side-by-side comparison.
///
/// Membership is a linear scan; the capacity keeps it at a handful of ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectionSet {
    ids: Vec<String>,
    #[serde(skip)]
    capacity: usize,
}

impl Default for SelectionSet {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_PIN_CAPACITY)
    }
}

impl SelectionSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ids: Vec::with_capacity(capacity),
            capacity: capacity.max(1),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.iter().any(|p| p == id)
    }

    pub fn toggle(&mut self, id: &str) -> Toggle {
        if self.remove(id) {
            return Toggle::Removed;
        }
        if self.ids.len() >= self.capacity {
            return Toggle::Rejected {
                capacity: self.capacity,
            };
        }
        self.ids.push(id.to_string());
        Toggle::Added
    }

    /// Returns whether `id` was pinned.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.ids.len();
        self.ids.retain(|p| p != id);
        self.ids.len() != before
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Drops pins for which `keep` is false; returns how many were dropped.
    pub fn retain<F: FnMut(&str) -> bool>(&mut self, mut keep: F) -> usize {
        let before = self.ids.len();
        self.ids.retain(|id| keep(id));
        before - self.ids.len()
    }

    /// Pinned records in pin order; ids without a record are left out.
    pub fn resolve<'a>(&self, records: &'a [ScoreRecord]) -> Vec<&'a ScoreRecord> {
        self.ids
            .iter()
            .filter_map(|id| records.iter().find(|r| &r.id == id))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareAttribute {
    Region,
    ExamYear,
    Ratio,
    RankInterval,
    Chinese,
    English,
    Math,
    Social,
    Science,
    Essay,
}

impl CompareAttribute {
    pub const ALL: [CompareAttribute; 10] = [
        CompareAttribute::Region,
        CompareAttribute::ExamYear,
        CompareAttribute::Ratio,
        CompareAttribute::RankInterval,
        CompareAttribute::Chinese,
        CompareAttribute::English,
        CompareAttribute::Math,
        CompareAttribute::Social,
        CompareAttribute::Science,
        CompareAttribute::Essay,
    ];

    pub fn key(self) -> &'static str {
        match self {
            CompareAttribute::Region => "region",
            CompareAttribute::ExamYear => "examYear",
            CompareAttribute::Ratio => "ratio",
            CompareAttribute::RankInterval => "rankInterval",
            CompareAttribute::Chinese => "chineseScore",
            CompareAttribute::English => "englishScore",
            CompareAttribute::Math => "mathScore",
            CompareAttribute::Social => "socialScore",
            CompareAttribute::Science => "scienceScore",
            CompareAttribute::Essay => "essayScore",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CompareAttribute::Region => "區域",
            CompareAttribute::ExamYear => "年度",
            CompareAttribute::Ratio => "序位比率",
            CompareAttribute::RankInterval => "排名區間",
            CompareAttribute::Chinese => "國文",
            CompareAttribute::English => "英文",
            CompareAttribute::Math => "數學",
            CompareAttribute::Social => "社會",
            CompareAttribute::Science => "自然",
            CompareAttribute::Essay => "作文",
        }
    }

    pub fn value(self, r: &ScoreRecord) -> String {
        match self {
            CompareAttribute::Region => r.region.clone(),
            CompareAttribute::ExamYear => r.exam_year.clone(),
            CompareAttribute::Ratio => r.ratio_display(),
            CompareAttribute::RankInterval => r.rank_interval_display(),
            CompareAttribute::Chinese => r.chinese_score.clone(),
            CompareAttribute::English => r.english_score.clone(),
            CompareAttribute::Math => r.math_score.clone(),
            CompareAttribute::Social => r.social_score.clone(),
            CompareAttribute::Science => r.science_score.clone(),
            CompareAttribute::Essay => r.essay_score.clone(),
        }
    }
}

/// Attribute rows by pinned-record columns.
pub fn comparison(pinned: &[&ScoreRecord]) -> serde_json::Value {
    let rows: Vec<serde_json::Value> = CompareAttribute::ALL
        .iter()
        .map(|attr| {
            json!({
                "key": attr.key(),
                "label": attr.label(),
                "values": pinned.iter().map(|r| attr.value(r)).collect::<Vec<_>>(),
            })
        })
        .collect();
    json!({
        "columns": pinned.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(),
        "rows": rows,
    })
}
