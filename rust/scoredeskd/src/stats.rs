use crate::record::ScoreRecord;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBucket {
    pub key: &'static str,
    pub label: &'static str,
    /// Number of A-tier subjects; `None` for the all-B/C bucket.
    pub a_count: Option<usize>,
    pub count: usize,
    pub percentage: f64,
    pub bar_ratio: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_count: usize,
    pub target_year: String,
    pub recent_year_count: usize,
    pub top_tier_count: usize,
    pub grade_distribution: Vec<GradeBucket>,
}

const BUCKETS: [(&str, &str, Option<usize>); 6] = [
    ("5A", "5A", Some(5)),
    ("4A", "4A", Some(4)),
    ("3A", "3A", Some(3)),
    ("2A", "2A", Some(2)),
    ("1A", "1A", Some(1)),
    ("noA", "all B/C", None),
];

/// Recomputed from scratch for every filtered set; inputs are small.
pub fn summarize(records: &[ScoreRecord], target_year: &str) -> Summary {
    let mut counts = [0_usize; 6];
    for r in records {
        let idx = match r.a_count() {
            n @ 1..=5 => 5 - n,
            _ => 5,
        };
        counts[idx] += 1;
    }

    let total = records.len();
    let max_bucket = counts.iter().copied().max().unwrap_or(0).max(1);
    let grade_distribution = BUCKETS
        .iter()
        .zip(counts.iter())
        .map(|(&(key, label, a_count), &count)| GradeBucket {
            key,
            label,
            a_count,
            count,
            percentage: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            bar_ratio: count as f64 / max_bucket as f64,
        })
        .collect();

    Summary {
        total_count: total,
        target_year: target_year.to_string(),
        recent_year_count: records.iter().filter(|r| r.exam_year == target_year).count(),
        top_tier_count: counts[0],
        grade_distribution,
    }
}
