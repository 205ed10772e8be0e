use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::warn;

/// Subject performance tier, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Grade {
    APlusPlus,
    APlus,
    A,
    BPlusPlus,
    BPlus,
    B,
    C,
}

impl Grade {
    pub const ALL: [Grade; 7] = [
        Grade::APlusPlus,
        Grade::APlus,
        Grade::A,
        Grade::BPlusPlus,
        Grade::BPlus,
        Grade::B,
        Grade::C,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Grade::APlusPlus => "A++",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlusPlus => "B++",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
        }
    }

    pub fn parse(raw: &str) -> Option<Grade> {
        let t = raw.trim();
        Grade::ALL
            .iter()
            .copied()
            .find(|g| g.as_str().eq_ignore_ascii_case(t))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Subject {
    Chinese,
    Math,
    English,
    Social,
    Science,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::Chinese,
        Subject::Math,
        Subject::English,
        Subject::Social,
        Subject::Science,
    ];

    pub fn field(self) -> RecordField {
        match self {
            Subject::Chinese => RecordField::ChineseScore,
            Subject::Math => RecordField::MathScore,
            Subject::English => RecordField::EnglishScore,
            Subject::Social => RecordField::SocialScore,
            Subject::Science => RecordField::ScienceScore,
        }
    }

    pub fn grade<'a>(self, record: &'a ScoreRecord) -> &'a str {
        self.field().value(record)
    }
}

/// One crowd-submitted exam result after normalization.
///
/// Ratio and rank-interval bounds keep the text they arrived with; numeric
/// coercion happens only where ordering needs it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoreRecord {
    pub id: String,
    pub timestamp: String,
    pub region: String,
    pub exam_year: String,
    pub chinese_score: String,
    pub math_score: String,
    pub english_score: String,
    pub social_score: String,
    pub science_score: String,
    pub essay_score: String,
    pub min_ratio: String,
    pub max_ratio: String,
    pub min_rank_interval: String,
    pub max_rank_interval: String,
}

/// Canonical attributes of a record, in export/header order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordField {
    Timestamp,
    Region,
    ExamYear,
    ChineseScore,
    MathScore,
    EnglishScore,
    SocialScore,
    ScienceScore,
    EssayScore,
    MinRatio,
    MaxRatio,
    MinRankInterval,
    MaxRankInterval,
}

impl RecordField {
    pub const ALL: [RecordField; 13] = [
        RecordField::Timestamp,
        RecordField::Region,
        RecordField::ExamYear,
        RecordField::ChineseScore,
        RecordField::MathScore,
        RecordField::EnglishScore,
        RecordField::SocialScore,
        RecordField::ScienceScore,
        RecordField::EssayScore,
        RecordField::MinRatio,
        RecordField::MaxRatio,
        RecordField::MinRankInterval,
        RecordField::MaxRankInterval,
    ];

    pub fn canonical_key(self) -> &'static str {
        match self {
            RecordField::Timestamp => "timestamp",
            RecordField::Region => "region",
            RecordField::ExamYear => "examYear",
            RecordField::ChineseScore => "chineseScore",
            RecordField::MathScore => "mathScore",
            RecordField::EnglishScore => "englishScore",
            RecordField::SocialScore => "socialScore",
            RecordField::ScienceScore => "scienceScore",
            RecordField::EssayScore => "essayScore",
            RecordField::MinRatio => "minRatio",
            RecordField::MaxRatio => "maxRatio",
            RecordField::MinRankInterval => "minRankInterval",
            RecordField::MaxRankInterval => "maxRankInterval",
        }
    }

    /// Column name used by the spreadsheet form the records originate from.
    pub fn localized_key(self) -> &'static str {
        match self {
            RecordField::Timestamp => "時間戳記",
            RecordField::Region => "區域",
            RecordField::ExamYear => "會考年度",
            RecordField::ChineseScore => "國文成績",
            RecordField::MathScore => "數學成績",
            RecordField::EnglishScore => "英文成績",
            RecordField::SocialScore => "社會成績",
            RecordField::ScienceScore => "自然成績",
            RecordField::EssayScore => "作文成績",
            RecordField::MinRatio => "全區序位最小比率(%)",
            RecordField::MaxRatio => "全區序位最大比率(%)",
            RecordField::MinRankInterval => "全區序位最小區間",
            RecordField::MaxRankInterval => "全區序位最大區間",
        }
    }

    pub fn value(self, r: &ScoreRecord) -> &str {
        match self {
            RecordField::Timestamp => &r.timestamp,
            RecordField::Region => &r.region,
            RecordField::ExamYear => &r.exam_year,
            RecordField::ChineseScore => &r.chinese_score,
            RecordField::MathScore => &r.math_score,
            RecordField::EnglishScore => &r.english_score,
            RecordField::SocialScore => &r.social_score,
            RecordField::ScienceScore => &r.science_score,
            RecordField::EssayScore => &r.essay_score,
            RecordField::MinRatio => &r.min_ratio,
            RecordField::MaxRatio => &r.max_ratio,
            RecordField::MinRankInterval => &r.min_rank_interval,
            RecordField::MaxRankInterval => &r.max_rank_interval,
        }
    }

    fn slot(self, r: &mut ScoreRecord) -> &mut String {
        match self {
            RecordField::Timestamp => &mut r.timestamp,
            RecordField::Region => &mut r.region,
            RecordField::ExamYear => &mut r.exam_year,
            RecordField::ChineseScore => &mut r.chinese_score,
            RecordField::MathScore => &mut r.math_score,
            RecordField::EnglishScore => &mut r.english_score,
            RecordField::SocialScore => &mut r.social_score,
            RecordField::ScienceScore => &mut r.science_score,
            RecordField::EssayScore => &mut r.essay_score,
            RecordField::MinRatio => &mut r.min_ratio,
            RecordField::MaxRatio => &mut r.max_ratio,
            RecordField::MinRankInterval => &mut r.min_rank_interval,
            RecordField::MaxRankInterval => &mut r.max_rank_interval,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub records: Vec<ScoreRecord>,
    pub skipped: usize,
}

fn scalar_text(v: Option<&serde_json::Value>) -> Option<String> {
    let s = match v? {
        serde_json::Value::String(s) => s.trim().to_string(),
        serde_json::Value::Number(n) => n.to_string(),
        serde_json::Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Normalizes raw rows from either schema into canonical records.
///
/// Canonical keys win; a missing or blank canonical value falls back to the
/// localized column of the same field. Non-object rows are skipped.
pub fn normalize_rows(rows: &[serde_json::Value]) -> Normalized {
    let mut out = Normalized::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for (idx, row) in rows.iter().enumerate() {
        let Some(obj) = row.as_object() else {
            warn!(row = idx, "skipping non-object record row");
            out.skipped += 1;
            continue;
        };
        let mut rec = ScoreRecord::default();
        for field in RecordField::ALL {
            let v = scalar_text(obj.get(field.canonical_key()))
                .or_else(|| scalar_text(obj.get(field.localized_key())))
                .unwrap_or_default();
            *field.slot(&mut rec) = v;
        }

        let base = content_hash(&rec, None);
        let n = seen.entry(base.clone()).or_insert(0);
        rec.id = if *n == 0 {
            base
        } else {
            content_hash(&rec, Some(*n))
        };
        *n += 1;
        out.records.push(rec);
    }
    out
}

fn content_hash(rec: &ScoreRecord, occurrence: Option<usize>) -> String {
    let mut hasher = Sha256::new();
    for field in RecordField::ALL {
        hasher.update(field.value(rec).as_bytes());
        hasher.update([0x1f]);
    }
    if let Some(n) = occurrence {
        hasher.update(n.to_string().as_bytes());
    }
    hasher
        .finalize()
        .iter()
        .take(8)
        .map(|b| format!("{:02x}", b))
        .collect()
}

/// Leading-numeric parse: "1.2%" -> 1.2, "2.5e-3" -> 0.0025, "" / "n/a" -> 0.0.
pub fn coerce_number(raw: &str) -> f64 {
    let t = raw.trim();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;
    for (i, c) in t.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '.' if !seen_dot => seen_dot = true,
            c if c.is_ascii_digit() => seen_digit = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }
    if !seen_digit {
        return 0.0;
    }
    end += exponent_len(&t[end..]);
    t[..end]
        .trim_end_matches('.')
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0)
}

/// Length of a complete `e[+-]digits` suffix at the start of `rest`, or 0.
fn exponent_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    if !matches!(bytes.first(), Some(b'e' | b'E')) {
        return 0;
    }
    let mut i = 1;
    if matches!(bytes.get(i), Some(b'+' | b'-')) {
        i += 1;
    }
    let digits = bytes[i..].iter().take_while(|b| b.is_ascii_digit()).count();
    if digits == 0 {
        0
    } else {
        i + digits
    }
}

/// Milliseconds since the Unix epoch; anything unparsable is the epoch itself.
/// Stamps without an offset are read as UTC, not local time.
pub fn coerce_instant(raw: &str) -> i64 {
    use chrono::{DateTime, NaiveDate, NaiveDateTime};

    let t = raw.trim();
    if t.is_empty() {
        return 0;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(t) {
        return dt.timestamp_millis();
    }
    for fmt in [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M",
    ] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(t, fmt) {
            return dt.and_utc().timestamp_millis();
        }
    }
    for fmt in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(t, fmt) {
            if let Some(dt) = d.and_hms_opt(0, 0, 0) {
                return dt.and_utc().timestamp_millis();
            }
        }
    }
    0
}

fn pair_display(min: &str, max: &str, sep: &str, suffix: &str) -> Option<String> {
    match (min.is_empty(), max.is_empty()) {
        (true, true) => None,
        (false, true) => Some(format!("{min}{suffix}")),
        (true, false) => Some(format!("{max}{suffix}")),
        (false, false) if min == max => Some(format!("{min}{suffix}")),
        (false, false) => Some(format!("{min}{suffix}{sep}{max}{suffix}")),
    }
}

impl ScoreRecord {
    pub fn subject_grades(&self) -> [&str; 5] {
        Subject::ALL.map(|s| s.grade(self))
    }

    /// Number of the five subjects (essay excluded) graded in the A tier.
    pub fn a_count(&self) -> usize {
        self.subject_grades()
            .iter()
            .filter(|g| g.contains('A'))
            .count()
    }

    /// "1.2% - 1.5%", or a single value when the bounds agree or one is missing.
    /// Inverted bounds are shown as they are.
    pub fn ratio_display(&self) -> String {
        pair_display(&self.min_ratio, &self.max_ratio, " - ", "%").unwrap_or_else(|| "-".into())
    }

    pub fn rank_interval_display(&self) -> String {
        pair_display(&self.min_rank_interval, &self.max_rank_interval, " - ", "")
            .unwrap_or_else(|| "-".into())
    }
}
