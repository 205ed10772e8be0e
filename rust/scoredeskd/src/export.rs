use crate::record::{RecordField, ScoreRecord};
use anyhow::Context;
use rust_xlsxwriter::Workbook;
use std::path::Path;

const BOM: &str = "\u{feff}";

pub const XLSX_SHEET_NAME: &str = "會考序位資料";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn render(self, rows: &[ScoreRecord]) -> anyhow::Result<Vec<u8>> {
        match self {
            ExportFormat::Csv => Ok(to_csv(rows).into_bytes()),
            ExportFormat::Json => Ok(to_json(rows)?.into_bytes()),
            ExportFormat::Xlsx => to_xlsx(rows),
        }
    }
}

fn quote(v: &str) -> String {
    format!("\"{}\"", v.replace('"', "\"\""))
}

/// BOM-prefixed CSV with every field quoted and canonical column names.
pub fn to_csv(rows: &[ScoreRecord]) -> String {
    let mut out = String::from(BOM);
    let header: Vec<&str> = RecordField::ALL.iter().map(|f| f.canonical_key()).collect();
    out.push_str(&header.join(","));
    for r in rows {
        out.push('\n');
        let line: Vec<String> = RecordField::ALL.iter().map(|f| quote(f.value(r))).collect();
        out.push_str(&line.join(","));
    }
    out.push('\n');
    out
}

pub fn to_json(rows: &[ScoreRecord]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(rows).context("failed to serialize records")
}

/// Single-sheet workbook: canonical header row, then one text row per record.
pub fn to_xlsx(rows: &[ScoreRecord]) -> anyhow::Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(XLSX_SHEET_NAME)?;
    for (col, field) in RecordField::ALL.iter().enumerate() {
        sheet.write_string(0, col as u16, field.canonical_key())?;
    }
    for (i, r) in rows.iter().enumerate() {
        let row = u32::try_from(i + 1).context("too many rows for a worksheet")?;
        for (col, field) in RecordField::ALL.iter().enumerate() {
            sheet.write_string(row, col as u16, field.value(r))?;
        }
    }
    workbook.save_to_buffer().context("failed to build workbook")
}

/// Writes the rendered export, creating parent directories as needed.
pub fn write_export(path: &Path, format: ExportFormat, rows: &[ScoreRecord]) -> anyhow::Result<usize> {
    let content = format.render(rows)?;
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create directory {}", parent.to_string_lossy())
            })?;
        }
    }
    std::fs::write(path, &content)
        .with_context(|| format!("failed to write export {}", path.to_string_lossy()))?;
    Ok(content.len())
}

/// Default download name, e.g. `scores_2025-06-01.csv`.
pub fn default_file_name(format: ExportFormat, today: chrono::NaiveDate) -> String {
    format!("scores_{}.{}", today.format("%Y-%m-%d"), format.extension())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::tests::sample_records;

    #[test]
    fn csv_has_bom_header_and_quoted_fields() {
        let mut rows = sample_records();
        rows[1].essay_score = "say \"hi\"".into();
        let csv = to_csv(&rows);
        assert!(csv.starts_with('\u{feff}'));
        let lines: Vec<&str> = csv.trim_start_matches('\u{feff}').lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "timestamp,region,examYear,chineseScore,mathScore,englishScore,socialScore,scienceScore,essayScore,minRatio,maxRatio,minRankInterval,maxRankInterval"
        );
        assert!(lines[1].starts_with("\"2025-05-20T10:00:00Z\",\"基北區\",\"114\",\"A++\""));
        assert!(lines[2].contains("\"say \"\"hi\"\"\""));
        assert_eq!(lines[1].split("\",\"").count(), 13);
    }

    #[test]
    fn empty_export_is_header_only() {
        let csv = to_csv(&[]);
        assert_eq!(csv.lines().count(), 1);
    }

    #[test]
    fn json_round_trips_canonical_records() {
        let rows = sample_records();
        let raw = to_json(&rows).expect("json");
        let back: Vec<ScoreRecord> = serde_json::from_str(&raw).expect("parse");
        assert_eq!(back, rows);
    }

    #[test]
    fn write_export_creates_parent_dirs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested/out.csv");
        let n = write_export(&path, ExportFormat::Csv, &sample_records()).expect("write");
        let written = std::fs::read(&path).expect("read");
        assert_eq!(written.len(), n);
        assert_eq!(&written[..3], &[0xEF, 0xBB, 0xBF]);
    }

    fn zip_entry(bytes: &[u8], name: &str) -> String {
        use std::io::Read;
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).expect("open xlsx");
        let mut entry = archive.by_name(name).expect("xlsx entry");
        let mut text = String::new();
        entry.read_to_string(&mut text).expect("read entry");
        text
    }

    #[test]
    fn xlsx_has_one_named_sheet_with_header_and_rows() {
        let bytes = to_xlsx(&sample_records()).expect("xlsx");
        assert_eq!(&bytes[..2], b"PK");
        let workbook = zip_entry(&bytes, "xl/workbook.xml");
        assert!(workbook.contains("會考序位資料"));
        assert_eq!(workbook.matches("<sheet ").count(), 1);
        let strings = zip_entry(&bytes, "xl/sharedStrings.xml");
        assert!(strings.contains("timestamp"));
        assert!(strings.contains("maxRankInterval"));
        assert!(strings.contains("基北區"));
        let sheet = zip_entry(&bytes, "xl/worksheets/sheet1.xml");
        let rows = sample_records().len();
        assert!(sheet.contains(&format!("<row r=\"{}\"", rows + 1)));
        assert!(!sheet.contains(&format!("<row r=\"{}\"", rows + 2)));
    }

    #[test]
    fn default_name_uses_date_and_extension() {
        let d = chrono::NaiveDate::from_ymd_opt(2025, 6, 1).expect("date");
        assert_eq!(default_file_name(ExportFormat::Json, d), "scores_2025-06-01.json");
        assert_eq!(default_file_name(ExportFormat::Xlsx, d), "scores_2025-06-01.xlsx");
    }
}
