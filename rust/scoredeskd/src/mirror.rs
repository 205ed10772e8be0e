use rusqlite::Connection;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Pending,
    Sent,
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Sent => "sent",
            SubmissionStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MirroredSubmission {
    pub id: String,
    pub payload: serde_json::Value,
    pub created_at: String,
    pub status: String,
}

/// Opens (or creates) the local mirror of submitted records.
pub fn open_mirror(path: &Path) -> anyhow::Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS submissions(
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL,
            created_at TEXT NOT NULL
        )",
        [],
    )?;
    // Mirrors written before delivery tracking have no status column.
    ensure_submissions_status(conn)?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_submissions_created ON submissions(created_at)",
        [],
    )?;
    Ok(())
}

fn ensure_submissions_status(conn: &Connection) -> anyhow::Result<()> {
    if !table_has_column(conn, "submissions", "status")? {
        conn.execute(
            "ALTER TABLE submissions ADD COLUMN status TEXT NOT NULL DEFAULT 'pending'",
            [],
        )?;
    }
    if !table_has_column(conn, "submissions", "updated_at")? {
        conn.execute("ALTER TABLE submissions ADD COLUMN updated_at TEXT", [])?;
    }
    Ok(())
}

pub fn insert_submission(
    conn: &Connection,
    id: &str,
    payload: &serde_json::Value,
    created_at: &str,
) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO submissions(id, payload, created_at, status) VALUES(?, ?, ?, ?)",
        (
            id,
            payload.to_string(),
            created_at,
            SubmissionStatus::Pending.as_str(),
        ),
    )?;
    Ok(())
}

/// Returns false when no submission has that id.
pub fn mark_submission(
    conn: &Connection,
    id: &str,
    status: SubmissionStatus,
    updated_at: &str,
) -> anyhow::Result<bool> {
    let n = conn.execute(
        "UPDATE submissions SET status = ?, updated_at = ? WHERE id = ?",
        (status.as_str(), updated_at, id),
    )?;
    Ok(n > 0)
}

/// All mirrored submissions, oldest first. Rows whose payload no longer
/// parses are skipped.
pub fn list_submissions(conn: &Connection) -> anyhow::Result<Vec<MirroredSubmission>> {
    let mut stmt = conn.prepare(
        "SELECT id, payload, created_at, status FROM submissions ORDER BY created_at, rowid",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok((
                r.get::<_, String>(0)?,
                r.get::<_, String>(1)?,
                r.get::<_, String>(2)?,
                r.get::<_, String>(3)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    let mut out = Vec::with_capacity(rows.len());
    for (id, payload, created_at, status) in rows {
        let Ok(payload) = serde_json::from_str::<serde_json::Value>(&payload) else {
            tracing::warn!(submission = %id, "skipping mirrored submission with unreadable payload");
            continue;
        };
        out.push(MirroredSubmission {
            id,
            payload,
            created_at,
            status,
        });
    }
    Ok(out)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> anyhow::Result<bool> {
    let sql = format!("PRAGMA table_info({})", table);
    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let name: String = row.get(1)?;
        if name == column {
            return Ok(true);
        }
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::OptionalExtension;
    use serde_json::json;

    fn submission_status(conn: &Connection, id: &str) -> anyhow::Result<Option<String>> {
        let status = conn
            .query_row("SELECT status FROM submissions WHERE id = ?", [id], |r| {
                r.get::<_, String>(0)
            })
            .optional()?;
        Ok(status)
    }

    #[test]
    fn insert_mark_and_list_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let conn = open_mirror(&dir.path().join("mirror/scoredesk.sqlite3")).expect("open");
        insert_submission(&conn, "s1", &json!({ "region": "基北區" }), "2025-06-01T00:00:00Z")
            .expect("insert");
        insert_submission(&conn, "s2", &json!({ "region": "桃連區" }), "2025-06-02T00:00:00Z")
            .expect("insert");
        assert!(mark_submission(&conn, "s2", SubmissionStatus::Sent, "2025-06-02T00:00:01Z")
            .expect("mark"));
        assert!(!mark_submission(&conn, "nope", SubmissionStatus::Failed, "x").expect("mark"));

        let rows = list_submissions(&conn).expect("list");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "s1");
        assert_eq!(rows[0].status, "pending");
        assert_eq!(rows[1].payload["region"], "桃連區");
        assert_eq!(submission_status(&conn, "s2").expect("status").as_deref(), Some("sent"));
        assert_eq!(submission_status(&conn, "zz").expect("status"), None);
    }

    #[test]
    fn legacy_table_without_status_is_migrated() {
        let conn = Connection::open_in_memory().expect("open");
        conn.execute(
            "CREATE TABLE submissions(id TEXT PRIMARY KEY, payload TEXT NOT NULL, created_at TEXT NOT NULL)",
            [],
        )
        .expect("create");
        conn.execute(
            "INSERT INTO submissions(id, payload, created_at) VALUES('old', '{}', '2024-01-01')",
            [],
        )
        .expect("insert");
        init_schema(&conn).expect("migrate");
        assert!(table_has_column(&conn, "submissions", "status").expect("pragma"));
        assert_eq!(submission_status(&conn, "old").expect("status").as_deref(), Some("pending"));
    }
}
