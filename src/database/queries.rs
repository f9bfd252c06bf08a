//! Database query functions

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, params};

use super::models::{AlertHistoryRecord, SubscriptionRecord};
use crate::alerts::Alert;

/// Subscribe `subscriber_id` to `address`.
///
/// Returns false when the subscription already existed.
pub fn add_subscription(conn: &Connection, address: &str, subscriber_id: &str) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT OR IGNORE INTO subscriptions (address, subscriber_id) VALUES (?1, ?2)",
            params![address, subscriber_id],
        )
        .context("Failed to insert subscription")?;
    Ok(inserted > 0)
}

/// Returns false when there was nothing to remove.
pub fn remove_subscription(conn: &Connection, address: &str, subscriber_id: &str) -> Result<bool> {
    let removed = conn
        .execute(
            "DELETE FROM subscriptions WHERE address = ?1 AND subscriber_id = ?2",
            params![address, subscriber_id],
        )
        .context("Failed to delete subscription")?;
    Ok(removed > 0)
}

/// Subscriber ids following `address`, oldest first
pub fn subscribers_of(conn: &Connection, address: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT subscriber_id FROM subscriptions WHERE address = ?1 ORDER BY id ASC",
    )?;
    let subscribers = stmt
        .query_map(params![address], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<String>>>()?;
    Ok(subscribers)
}

/// Subscriptions held by one subscriber, oldest first
pub fn followed_by(conn: &Connection, subscriber_id: &str) -> Result<Vec<SubscriptionRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT address, subscriber_id, created_at
        FROM subscriptions
        WHERE subscriber_id = ?1
        ORDER BY id ASC
        "#,
    )?;
    let records = stmt
        .query_map(params![subscriber_id], |row| {
            Ok(SubscriptionRecord {
                address: row.get(0)?,
                subscriber_id: row.get(1)?,
                created_at: parse_datetime_column(row.get::<_, String>(2)?, 2)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(records)
}

/// Record a fired alert in history
pub fn insert_alert(conn: &Connection, alert: &Alert, message: &str, delivered: bool) -> Result<i64> {
    conn.execute(
        r#"
        INSERT INTO alerts (created_at, alert_type, address, era, message, severity, delivered)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
        params![
            alert.fired_at.format("%Y-%m-%d %H:%M:%S").to_string(),
            alert.kind.as_str(),
            alert.address,
            alert.era,
            message,
            alert.severity.as_str(),
            delivered as i32,
        ],
    )
    .context("Failed to insert alert")?;

    Ok(conn.last_insert_rowid())
}

/// Most recent alerts for `address`, newest first
pub fn recent_alerts(conn: &Connection, address: &str, limit: u32) -> Result<Vec<AlertHistoryRecord>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, created_at, alert_type, address, era, message, severity, delivered
        FROM alerts
        WHERE address = ?1
        ORDER BY id DESC
        LIMIT ?2
        "#,
    )?;
    let alerts = stmt
        .query_map(params![address, limit], |row| {
            Ok(AlertHistoryRecord {
                id: row.get(0)?,
                created_at: parse_datetime_column(row.get::<_, String>(1)?, 1)?,
                alert_type: row.get(2)?,
                address: row.get(3)?,
                era: row.get(4)?,
                message: row.get(5)?,
                severity: row.get(6)?,
                delivered: row.get::<_, i32>(7)? == 1,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(alerts)
}

fn parse_datetime_column(s: String, column: usize) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_str(&format!("{} +0000", s), "%Y-%m-%d %H:%M:%S %z")
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
        })
}
