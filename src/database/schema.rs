//! Database schema definitions

use anyhow::{Context, Result};
use rusqlite::Connection;

/// Create all database tables
pub fn create_tables(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Follower subscriptions: who gets mentioned for which validator
        CREATE TABLE IF NOT EXISTS subscriptions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            address TEXT NOT NULL,
            subscriber_id TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE (address, subscriber_id)
        );

        -- Alert history: every alert the monitor fired
        CREATE TABLE IF NOT EXISTS alerts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            alert_type TEXT NOT NULL,
            address TEXT NOT NULL,
            era INTEGER NOT NULL,
            message TEXT NOT NULL,
            severity TEXT NOT NULL,
            delivered INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_subscriptions_address ON subscriptions(address);
        CREATE INDEX IF NOT EXISTS idx_subscriptions_subscriber ON subscriptions(subscriber_id);
        CREATE INDEX IF NOT EXISTS idx_alerts_address ON alerts(address, id);
        "#,
    )
    .context("Failed to create database tables")?;

    Ok(())
}
