//! Reference schema for the ticket tables this crate reads and writes

use sqlx::SqlitePool;

use crate::error::{CoreError, Result};

const TABLES: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        login TEXT NOT NULL UNIQUE,
        first_name TEXT,
        last_name TEXT,
        title TEXT,
        valid_id INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS permission_groups (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        valid_id INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS group_user (
        user_id INTEGER NOT NULL REFERENCES users(id),
        group_id INTEGER NOT NULL REFERENCES permission_groups(id),
        permission_key TEXT NOT NULL,
        PRIMARY KEY (user_id, group_id, permission_key)
    )",
    "CREATE TABLE IF NOT EXISTS queue (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        group_id INTEGER NOT NULL REFERENCES permission_groups(id),
        valid_id INTEGER NOT NULL DEFAULT 1
    )",
    "CREATE TABLE IF NOT EXISTS ticket_state (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS ticket_priority (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS ticket (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        tn TEXT NOT NULL,
        title TEXT NOT NULL,
        queue_id INTEGER NOT NULL REFERENCES queue(id),
        ticket_state_id INTEGER NOT NULL REFERENCES ticket_state(id),
        ticket_priority_id INTEGER NOT NULL REFERENCES ticket_priority(id),
        customer_id TEXT,
        customer_user_id TEXT,
        user_id INTEGER NOT NULL REFERENCES users(id),
        responsible_user_id INTEGER REFERENCES users(id),
        create_time TEXT NOT NULL,
        create_by INTEGER NOT NULL,
        change_time TEXT NOT NULL,
        change_by INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS ticket_queue_idx ON ticket (queue_id)",
    "CREATE INDEX IF NOT EXISTS ticket_tn_idx ON ticket (tn)",
    "CREATE TABLE IF NOT EXISTS article_sender_type (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL UNIQUE
    )",
    "CREATE TABLE IF NOT EXISTS article (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id INTEGER NOT NULL REFERENCES ticket(id),
        article_sender_type_id INTEGER NOT NULL REFERENCES article_sender_type(id),
        communication_channel_id INTEGER NOT NULL DEFAULT 1,
        is_visible_for_customer INTEGER NOT NULL DEFAULT 0,
        create_time TEXT NOT NULL,
        create_by INTEGER NOT NULL,
        change_time TEXT NOT NULL,
        change_by INTEGER NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS article_ticket_idx ON article (ticket_id)",
    "CREATE TABLE IF NOT EXISTS article_data_mime (
        article_id INTEGER PRIMARY KEY REFERENCES article(id),
        a_from TEXT,
        a_to TEXT,
        a_subject TEXT,
        a_body TEXT,
        a_content_type TEXT,
        incoming_time INTEGER NOT NULL,
        create_time TEXT NOT NULL,
        create_by INTEGER NOT NULL,
        change_time TEXT NOT NULL,
        change_by INTEGER NOT NULL
    )",
];

const STATES: &[(i64, &str)] = &[
    (1, "new"),
    (2, "closed successful"),
    (3, "closed unsuccessful"),
    (4, "open"),
    (5, "removed"),
    (6, "pending reminder"),
    (7, "pending auto close+"),
    (8, "pending auto close-"),
    (9, "merged"),
];

const PRIORITIES: &[(i64, &str)] = &[
    (1, "1 very low"),
    (2, "2 low"),
    (3, "3 normal"),
    (4, "4 high"),
    (5, "5 very high"),
];

const SENDER_TYPES: &[(i64, &str)] = &[(1, "agent"), (2, "system"), (3, "customer")];

pub(crate) async fn ensure(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(CoreError::store("failed to begin schema transaction"))?;

    for ddl in TABLES {
        sqlx::query(ddl)
            .execute(&mut *tx)
            .await
            .map_err(CoreError::store("failed to create table"))?;
    }

    let lookups = [
        ("INSERT OR IGNORE INTO ticket_state (id, name) VALUES (?, ?)", STATES),
        ("INSERT OR IGNORE INTO ticket_priority (id, name) VALUES (?, ?)", PRIORITIES),
        ("INSERT OR IGNORE INTO article_sender_type (id, name) VALUES (?, ?)", SENDER_TYPES),
    ];
    for (insert, rows) in lookups {
        for (id, name) in rows {
            sqlx::query(insert)
                .bind(*id)
                .bind(*name)
                .execute(&mut *tx)
                .await
                .map_err(CoreError::store("failed to seed lookup table"))?;
        }
    }

    tx.commit()
        .await
        .map_err(CoreError::store("failed to commit schema"))?;

    tracing::debug!("reference schema ensured");
    Ok(())
}
