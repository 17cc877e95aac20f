//! Storage for point transfers.

use rusqlite::{Connection, Row, params};
use time::OffsetDateTime;

use crate::{
    Error, UserID,
    ledger::{TransactionId, TransactionRecord},
};

/// A validated point transfer that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransfer {
    pub giver_id: UserID,
    pub getter_id: UserID,
    pub name: String,
    pub points: i64,
    pub kind: String,
}

/// The most points a single transfer can move.
///
/// Keeps the sums over a member's transfers well inside the range of an `i64`.
pub const MAX_TRANSFER_POINTS: i64 = 1_000_000;

pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS point_transaction (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            points INTEGER NOT NULL CHECK (points BETWEEN 1 AND {MAX_TRANSFER_POINTS}),
            kind TEXT NOT NULL,
            date_created TEXT NOT NULL,
            giver_id INTEGER NOT NULL,
            getter_id INTEGER NOT NULL,
            FOREIGN KEY(giver_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE,
            FOREIGN KEY(getter_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
        )"
        ),
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_point_transaction_giver ON point_transaction(giver_id)",
        (),
    )?;
    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_point_transaction_getter ON point_transaction(getter_id)",
        (),
    )?;

    Ok(())
}

/// Store `transfer`, timestamped with the current time.
///
/// # Errors
/// Returns an [Error::SqlError] if the insert fails, e.g. because one of the users does not exist.
pub fn insert_transfer(
    transfer: &NewTransfer,
    connection: &Connection,
) -> Result<TransactionId, Error> {
    connection.execute(
        "INSERT INTO point_transaction (name, points, kind, date_created, giver_id, getter_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            transfer.name,
            transfer.points,
            transfer.kind,
            OffsetDateTime::now_utc(),
            transfer.giver_id.as_i64(),
            transfer.getter_id.as_i64(),
        ],
    )?;

    Ok(connection.last_insert_rowid())
}

fn map_row_to_record(row: &Row) -> Result<TransactionRecord, rusqlite::Error> {
    Ok(TransactionRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        points: row.get(2)?,
        kind: row.get(3)?,
        date_created: row.get(4)?,
        giver_id: UserID::new(row.get(5)?),
        getter_id: UserID::new(row.get(6)?),
        giver_name: row.get(7)?,
        getter_name: row.get(8)?,
    })
}

/// Get every transfer `user_id` gave or got, newest first, with both members' names.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn get_ledger_records(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<TransactionRecord>, Error> {
    connection
        .prepare(
            "SELECT t.id, t.name, t.points, t.kind, t.date_created, t.giver_id, t.getter_id,
                giver.name, getter.name
            FROM point_transaction t
            INNER JOIN user giver ON giver.id = t.giver_id
            INNER JOIN user getter ON getter.id = t.getter_id
            WHERE t.giver_id = :user_id OR t.getter_id = :user_id
            ORDER BY t.id DESC",
        )?
        .query_map(&[(":user_id", &user_id.as_i64())], map_row_to_record)?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}
