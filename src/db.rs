//! Database initialization for the application's SQLite database.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error, auth::create_user_table, ledger::create_transaction_table,
    listing::create_listing_tables,
};

/// Create the tables for all of the domain models.
///
/// Foreign key enforcement is switched on for `connection` and the tables are
/// created in a single exclusive transaction, so either all of the tables are
/// created or none are.
///
/// # Errors
/// Returns an [Error::SqlError] if any of the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_listing_tables(&transaction)?;

    transaction.commit()?;

    Ok(())
}
