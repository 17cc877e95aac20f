//! Pointsz is a community marketplace where members trade products and
//! services for points instead of money.
//!
//! Members register, list what they offer, and record point transfers with
//! each other. The ledger page shows each member what they are owed and what
//! they owe, and the shops page ranks members by how much they have given
//! relative to what they have received.
//!
//! This library provides a REST API that directly serves HTML pages.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod date_time;
mod db;
mod endpoints;
mod html;
mod internal_server_error;
mod ledger;
mod listing;
mod logging;
mod navigation;
mod not_found;
mod routing;
mod shops;
mod timezone;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, ValidatedPassword};
pub use db::initialize as initialize_db;
pub use ledger::{
    AnnotatedTransaction, CounterpartyBalance, LedgerStats, LedgerSummary, MAX_TRANSFER_POINTS,
    TransactionId, TransactionRecord, summarize_ledger,
};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use shops::credit_ratio;

use crate::{
    alert::Alert, internal_server_error::InternalServerError, not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of codename and password.
    #[error("invalid codename or password")]
    InvalidCredentials,

    /// The auth token cookie is missing from the cookie jar in the request.
    #[error("no cookies in the cookie jar :(")]
    CookieMissing,

    /// The auth token cookie could not be parsed.
    #[error("the auth token cookie is invalid")]
    InvalidCookie,

    /// The auth token in the cookie has expired.
    #[error("the auth token has expired")]
    CookieExpired,

    /// Adding a duration to the current time overflowed the date time range.
    #[error("could not compute the cookie expiry date time")]
    DateOverflow,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// The PIN was not made of 4 to 8 digits.
    #[error("PIN must be 4 to 8 digits")]
    InvalidPin,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The codename chosen during registration belongs to another user.
    #[error("the codename \"{0}\" already exists")]
    DuplicateCodename(String),

    /// A required text field was empty or only whitespace.
    #[error("{0} cannot be empty")]
    EmptyField(&'static str),

    /// A date string was not in the format YYYY-MM-DD.
    #[error("\"{0}\" is not a valid date, expected YYYY-MM-DD")]
    InvalidDate(String),

    /// A point transfer must move at least one point.
    #[error("{0} is not a valid number of points, must be greater than zero")]
    NonPositivePoints(i64),

    /// A point transfer moved more than [MAX_TRANSFER_POINTS] points.
    #[error("{0} is not a valid number of points, must be at most {max}", max = MAX_TRANSFER_POINTS)]
    TooManyPoints(i64),

    /// A listing cannot have a negative price.
    #[error("{0} is not a valid price, must be zero or more points")]
    NegativePrice(i64),

    /// No user has the given codename.
    #[error("no user has the codename \"{0}\"")]
    UnknownCodename(String),

    /// A user tried to transfer points to themselves.
    #[error("cannot transfer points to yourself")]
    SelfTransfer,

    /// A ledger record did not involve the user the ledger was computed for.
    ///
    /// This indicates a bug in the query that fetched the records.
    #[error("transaction {transaction_id} does not involve user {subject}")]
    UnrelatedTransaction {
        /// The ID of the offending record.
        transaction_id: TransactionId,
        /// The user the ledger was computed for.
        subject: UserID,
    },

    /// A ledger record had the same user as both giver and getter.
    #[error("transaction {0} has the same user as giver and getter")]
    SelfTransaction(TransactionId),

    /// A member's balance went out of range while adding up their ledger.
    #[error("the balance overflowed at transaction {0}")]
    BalanceOverflow(TransactionId),

    /// The requested resource was not found.
    ///
    /// For HTTP request handlers, the client should check that the parameters
    /// (e.g., ID) are correct and that the resource has been created.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// An error occurred while serializing a struct as JSON
    #[error("could not serialize as JSON: {0}")]
    JSONSerializationError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            Error::DatabaseLockError => InternalServerError::default().into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}

impl Error {
    /// Render the error as an alert for requests made by HTMX forms.
    fn into_alert_response(self) -> Response {
        match self {
            Error::EmptyField(_)
            | Error::NonPositivePoints(_)
            | Error::TooManyPoints(_)
            | Error::NegativePrice(_)
            | Error::SelfTransfer => (
                StatusCode::BAD_REQUEST,
                Alert::error("Invalid details", &self.to_string()).into_html(),
            )
                .into_response(),
            Error::UnknownCodename(codename) => (
                StatusCode::NOT_FOUND,
                Alert::error(
                    "Unknown member",
                    &format!(
                        "Could not find a member with the codename \"{codename}\". \
                        Check the spelling and try again."
                    ),
                )
                .into_html(),
            )
                .into_response(),
            Error::InvalidTimezoneError(timezone) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Alert::error(
                    "Invalid Timezone Settings",
                    &format!(
                        "Could not get local timezone \"{timezone}\". Check your server settings and \
                        ensure the timezone has been set to valid, canonical timezone string"
                    ),
                )
                .into_html(),
            )
                .into_response(),
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Alert::error(
                        "Something went wrong",
                        "An unexpected error occurred, check the server logs for more details.",
                    )
                    .into_html(),
                )
                    .into_response()
            }
        }
    }
}
