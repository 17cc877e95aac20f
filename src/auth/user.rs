//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, ErrorCode, Row};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, auth::PasswordHash};

/// The SQLite extended error code for a violated UNIQUE constraint.
const SQLITE_CONSTRAINT_UNIQUE: i32 = 2067;

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The optional details a member can share about themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// A URL to an image of the member.
    pub avatar: Option<String>,
    /// The member's gender, free text.
    pub gender: Option<String>,
    /// The member's date of birth.
    pub date_of_birth: Option<Date>,
    /// An email address for contacting the member.
    pub email: Option<String>,
    /// A phone number for contacting the member.
    pub phone: Option<String>,
    /// Where the member is based, free text.
    pub location: Option<String>,
}

/// A member of the marketplace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The display name shown to other members.
    pub name: String,
    /// The unique handle the user logs in with and receives points by.
    pub codename: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The hash of the user's PIN.
    pub pin_hash: PasswordHash,
    /// The optional profile details.
    pub profile: Profile,
}

/// The validated details for a user that has not been inserted into the database yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub name: String,
    pub codename: String,
    pub password_hash: PasswordHash,
    pub pin_hash: PasswordHash,
    pub profile: Profile,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                codename TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                pin TEXT NOT NULL,
                avatar TEXT,
                gender TEXT,
                date_of_birth TEXT,
                email TEXT,
                phone TEXT,
                location TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateCodename] if another user already has the codename,
/// - [Error::SqlError] if another SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let NewUser {
        name,
        codename,
        password_hash,
        pin_hash,
        profile,
    } = new_user;

    connection
        .execute(
            "INSERT INTO user (name, codename, password, pin, avatar, gender, date_of_birth, \
            email, phone, location) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            (
                &name,
                &codename,
                password_hash.to_string(),
                pin_hash.to_string(),
                &profile.avatar,
                &profile.gender,
                profile.date_of_birth,
                &profile.email,
                &profile.phone,
                &profile.location,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(sql_error, _)
                if sql_error.code == ErrorCode::ConstraintViolation
                    && sql_error.extended_code == SQLITE_CONSTRAINT_UNIQUE =>
            {
                Error::DuplicateCodename(codename.clone())
            }
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        name,
        codename,
        password_hash,
        pin_hash,
        profile,
    })
}

const SELECT_USER: &str = "SELECT id, name, codename, password, pin, avatar, gender, \
    date_of_birth, email, phone, location FROM user";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;
    let raw_pin_hash: String = row.get(4)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        codename: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        pin_hash: PasswordHash::new_unchecked(&raw_pin_hash),
        profile: Profile {
            avatar: row.get(5)?,
            gender: row.get(6)?,
            date_of_birth: row.get(7)?,
            email: row.get(8)?,
            phone: row.get(9)?,
            location: row.get(10)?,
        },
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user with the codename `codename`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the codename.
pub fn get_user_by_codename(codename: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("{SELECT_USER} WHERE codename = :codename"))?
        .query_row(&[(":codename", &codename)], map_user_row)
        .map_err(|error| error.into())
}
