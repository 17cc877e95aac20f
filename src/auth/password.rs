//! Types that handle password and PIN validation and hashing.
//!
//! `ValidatedPassword` and `ValidatedPin` wrap strings that passed validation.
//! `PasswordHash` converts either of them into a salted and hashed string.

use std::fmt::Display;

use bcrypt::{BcryptError, hash, verify};
use serde::{Deserialize, Serialize};
use zxcvbn::{Score, feedback::Feedback, zxcvbn};

use crate::Error;

/// A password that has been validated, but not yet hashed.
///
/// This struct can be used to construct a [PasswordHash].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// `user_inputs` are strings the user also entered, such as their name,
    /// and count against the password's strength when it contains them.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password is considered too weak.
    /// The error message will explain why the password is considered too weak and suggest how to make it stronger.
    pub fn new(raw_password_string: &str, user_inputs: &[&str]) -> Result<Self, Error> {
        let password_analysis = zxcvbn(raw_password_string, user_inputs);

        match password_analysis.score() {
            Score::Three | Score::Four => Ok(Self(raw_password_string.to_string())),
            _ => Err(Error::TooWeak(
                password_analysis
                    .feedback()
                    .unwrap_or(&Feedback::default())
                    .to_string(),
            )),
        }
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// The shortest PIN a user may choose.
pub const PIN_MIN_LENGTH: usize = 4;
/// The longest PIN a user may choose.
pub const PIN_MAX_LENGTH: usize = 8;

/// A PIN of 4 to 8 ASCII digits that has not been hashed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPin(String);

impl ValidatedPin {
    /// # Errors
    ///
    /// Returns [Error::InvalidPin] if `raw_pin` is not made of 4 to 8 digits.
    pub fn new(raw_pin: &str) -> Result<Self, Error> {
        let length_ok = (PIN_MIN_LENGTH..=PIN_MAX_LENGTH).contains(&raw_pin.len());

        if length_ok && raw_pin.bytes().all(|byte| byte.is_ascii_digit()) {
            Ok(Self(raw_pin.to_owned()))
        } else {
            Err(Error::InvalidPin)
        }
    }
}

impl Display for ValidatedPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", PIN_MIN_LENGTH))
    }
}

/// A salted and hashed password or PIN.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a hashed password from a validated password with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed to verify a password.
    /// A value of at least 12 is recommended. Pass in [PasswordHash::DEFAULT_COST] to use the recommended cost.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        Self::hash_secret(&password.0, cost)
    }

    /// Create a hashed PIN with the specified `cost`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the PIN could not be hashed.
    pub fn from_pin(pin: ValidatedPin, cost: u32) -> Result<Self, Error> {
        Self::hash_secret(&pin.0, cost)
    }

    fn hash_secret(secret: &str, cost: u32) -> Result<Self, Error> {
        match hash(secret, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(Error::HashingError(e.to_string())),
        }
    }

    /// Create a new `PasswordHash` without any validation.
    ///
    /// The caller should ensure that `raw_password_hash` is a valid password hash.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if an invalid hash is provided it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod validated_password_tests {
    use crate::{Error, auth::ValidatedPassword};

    #[test]
    fn new_fails_on_empty() {
        let result = ValidatedPassword::new("", &[]);

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn new_fails_on_common_password() {
        let result = ValidatedPassword::new("password1", &[]);

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn new_fails_when_password_is_codename() {
        let result = ValidatedPassword::new("sunnydaleslayer", &["Buffy", "sunnydaleslayer"]);

        assert!(matches!(result, Err(Error::TooWeak(_))));
    }

    #[test]
    fn new_succeeds_on_long_password() {
        let result = ValidatedPassword::new("asomewhatlongpassword1", &[]);

        assert!(result.is_ok());
    }
}

#[cfg(test)]
mod validated_pin_tests {
    use crate::{Error, auth::password::ValidatedPin};

    #[test]
    fn accepts_four_to_eight_digits() {
        assert!(ValidatedPin::new("1234").is_ok());
        assert!(ValidatedPin::new("12345678").is_ok());
    }

    #[test]
    fn rejects_short_and_long_pins() {
        assert_eq!(ValidatedPin::new("123"), Err(Error::InvalidPin));
        assert_eq!(ValidatedPin::new("123456789"), Err(Error::InvalidPin));
    }

    #[test]
    fn rejects_non_digits() {
        assert_eq!(ValidatedPin::new("12a4"), Err(Error::InvalidPin));
        assert_eq!(ValidatedPin::new("١٢٣٤"), Err(Error::InvalidPin));
    }
}
