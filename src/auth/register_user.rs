//! The registration page and the handler that creates new members.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::{
        NewUser, PasswordHash, Profile, ValidatedPassword, create_user,
        log_in::REMEMBER_ME_COOKIE_DURATION,
        password::{PIN_MAX_LENGTH, PIN_MIN_LENGTH, ValidatedPin},
        set_auth_cookie,
    },
    date_time::parse_date,
    endpoints,
    html::{
        FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, LINK_STYLE, base, log_in_register,
        password_input, submit_button, text_input,
    },
    internal_server_error::get_internal_server_error_redirect,
    timezone::get_local_offset,
};

/// The minimum number of characters the password should have to be considered valid on the client side (server-side validation is done on top of this validation).
const PASSWORD_INPUT_MIN_LENGTH: u8 = 14;

/// How long a new member stays logged in after registering.
const REGISTRATION_COOKIE_DURATION: Duration = REMEMBER_ME_COOKIE_DURATION;

pub const DUPLICATE_CODENAME_ERROR_MSG: &str = "Codename already exists";
pub const PASSWORD_MISMATCH_ERROR_MSG: &str = "Passwords do not match";

/// The form field a registration error is shown next to.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Field {
    Name,
    Codename,
    Password,
    ConfirmPassword,
    Pin,
    DateOfBirth,
}

#[derive(Debug, PartialEq)]
struct FieldError {
    field: Field,
    message: String,
}

impl FieldError {
    fn new(field: Field, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

fn confirm_password_input(min_length: u8, error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label
                for="confirm-password"
                class=(FORM_LABEL_STYLE)
            {
                "Confirm Password"
            }

            input
                type="password"
                name="confirm_password"
                id="confirm-password"
                placeholder="••••••••"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(min_length)
                autofocus[error_message.is_some()]
            ;

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

fn pin_input(error_message: Option<&str>) -> Markup {
    html! {
        div
        {
            label for="pin" class=(FORM_LABEL_STYLE) { "PIN" }

            input
                type="password"
                name="pin"
                id="pin"
                inputmode="numeric"
                pattern="[0-9]*"
                class=(FORM_TEXT_INPUT_STYLE)
                required
                minlength=(PIN_MIN_LENGTH)
                maxlength=(PIN_MAX_LENGTH);

            @if let Some(error_message) = error_message
            {
                p class="text-red-500 text-base" { (error_message) }
            }
        }
    }
}

fn registration_form(form: &RegisterForm, error: Option<&FieldError>) -> Markup {
    let error_for = |field: Field| {
        error
            .filter(|error| error.field == field)
            .map(|error| error.message.as_str())
    };

    html! {
        form
            hx-post=(endpoints::USERS)
            hx-indicator="#indicator"
            hx-disabled-elt="#submit-button"
            class="space-y-4 md:space-y-6"
        {
            (text_input("Name", "name", "text", &form.name, true, error_for(Field::Name)))
            (text_input("Codename", "codename", "text", &form.codename, true, error_for(Field::Codename)))
            (password_input(&form.password, PASSWORD_INPUT_MIN_LENGTH, error_for(Field::Password)))
            (confirm_password_input(PASSWORD_INPUT_MIN_LENGTH, error_for(Field::ConfirmPassword)))
            (pin_input(error_for(Field::Pin)))

            details
            {
                summary class="text-sm text-gray-900 dark:text-white cursor-pointer"
                {
                    "Profile details (optional)"
                }

                div class="space-y-4 mt-4"
                {
                    (text_input("Avatar URL", "avatar", "url", &form.avatar, false, None))
                    (text_input("Gender", "gender", "text", &form.gender, false, None))
                    (text_input("Date of birth", "date_of_birth", "date", &form.date_of_birth, false, error_for(Field::DateOfBirth)))
                    (text_input("Email", "email", "email", &form.email, false, None))
                    (text_input("Phone", "phone", "tel", &form.phone, false, None))
                    (text_input("Location", "location", "text", &form.location, false, None))
                }
            }

            (submit_button("Register"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already a member? "

                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    let registration_form = registration_form(&RegisterForm::default(), None);
    let content = log_in_register("Join Pointsz", &registration_form);
    base("Register", &content).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            local_timezone: state.local_timezone.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw registration form. Optional profile fields are sent as empty strings.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    pub name: String,
    pub codename: String,
    pub password: String,
    pub confirm_password: String,
    pub pin: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub date_of_birth: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub location: String,
}

/// The registration form after every field has been checked, but before hashing.
struct ValidatedRegistration {
    name: String,
    codename: String,
    password: ValidatedPassword,
    pin: ValidatedPin,
    profile: Profile,
}

fn optional(value: &str) -> Option<String> {
    let value = value.trim();

    (!value.is_empty()).then(|| value.to_owned())
}

fn validate_registration(form: &RegisterForm) -> Result<ValidatedRegistration, FieldError> {
    let name = form.name.trim();
    if name.is_empty() {
        return Err(FieldError::new(
            Field::Name,
            Error::EmptyField("name").to_string(),
        ));
    }

    let codename = form.codename.trim();
    if codename.is_empty() {
        return Err(FieldError::new(
            Field::Codename,
            Error::EmptyField("codename").to_string(),
        ));
    }

    let password = ValidatedPassword::new(&form.password, &[name, codename])
        .map_err(|error| FieldError::new(Field::Password, error.to_string()))?;

    if form.password != form.confirm_password {
        return Err(FieldError::new(
            Field::ConfirmPassword,
            PASSWORD_MISMATCH_ERROR_MSG,
        ));
    }

    let pin = ValidatedPin::new(form.pin.trim())
        .map_err(|error| FieldError::new(Field::Pin, error.to_string()))?;

    let date_of_birth = optional(&form.date_of_birth)
        .map(|raw_date| parse_date(&raw_date))
        .transpose()
        .map_err(|error| FieldError::new(Field::DateOfBirth, error.to_string()))?;

    Ok(ValidatedRegistration {
        name: name.to_owned(),
        codename: codename.to_owned(),
        password,
        pin,
        profile: Profile {
            avatar: optional(&form.avatar),
            gender: optional(&form.gender),
            date_of_birth,
            email: optional(&form.email),
            phone: optional(&form.phone),
            location: optional(&form.location),
        },
    })
}

fn hash_registration(registration: ValidatedRegistration, cost: u32) -> Result<NewUser, Error> {
    Ok(NewUser {
        name: registration.name,
        codename: registration.codename,
        password_hash: PasswordHash::new(registration.password, cost)?,
        pin_hash: PasswordHash::from_pin(registration.pin, cost)?,
        profile: registration.profile,
    })
}

/// Create a member from the registration form, log them in and send them to the points page.
///
/// Invalid details re-render the form with an error next to the offending field.
pub async fn register_user(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let registration = match validate_registration(&form) {
        Ok(registration) => registration,
        Err(error) => return registration_form(&form, Some(&error)).into_response(),
    };

    let new_user = match hash_registration(registration, PasswordHash::DEFAULT_COST) {
        Ok(new_user) => new_user,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");

            return get_internal_server_error_redirect();
        }
    };

    let local_offset = match get_local_offset(&state.local_timezone) {
        Some(offset) => offset,
        None => return Error::InvalidTimezoneError(state.local_timezone).into_response(),
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(error) => {
                tracing::error!("could not acquire database lock: {error}");
                return get_internal_server_error_redirect();
            }
        };

        create_user(new_user, &connection)
    };

    let user = match user {
        Ok(user) => user,
        Err(Error::DuplicateCodename(_)) => {
            let error = FieldError::new(Field::Codename, DUPLICATE_CODENAME_ERROR_MSG);
            return registration_form(&form, Some(&error)).into_response();
        }
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            return get_internal_server_error_redirect();
        }
    };

    tracing::info!("Registered user {} with codename {}", user.id, user.codename);

    match set_auth_cookie(jar, user.id, REGISTRATION_COOKIE_DURATION, local_offset) {
        Ok(jar) => (
            StatusCode::SEE_OTHER,
            HxRedirect(endpoints::LEDGER_VIEW.to_owned()),
            jar,
        )
            .into_response(),
        Err(error) => {
            tracing::error!("An error occurred while setting the auth cookie: {error}");

            get_internal_server_error_redirect()
        }
    }
}
