//! Defines the form and endpoint for giving points to another member.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID,
    auth::get_user_by_codename,
    endpoints,
    html::{
        FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, submit_button, text_input,
    },
    ledger::db::{MAX_TRANSFER_POINTS, NewTransfer, insert_transfer},
};

/// The form for giving points to another member, who is identified by codename.
pub(super) fn transfer_form() -> Markup {
    html! {
        section class=(FORM_CONTAINER_STYLE)
        {
            h2 class="text-lg font-bold mb-4" { "Give Points" }

            form
                hx-post=(endpoints::TRANSACTIONS_API)
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                hx-disabled-elt="#submit-button"
                class="w-full space-y-4"
            {
                (text_input("Codename", "getter_codename", "text", "", true, None))

                div
                {
                    label for="points" class=(FORM_LABEL_STYLE) { "Points" }

                    input
                        type="number"
                        name="points"
                        id="points"
                        min="1"
                        max=(MAX_TRANSFER_POINTS)
                        step="1"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                (text_input("What for", "name", "text", "", true, None))
                (text_input("Kind", "kind", "text", "product", true, None))

                (submit_button("Give points"))
            }
        }
    }
}

/// The state needed to record a point transfer.
#[derive(Debug, Clone)]
pub struct TransferState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for TransferState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for giving points to another member.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferForm {
    /// The codename of the member receiving the points.
    pub getter_codename: String,
    pub points: i64,
    /// What the points are for.
    pub name: String,
    pub kind: String,
}

/// Check `form` and resolve the getter, with `giver_id` as the giver.
///
/// # Errors
///
/// Returns a:
/// - [Error::NonPositivePoints] if fewer than one point is given,
/// - [Error::TooManyPoints] if more than [MAX_TRANSFER_POINTS] points are given,
/// - [Error::EmptyField] if the name or kind is blank,
/// - [Error::UnknownCodename] if no member has the getter's codename,
/// - [Error::SelfTransfer] if the getter is the giver,
/// - [Error::SqlError] if the getter could not be looked up.
pub fn validate_transfer(
    giver_id: UserID,
    form: &TransferForm,
    connection: &Connection,
) -> Result<NewTransfer, Error> {
    if form.points <= 0 {
        return Err(Error::NonPositivePoints(form.points));
    }

    if form.points > MAX_TRANSFER_POINTS {
        return Err(Error::TooManyPoints(form.points));
    }

    let name = form.name.trim();
    if name.is_empty() {
        return Err(Error::EmptyField("name"));
    }

    let kind = form.kind.trim();
    if kind.is_empty() {
        return Err(Error::EmptyField("kind"));
    }

    let codename = form.getter_codename.trim();
    let getter = match get_user_by_codename(codename, connection) {
        Ok(getter) => getter,
        Err(Error::NotFound) => return Err(Error::UnknownCodename(codename.to_owned())),
        Err(error) => return Err(error),
    };

    if getter.id == giver_id {
        return Err(Error::SelfTransfer);
    }

    Ok(NewTransfer {
        giver_id,
        getter_id: getter.id,
        name: name.to_owned(),
        points: form.points,
        kind: kind.to_owned(),
    })
}

/// A route handler that records the current member giving points to another member.
///
/// Redirects to the points page on success, otherwise responds with an alert.
pub async fn create_transfer_endpoint(
    State(state): State<TransferState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<TransferForm>,
) -> Response {
    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    let transfer = match validate_transfer(user_id, &form, &connection) {
        Ok(transfer) => transfer,
        Err(error) => {
            tracing::debug!("Rejected transfer from user {user_id} with {form:?}: {error}");
            return error.into_alert_response();
        }
    };

    match insert_transfer(&transfer, &connection) {
        Ok(id) => {
            tracing::info!(
                "User {} gave {} points to user {} in transaction {id}",
                transfer.giver_id,
                transfer.points,
                transfer.getter_id
            );
        }
        Err(error) => {
            tracing::error!("Could not store transfer {transfer:?}: {error}");
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::LEDGER_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Extension, Form, extract::State, http::StatusCode};

    use crate::{
        Error, UserID,
        auth::insert_test_user,
        endpoints,
        ledger::db::{MAX_TRANSFER_POINTS, get_ledger_records},
        test_utils::{assert_hx_redirect, get_test_connection},
    };

    use super::{TransferForm, TransferState, create_transfer_endpoint, validate_transfer};

    fn transfer_form(getter_codename: &str, points: i64) -> TransferForm {
        TransferForm {
            getter_codename: getter_codename.to_owned(),
            points,
            name: "Sourdough loaf".to_owned(),
            kind: "product".to_owned(),
        }
    }

    fn get_test_state() -> (TransferState, UserID, UserID) {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        let bob = insert_test_user("Bob", "bob", &connection);

        (
            TransferState {
                db_connection: Arc::new(Mutex::new(connection)),
            },
            alice.id,
            bob.id,
        )
    }

    #[test]
    fn validate_resolves_getter_and_trims_text() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        let bob = insert_test_user("Bob", "bob", &connection);
        let form = TransferForm {
            getter_codename: " bob ".to_owned(),
            points: 7,
            name: "  Haircut ".to_owned(),
            kind: "service ".to_owned(),
        };

        let transfer = validate_transfer(alice.id, &form, &connection).unwrap();

        assert_eq!(transfer.giver_id, alice.id);
        assert_eq!(transfer.getter_id, bob.id);
        assert_eq!(transfer.points, 7);
        assert_eq!(transfer.name, "Haircut");
        assert_eq!(transfer.kind, "service");
    }

    #[test]
    fn validate_rejects_zero_and_negative_points() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        insert_test_user("Bob", "bob", &connection);

        for points in [0, -3] {
            let result = validate_transfer(alice.id, &transfer_form("bob", points), &connection);

            assert_eq!(result, Err(Error::NonPositivePoints(points)));
        }
    }

    #[test]
    fn validate_rejects_points_above_limit() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        insert_test_user("Bob", "bob", &connection);

        for points in [MAX_TRANSFER_POINTS + 1, i64::MAX] {
            let result = validate_transfer(alice.id, &transfer_form("bob", points), &connection);

            assert_eq!(result, Err(Error::TooManyPoints(points)));
        }
    }

    #[test]
    fn validate_accepts_points_at_limit() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        insert_test_user("Bob", "bob", &connection);

        let transfer =
            validate_transfer(alice.id, &transfer_form("bob", MAX_TRANSFER_POINTS), &connection)
                .unwrap();

        assert_eq!(transfer.points, MAX_TRANSFER_POINTS);
    }

    #[test]
    fn validate_rejects_blank_name() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        insert_test_user("Bob", "bob", &connection);
        let form = TransferForm {
            name: "   ".to_owned(),
            ..transfer_form("bob", 5)
        };

        let result = validate_transfer(alice.id, &form, &connection);

        assert_eq!(result, Err(Error::EmptyField("name")));
    }

    #[test]
    fn validate_rejects_unknown_codename() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);

        let result = validate_transfer(alice.id, &transfer_form("nobody", 5), &connection);

        assert_eq!(result, Err(Error::UnknownCodename("nobody".to_owned())));
    }

    #[test]
    fn validate_rejects_giving_to_yourself() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);

        let result = validate_transfer(alice.id, &transfer_form("alice", 5), &connection);

        assert_eq!(result, Err(Error::SelfTransfer));
    }

    #[tokio::test]
    async fn can_create_transfer() {
        let (state, alice, bob) = get_test_state();

        let response = create_transfer_endpoint(
            State(state.clone()),
            Extension(alice),
            Form(transfer_form("bob", 12)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::LEDGER_VIEW);
        let connection = state.db_connection.lock().unwrap();
        let records = get_ledger_records(bob, &connection).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].giver_id, alice);
        assert_eq!(records[0].points, 12);
    }

    #[tokio::test]
    async fn invalid_transfer_responds_with_alert() {
        let (state, alice, _) = get_test_state();

        let response = create_transfer_endpoint(
            State(state.clone()),
            Extension(alice),
            Form(transfer_form("bob", 0)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("hx-redirect").is_none());
        let connection = state.db_connection.lock().unwrap();
        assert!(get_ledger_records(alice, &connection).unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_getter_responds_with_not_found_alert() {
        let (state, alice, _) = get_test_state();

        let response = create_transfer_endpoint(
            State(state),
            Extension(alice),
            Form(transfer_form("zed", 3)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn huge_transfer_responds_with_alert() {
        let (state, alice, bob) = get_test_state();

        let response = create_transfer_endpoint(
            State(state.clone()),
            Extension(alice),
            Form(transfer_form("bob", i64::MAX)),
        )
        .await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get("hx-redirect").is_none());
        let connection = state.db_connection.lock().unwrap();
        assert!(get_ledger_records(bob, &connection).unwrap().is_empty());
    }
}
