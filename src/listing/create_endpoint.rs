//! Defines the endpoints for creating a new product or service.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_htmx::HxRedirect;
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, UserID, endpoints,
    listing::{ListingKind, NewListing, insert_listing},
};

/// The state needed to create a listing.
#[derive(Debug, Clone)]
pub struct CreateListingState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CreateListingState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The form data for a product or service.
///
/// The owner is always the logged in member, so it is not part of the form.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingForm {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// The asking price in points.
    pub price: i64,
}

fn create_listing(
    kind: ListingKind,
    state: CreateListingState,
    user_id: UserID,
    form: ListingForm,
) -> Response {
    let new_listing = match NewListing::new(user_id, &form.name, &form.description, form.price) {
        Ok(new_listing) => new_listing,
        Err(error) => {
            tracing::debug!("Rejected {} listing {form:?}: {error}", kind.table_name());
            return error.into_alert_response();
        }
    };

    let connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(error) => {
            tracing::error!("Could not acquire database lock: {error}");
            return Error::DatabaseLockError.into_alert_response();
        }
    };

    match insert_listing(kind, new_listing, &connection) {
        Ok(listing) => tracing::info!(
            "User {user_id} listed {} {} \"{}\"",
            kind.table_name(),
            listing.id,
            listing.name
        ),
        Err(error) => {
            tracing::error!("Could not create {} listing {form:?}: {error}", kind.table_name());
            return error.into_alert_response();
        }
    }

    (
        HxRedirect(endpoints::SHOPS_VIEW.to_owned()),
        StatusCode::SEE_OTHER,
    )
        .into_response()
}

/// A route handler for listing a new product, redirects to the shops view on success.
pub async fn create_product_endpoint(
    State(state): State<CreateListingState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ListingForm>,
) -> Response {
    create_listing(ListingKind::Product, state, user_id, form)
}

/// A route handler for listing a new service, redirects to the shops view on success.
pub async fn create_service_endpoint(
    State(state): State<CreateListingState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<ListingForm>,
) -> Response {
    create_listing(ListingKind::Service, state, user_id, form)
}
