//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{
        auth_guard, auth_guard_hx, get_log_in_page, get_log_out, get_register_page, post_log_in,
        register_user,
    },
    endpoints,
    internal_server_error::get_internal_server_error_page,
    ledger::{create_transfer_endpoint, get_ledger_json, get_ledger_page},
    listing::{
        create_product_endpoint, create_service_endpoint, get_new_product_page,
        get_new_service_page,
    },
    not_found::get_404_not_found,
    shops::get_shops_page,
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN_VIEW, get(get_log_in_page))
        .route(endpoints::LOG_IN_API, post(post_log_in))
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::REGISTER_VIEW, get(get_register_page))
        .route(endpoints::USERS, post(register_user))
        .route(endpoints::SHOPS_VIEW, get(get_shops_page))
        .route(
            endpoints::INTERNAL_ERROR_VIEW,
            get(get_internal_server_error_page),
        );

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::LEDGER_VIEW, get(get_ledger_page))
        .route(endpoints::LEDGER_API, get(get_ledger_json))
        .route(endpoints::NEW_PRODUCT_VIEW, get(get_new_product_page))
        .route(endpoints::NEW_SERVICE_VIEW, get(get_new_service_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    // These POST routes need to use the HX-REDIRECT header for auth redirects to work properly for HTMX requests.
    let protected_routes = protected_routes.merge(
        Router::new()
            .route(endpoints::TRANSACTIONS_API, post(create_transfer_endpoint))
            .route(endpoints::PRODUCTS_API, post(create_product_endpoint))
            .route(endpoints::SERVICES_API, post(create_service_endpoint))
            .layer(middleware::from_fn_with_state(state.clone(), auth_guard_hx)),
    );

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}

/// The root path '/' redirects to the points page.
async fn get_index_page() -> Redirect {
    Redirect::to(endpoints::LEDGER_VIEW)
}


#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use axum_extra::extract::cookie::Cookie;
    use axum_test::TestServer;
    use rusqlite::Connection;

    use crate::{
        AppState, LedgerSummary,
        auth::{COOKIE_TOKEN, NewUser, PasswordHash, Profile, ValidatedPassword, create_user},
        build_router, endpoints,
    };

    const PASSWORD: &str = "roostersgocockledoodledoo";

    fn get_test_server() -> TestServer {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "routing-test-secret",
            "Etc/UTC",
        )
        .unwrap();

        {
            let connection = state.db_connection.lock().unwrap();
            for (name, codename) in [("Alice", "alice"), ("Bob", "bob")] {
                create_user(
                    NewUser {
                        name: name.to_owned(),
                        codename: codename.to_owned(),
                        password_hash: PasswordHash::new(
                            ValidatedPassword::new(PASSWORD, &[]).unwrap(),
                            4,
                        )
                        .unwrap(),
                        pin_hash: PasswordHash::new_unchecked("unused"),
                        profile: Profile::default(),
                    },
                    &connection,
                )
                .unwrap();
            }
        }

        TestServer::try_new(build_router(state)).expect("Could not create test server.")
    }

    async fn log_in(server: &TestServer, codename: &str) -> Cookie<'static> {
        let response = server
            .post(endpoints::LOG_IN_API)
            .form(&[("codename", codename), ("password", PASSWORD)])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        response.cookie(COOKIE_TOKEN)
    }

    #[tokio::test]
    async fn guests_are_redirected_to_log_in() {
        let server = get_test_server();

        for endpoint in [endpoints::ROOT, endpoints::LEDGER_VIEW, endpoints::NEW_PRODUCT_VIEW] {
            let response = server.get(endpoint).await;

            response.assert_status_see_other();
            let location = response.header("location");
            let location = location.to_str().unwrap();
            assert!(
                location.starts_with(endpoints::LOG_IN_VIEW),
                "want {endpoint} to redirect to log in, got {location}"
            );
        }
    }

    #[tokio::test]
    async fn guests_posting_forms_get_hx_redirect() {
        let server = get_test_server();

        let response = server
            .post(endpoints::TRANSACTIONS_API)
            .form(&[("getter_codename", "bob"), ("points", "5"), ("name", "Jam"), ("kind", "product")])
            .await;

        response.assert_status_ok();
        let location = response.header("hx-redirect");
        assert!(location.to_str().unwrap().starts_with(endpoints::LOG_IN_VIEW));
    }

    #[tokio::test]
    async fn shops_and_log_in_are_public() {
        let server = get_test_server();

        server.get(endpoints::SHOPS_VIEW).await.assert_status_ok();
        server.get(endpoints::LOG_IN_VIEW).await.assert_status_ok();
        server.get(endpoints::REGISTER_VIEW).await.assert_status_ok();
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = get_test_server();

        server
            .get("/definitely/not/a/page")
            .await
            .assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn members_can_give_points_and_see_their_ledger() {
        let server = get_test_server();
        let cookie = log_in(&server, "alice").await;

        server
            .post(endpoints::TRANSACTIONS_API)
            .add_cookie(cookie.clone())
            .form(&[("getter_codename", "bob"), ("points", "9"), ("name", "Jam"), ("kind", "product")])
            .await
            .assert_status_see_other();

        let response = server.get(endpoints::LEDGER_API).add_cookie(cookie.clone()).await;
        response.assert_status_ok();
        let summary: LedgerSummary = response.json();
        assert_eq!(summary.balance, 9);
        assert_eq!(summary.counterparty_balances.len(), 1);
        assert_eq!(summary.counterparty_balances[0].name, "Bob");

        server
            .get(endpoints::LEDGER_VIEW)
            .add_cookie(cookie)
            .await
            .assert_status_ok();

        let bob_cookie = log_in(&server, "bob").await;
        let bob_summary: LedgerSummary = server
            .get(endpoints::LEDGER_API)
            .add_cookie(bob_cookie)
            .await
            .json();
        assert_eq!(bob_summary.balance, -9);
    }

    #[tokio::test]
    async fn members_can_list_products() {
        let server = get_test_server();
        let cookie = log_in(&server, "alice").await;

        let response = server
            .post(endpoints::PRODUCTS_API)
            .add_cookie(cookie)
            .form(&[("name", "Bread"), ("description", "Sourdough"), ("price", "4")])
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("hx-redirect"), endpoints::SHOPS_VIEW);
        let shops_page = server.get(endpoints::SHOPS_VIEW).await.text();
        assert!(shops_page.contains("Alice"));
    }
}
