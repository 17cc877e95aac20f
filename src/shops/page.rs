//! Displays every member's shop.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;

use crate::{
    AppState, Error, endpoints,
    html::{
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE,
        base,
    },
    navigation::NavBar,
    shops::{Shop, get_shops},
};

/// The state needed for the [get_shops_page] route handler.
#[derive(Debug, Clone)]
pub struct ShopsState {
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ShopsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// Renders the shops page, open to guests and members alike.
pub async fn get_shops_page(State(state): State<ShopsState>) -> Result<Response, Error> {
    let shops = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("Could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        get_shops(&connection)?
    };

    Ok(shops_view(&shops).into_response())
}

fn shop_row(shop: &Shop) -> Markup {
    html!(
        tr class=(TABLE_ROW_STYLE)
        {
            th
                scope="row"
                class="px-6 py-4 font-medium text-gray-900 whitespace-nowrap dark:text-white"
            {
                div class="flex items-center gap-3"
                {
                    @if let Some(avatar) = &shop.avatar {
                        img src=(avatar) alt="" class="w-8 h-8 rounded-full";
                    }

                    span { (shop.name) }
                }
            }
            td class=(TABLE_CELL_STYLE) { "@" (shop.codename) }
            td class=(TABLE_CELL_STYLE) { (shop.location.as_deref().unwrap_or("")) }
            td class="px-6 py-4 text-right tabular-nums" { (shop.product_count) }
            td class="px-6 py-4 text-right tabular-nums" { (shop.service_count) }
            td class="px-6 py-4 text-right tabular-nums" { (format!("{:.2}", shop.credit_ratio)) }
        }
    )
}

fn shops_view(shops: &[Shop]) -> Markup {
    let nav_bar = NavBar::new(endpoints::SHOPS_VIEW).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full lg:max-w-5xl space-y-4"
            {
                header class="flex justify-between flex-wrap items-end"
                {
                    h1 class="text-xl font-bold" { "Shops" }

                    div class="flex gap-4"
                    {
                        a href=(endpoints::NEW_PRODUCT_VIEW) class=(LINK_STYLE) { "List a product" }
                        a href=(endpoints::NEW_SERVICE_VIEW) class=(LINK_STYLE) { "List a service" }
                    }
                }

                div class="overflow-x-auto"
                {
                    table
                        id="shops"
                        class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Member" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Codename" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Location" }
                                th scope="col" class="px-6 py-3 text-right" { "Products" }
                                th scope="col" class="px-6 py-3 text-right" { "Services" }
                                th
                                    scope="col"
                                    class="px-6 py-3 text-right"
                                    title="Points given for each point received"
                                {
                                    "Credit ratio"
                                }
                            }
                        }

                        tbody
                        {
                            @for shop in shops {
                                (shop_row(shop))
                            }

                            @if shops.is_empty() {
                                tr
                                {
                                    td colspan="6" class="px-6 py-4 text-center"
                                    {
                                        "No shops yet. "
                                        a href=(endpoints::REGISTER_VIEW) class=(LINK_STYLE)
                                        {
                                            "Register"
                                        }
                                        " to open the first one."
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
    );

    base("Shops", &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::StatusCode, response::IntoResponse};
    use scraper::Selector;

    use crate::{
        auth::insert_test_user,
        test_utils::{
            assert_content_type, assert_valid_html, get_test_connection, parse_html_document,
            select_table_rows,
        },
    };

    use super::{ShopsState, get_shops_page};

    #[tokio::test]
    async fn shops_page_ranks_members() {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        let bob = insert_test_user("Bob", "bob", &connection);
        connection
            .execute(
                "INSERT INTO point_transaction (name, points, kind, date_created, giver_id, getter_id)
                VALUES ('Eggs', 6, 'product', '2025-01-01 00:00:00.0+00:00', ?1, ?2)",
                (bob.id.as_i64(), alice.id.as_i64()),
            )
            .unwrap();
        let state = ShopsState {
            db_connection: Arc::new(Mutex::new(connection)),
        };

        let response = get_shops_page(State(state)).await.into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let names: Vec<String> = document
            .select(&Selector::parse("table#shops tbody th").unwrap())
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect();
        assert_eq!(names, ["Bob", "Alice"]);
        let rows = select_table_rows(&document, "table#shops");
        assert_eq!(rows[0], ["@bob", "", "0", "0", "1.00"]);
        assert_eq!(rows[1], ["@alice", "", "0", "0", "0.00"]);
    }

    #[tokio::test]
    async fn shops_page_without_members_invites_registration() {
        let state = ShopsState {
            db_connection: Arc::new(Mutex::new(get_test_connection())),
        };

        let response = get_shops_page(State(state)).await.into_response();

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let rows = select_table_rows(&document, "table#shops");
        assert_eq!(rows, [["No shops yet. Register to open the first one."]]);
    }
}
