//! The points page and its JSON counterpart.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use time::UtcOffset;

use crate::{
    AppState, Error, User, UserID,
    auth::get_user_by_id,
    date_time::format_local_date_time,
    endpoints,
    html::{
        KIND_BADGE_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE,
        TABLE_ROW_STYLE, base, format_average_points, format_points,
    },
    ledger::{
        AnnotatedTransaction, LedgerSummary, db::get_ledger_records, summarize_ledger,
        transfer::transfer_form,
    },
    navigation::NavBar,
    timezone::get_local_offset,
};

/// The state needed to display a member's ledger.
#[derive(Debug, Clone)]
pub struct LedgerState {
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for LedgerState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// Fetch the records for `user_id` and fold them into a summary.
///
/// The database lock is released before aggregating.
fn load_ledger(user_id: UserID, db_connection: &Mutex<Connection>) -> Result<LedgerSummary, Error> {
    let records = {
        let connection = db_connection.lock().map_err(|error| {
            tracing::error!("Could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        get_ledger_records(user_id, &connection)?
    };

    summarize_ledger(user_id, records).inspect_err(|error| {
        tracing::error!("Could not summarize the ledger for user {user_id}: {error}");
    })
}

/// Renders the points page for the logged in member.
pub async fn get_ledger_page(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let local_offset = get_local_offset(&state.local_timezone).ok_or_else(|| {
        tracing::error!(
            "could not get local time offset from timezone {}",
            &state.local_timezone
        );
        Error::InvalidTimezoneError(state.local_timezone.clone())
    })?;

    let member = {
        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("Could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        get_user_by_id(user_id, &connection)?
    };
    let summary = load_ledger(user_id, &state.db_connection)?;

    Ok(ledger_view(&member, &summary, local_offset).into_response())
}

/// Responds with the logged in member's ledger as JSON.
pub async fn get_ledger_json(
    State(state): State<LedgerState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Json<LedgerSummary>, Error> {
    load_ledger(user_id, &state.db_connection).map(Json)
}

fn balance_caption(balance: i64) -> &'static str {
    match balance.signum() {
        1 => "Others owe you",
        -1 => "You owe others",
        _ => "You are all square",
    }
}

/// The points as seen by `subject`, e.g. "+5 pts" for points they gave.
fn signed_points(subject: UserID, transaction: &AnnotatedTransaction) -> String {
    let record = &transaction.record;

    if record.giver_id == subject {
        format!("+{}", format_points(record.points))
    } else {
        format_points(-record.points)
    }
}

fn stat(label: &str, id: &str, value: &str) -> Markup {
    html! {
        div class="rounded border border-gray-200 bg-white px-4 py-3 shadow-sm dark:border-gray-700 dark:bg-gray-800"
        {
            dt class="text-sm text-gray-500 dark:text-gray-400" { (label) }
            dd id=(id) class="text-lg font-semibold tabular-nums" { (value) }
        }
    }
}

fn ledger_view(member: &User, summary: &LedgerSummary, local_offset: UtcOffset) -> Markup {
    let nav_bar = NavBar::new(endpoints::LEDGER_VIEW).into_html();
    let stats = &summary.stats;

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            section class="w-full lg:max-w-5xl space-y-6"
            {
                header
                {
                    h1 class="text-xl font-bold" { "Points" }
                    p id="member" class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        (member.name) " (@" (member.codename) ")"
                    }

                    p id="balance" class="text-4xl font-extrabold tabular-nums"
                    {
                        (format_points(summary.balance))
                    }
                    p class="text-sm text-gray-500 dark:text-gray-400"
                    {
                        (balance_caption(summary.balance))
                    }
                }

                dl class="grid grid-cols-1 sm:grid-cols-3 gap-4"
                {
                    (stat("Transactions", "total-transactions", &stats.total_transactions.to_string()))
                    (stat("Partners", "unique-partners", &stats.unique_partners.to_string()))
                    (stat("Average transaction", "avg-transaction", &format_average_points(stats.avg_transaction)))
                }

                section class="overflow-x-auto"
                {
                    h2 class="text-lg font-bold mb-2" { "Balances by member" }

                    table
                        id="partner-balances"
                        class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Member" }
                                th scope="col" class="px-6 py-3 text-right" { "Balance" }
                            }
                        }

                        tbody
                        {
                            @for partner in &summary.counterparty_balances {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE) { (partner.name) }
                                    td class="px-6 py-4 text-right tabular-nums"
                                    {
                                        (format_points(partner.balance))
                                    }
                                }
                            }

                            @if summary.counterparty_balances.is_empty() {
                                tr
                                {
                                    td colspan="2" class="px-6 py-4 text-center"
                                    {
                                        "No trading partners yet."
                                    }
                                }
                            }
                        }
                    }
                }

                section class="overflow-x-auto"
                {
                    h2 class="text-lg font-bold mb-2" { "History" }

                    table
                        id="transactions"
                        class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
                    {
                        thead class=(TABLE_HEADER_STYLE)
                        {
                            tr
                            {
                                th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Kind" }
                                th scope="col" class=(TABLE_CELL_STYLE) { "Member" }
                                th scope="col" class="px-6 py-3 text-right" { "Points" }
                            }
                        }

                        tbody
                        {
                            @for transaction in &summary.annotated_transactions {
                                tr class=(TABLE_ROW_STYLE)
                                {
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        (format_local_date_time(transaction.record.date_created, local_offset))
                                    }
                                    td class=(TABLE_CELL_STYLE) { (transaction.record.name) }
                                    td class=(TABLE_CELL_STYLE)
                                    {
                                        span class=(KIND_BADGE_STYLE) { (transaction.record.kind) }
                                    }
                                    td class=(TABLE_CELL_STYLE) { (transaction.other_party) }
                                    td class="px-6 py-4 text-right tabular-nums"
                                    {
                                        (signed_points(member.id, transaction))
                                    }
                                }
                            }

                            @if summary.annotated_transactions.is_empty() {
                                tr
                                {
                                    td colspan="5" class="px-6 py-4 text-center"
                                    {
                                        "No transactions yet. Give some points below to get started."
                                    }
                                }
                            }
                        }
                    }
                }

                (transfer_form())
            }
        }
    );

    base("Points", &content)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension, Json,
        extract::State,
        http::StatusCode,
        response::IntoResponse,
    };
    use rusqlite::Connection;
    use scraper::Selector;

    use crate::{
        UserID,
        auth::insert_test_user,
        endpoints,
        ledger::db::{NewTransfer, insert_transfer},
        test_utils::{
            assert_content_type, assert_hx_endpoint, assert_valid_html, get_test_connection,
            parse_html_document, select_table_rows,
        },
    };

    use super::{LedgerState, get_ledger_json, get_ledger_page};

    fn give(giver: UserID, getter: UserID, points: i64, name: &str, connection: &Connection) {
        insert_transfer(
            &NewTransfer {
                giver_id: giver,
                getter_id: getter,
                name: name.to_owned(),
                points,
                kind: "service".to_owned(),
            },
            connection,
        )
        .unwrap();
    }

    /// Alice gave Bob 20 and Carol 10, and got 5 from Carol.
    fn get_test_state() -> (LedgerState, UserID) {
        let connection = get_test_connection();
        let alice = insert_test_user("Alice", "alice", &connection);
        let bob = insert_test_user("Bob", "bob", &connection);
        let carol = insert_test_user("Carol", "carol", &connection);
        give(alice.id, bob.id, 20, "Haircut", &connection);
        give(alice.id, carol.id, 10, "Bike repair", &connection);
        give(carol.id, alice.id, 5, "Eggs", &connection);

        (
            LedgerState {
                db_connection: Arc::new(Mutex::new(connection)),
                local_timezone: "Etc/UTC".to_owned(),
            },
            alice.id,
        )
    }

    #[tokio::test]
    async fn ledger_page_shows_balance_and_partners() {
        let (state, alice) = get_test_state();

        let response = get_ledger_page(State(state), Extension(alice))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::OK);
        assert_content_type(&response, "text/html; charset=utf-8");
        let document = parse_html_document(response).await;
        assert_valid_html(&document);

        let member = document
            .select(&Selector::parse("#member").unwrap())
            .next()
            .expect("could not find member name")
            .text()
            .collect::<String>();
        assert_eq!(member.trim(), "Alice (@alice)");

        let balance = document
            .select(&Selector::parse("#balance").unwrap())
            .next()
            .expect("could not find balance")
            .text()
            .collect::<String>();
        assert_eq!(balance.trim(), "25 pts");

        let partners = select_table_rows(&document, "table#partner-balances");
        assert_eq!(
            partners,
            vec![
                vec!["Carol".to_owned(), "5 pts".to_owned()],
                vec!["Bob".to_owned(), "20 pts".to_owned()],
            ]
        );
    }

    #[tokio::test]
    async fn ledger_page_lists_history_from_subjects_view() {
        let (state, alice) = get_test_state();

        let response = get_ledger_page(State(state), Extension(alice))
            .await
            .into_response();

        let document = parse_html_document(response).await;
        let history = select_table_rows(&document, "table#transactions");
        assert_eq!(history.len(), 3);
        let eggs = history
            .iter()
            .find(|row| row[1] == "Eggs")
            .expect("could not find the transfer from Carol");
        assert_eq!(eggs[3], "Carol");
        assert!(
            eggs[4].starts_with('-') && eggs[4].ends_with("5 pts"),
            "want points Alice got shown as negative, got {:?}",
            eggs[4]
        );
        let haircut = history
            .iter()
            .find(|row| row[1] == "Haircut")
            .expect("could not find the transfer to Bob");
        assert_eq!(haircut[3], "Bob");
        assert_eq!(haircut[4], "+20 pts");
    }

    #[tokio::test]
    async fn ledger_page_has_transfer_form() {
        let (state, alice) = get_test_state();

        let response = get_ledger_page(State(state), Extension(alice))
            .await
            .into_response();

        let document = parse_html_document(response).await;
        let form = document
            .select(&Selector::parse("form").unwrap())
            .next()
            .expect("could not find transfer form");
        assert_hx_endpoint(&form, endpoints::TRANSACTIONS_API, "hx-post");
        assert_hx_endpoint(&form, "#alert-container", "hx-target-error");
    }

    #[tokio::test]
    async fn ledger_page_for_new_member_is_empty() {
        let connection = get_test_connection();
        let dave = insert_test_user("Dave", "dave", &connection);
        let state = LedgerState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        let response = get_ledger_page(State(state), Extension(dave.id))
            .await
            .into_response();

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let partners = select_table_rows(&document, "table#partner-balances");
        assert_eq!(partners, vec![vec!["No trading partners yet.".to_owned()]]);
        let average = document
            .select(&Selector::parse("#avg-transaction").unwrap())
            .next()
            .expect("could not find average")
            .text()
            .collect::<String>();
        assert_eq!(average.trim(), "0.0 pts");
    }

    #[tokio::test]
    async fn ledger_page_fails_with_invalid_timezone() {
        let (mut state, alice) = get_test_state();
        state.local_timezone = "Not/AZone".to_owned();

        let response = get_ledger_page(State(state), Extension(alice))
            .await
            .into_response();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn ledger_json_matches_summary() {
        let (state, alice) = get_test_state();

        let Json(summary) = get_ledger_json(State(state), Extension(alice))
            .await
            .unwrap();

        assert_eq!(summary.balance, 25);
        assert_eq!(summary.stats.total_transactions, 3);
        assert_eq!(summary.stats.unique_partners, 2);
        assert_eq!(summary.stats.avg_transaction, 35.0 / 3.0);
        let total: i64 = summary
            .counterparty_balances
            .iter()
            .map(|partner| partner.balance)
            .sum();
        assert_eq!(total, summary.balance);
    }
}
