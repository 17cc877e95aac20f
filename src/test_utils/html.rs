use axum::{body::Body, response::Response};
use scraper::{ElementRef, Html, Selector};

async fn read_body(response: Response<Body>) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not get response body");

    String::from_utf8_lossy(&body).into_owned()
}

pub(crate) async fn parse_html_document(response: Response<Body>) -> Html {
    Html::parse_document(&read_body(response).await)
}

pub(crate) async fn parse_html_fragment(response: Response<Body>) -> Html {
    Html::parse_fragment(&read_body(response).await)
}

#[track_caller]
pub(crate) fn assert_valid_html(html: &Html) {
    assert!(
        html.errors.is_empty(),
        "Got HTML parsing errors: {:?}",
        html.errors
    );
}

/// The trimmed cell text of each body row in the table matching `table_selector`.
#[track_caller]
pub(crate) fn select_table_rows(html: &Html, table_selector: &str) -> Vec<Vec<String>> {
    let table = html
        .select(&Selector::parse(table_selector).unwrap())
        .next()
        .unwrap_or_else(|| panic!("No table found matching {table_selector:?}"));
    let cell_selector = Selector::parse("td").unwrap();

    table
        .select(&Selector::parse("tbody tr").unwrap())
        .map(|row: ElementRef<'_>| {
            row.select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_owned())
                .collect()
        })
        .collect()
}
