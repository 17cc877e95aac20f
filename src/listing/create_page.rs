//! Defines the route handlers for the pages for listing a new product or service.

use axum::response::{IntoResponse, Response};
use maud::{Markup, html};

use crate::{
    html::{
        FORM_CONTAINER_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, submit_button,
        text_input,
    },
    listing::ListingKind,
    navigation::NavBar,
};

fn create_listing_view(kind: ListingKind) -> Markup {
    let nav_bar = NavBar::new(kind.view_endpoint()).into_html();
    let title = format!("New {}", kind.label());

    let content = html! {
        (nav_bar)

        div class=(FORM_CONTAINER_STYLE)
        {
            h1 class="text-xl font-bold mb-4" { (title) }

            form
                hx-post=(kind.api_endpoint())
                hx-target-error="#alert-container"
                hx-indicator="#indicator"
                hx-disabled-elt="#submit-button"
                class="w-full space-y-4 md:space-y-6"
            {
                (text_input("Name", "name", "text", "", true, None))

                div
                {
                    label for="description" class=(FORM_LABEL_STYLE) { "Description" }

                    textarea
                        name="description"
                        id="description"
                        rows="4"
                        class=(FORM_TEXT_INPUT_STYLE)
                    {}
                }

                div
                {
                    label for="price" class=(FORM_LABEL_STYLE) { "Price (points)" }

                    input
                        type="number"
                        name="price"
                        id="price"
                        min="0"
                        step="1"
                        value="0"
                        class=(FORM_TEXT_INPUT_STYLE)
                        required;
                }

                (submit_button(&format!("Create {}", kind.label().to_lowercase())))
            }
        }
    };

    base(&title, &content)
}

/// Renders the page for listing a new product.
pub async fn get_new_product_page() -> Response {
    create_listing_view(ListingKind::Product).into_response()
}

/// Renders the page for listing a new service.
pub async fn get_new_service_page() -> Response {
    create_listing_view(ListingKind::Service).into_response()
}
