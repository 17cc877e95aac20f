//! Products and services that members offer in exchange for points.

mod core;
mod create_endpoint;
mod create_page;

pub use core::{Listing, ListingKind, NewListing, create_listing_tables, insert_listing};
pub use create_endpoint::{create_product_endpoint, create_service_endpoint};
pub use create_page::{get_new_product_page, get_new_service_page};

#[cfg(test)]
pub(crate) use core::map_row_to_listing;
