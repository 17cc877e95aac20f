//! Every member's shop, ranked by how much they have given relative to what they have received.

mod core;
mod page;

pub use core::{Shop, credit_ratio, get_shops};
pub use page::get_shops_page;
