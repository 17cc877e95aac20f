//! The API endpoints URIs.

/// The root route which redirects to the points page or log in page.
pub const ROOT: &str = "/";
/// The landing page for logged in users, showing their points ledger.
pub const LEDGER_VIEW: &str = "/pointsz";
/// The page listing every member's shop ranked by credit ratio.
pub const SHOPS_VIEW: &str = "/shops";
/// The page for listing a new product.
pub const NEW_PRODUCT_VIEW: &str = "/products/new";
/// The page for listing a new service.
pub const NEW_SERVICE_VIEW: &str = "/services/new";
/// The route for getting the registration page.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page.
pub const LOG_IN_VIEW: &str = "/log_in";
/// The page to display when an internal server error occurs.
pub const INTERNAL_ERROR_VIEW: &str = "/error";
/// The route for static files.
pub const STATIC: &str = "/static";

/// The route for logging in a user.
pub const LOG_IN_API: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to create users.
pub const USERS: &str = "/api/users";
/// The route for the current user's ledger as JSON.
pub const LEDGER_API: &str = "/api/pointsz";
/// The route to record a point transfer.
pub const TRANSACTIONS_API: &str = "/api/transactions";
/// The route to create a product listing.
pub const PRODUCTS_API: &str = "/api/products";
/// The route to create a service listing.
pub const SERVICES_API: &str = "/api/services";
