use rusqlite::{Connection, params};

use crate::{Error, UserID, endpoints};

pub type ListingId = i64;

/// The two kinds of thing a member can offer.
///
/// Both share the same shape and are stored in tables of the same layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListingKind {
    Product,
    Service,
}

impl ListingKind {
    pub fn table_name(self) -> &'static str {
        match self {
            ListingKind::Product => "product",
            ListingKind::Service => "service",
        }
    }

    /// The capitalised name shown in page titles and labels.
    pub fn label(self) -> &'static str {
        match self {
            ListingKind::Product => "Product",
            ListingKind::Service => "Service",
        }
    }

    /// The page with the form for creating this kind of listing.
    pub fn view_endpoint(self) -> &'static str {
        match self {
            ListingKind::Product => endpoints::NEW_PRODUCT_VIEW,
            ListingKind::Service => endpoints::NEW_SERVICE_VIEW,
        }
    }

    /// The endpoint the creation form posts to.
    pub fn api_endpoint(self) -> &'static str {
        match self {
            ListingKind::Product => endpoints::PRODUCTS_API,
            ListingKind::Service => endpoints::SERVICES_API,
        }
    }
}

/// A product or service offered by a member.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing {
    pub id: ListingId,
    /// The member offering the listing.
    pub user_id: UserID,
    pub name: String,
    pub description: String,
    /// The asking price in points.
    pub price: i64,
}

/// A validated listing that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewListing {
    pub user_id: UserID,
    pub name: String,
    pub description: String,
    pub price: i64,
}

impl NewListing {
    /// Trim and check the user supplied fields of a listing owned by `user_id`.
    ///
    /// # Errors
    /// Returns an [Error::EmptyField] if `name` is blank, or an
    /// [Error::NegativePrice] if `price` is below zero.
    pub fn new(user_id: UserID, name: &str, description: &str, price: i64) -> Result<Self, Error> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::EmptyField("name"));
        }

        if price < 0 {
            return Err(Error::NegativePrice(price));
        }

        Ok(Self {
            user_id,
            name: name.to_owned(),
            description: description.trim().to_owned(),
            price,
        })
    }
}

/// Create the product and service tables.
pub fn create_listing_tables(connection: &Connection) -> Result<(), rusqlite::Error> {
    for kind in [ListingKind::Product, ListingKind::Service] {
        let table = kind.table_name();

        connection.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY,
                    user_id INTEGER NOT NULL,
                    name TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    price INTEGER NOT NULL CHECK (price >= 0),
                    FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )"
            ),
            (),
        )?;

        connection.execute(
            &format!("CREATE INDEX IF NOT EXISTS idx_{table}_user_id ON {table}(user_id)"),
            (),
        )?;
    }

    Ok(())
}

/// Store `listing` in the table for `kind`.
///
/// # Errors
/// Returns an [Error::SqlError] if the insert fails, e.g. because the owner does not exist.
pub fn insert_listing(
    kind: ListingKind,
    listing: NewListing,
    connection: &Connection,
) -> Result<Listing, Error> {
    connection.execute(
        &format!(
            "INSERT INTO {} (user_id, name, description, price) VALUES (?1, ?2, ?3, ?4)",
            kind.table_name()
        ),
        params![
            listing.user_id.as_i64(),
            listing.name,
            listing.description,
            listing.price
        ],
    )?;

    let NewListing {
        user_id,
        name,
        description,
        price,
    } = listing;

    Ok(Listing {
        id: connection.last_insert_rowid(),
        user_id,
        name,
        description,
        price,
    })
}

#[cfg(test)]
pub fn map_row_to_listing(row: &rusqlite::Row) -> Result<Listing, rusqlite::Error> {
    Ok(Listing {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        name: row.get(2)?,
        description: row.get(3)?,
        price: row.get(4)?,
    })
}

#[cfg(test)]
mod tests {
    use rusqlite::{Connection, params};

    use crate::{
        Error, UserID, auth::insert_test_user, test_utils::get_test_connection,
    };

    use super::{
        Listing, ListingKind, NewListing, create_listing_tables, insert_listing,
        map_row_to_listing,
    };

    #[test]
    fn create_tables_is_idempotent() {
        let connection = Connection::open_in_memory().unwrap();

        assert_eq!(Ok(()), create_listing_tables(&connection));
        assert_eq!(Ok(()), create_listing_tables(&connection));
    }

    #[test]
    fn new_listing_trims_text() {
        let listing = NewListing::new(UserID::new(1), "  Jam ", " Plum, homemade ", 3).unwrap();

        assert_eq!(listing.name, "Jam");
        assert_eq!(listing.description, "Plum, homemade");
    }

    #[test]
    fn new_listing_rejects_blank_name() {
        assert_eq!(
            NewListing::new(UserID::new(1), "   ", "", 3),
            Err(Error::EmptyField("name"))
        );
    }

    #[test]
    fn new_listing_allows_free_but_not_negative_price() {
        assert!(NewListing::new(UserID::new(1), "Advice", "", 0).is_ok());
        assert_eq!(
            NewListing::new(UserID::new(1), "Advice", "", -1),
            Err(Error::NegativePrice(-1))
        );
    }

    #[test]
    fn insert_stores_listing_in_table_for_kind() {
        let connection = get_test_connection();
        let owner = insert_test_user("Alice", "alice", &connection);
        let new_listing = NewListing::new(owner.id, "Mowing", "Up to 500m²", 15).unwrap();

        let inserted = insert_listing(ListingKind::Service, new_listing, &connection).unwrap();

        let got: Listing = connection
            .query_row(
                "SELECT id, user_id, name, description, price FROM service WHERE id = ?1",
                params![inserted.id],
                map_row_to_listing,
            )
            .unwrap();
        assert_eq!(got, inserted);
        let product_count: i64 = connection
            .query_row("SELECT COUNT(*) FROM product", [], |row| row.get(0))
            .unwrap();
        assert_eq!(product_count, 0);
    }

    #[test]
    fn insert_fails_for_unknown_owner() {
        let connection = get_test_connection();
        let new_listing = NewListing::new(UserID::new(404), "Jam", "", 3).unwrap();

        let result = insert_listing(ListingKind::Product, new_listing, &connection);

        assert!(matches!(result, Err(Error::SqlError(_))), "got {result:?}");
    }
}
