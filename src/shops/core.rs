use rusqlite::{Connection, Row};

use crate::{Error, UserID};

/// A member's shop with what it offers and how the member stands in the community.
#[derive(Debug, Clone, PartialEq)]
pub struct Shop {
    pub user_id: UserID,
    pub name: String,
    pub codename: String,
    pub avatar: Option<String>,
    pub location: Option<String>,
    pub product_count: i64,
    pub service_count: i64,
    /// The total points the member has given.
    pub credits: i64,
    /// The total points the member has received.
    pub debts: i64,
    /// See [credit_ratio].
    pub credit_ratio: f64,
}

/// How much a member has given for each point they have received.
///
/// A member who has only given scores 1, and a member who has done
/// neither scores 0.
pub fn credit_ratio(credits: i64, debts: i64) -> f64 {
    if debts > 0 {
        credits as f64 / debts as f64
    } else if credits > 0 {
        1.0
    } else {
        0.0
    }
}

fn map_row_to_shop(row: &Row) -> Result<Shop, rusqlite::Error> {
    let credits = row.get(7)?;
    let debts = row.get(8)?;

    Ok(Shop {
        user_id: UserID::new(row.get(0)?),
        name: row.get(1)?,
        codename: row.get(2)?,
        avatar: row.get(3)?,
        location: row.get(4)?,
        product_count: row.get(5)?,
        service_count: row.get(6)?,
        credits,
        debts,
        credit_ratio: credit_ratio(credits, debts),
    })
}

/// Get the shop of every member, highest credit ratio first.
///
/// Members with equal ratios stay in registration order.
///
/// # Errors
/// Returns an [Error::SqlError] if the query fails.
pub fn get_shops(connection: &Connection) -> Result<Vec<Shop>, Error> {
    let mut shops = connection
        .prepare(
            "SELECT u.id, u.name, u.codename, u.avatar, u.location,
                (SELECT COUNT(*) FROM product p WHERE p.user_id = u.id),
                (SELECT COUNT(*) FROM service s WHERE s.user_id = u.id),
                (SELECT COALESCE(SUM(t.points), 0) FROM point_transaction t WHERE t.giver_id = u.id),
                (SELECT COALESCE(SUM(t.points), 0) FROM point_transaction t WHERE t.getter_id = u.id)
            FROM user u
            ORDER BY u.id ASC",
        )?
        .query_map([], map_row_to_shop)?
        .collect::<Result<Vec<_>, _>>()?;

    shops.sort_by(|a, b| b.credit_ratio.total_cmp(&a.credit_ratio));

    Ok(shops)
}

#[cfg(test)]
mod credit_ratio_tests {
    use super::credit_ratio;

    #[test]
    fn ratio_of_credits_to_debts() {
        assert_eq!(credit_ratio(30, 10), 3.0);
        assert_eq!(credit_ratio(5, 20), 0.25);
    }

    #[test]
    fn only_credits_is_one() {
        assert_eq!(credit_ratio(40, 0), 1.0);
    }

    #[test]
    fn only_debts_is_zero() {
        assert_eq!(credit_ratio(0, 40), 0.0);
    }

    #[test]
    fn no_activity_is_zero() {
        assert_eq!(credit_ratio(0, 0), 0.0);
    }
}
