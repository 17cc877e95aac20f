//! Folds a member's point transfers into their ledger.
//!
//! A transfer moves points from the giver to the getter in exchange for a
//! product or service, so the giver is owed. From the subject's point of view
//! every transfer they gave adds to their balance and every transfer they got
//! subtracts from it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, UserID};

/// The ID of a point transfer in the database.
pub type TransactionId = i64;

/// A point transfer between two members, with both members' display names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// The ID of the transfer in the database.
    pub id: TransactionId,
    /// What the points were for, e.g. "Haircut".
    pub name: String,
    pub points: i64,
    /// A free text category, e.g. "service".
    pub kind: String,
    /// When the transfer was recorded.
    #[serde(with = "crate::date_time::datetime_format")]
    pub date_created: OffsetDateTime,
    /// The member who gave the points and is owed for them.
    pub giver_id: UserID,
    /// The member who got the points.
    pub getter_id: UserID,
    /// The giver's display name.
    pub giver_name: String,
    /// The getter's display name.
    pub getter_name: String,
}

/// The subject's net position with one other member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyBalance {
    /// The counterparty's user ID.
    pub id: UserID,
    /// The name from the first transfer the member appeared in.
    pub name: String,
    /// Positive when the counterparty owes the subject.
    pub balance: i64,
}

/// A transfer along with the name of the member on the other side of it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotatedTransaction {
    #[serde(flatten)]
    pub record: TransactionRecord,
    /// The display name of the member on the other side of the transfer.
    pub other_party: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerStats {
    /// The number of transfers the subject took part in.
    pub total_transactions: usize,
    /// The number of distinct members the subject traded with.
    pub unique_partners: usize,
    /// The mean points per transfer, zero when there are no transfers.
    pub avg_transaction: f64,
}

/// Everything the points page shows about one member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// The subject's net position, positive when others owe the subject.
    pub balance: i64,
    /// One entry per counterparty, in the order they first appear.
    #[serde(rename = "userBalances")]
    pub counterparty_balances: Vec<CounterpartyBalance>,
    /// The input records in their original order.
    #[serde(rename = "transactions")]
    pub annotated_transactions: Vec<AnnotatedTransaction>,
    pub stats: LedgerStats,
}

/// The subject's view of a single record: the signed amount and who was on the other side.
fn counterparty_of(
    subject: UserID,
    record: &TransactionRecord,
) -> Result<(i64, UserID, &str), Error> {
    let is_giver = record.giver_id == subject;
    let is_getter = record.getter_id == subject;

    match (is_giver, is_getter) {
        (true, false) => Ok((record.points, record.getter_id, &record.getter_name)),
        (false, true) => {
            let signed_amount = record
                .points
                .checked_neg()
                .ok_or(Error::BalanceOverflow(record.id))?;
            Ok((signed_amount, record.giver_id, &record.giver_name))
        }
        (true, true) => Err(Error::SelfTransaction(record.id)),
        (false, false) => Err(Error::UnrelatedTransaction {
            transaction_id: record.id,
            subject,
        }),
    }
}

/// Compute `subject`'s balance, per-counterparty balances and stats from the
/// transfers they took part in.
///
/// Records are processed in order and independently, so duplicate IDs count
/// once per occurrence.
///
/// # Errors
///
/// Returns [Error::UnrelatedTransaction] for a record that does not involve
/// `subject` and [Error::SelfTransaction] for a record where `subject` is both
/// giver and getter. Either means the records were not fetched for `subject`.
/// Returns [Error::BalanceOverflow] if a balance does not fit in an `i64`.
pub fn summarize_ledger(
    subject: UserID,
    records: Vec<TransactionRecord>,
) -> Result<LedgerSummary, Error> {
    let mut balance: i64 = 0;
    let mut total_points: i128 = 0;
    let mut counterparty_balances: Vec<CounterpartyBalance> = Vec::new();
    let mut counterparty_index: HashMap<UserID, usize> = HashMap::new();
    let mut annotated_transactions = Vec::with_capacity(records.len());

    for record in records {
        let (signed_amount, counterparty_id, counterparty_name) =
            counterparty_of(subject, &record)?;

        balance = balance
            .checked_add(signed_amount)
            .ok_or(Error::BalanceOverflow(record.id))?;
        total_points += i128::from(record.points);

        let index = *counterparty_index
            .entry(counterparty_id)
            .or_insert_with(|| {
                counterparty_balances.push(CounterpartyBalance {
                    id: counterparty_id,
                    name: counterparty_name.to_owned(),
                    balance: 0,
                });
                counterparty_balances.len() - 1
            });
        let counterparty = &mut counterparty_balances[index];
        counterparty.balance = counterparty
            .balance
            .checked_add(signed_amount)
            .ok_or(Error::BalanceOverflow(record.id))?;

        let other_party = counterparty_name.to_owned();
        annotated_transactions.push(AnnotatedTransaction {
            record,
            other_party,
        });
    }

    let total_transactions = annotated_transactions.len();
    let avg_transaction = if total_transactions == 0 {
        0.0
    } else {
        total_points as f64 / total_transactions as f64
    };

    Ok(LedgerSummary {
        balance,
        stats: LedgerStats {
            total_transactions,
            unique_partners: counterparty_balances.len(),
            avg_transaction,
        },
        counterparty_balances,
        annotated_transactions,
    })
}
