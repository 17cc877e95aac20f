//! The points ledger: storage of point transfers, the aggregation of a
//! member's transfers into balances, and the pages that show them.

mod aggregate;
mod db;
mod page;
mod transfer;

pub use aggregate::{
    AnnotatedTransaction, CounterpartyBalance, LedgerStats, LedgerSummary, TransactionId,
    TransactionRecord, summarize_ledger,
};
pub use db::{MAX_TRANSFER_POINTS, create_transaction_table};
pub use page::{get_ledger_json, get_ledger_page};
pub use transfer::create_transfer_endpoint;
