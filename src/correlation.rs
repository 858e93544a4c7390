//! Locating the local transaction a gateway notification refers to.
//!
//! Order ids round-trip cleanly in the common case, so the exact reference
//! match almost always hits. The remaining rungs cover orders created by
//! older builds that stored the reference inside the metadata blob, and
//! gateway-side retries that arrive under a suffixed transaction id.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::Result;
use crate::gateway::MidtransNotification;
use crate::models::Transaction;

pub trait CorrelationStrategy {
    /// Label recorded on the delivery row when this rung matches.
    fn name(&self) -> &'static str;

    fn locate(
        &self,
        conn: &Connection,
        notification: &MidtransNotification,
    ) -> Result<Option<Transaction>>;
}

struct ExactReference;

impl CorrelationStrategy for ExactReference {
    fn name(&self) -> &'static str {
        "exact_reference"
    }

    fn locate(
        &self,
        conn: &Connection,
        notification: &MidtransNotification,
    ) -> Result<Option<Transaction>> {
        queries::get_transaction_by_reference(conn, &notification.order_id)
    }
}

struct MetadataContainment;

impl CorrelationStrategy for MetadataContainment {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn locate(
        &self,
        conn: &Connection,
        notification: &MidtransNotification,
    ) -> Result<Option<Transaction>> {
        queries::find_transaction_by_metadata(conn, &notification.order_id)
    }
}

struct GatewayTransactionId;

impl CorrelationStrategy for GatewayTransactionId {
    fn name(&self) -> &'static str {
        "gateway_transaction_id"
    }

    fn locate(
        &self,
        conn: &Connection,
        notification: &MidtransNotification,
    ) -> Result<Option<Transaction>> {
        match notification.transaction_id.as_deref() {
            Some(gateway_id) if !gateway_id.is_empty() => {
                queries::find_transaction_by_gateway_id(conn, gateway_id)
            }
            _ => Ok(None),
        }
    }
}

const STRATEGIES: &[&dyn CorrelationStrategy] =
    &[&ExactReference, &MetadataContainment, &GatewayTransactionId];

/// Walk the strategy chain in order and return the first match along with
/// the name of the rung that found it. `None` means the notification is an
/// orphan.
pub fn correlate(
    conn: &Connection,
    notification: &MidtransNotification,
) -> Result<Option<(Transaction, &'static str)>> {
    for strategy in STRATEGIES {
        if let Some(transaction) = strategy.locate(conn, notification)? {
            tracing::debug!(
                order_id = %notification.order_id,
                transaction_id = %transaction.id,
                strategy = strategy.name(),
                "correlated notification"
            );
            return Ok(Some((transaction, strategy.name())));
        }
    }
    Ok(None)
}
