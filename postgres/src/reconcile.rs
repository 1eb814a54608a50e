//! Startup reconciliation of available stock.
//!
//! Cart reservations live only in engine memory, so a process exit leaks
//! their debits: stock stays subtracted with no cart left to release it.
//! Run [`reconcile_available`] once at startup, before the engine takes
//! traffic, to recompute every product's availability from first
//! principles and discard those orphaned reservations.

use sqlx::PgPool;
use storefront_core::error::StoreError;

/// Reset `available` to `stock_total` minus the quantity sold through
/// committed order lines, for every product.
///
/// Returns the number of product rows updated.
///
/// # Errors
///
/// Returns [`StoreError::Unavailable`] if the update fails. A constraint
/// violation (committed sales exceeding `stock_total`) also surfaces here;
/// that is an inventory bookkeeping defect and is deliberately not papered
/// over.
pub async fn reconcile_available(pool: &PgPool) -> Result<u64, StoreError> {
    let result = sqlx::query(
        r"
        UPDATE products p
        SET available = p.stock_total - COALESCE((
            SELECT SUM(ol.quantity)
            FROM order_lines ol
            WHERE ol.product_id = p.id
        ), 0)
        ",
    )
    .execute(pool)
    .await
    .map_err(|e| StoreError::Unavailable(e.to_string()))?;

    tracing::info!(
        products = result.rows_affected(),
        "available stock reconciled from committed orders"
    );
    Ok(result.rows_affected())
}
