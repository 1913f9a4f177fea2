//! # Receipt Repository
//!
//! Repair tickets: intake, edits, and the SIN_ARREGLAR → ARREGLADO →
//! ENTREGADO lifecycle.
//!
//! State changes go through [`ReceiptRepository::advance`] only; editing a
//! ticket's details never touches its state or the repaired/delivered dates.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use celumax_core::repair::default_delivery;
use celumax_core::validation::validate_receipt_details;
use celumax_core::{NewReceipt, Receipt, ReceiptDetails, ReceiptFilter, ReceiptState};

use super::{contains_pattern, new_id};
use crate::changes::{ChangeFeed, DataChange};
use crate::error::{DbError, DbResult};

const RECEIPT_COLUMNS: &str = "id, client_name, client_phone, client_id, device_reference, \
     procedure, device_password, price_cents, deposit_cents, registered_at, \
     estimated_delivery_at, state, repaired_at, delivered_at";

/// Repository for repair tickets.
#[derive(Debug, Clone)]
pub struct ReceiptRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ReceiptRepository {
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ReceiptRepository { pool, changes }
    }

    /// Registers a device left for repair.
    ///
    /// Without an explicit estimate the device is due one day after intake.
    pub async fn insert(&self, new: &NewReceipt) -> DbResult<Receipt> {
        validate_receipt_details(new)?;

        let now = Utc::now();
        let receipt = Receipt {
            id: new_id(),
            client_name: new.client_name.trim().to_string(),
            client_phone: new.client_phone.trim().to_string(),
            client_id: new.client_id.trim().to_string(),
            device_reference: new.device_reference.trim().to_string(),
            procedure: new.procedure.trim().to_string(),
            device_password: clean_password(&new.device_password),
            price_cents: new.price_cents,
            deposit_cents: new.deposit_cents,
            registered_at: now,
            estimated_delivery_at: new.estimated_delivery_at.unwrap_or_else(|| default_delivery(now)),
            state: ReceiptState::SinArreglar,
            repaired_at: None,
            delivered_at: None,
        };

        debug!(id = %receipt.id, client = %receipt.client_name, "Registering receipt");

        sqlx::query(
            r#"
            INSERT INTO receipts (
                id, client_name, client_phone, client_id, device_reference,
                procedure, device_password, price_cents, deposit_cents, registered_at,
                estimated_delivery_at, state, repaired_at, delivered_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
        )
        .bind(&receipt.id)
        .bind(&receipt.client_name)
        .bind(&receipt.client_phone)
        .bind(&receipt.client_id)
        .bind(&receipt.device_reference)
        .bind(&receipt.procedure)
        .bind(&receipt.device_password)
        .bind(receipt.price_cents)
        .bind(receipt.deposit_cents)
        .bind(receipt.registered_at)
        .bind(receipt.estimated_delivery_at)
        .bind(receipt.state)
        .bind(receipt.repaired_at)
        .bind(receipt.delivered_at)
        .execute(&self.pool)
        .await?;

        info!(id = %receipt.id, "Receipt registered");
        self.changes.publish(&[DataChange::Receipts]);
        Ok(receipt)
    }

    pub async fn get(&self, id: &str) -> DbResult<Option<Receipt>> {
        let mut conn = self.pool.acquire().await?;
        fetch_receipt(&mut conn, id).await
    }

    /// Rewrites client, device and price fields.
    ///
    /// `estimated_delivery_at: None` keeps the current estimate.
    pub async fn update_details(&self, id: &str, details: &ReceiptDetails) -> DbResult<Receipt> {
        validate_receipt_details(details)?;

        let mut tx = self.pool.begin().await?;
        let current = fetch_receipt(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", id))?;

        let updated = Receipt {
            client_name: details.client_name.trim().to_string(),
            client_phone: details.client_phone.trim().to_string(),
            client_id: details.client_id.trim().to_string(),
            device_reference: details.device_reference.trim().to_string(),
            procedure: details.procedure.trim().to_string(),
            device_password: clean_password(&details.device_password),
            price_cents: details.price_cents,
            deposit_cents: details.deposit_cents,
            estimated_delivery_at: details
                .estimated_delivery_at
                .unwrap_or(current.estimated_delivery_at),
            ..current
        };

        sqlx::query(
            r#"
            UPDATE receipts SET
                client_name = ?2,
                client_phone = ?3,
                client_id = ?4,
                device_reference = ?5,
                procedure = ?6,
                device_password = ?7,
                price_cents = ?8,
                deposit_cents = ?9,
                estimated_delivery_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(&updated.id)
        .bind(&updated.client_name)
        .bind(&updated.client_phone)
        .bind(&updated.client_id)
        .bind(&updated.device_reference)
        .bind(&updated.procedure)
        .bind(&updated.device_password)
        .bind(updated.price_cents)
        .bind(updated.deposit_cents)
        .bind(updated.estimated_delivery_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        debug!(id = %id, "Receipt details updated");
        self.changes.publish(&[DataChange::Receipts]);
        Ok(updated)
    }

    /// Moves a ticket one step forward and stamps the matching date.
    pub async fn advance(&self, id: &str, target: ReceiptState) -> DbResult<Receipt> {
        let mut tx = self.pool.begin().await?;
        let mut receipt = fetch_receipt(&mut tx, id)
            .await?
            .ok_or_else(|| DbError::not_found("Receipt", id))?;

        let from = receipt.state;
        receipt.advance(target, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE receipts SET state = ?2, repaired_at = ?3, delivered_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&receipt.id)
        .bind(receipt.state)
        .bind(receipt.repaired_at)
        .bind(receipt.delivered_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %id, from = %from, to = %target, "Receipt advanced");
        self.changes.publish(&[DataChange::Receipts]);
        Ok(receipt)
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM receipts WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Receipt", id));
        }

        info!(id = %id, "Receipt deleted");
        self.changes.publish(&[DataChange::Receipts]);
        Ok(())
    }

    /// Tickets ordered by estimated delivery, soonest first.
    ///
    /// The delivered-at range only applies when both ends are set; it then
    /// excludes tickets not yet delivered.
    pub async fn list(&self, filter: &ReceiptFilter) -> DbResult<Vec<Receipt>> {
        let (from, to) = match (filter.delivered_from, filter.delivered_to) {
            (Some(from), Some(to)) => (Some(from), Some(to)),
            _ => (None, None),
        };

        let sql = format!(
            "SELECT {RECEIPT_COLUMNS} FROM receipts \
             WHERE client_name LIKE ?1 ESCAPE '\\' \
               AND (?2 IS NULL OR julianday(delivered_at) BETWEEN julianday(?2) AND julianday(?3)) \
               AND (?4 IS NULL OR state = ?4) \
             ORDER BY estimated_delivery_at ASC, rowid ASC"
        );
        let receipts = sqlx::query_as::<_, Receipt>(&sql)
            .bind(contains_pattern(&filter.client_query))
            .bind(from)
            .bind(to)
            .bind(filter.state)
            .fetch_all(&self.pool)
            .await?;
        Ok(receipts)
    }

    pub async fn count_by_state(&self, state: ReceiptState) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM receipts WHERE state = ?1")
            .bind(state)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Tickets repaired at or after `since` and still waiting for pickup.
    ///
    /// Tickets already handed back are counted by [`Self::delivered_since`]
    /// instead.
    pub async fn repaired_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        self.count_stamped_since("repaired_at", Some(ReceiptState::Arreglado), since)
            .await
    }

    /// Tickets handed back at or after `since`.
    pub async fn delivered_since(&self, since: DateTime<Utc>) -> DbResult<i64> {
        self.count_stamped_since("delivered_at", None, since).await
    }

    async fn count_stamped_since(
        &self,
        column: &'static str,
        state: Option<ReceiptState>,
        since: DateTime<Utc>,
    ) -> DbResult<i64> {
        let sql = format!(
            "SELECT COUNT(*) FROM receipts \
             WHERE {column} IS NOT NULL AND julianday({column}) >= julianday(?1) \
             AND (?2 IS NULL OR state = ?2)"
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(since)
            .bind(state)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Blank passwords are stored as NULL so tickets print the `___` blank.
fn clean_password(password: &Option<String>) -> Option<String> {
    password
        .as_deref()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_string)
}

async fn fetch_receipt(conn: &mut SqliteConnection, id: &str) -> DbResult<Option<Receipt>> {
    let sql = format!("SELECT {RECEIPT_COLUMNS} FROM receipts WHERE id = ?1");
    let receipt = sqlx::query_as::<_, Receipt>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
    Ok(receipt)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::db;
    use celumax_core::CoreError;
    use chrono::Duration;

    fn details(client: &str) -> ReceiptDetails {
        ReceiptDetails {
            client_name: client.to_string(),
            client_phone: "3205550000".to_string(),
            client_id: "91109".to_string(),
            device_reference: "Samsung A32".to_string(),
            procedure: "Cambio de pantalla".to_string(),
            device_password: Some(" ".to_string()),
            price_cents: 25_000_000,
            deposit_cents: 10_000_000,
            estimated_delivery_at: None,
        }
    }

    #[tokio::test]
    async fn test_insert_defaults() {
        let db = db().await;
        let r = db.receipts().insert(&details("Ana")).await.unwrap();

        assert_eq!(r.state, ReceiptState::SinArreglar);
        assert_eq!(r.device_password, None);
        assert_eq!(r.estimated_delivery_at, default_delivery(r.registered_at));
        assert_eq!(db.receipts().get(&r.id).await.unwrap(), Some(r));
    }

    #[tokio::test]
    async fn test_insert_rejects_deposit_above_price() {
        let db = db().await;
        let mut d = details("Ana");
        d.deposit_cents = d.price_cents + 1;
        assert!(db.receipts().insert(&d).await.is_err());
    }

    #[tokio::test]
    async fn test_lifecycle_only_moves_forward() {
        let db = db().await;
        let repo = db.receipts();
        let r = repo.insert(&details("Luis")).await.unwrap();

        let err = repo.advance(&r.id, ReceiptState::Entregado).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::InvalidStateTransition { .. })
        ));

        let repaired = repo.advance(&r.id, ReceiptState::Arreglado).await.unwrap();
        assert!(repaired.repaired_at.is_some());
        assert!(repaired.delivered_at.is_none());

        assert!(repo.advance(&r.id, ReceiptState::SinArreglar).await.is_err());
        assert!(repo.advance(&r.id, ReceiptState::Arreglado).await.is_err());

        let delivered = repo.advance(&r.id, ReceiptState::Entregado).await.unwrap();
        assert_eq!(delivered.repaired_at, repaired.repaired_at);
        assert!(delivered.delivered_at.is_some());

        let stored = repo.get(&r.id).await.unwrap().unwrap();
        assert_eq!(stored, delivered);

        for target in [
            ReceiptState::SinArreglar,
            ReceiptState::Arreglado,
            ReceiptState::Entregado,
        ] {
            assert!(repo.advance(&r.id, target).await.is_err());
        }
    }

    #[tokio::test]
    async fn test_update_details_leaves_state_and_dates() {
        let db = db().await;
        let repo = db.receipts();
        let r = repo.insert(&details("Pedro")).await.unwrap();
        let repaired = repo.advance(&r.id, ReceiptState::Arreglado).await.unwrap();

        let mut edit = details("Pedro Pérez");
        edit.procedure = "Cambio de pantalla y batería".to_string();
        edit.device_password = Some("0000".to_string());
        let updated = repo.update_details(&r.id, &edit).await.unwrap();

        assert_eq!(updated.client_name, "Pedro Pérez");
        assert_eq!(updated.device_password.as_deref(), Some("0000"));
        assert_eq!(updated.state, ReceiptState::Arreglado);
        assert_eq!(updated.repaired_at, repaired.repaired_at);
        assert_eq!(updated.registered_at, r.registered_at);
        assert_eq!(updated.estimated_delivery_at, r.estimated_delivery_at);
        assert_eq!(repo.get(&r.id).await.unwrap(), Some(updated));

        assert!(matches!(
            repo.update_details("missing", &edit).await.unwrap_err(),
            DbError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn test_list_filters_and_counts() {
        let db = db().await;
        let repo = db.receipts();

        let mut later = details("Camila Ortiz");
        later.estimated_delivery_at = Some(Utc::now() + Duration::days(5));
        let later = repo.insert(&later).await.unwrap();
        let sooner = repo.insert(&details("Andrés Ortiz")).await.unwrap();
        let other = repo.insert(&details("Sofía")).await.unwrap();

        repo.advance(&sooner.id, ReceiptState::Arreglado).await.unwrap();
        repo.advance(&sooner.id, ReceiptState::Entregado).await.unwrap();
        repo.advance(&other.id, ReceiptState::Arreglado).await.unwrap();

        let ortiz = repo
            .list(&ReceiptFilter {
                client_query: "ortiz".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let ids: Vec<_> = ortiz.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec![sooner.id.as_str(), later.id.as_str()]);

        let hour = Duration::hours(1);
        let delivered = repo
            .list(&ReceiptFilter {
                delivered_from: Some(Utc::now() - hour),
                delivered_to: Some(Utc::now() + hour),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(delivered.len(), 1);
        assert_eq!(delivered[0].id, sooner.id);

        // A half-open range is ignored
        let half_open = repo
            .list(&ReceiptFilter {
                delivered_from: Some(Utc::now() + hour),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(half_open.len(), 3);

        let pending = repo
            .list(&ReceiptFilter {
                state: Some(ReceiptState::SinArreglar),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, later.id);

        assert_eq!(repo.count_by_state(ReceiptState::SinArreglar).await.unwrap(), 1);
        assert_eq!(repo.count_by_state(ReceiptState::Arreglado).await.unwrap(), 1);
        assert_eq!(repo.count_by_state(ReceiptState::Entregado).await.unwrap(), 1);

        let since = Utc::now() - hour;
        // The delivered ticket was repaired too, but only counts as delivered
        assert_eq!(repo.repaired_since(since).await.unwrap(), 1);
        assert_eq!(repo.delivered_since(since).await.unwrap(), 1);
        assert_eq!(repo.repaired_since(Utc::now() + hour).await.unwrap(), 0);
        assert_eq!(repo.delivered_since(Utc::now() + hour).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let db = db().await;
        let r = db.receipts().insert(&details("Ana")).await.unwrap();
        db.receipts().delete(&r.id).await.unwrap();
        assert!(db.receipts().get(&r.id).await.unwrap().is_none());
        assert!(db.receipts().delete(&r.id).await.is_err());
    }
}
