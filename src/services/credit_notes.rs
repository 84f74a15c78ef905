use crate::{
    db::DbPool,
    entities::credit_note::{self, CreditNoteStatus, Entity as CreditNoteEntity},
    entities::credit_note_item::{self, Entity as CreditNoteItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
    services::LineItemInput,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    EntityTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Credit note header data as submitted by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCreditNote {
    pub order_id: i64,
    pub customer_id: Option<i64>,
    pub total_amount_ht: Decimal,
    pub total_amount_ttc: Decimal,
    pub reason: String,
    pub description: Option<String>,
    /// Defaults to the creation instant when absent.
    pub issue_date: Option<DateTime<Utc>>,
    pub payment_method: String,
    pub notes: Option<String>,
}

/// Service for the credit note aggregate. Creation with items follows the
/// same atomic header-then-children pipeline as orders, minus the
/// idempotency key.
#[derive(Clone)]
pub struct CreditNoteService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

impl CreditNoteService {
    /// Creates a new credit note service instance
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    /// Validates a credit note header before any write.
    pub fn validate_header(header: &NewCreditNote) -> Result<(), ServiceError> {
        if header.order_id <= 0 {
            return Err(ServiceError::ValidationError(
                "order reference required".to_string(),
            ));
        }
        if header.reason.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "reason required".to_string(),
            ));
        }
        if header.total_amount_ht < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "total HT must be non-negative".to_string(),
            ));
        }
        if header.total_amount_ttc < header.total_amount_ht {
            return Err(ServiceError::ValidationError(
                "total TTC must be at least total HT".to_string(),
            ));
        }
        if header.payment_method.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "payment method required".to_string(),
            ));
        }
        Ok(())
    }

    /// Creates a credit note, atomically with its line items when any are
    /// given. Without items this is a single-row insert carrying the
    /// caller-supplied totals; with items, any failure rolls the whole unit
    /// of work back and surfaces as `CreditNoteCreationFailed`.
    #[instrument(skip(self, header, items), fields(order_id = %header.order_id, lines = items.len()))]
    pub async fn create_credit_note(
        &self,
        header: NewCreditNote,
        items: Vec<LineItemInput>,
    ) -> Result<credit_note::Model, ServiceError> {
        Self::validate_header(&header)?;

        let model = if items.is_empty() {
            self.insert_header(&header, &*self.db_pool).await?
        } else {
            let txn = self.db_pool.begin().await.map_err(|e| {
                error!(error = %e, "Failed to start transaction for credit note creation");
                ServiceError::CreditNoteCreationFailed(format!("begin unit of work: {}", e))
            })?;

            let written = self.write_credit_note(&txn, &header, &items).await;

            let model = match written {
                Ok(model) => model,
                Err(e) => {
                    if let Err(rollback_err) = txn.rollback().await {
                        error!(error = %rollback_err, "Rollback failed after aborted credit note creation");
                    }
                    return Err(match e {
                        wrapped @ ServiceError::CreditNoteCreationFailed(_) => wrapped,
                        other => ServiceError::CreditNoteCreationFailed(other.to_string()),
                    });
                }
            };

            txn.commit().await.map_err(|e| {
                error!(error = %e, credit_note_id = %model.id, "Failed to commit credit note creation");
                ServiceError::CreditNoteCreationFailed(format!("commit: {}", e))
            })?;

            model
        };

        info!(credit_note_id = %model.id, order_id = %model.order_id, "Credit note created");

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender.send(Event::CreditNoteCreated(model.id)).await {
                warn!(error = %e, credit_note_id = %model.id, "Failed to send credit note created event");
            }
        }

        Ok(model)
    }

    async fn write_credit_note(
        &self,
        txn: &DatabaseTransaction,
        header: &NewCreditNote,
        items: &[LineItemInput],
    ) -> Result<credit_note::Model, ServiceError> {
        let model = self.insert_header(header, txn).await.map_err(|e| {
            ServiceError::CreditNoteCreationFailed(format!("credit note header: {}", e))
        })?;

        for (index, item) in items.iter().enumerate() {
            self.create_item(model.id, item, txn).await.map_err(|e| {
                ServiceError::CreditNoteCreationFailed(format!("line {}: {}", index + 1, e))
            })?;
        }

        Ok(model)
    }

    async fn insert_header<C: ConnectionTrait>(
        &self,
        header: &NewCreditNote,
        conn: &C,
    ) -> Result<credit_note::Model, ServiceError> {
        let now = Utc::now();

        let active = credit_note::ActiveModel {
            id: NotSet,
            order_id: Set(header.order_id),
            customer_id: Set(header.customer_id),
            total_amount_ht: Set(header.total_amount_ht),
            total_amount_ttc: Set(header.total_amount_ttc),
            reason: Set(header.reason.trim().to_string()),
            description: Set(header.description.clone()),
            issue_date: Set(header.issue_date.unwrap_or(now)),
            payment_method: Set(header.payment_method.trim().to_string()),
            notes: Set(header.notes.clone()),
            status: Set(CreditNoteStatus::Pending),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let model = active.insert(conn).await?;
        Ok(model)
    }

    /// Creates one credit note line item under the supplied unit of work.
    #[instrument(skip(self, item, conn), fields(credit_note_id = %credit_note_id))]
    pub async fn create_item<C: ConnectionTrait>(
        &self,
        credit_note_id: i64,
        item: &LineItemInput,
        conn: &C,
    ) -> Result<credit_note_item::Model, ServiceError> {
        item.validate()?;

        let active = credit_note_item::ActiveModel {
            id: NotSet,
            credit_note_id: Set(credit_note_id),
            product_id: Set(item.product_id),
            product_name: Set(item.product_name.trim().to_string()),
            description: Set(item.description.clone()),
            image_url: Set(item.image_url.clone()),
            quantity: Set(item.quantity),
            unit_price_ht: Set(item.unit_price_ht),
            unit_price_ttc: Set(item.unit_price_ttc),
            vat_rate: Set(item.vat_rate),
            total_price_ht: Set(item.total_price_ht),
            total_price_ttc: Set(item.total_price_ttc),
            created_at: NotSet,
            updated_at: NotSet,
        };

        let model = active.insert(conn).await?;
        Ok(model)
    }

    /// Retrieves a credit note by ID
    #[instrument(skip(self), fields(credit_note_id = %credit_note_id))]
    pub async fn get_credit_note(
        &self,
        credit_note_id: i64,
    ) -> Result<Option<credit_note::Model>, ServiceError> {
        let db = &*self.db_pool;

        let credit_note = CreditNoteEntity::find_by_id(credit_note_id)
            .one(db)
            .await
            .map_err(|e| {
                error!(error = %e, credit_note_id = %credit_note_id, "Failed to fetch credit note");
                ServiceError::DatabaseError(e)
            })?;

        Ok(credit_note)
    }

    /// Items of one credit note, in stable display order.
    #[instrument(skip(self), fields(credit_note_id = %credit_note_id))]
    pub async fn get_items(
        &self,
        credit_note_id: i64,
    ) -> Result<Vec<credit_note_item::Model>, ServiceError> {
        let db = &*self.db_pool;

        let items = CreditNoteItemEntity::find()
            .filter(credit_note_item::Column::CreditNoteId.eq(credit_note_id))
            .order_by_asc(credit_note_item::Column::CreatedAt)
            .order_by_asc(credit_note_item::Column::Id)
            .all(db)
            .await?;

        Ok(items)
    }

    /// Updates the refund status. The only legal transition is
    /// pending → refunded; an unknown status is a `ValidationError` and
    /// refunded is terminal. The stored row is untouched on rejection.
    #[instrument(skip(self), fields(credit_note_id = %credit_note_id, status = %status))]
    pub async fn update_status(
        &self,
        credit_note_id: i64,
        status: &str,
    ) -> Result<credit_note::Model, ServiceError> {
        let new_status = CreditNoteStatus::parse(status).ok_or_else(|| {
            ServiceError::ValidationError(format!("invalid credit note status: {}", status))
        })?;

        let db = &*self.db_pool;

        let credit_note = CreditNoteEntity::find_by_id(credit_note_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                warn!(credit_note_id = %credit_note_id, "Credit note not found for status update");
                ServiceError::NotFound("credit note not found".to_string())
            })?;

        let old_status = credit_note.status;

        if old_status == new_status {
            return Ok(credit_note);
        }
        if old_status == CreditNoteStatus::Refunded {
            return Err(ServiceError::InvalidOperation(
                "credit note already refunded".to_string(),
            ));
        }

        let mut active: credit_note::ActiveModel = credit_note.into();
        active.status = Set(new_status);
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(db).await?;

        info!(
            credit_note_id = %credit_note_id,
            old_status = %old_status.as_str(),
            new_status = %new_status.as_str(),
            "Credit note status updated"
        );

        if let Some(event_sender) = &self.event_sender {
            if let Err(e) = event_sender
                .send(Event::CreditNoteStatusChanged {
                    credit_note_id,
                    old_status: old_status.as_str().to_string(),
                    new_status: new_status.as_str().to_string(),
                })
                .await
            {
                warn!(error = %e, credit_note_id = %credit_note_id, "Failed to send status changed event");
            }
        }

        Ok(updated)
    }

    /// Credit notes created within the UTC year window `[Jan 1, Jan 1 + 1y)`.
    #[instrument(skip(self))]
    pub async fn list_by_year(&self, year: i32) -> Result<Vec<credit_note::Model>, ServiceError> {
        let (start, end) = crate::services::year_window(year)?;
        self.list_created_between(None, Some(start), Some(end))
            .await
    }

    /// Credit notes matching an optional customer and creation window.
    /// `start` is inclusive, `end` exclusive.
    #[instrument(skip(self))]
    pub async fn list_created_between(
        &self,
        customer_id: Option<i64>,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<Vec<credit_note::Model>, ServiceError> {
        let db = &*self.db_pool;

        let mut query = CreditNoteEntity::find();
        if let Some(customer_id) = customer_id {
            query = query.filter(credit_note::Column::CustomerId.eq(customer_id));
        }
        if let Some(start) = start {
            query = query.filter(credit_note::Column::CreatedAt.gte(start));
        }
        if let Some(end) = end {
            query = query.filter(credit_note::Column::CreatedAt.lt(end));
        }

        let credit_notes = query
            .order_by_asc(credit_note::Column::CreatedAt)
            .order_by_asc(credit_note::Column::Id)
            .all(db)
            .await?;

        Ok(credit_notes)
    }

    /// Administrative single-item deletion. Does not resync the parent's
    /// stored totals; reconciled reads absorb the drift.
    #[instrument(skip(self), fields(item_id = %item_id))]
    pub async fn delete_item(&self, item_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let result = CreditNoteItemEntity::delete_by_id(item_id).exec(db).await?;
        Ok(result.rows_affected > 0)
    }

    /// Administrative deletion; removes the credit note together with its
    /// items in one transaction. Returns false when it does not exist.
    #[instrument(skip(self), fields(credit_note_id = %credit_note_id))]
    pub async fn delete_credit_note(&self, credit_note_id: i64) -> Result<bool, ServiceError> {
        let db = &*self.db_pool;

        let Some(credit_note) = CreditNoteEntity::find_by_id(credit_note_id).one(db).await? else {
            return Ok(false);
        };

        let txn = db.begin().await?;

        CreditNoteItemEntity::delete_many()
            .filter(credit_note_item::Column::CreditNoteId.eq(credit_note_id))
            .exec(&txn)
            .await?;
        CreditNoteEntity::delete_by_id(credit_note.id).exec(&txn).await?;

        txn.commit().await?;

        info!(credit_note_id = %credit_note_id, "Credit note deleted");

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    fn header() -> NewCreditNote {
        NewCreditNote {
            order_id: 1,
            customer_id: Some(7),
            total_amount_ht: dec!(15),
            total_amount_ttc: dec!(18),
            reason: "damaged item".to_string(),
            description: None,
            issue_date: None,
            payment_method: "card".to_string(),
            notes: None,
        }
    }

    #[test]
    fn valid_header_passes() {
        assert!(CreditNoteService::validate_header(&header()).is_ok());
    }

    #[test]
    fn missing_order_reference_is_rejected() {
        let mut bad = header();
        bad.order_id = 0;
        assert!(CreditNoteService::validate_header(&bad).is_err());
    }

    #[test]
    fn blank_reason_is_rejected() {
        let mut bad = header();
        bad.reason = " ".to_string();
        let err = CreditNoteService::validate_header(&bad).unwrap_err();
        assert_matches!(err, ServiceError::ValidationError(msg) if msg == "reason required");
    }

    #[test]
    fn ttc_below_ht_is_rejected() {
        let mut bad = header();
        bad.total_amount_ttc = dec!(14);
        assert!(CreditNoteService::validate_header(&bad).is_err());
    }

    #[test]
    fn unknown_status_fails_to_parse() {
        assert_eq!(CreditNoteStatus::parse("shipped"), None);
        assert_eq!(
            CreditNoteStatus::parse("refunded"),
            Some(CreditNoteStatus::Refunded)
        );
        assert_eq!(
            CreditNoteStatus::parse(" Pending "),
            Some(CreditNoteStatus::Pending)
        );
    }
}
