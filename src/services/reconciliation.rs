use crate::{
    db::DbPool,
    entities::{credit_note, credit_note_item, order, order_address, order_item},
    errors::ServiceError,
    money::{round2, sum_line_totals, LineTotals},
    services::{credit_notes::CreditNoteService, orders::OrderService, year_window},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, instrument};

/// Exports are only defined from the platform's first fiscal year onwards.
const EXPORT_MIN_YEAR: i32 = 2025;

/// An order with its authoritative totals recomputed from the line items.
/// This is the single source of truth callers must use for displaying or
/// exporting money; the header columns are a cache that can drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledOrder {
    pub order: order::Model,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
}

/// Credit-note counterpart of [`ReconciledOrder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciledCreditNote {
    pub credit_note: credit_note::Model,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
}

/// Filter shared by the statistics queries.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatisticsFilter {
    pub customer_id: Option<i64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub year: Option<i32>,
}

impl StatisticsFilter {
    /// Resolves the creation window. An explicit year takes precedence over
    /// the free-form date bounds; `start` is inclusive, `end` exclusive.
    fn resolve_window(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ServiceError> {
        if let Some(year) = self.year {
            let (start, end) = year_window(year)?;
            return Ok((Some(start), Some(end)));
        }
        Ok((self.start_date, self.end_date))
    }
}

/// Net revenue for a filtered period: orders minus credit notes,
/// floor-clamped at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statistics {
    pub total_amount_ht: Decimal,
    pub total_amount_ttc: Decimal,
}

/// Denormalized order record for the year export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderExportRecord {
    pub order: order::Model,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
    pub items: Vec<order_item::Model>,
    pub addresses: Vec<order_address::Model>,
}

/// Denormalized credit note record for the year export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreditNoteExportRecord {
    pub credit_note: credit_note::Model,
    pub total_ht: Decimal,
    pub total_ttc: Decimal,
    pub items: Vec<credit_note_item::Model>,
}

/// Year-end export payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YearExportData {
    pub orders: Vec<OrderExportRecord>,
    pub credit_notes: Vec<CreditNoteExportRecord>,
}

/// Recombines headers with freshly recomputed totals for display, statistics
/// and the year export.
#[derive(Clone)]
pub struct ReconciliationService {
    db_pool: Arc<DbPool>,
    orders: Arc<OrderService>,
    credit_notes: Arc<CreditNoteService>,
}

impl ReconciliationService {
    pub fn new(
        db_pool: Arc<DbPool>,
        orders: Arc<OrderService>,
        credit_notes: Arc<CreditNoteService>,
    ) -> Self {
        Self {
            db_pool,
            orders,
            credit_notes,
        }
    }

    /// Order with authoritative totals: the item sum when items exist, the
    /// stored header totals otherwise.
    #[instrument(skip(self), fields(order_id = %order_id))]
    pub async fn get_reconciled_order(
        &self,
        order_id: i64,
    ) -> Result<ReconciledOrder, ServiceError> {
        let db = &*self.db_pool;

        let order = order::Entity::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound("order not found".to_string()))?;

        let items = order_item::Entity::find()
            .filter(order_item::Column::OrderId.eq(order_id))
            .order_by_asc(order_item::Column::CreatedAt)
            .order_by_asc(order_item::Column::Id)
            .all(db)
            .await?;

        let totals = sum_line_totals(
            items.iter(),
            Some(LineTotals::new(
                order.total_amount_ht,
                order.total_amount_ttc,
            )),
        );

        let order = if items.is_empty() {
            order
        } else {
            self.refresh_order_cache(order, &totals).await
        };

        Ok(ReconciledOrder {
            order,
            total_ht: totals.total_ht,
            total_ttc: totals.total_ttc,
        })
    }

    /// Credit note with authoritative totals, mirroring
    /// [`Self::get_reconciled_order`].
    #[instrument(skip(self), fields(credit_note_id = %credit_note_id))]
    pub async fn get_reconciled_credit_note(
        &self,
        credit_note_id: i64,
    ) -> Result<ReconciledCreditNote, ServiceError> {
        let credit_note = self
            .credit_notes
            .get_credit_note(credit_note_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("credit note not found".to_string()))?;

        let items = self.credit_notes.get_items(credit_note_id).await?;

        let totals = sum_line_totals(
            items.iter(),
            Some(LineTotals::new(
                credit_note.total_amount_ht,
                credit_note.total_amount_ttc,
            )),
        );

        let credit_note = if items.is_empty() {
            credit_note
        } else {
            self.refresh_credit_note_cache(credit_note, &totals).await
        };

        Ok(ReconciledCreditNote {
            credit_note,
            total_ht: totals.total_ht,
            total_ttc: totals.total_ttc,
        })
    }

    /// Net revenue for the filtered period: reconciled order totals minus
    /// reconciled credit-note totals, never negative.
    #[instrument(skip(self))]
    pub async fn get_order_statistics(
        &self,
        filter: &StatisticsFilter,
    ) -> Result<Statistics, ServiceError> {
        let (start, end) = filter.resolve_window()?;

        let orders = self
            .orders
            .list_created_between(filter.customer_id, start, end)
            .await?;
        let order_totals = self.reconciled_order_totals(&orders).await?;

        let credit_notes = self
            .credit_notes
            .list_created_between(filter.customer_id, start, end)
            .await?;
        let credit_note_totals = self.reconciled_credit_note_totals(&credit_notes).await?;

        let mut orders_ht = Decimal::ZERO;
        let mut orders_ttc = Decimal::ZERO;
        for totals in order_totals.values() {
            orders_ht += totals.total_ht;
            orders_ttc += totals.total_ttc;
        }

        let mut credits_ht = Decimal::ZERO;
        let mut credits_ttc = Decimal::ZERO;
        for totals in credit_note_totals.values() {
            credits_ht += totals.total_ht;
            credits_ttc += totals.total_ttc;
        }

        Ok(Statistics {
            total_amount_ht: round2((orders_ht - credits_ht).max(Decimal::ZERO)),
            total_amount_ttc: round2((orders_ttc - credits_ttc).max(Decimal::ZERO)),
        })
    }

    /// Year-end export: denormalized, reconciled records for every order and
    /// credit note created in `year`. Each collection is deep-copied through
    /// a serialization round trip so no driver-internal values can leak to
    /// the caller; losing a record in that round trip is a fatal integrity
    /// error.
    #[instrument(skip(self))]
    pub async fn get_year_export_data(&self, year: i32) -> Result<YearExportData, ServiceError> {
        if year < EXPORT_MIN_YEAR {
            return Err(ServiceError::ValidationError(format!(
                "export year must be {} or later",
                EXPORT_MIN_YEAR
            )));
        }

        let db = &*self.db_pool;
        let (start, end) = year_window(year)?;

        let orders = self.orders.list_created_between(None, Some(start), Some(end)).await?;
        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let order_totals = self.reconciled_order_totals(&orders).await?;

        let mut addresses_by_order: HashMap<i64, Vec<order_address::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            let addresses = order_address::Entity::find()
                .filter(order_address::Column::OrderId.is_in(order_ids.clone()))
                .order_by_asc(order_address::Column::Id)
                .all(db)
                .await?;
            for address in addresses {
                addresses_by_order
                    .entry(address.order_id)
                    .or_default()
                    .push(address);
            }
        }

        let mut items_by_order: HashMap<i64, Vec<order_item::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .order_by_asc(order_item::Column::CreatedAt)
                .order_by_asc(order_item::Column::Id)
                .all(db)
                .await?;
            for item in items {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        let order_records: Vec<OrderExportRecord> = orders
            .into_iter()
            .map(|order| {
                let totals = order_totals.get(&order.id).copied().unwrap_or_default();
                let items = items_by_order.remove(&order.id).unwrap_or_default();
                let addresses = addresses_by_order.remove(&order.id).unwrap_or_default();
                OrderExportRecord {
                    order,
                    total_ht: totals.total_ht,
                    total_ttc: totals.total_ttc,
                    items,
                    addresses,
                }
            })
            .collect();

        let credit_notes = self
            .credit_notes
            .list_created_between(None, Some(start), Some(end))
            .await?;
        let credit_note_ids: Vec<i64> = credit_notes.iter().map(|c| c.id).collect();
        let credit_note_totals = self.reconciled_credit_note_totals(&credit_notes).await?;

        let mut items_by_credit_note: HashMap<i64, Vec<credit_note_item::Model>> = HashMap::new();
        if !credit_note_ids.is_empty() {
            let items = credit_note_item::Entity::find()
                .filter(credit_note_item::Column::CreditNoteId.is_in(credit_note_ids))
                .order_by_asc(credit_note_item::Column::CreatedAt)
                .order_by_asc(credit_note_item::Column::Id)
                .all(db)
                .await?;
            for item in items {
                items_by_credit_note
                    .entry(item.credit_note_id)
                    .or_default()
                    .push(item);
            }
        }

        let credit_note_records: Vec<CreditNoteExportRecord> = credit_notes
            .into_iter()
            .map(|credit_note| {
                let totals = credit_note_totals
                    .get(&credit_note.id)
                    .copied()
                    .unwrap_or_default();
                let items = items_by_credit_note
                    .remove(&credit_note.id)
                    .unwrap_or_default();
                CreditNoteExportRecord {
                    credit_note,
                    total_ht: totals.total_ht,
                    total_ttc: totals.total_ttc,
                    items,
                }
            })
            .collect();

        Ok(YearExportData {
            orders: deep_copy(order_records, "orders")?,
            credit_notes: deep_copy(credit_note_records, "credit notes")?,
        })
    }

    /// Reconciled totals for a batch of orders, one item query for the lot.
    async fn reconciled_order_totals(
        &self,
        orders: &[order::Model],
    ) -> Result<HashMap<i64, LineTotals>, ServiceError> {
        let db = &*self.db_pool;

        let order_ids: Vec<i64> = orders.iter().map(|o| o.id).collect();
        let mut items_by_order: HashMap<i64, Vec<order_item::Model>> = HashMap::new();
        if !order_ids.is_empty() {
            let items = order_item::Entity::find()
                .filter(order_item::Column::OrderId.is_in(order_ids))
                .all(db)
                .await?;
            for item in items {
                items_by_order.entry(item.order_id).or_default().push(item);
            }
        }

        let empty: Vec<order_item::Model> = Vec::new();
        let totals = orders
            .iter()
            .map(|order| {
                let items = items_by_order.get(&order.id).unwrap_or(&empty);
                let totals = sum_line_totals(
                    items.iter(),
                    Some(LineTotals::new(
                        order.total_amount_ht,
                        order.total_amount_ttc,
                    )),
                );
                (order.id, totals)
            })
            .collect();

        Ok(totals)
    }

    /// Credit-note counterpart of [`Self::reconciled_order_totals`].
    async fn reconciled_credit_note_totals(
        &self,
        credit_notes: &[credit_note::Model],
    ) -> Result<HashMap<i64, LineTotals>, ServiceError> {
        let db = &*self.db_pool;

        let credit_note_ids: Vec<i64> = credit_notes.iter().map(|c| c.id).collect();
        let mut items_by_credit_note: HashMap<i64, Vec<credit_note_item::Model>> = HashMap::new();
        if !credit_note_ids.is_empty() {
            let items = credit_note_item::Entity::find()
                .filter(credit_note_item::Column::CreditNoteId.is_in(credit_note_ids))
                .all(db)
                .await?;
            for item in items {
                items_by_credit_note
                    .entry(item.credit_note_id)
                    .or_default()
                    .push(item);
            }
        }

        let empty: Vec<credit_note_item::Model> = Vec::new();
        let totals = credit_notes
            .iter()
            .map(|credit_note| {
                let items = items_by_credit_note.get(&credit_note.id).unwrap_or(&empty);
                let totals = sum_line_totals(
                    items.iter(),
                    Some(LineTotals::new(
                        credit_note.total_amount_ht,
                        credit_note.total_amount_ttc,
                    )),
                );
                (credit_note.id, totals)
            })
            .collect();

        Ok(totals)
    }

    /// Best-effort refresh of the cached header totals when drift is
    /// detected. A failed refresh is logged and swallowed; the reconciled
    /// totals returned to the caller are unaffected either way.
    async fn refresh_order_cache(
        &self,
        order: order::Model,
        totals: &LineTotals,
    ) -> order::Model {
        if round2(order.total_amount_ht) == totals.total_ht
            && round2(order.total_amount_ttc) == totals.total_ttc
        {
            return order;
        }

        debug!(order_id = %order.id, "Refreshing drifted order totals cache");

        let mut active: order::ActiveModel = order.clone().into();
        active.total_amount_ht = Set(totals.total_ht);
        active.total_amount_ttc = Set(totals.total_ttc);
        active.updated_at = Set(Some(Utc::now()));

        match active.update(&*self.db_pool).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(error = %e, order_id = %order.id, "Failed to refresh order totals cache");
                order
            }
        }
    }

    async fn refresh_credit_note_cache(
        &self,
        credit_note: credit_note::Model,
        totals: &LineTotals,
    ) -> credit_note::Model {
        if round2(credit_note.total_amount_ht) == totals.total_ht
            && round2(credit_note.total_amount_ttc) == totals.total_ttc
        {
            return credit_note;
        }

        debug!(credit_note_id = %credit_note.id, "Refreshing drifted credit note totals cache");

        let mut active: credit_note::ActiveModel = credit_note.clone().into();
        active.total_amount_ht = Set(totals.total_ht);
        active.total_amount_ttc = Set(totals.total_ttc);
        active.updated_at = Set(Some(Utc::now()));

        match active.update(&*self.db_pool).await {
            Ok(updated) => updated,
            Err(e) => {
                error!(error = %e, credit_note_id = %credit_note.id, "Failed to refresh credit note totals cache");
                credit_note
            }
        }
    }
}

/// Deep-copies export records through a serialize/deserialize round trip so
/// only plain data reaches the caller. A changed record count is fatal.
fn deep_copy<T>(records: Vec<T>, what: &str) -> Result<Vec<T>, ServiceError>
where
    T: Serialize + DeserializeOwned,
{
    let expected = records.len();

    let value = serde_json::to_value(&records).map_err(|e| {
        error!(error = %e, what = %what, "Export serialization failed");
        ServiceError::IntegrityError(format!("{} export serialization failed: {}", what, e))
    })?;

    let copied: Vec<T> = serde_json::from_value(value).map_err(|e| {
        error!(error = %e, what = %what, "Export deserialization failed");
        ServiceError::IntegrityError(format!("{} export deserialization failed: {}", what, e))
    })?;

    if copied.len() != expected {
        error!(
            what = %what,
            expected = expected,
            actual = copied.len(),
            "Export round trip changed record count"
        );
        return Err(ServiceError::IntegrityError(format!(
            "{} export lost records: expected {}, got {}",
            what,
            expected,
            copied.len()
        )));
    }

    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn filter_year_takes_precedence_over_dates() {
        let filter = StatisticsFilter {
            customer_id: None,
            start_date: Some(Utc::now()),
            end_date: Some(Utc::now()),
            year: Some(2025),
        };

        let (start, end) = filter.resolve_window().unwrap();
        assert_eq!(start.unwrap().to_rfc3339(), "2025-01-01T00:00:00+00:00");
        assert_eq!(end.unwrap().to_rfc3339(), "2026-01-01T00:00:00+00:00");
    }

    #[test]
    fn empty_filter_resolves_to_open_window() {
        let filter = StatisticsFilter::default();
        let (start, end) = filter.resolve_window().unwrap();
        assert!(start.is_none());
        assert!(end.is_none());
    }

    #[test]
    fn deep_copy_preserves_records() {
        let records = vec![dec!(1.10), dec!(2.20)];
        let copied = deep_copy(records.clone(), "test").unwrap();
        assert_eq!(copied, records);
    }
}
