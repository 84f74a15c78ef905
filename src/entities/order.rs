use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Order header. Totals are a best-effort cache of the item sums; the
/// reconciliation service is the authoritative read path for money.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,

    #[sea_orm(nullable)]
    pub customer_id: Option<i64>,

    /// Immutable copy of the customer data at order time. Opaque to the
    /// service; guests carry only this.
    #[sea_orm(column_type = "Json", nullable)]
    pub customer_snapshot: Option<Json>,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount_ht: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total_amount_ttc: Decimal,

    pub payment_method: String,
    pub notes: Option<String>,
    pub delivered: bool,

    /// Payment-gateway reference; unique when present, the idempotency key
    /// for duplicate webhook deliveries.
    #[sea_orm(nullable)]
    pub payment_reference: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
    #[sea_orm(has_many = "super::order_address::Entity")]
    OrderAddresses,
    #[sea_orm(has_many = "super::credit_note::Entity")]
    CreditNotes,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl Related<super::order_address::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderAddresses.def()
    }
}

impl Related<super::credit_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CreditNotes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
