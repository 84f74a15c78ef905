use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_orders_table::Migration),
            Box::new(m20250101_000002_create_order_items_table::Migration),
            Box::new(m20250101_000003_create_order_addresses_table::Migration),
            Box::new(m20250101_000004_create_credit_notes_table::Migration),
            Box::new(m20250101_000005_create_credit_note_items_table::Migration),
        ]
    }
}

// Migration implementations

mod m20250101_000001_create_orders_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_orders_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create orders table aligned with entities::order Model
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Orders::CustomerId).big_integer().null())
                        .col(ColumnDef::new(Orders::CustomerSnapshot).json().null())
                        .col(
                            ColumnDef::new(Orders::TotalAmountHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Orders::TotalAmountTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Orders::PaymentMethod).string().not_null())
                        .col(ColumnDef::new(Orders::Notes).string().null())
                        .col(
                            ColumnDef::new(Orders::Delivered)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Orders::PaymentReference).string().null())
                        .col(ColumnDef::new(Orders::CreatedAt).timestamp().not_null())
                        .col(ColumnDef::new(Orders::UpdatedAt).timestamp().null())
                        .to_owned(),
                )
                .await?;

            // Storage-level idempotency guarantee for duplicate payment webhooks
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_payment_reference")
                        .table(Orders::Table)
                        .col(Orders::PaymentReference)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_customer_id")
                        .table(Orders::Table)
                        .col(Orders::CustomerId)
                        .to_owned(),
                )
                .await?;

            // Year-window listing and export scan
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Orders {
        Table,
        Id,
        CustomerId,
        CustomerSnapshot,
        TotalAmountHt,
        TotalAmountTtc,
        PaymentMethod,
        Notes,
        Delivered,
        PaymentReference,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_order_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_order_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Create order_items table aligned with entities::order_item Model
            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).big_integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::ProductName).string().not_null())
                        .col(ColumnDef::new(OrderItems::Description).string().null())
                        .col(ColumnDef::new(OrderItems::ImageUrl).string().null())
                        .col(ColumnDef::new(OrderItems::Quantity).integer().not_null())
                        .col(
                            ColumnDef::new(OrderItems::UnitPriceHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::UnitPriceTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::VatRate)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::TotalPriceHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::TotalPriceTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(OrderItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderItems::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_order_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductName,
        Description,
        ImageUrl,
        Quantity,
        UnitPriceHt,
        UnitPriceTtc,
        VatRate,
        TotalPriceHt,
        TotalPriceTtc,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_order_addresses_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_order_addresses_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(OrderAddresses::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderAddresses::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(OrderAddresses::OrderId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderAddresses::AddressType)
                                .string_len(20)
                                .not_null(),
                        )
                        .col(ColumnDef::new(OrderAddresses::Snapshot).json().not_null())
                        .col(
                            ColumnDef::new(OrderAddresses::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_addresses_order_id")
                                .from(OrderAddresses::Table, OrderAddresses::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_addresses_order_id")
                        .table(OrderAddresses::Table)
                        .col(OrderAddresses::OrderId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderAddresses::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum OrderAddresses {
        Table,
        Id,
        OrderId,
        AddressType,
        Snapshot,
        CreatedAt,
    }
}

mod m20250101_000004_create_credit_notes_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000001_create_orders_table::Orders;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_credit_notes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CreditNotes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CreditNotes::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CreditNotes::OrderId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CreditNotes::CustomerId)
                                .big_integer()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CreditNotes::TotalAmountHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CreditNotes::TotalAmountTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(CreditNotes::Reason).string().not_null())
                        .col(ColumnDef::new(CreditNotes::Description).string().null())
                        .col(
                            ColumnDef::new(CreditNotes::IssueDate)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CreditNotes::PaymentMethod)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CreditNotes::Notes).string().null())
                        .col(
                            ColumnDef::new(CreditNotes::Status)
                                .string_len(20)
                                .not_null()
                                .default("pending"),
                        )
                        .col(
                            ColumnDef::new(CreditNotes::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CreditNotes::UpdatedAt).timestamp().null())
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_credit_notes_order_id")
                                .from(CreditNotes::Table, CreditNotes::OrderId)
                                .to(Orders::Table, Orders::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_credit_notes_order_id")
                        .table(CreditNotes::Table)
                        .col(CreditNotes::OrderId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_credit_notes_created_at")
                        .table(CreditNotes::Table)
                        .col(CreditNotes::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CreditNotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum CreditNotes {
        Table,
        Id,
        OrderId,
        CustomerId,
        TotalAmountHt,
        TotalAmountTtc,
        Reason,
        Description,
        IssueDate,
        PaymentMethod,
        Notes,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000005_create_credit_note_items_table {

    use sea_orm_migration::prelude::*;

    use super::m20250101_000004_create_credit_notes_table::CreditNotes;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_credit_note_items_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CreditNoteItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CreditNoteItems::Id)
                                .big_integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::CreditNoteId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::ProductId)
                                .big_integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::ProductName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CreditNoteItems::Description).string().null())
                        .col(ColumnDef::new(CreditNoteItems::ImageUrl).string().null())
                        .col(
                            ColumnDef::new(CreditNoteItems::Quantity)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::UnitPriceHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::UnitPriceTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::VatRate)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::TotalPriceHt)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::TotalPriceTtc)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::CreatedAt)
                                .timestamp()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CreditNoteItems::UpdatedAt)
                                .timestamp()
                                .null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_credit_note_items_credit_note_id")
                                .from(CreditNoteItems::Table, CreditNoteItems::CreditNoteId)
                                .to(CreditNotes::Table, CreditNotes::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_credit_note_items_credit_note_id")
                        .table(CreditNoteItems::Table)
                        .col(CreditNoteItems::CreditNoteId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CreditNoteItems::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum CreditNoteItems {
        Table,
        Id,
        CreditNoteId,
        ProductId,
        ProductName,
        Description,
        ImageUrl,
        Quantity,
        UnitPriceHt,
        UnitPriceTtc,
        VatRate,
        TotalPriceHt,
        TotalPriceTtc,
        CreatedAt,
        UpdatedAt,
    }
}
