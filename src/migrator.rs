use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_flocks_table::Migration),
            Box::new(m20250101_000002_create_feed_inventory_table::Migration),
            Box::new(m20250101_000003_create_feed_consumption_table::Migration),
            Box::new(m20250101_000004_create_consumption_deductions_table::Migration),
            Box::new(m20250101_000005_create_activity_logs_table::Migration),
        ]
    }
}

mod m20250101_000001_create_flocks_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_flocks_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Flocks::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Flocks::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Flocks::Name).string().not_null())
                        .col(ColumnDef::new(Flocks::Breed).string().null())
                        .col(
                            ColumnDef::new(Flocks::BirdCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Flocks::Status)
                                .string()
                                .not_null()
                                .default("active"),
                        )
                        .col(
                            ColumnDef::new(Flocks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Flocks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Flocks::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum Flocks {
        Table,
        Id,
        Name,
        Breed,
        BirdCount,
        Status,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000002_create_feed_inventory_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_feed_inventory_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FeedInventory::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FeedInventory::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FeedInventory::FeedType).string().not_null())
                        .col(
                            ColumnDef::new(FeedInventory::Quantity)
                                .decimal_len(14, 3)
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(FeedInventory::PurchaseDate).date().not_null())
                        .col(ColumnDef::new(FeedInventory::ExpiryDate).date().not_null())
                        .col(
                            ColumnDef::new(FeedInventory::Status)
                                .string()
                                .not_null()
                                .default("in_stock"),
                        )
                        .col(ColumnDef::new(FeedInventory::Supplier).string().null())
                        .col(
                            ColumnDef::new(FeedInventory::UnitCost)
                                .decimal_len(14, 4)
                                .null(),
                        )
                        .col(
                            ColumnDef::new(FeedInventory::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(FeedInventory::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // Covers the consumption walk: in-stock batches of one type by freshness
            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_feed_inventory_type_status_expiry")
                        .table(FeedInventory::Table)
                        .col(FeedInventory::FeedType)
                        .col(FeedInventory::Status)
                        .col(FeedInventory::ExpiryDate)
                        .col(FeedInventory::PurchaseDate)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FeedInventory::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum FeedInventory {
        Table,
        Id,
        FeedType,
        Quantity,
        PurchaseDate,
        ExpiryDate,
        Status,
        Supplier,
        UnitCost,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20250101_000003_create_feed_consumption_table {

    use super::m20250101_000001_create_flocks_table::Flocks;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_feed_consumption_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(FeedConsumption::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(FeedConsumption::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(FeedConsumption::FlockId).integer().not_null())
                        .col(ColumnDef::new(FeedConsumption::FeedType).string().not_null())
                        .col(
                            ColumnDef::new(FeedConsumption::Quantity)
                                .decimal_len(14, 3)
                                .not_null(),
                        )
                        .col(ColumnDef::new(FeedConsumption::FeedingDate).date().not_null())
                        .col(ColumnDef::new(FeedConsumption::Notes).text().null())
                        .col(ColumnDef::new(FeedConsumption::RecordedBy).uuid().not_null())
                        .col(
                            ColumnDef::new(FeedConsumption::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_feed_consumption_flock")
                                .from(FeedConsumption::Table, FeedConsumption::FlockId)
                                .to(Flocks::Table, Flocks::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_feed_consumption_flock_id")
                        .table(FeedConsumption::Table)
                        .col(FeedConsumption::FlockId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_feed_consumption_feed_type")
                        .table(FeedConsumption::Table)
                        .col(FeedConsumption::FeedType)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(FeedConsumption::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(super) enum FeedConsumption {
        Table,
        Id,
        FlockId,
        FeedType,
        Quantity,
        FeedingDate,
        Notes,
        RecordedBy,
        CreatedAt,
    }
}

mod m20250101_000004_create_consumption_deductions_table {

    use super::m20250101_000002_create_feed_inventory_table::FeedInventory;
    use super::m20250101_000003_create_feed_consumption_table::FeedConsumption;
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_consumption_deductions_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ConsumptionDeductions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ConsumptionDeductions::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(ConsumptionDeductions::ConsumptionId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ConsumptionDeductions::BatchId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ConsumptionDeductions::Quantity)
                                .decimal_len(14, 3)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(ConsumptionDeductions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_consumption_deductions_consumption")
                                .from(
                                    ConsumptionDeductions::Table,
                                    ConsumptionDeductions::ConsumptionId,
                                )
                                .to(FeedConsumption::Table, FeedConsumption::Id),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_consumption_deductions_batch")
                                .from(ConsumptionDeductions::Table, ConsumptionDeductions::BatchId)
                                .to(FeedInventory::Table, FeedInventory::Id),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_consumption_deductions_consumption_id")
                        .table(ConsumptionDeductions::Table)
                        .col(ConsumptionDeductions::ConsumptionId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_consumption_deductions_batch_id")
                        .table(ConsumptionDeductions::Table)
                        .col(ConsumptionDeductions::BatchId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ConsumptionDeductions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ConsumptionDeductions {
        Table,
        Id,
        ConsumptionId,
        BatchId,
        Quantity,
        CreatedAt,
    }
}

mod m20250101_000005_create_activity_logs_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_activity_logs_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(ActivityLogs::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(ActivityLogs::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(ActivityLogs::UserId).uuid().not_null())
                        .col(ColumnDef::new(ActivityLogs::Action).string().not_null())
                        .col(ColumnDef::new(ActivityLogs::Description).text().not_null())
                        .col(
                            ColumnDef::new(ActivityLogs::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_activity_logs_user_id")
                        .table(ActivityLogs::Table)
                        .col(ActivityLogs::UserId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum ActivityLogs {
        Table,
        Id,
        UserId,
        Action,
        Description,
        CreatedAt,
    }
}
