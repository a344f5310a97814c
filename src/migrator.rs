use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_master_data_tables::Migration),
            Box::new(m20240101_000002_create_delivery_notes_table::Migration),
            Box::new(m20240101_000003_create_cash_ledger_tables::Migration),
            Box::new(m20240101_000004_create_users_table::Migration),
        ]
    }
}

mod m20240101_000001_create_master_data_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_master_data_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Drivers::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Drivers::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Drivers::Name).string().not_null())
                        .col(ColumnDef::new(Drivers::CompanyName).string().not_null())
                        .col(ColumnDef::new(Drivers::Username).string().not_null())
                        .col(
                            ColumnDef::new(Drivers::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Drivers::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Drivers::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Trucks::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Trucks::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Trucks::PlateNumber).string().not_null())
                        .col(
                            ColumnDef::new(Trucks::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Trucks::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Trucks::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Materials::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Materials::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Materials::Name).string().not_null())
                        .col(ColumnDef::new(Materials::Unit).string().not_null())
                        .col(
                            ColumnDef::new(Materials::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Materials::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Routes::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Routes::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Routes::Name).string().not_null())
                        .col(
                            ColumnDef::new(Routes::Allowance)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Routes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Routes::UpdatedAt)
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
                        .name("idx_drivers_username")
                        .table(Drivers::Table)
                        .col(Drivers::Username)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_trucks_plate_number")
                        .table(Trucks::Table)
                        .col(Trucks::PlateNumber)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Routes::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Materials::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Trucks::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Drivers::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Drivers {
        Table,
        Id,
        Name,
        CompanyName,
        Username,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Trucks {
        Table,
        Id,
        PlateNumber,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Materials {
        Table,
        Id,
        Name,
        Unit,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Routes {
        Table,
        Id,
        Name,
        Allowance,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_delivery_notes_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_delivery_notes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // Snapshot columns are copied at creation; the *_id columns are
            // lookups only and deliberately carry no foreign keys.
            manager
                .create_table(
                    Table::create()
                        .table(DeliveryNotes::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(DeliveryNotes::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::DocumentNumber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::DocumentDate).date().not_null())
                        .col(ColumnDef::new(DeliveryNotes::TruckId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryNotes::TruckPlate).string().not_null())
                        .col(ColumnDef::new(DeliveryNotes::DriverId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryNotes::DriverName).string().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::DriverCompany)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::RouteId).uuid().not_null())
                        .col(ColumnDef::new(DeliveryNotes::RouteName).string().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::RouteAllowance)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::MaterialId).uuid().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::MaterialName)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::Unit).string().not_null())
                        .col(
                            ColumnDef::new(DeliveryNotes::QuantityLoaded)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::Status).string().not_null())
                        .col(ColumnDef::new(DeliveryNotes::DeliveryDate).date().null())
                        .col(
                            ColumnDef::new(DeliveryNotes::QuantityDelivered)
                                .decimal()
                                .null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::InvoiceNumber).string().null())
                        .col(ColumnDef::new(DeliveryNotes::InvoiceDate).date().null())
                        .col(
                            ColumnDef::new(DeliveryNotes::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(DeliveryNotes::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(ColumnDef::new(DeliveryNotes::CreatedBy).string().not_null())
                        .col(ColumnDef::new(DeliveryNotes::UpdatedBy).string().null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_notes_document_number")
                        .table(DeliveryNotes::Table)
                        .col(DeliveryNotes::DocumentNumber)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_delivery_notes_status")
                        .table(DeliveryNotes::Table)
                        .col(DeliveryNotes::Status)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(DeliveryNotes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum DeliveryNotes {
        Table,
        Id,
        DocumentNumber,
        DocumentDate,
        TruckId,
        TruckPlate,
        DriverId,
        DriverName,
        DriverCompany,
        RouteId,
        RouteName,
        RouteAllowance,
        MaterialId,
        MaterialName,
        Unit,
        QuantityLoaded,
        Status,
        DeliveryDate,
        QuantityDelivered,
        InvoiceNumber,
        InvoiceDate,
        CreatedAt,
        UpdatedAt,
        CreatedBy,
        UpdatedBy,
    }
}

mod m20240101_000003_create_cash_ledger_tables {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_cash_ledger_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CashTransactions::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CashTransactions::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CashTransactions::Date).date().not_null())
                        .col(
                            ColumnDef::new(CashTransactions::TransactionType)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::Category)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::Amount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::Description)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::DeliveryNoteId)
                                .uuid()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::DeliveryNoteNumber)
                                .string()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashTransactions::CreatedBy)
                                .string()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_cash_transactions_date")
                        .table(CashTransactions::Table)
                        .col(CashTransactions::Date)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(CashBalances::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CashBalances::Id)
                                .integer()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CashBalances::Balance)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CashBalances::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CashBalances::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(CashTransactions::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum CashTransactions {
        Table,
        Id,
        Date,
        TransactionType,
        Category,
        Amount,
        Description,
        DeliveryNoteId,
        DeliveryNoteNumber,
        CreatedAt,
        CreatedBy,
    }

    #[derive(DeriveIden)]
    enum CashBalances {
        Table,
        Id,
        Balance,
        UpdatedAt,
    }
}

mod m20240101_000004_create_users_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000004_create_users_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Users::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Users::Id).uuid().primary_key().not_null())
                        .col(
                            ColumnDef::new(Users::Username)
                                .string()
                                .not_null()
                                .unique_key(),
                        )
                        .col(ColumnDef::new(Users::Name).string().not_null())
                        .col(ColumnDef::new(Users::PasswordHash).string().not_null())
                        .col(ColumnDef::new(Users::Role).string().not_null())
                        .col(
                            ColumnDef::new(Users::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Users::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Users::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Users::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Users {
        Table,
        Id,
        Username,
        Name,
        PasswordHash,
        Role,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}
