use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240301_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000002_create_products_table::Migration),
            Box::new(m20240301_000003_create_orders_tables::Migration),
            Box::new(m20240301_000004_create_leads_table::Migration),
        ]
    }
}

// Migration implementations

mod m20240301_000001_create_catalog_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Categories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Categories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Categories::Title).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Categories::Slug)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Categories::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Categories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Categories::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Categories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Categories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Subcategories::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Subcategories::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Subcategories::CategoryId)
                                .integer()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Subcategories::Title)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(ColumnDef::new(Subcategories::Slug).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Subcategories::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Subcategories::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Subcategories::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Subcategories::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Subcategories::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_subcategories_category_id")
                                .from(Subcategories::Table, Subcategories::CategoryId)
                                .to(Categories::Table, Categories::Id)
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
                        .name("uq_subcategories_category_slug")
                        .table(Subcategories::Table)
                        .col(Subcategories::CategoryId)
                        .col(Subcategories::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Sections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Sections::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Sections::SubcategoryId).integer().not_null())
                        .col(ColumnDef::new(Sections::Title).string_len(255).not_null())
                        .col(ColumnDef::new(Sections::Slug).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Sections::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Sections::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Sections::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Sections::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Sections::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_sections_subcategory_id")
                                .from(Sections::Table, Sections::SubcategoryId)
                                .to(Subcategories::Table, Subcategories::Id)
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
                        .name("uq_sections_subcategory_slug")
                        .table(Sections::Table)
                        .col(Sections::SubcategoryId)
                        .col(Sections::Slug)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(Subsections::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Subsections::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Subsections::SectionId).integer().not_null())
                        .col(ColumnDef::new(Subsections::Title).string_len(255).not_null())
                        .col(ColumnDef::new(Subsections::Slug).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Subsections::Description)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Subsections::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Subsections::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Subsections::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Subsections::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_subsections_section_id")
                                .from(Subsections::Table, Subsections::SectionId)
                                .to(Sections::Table, Sections::Id)
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
                        .name("uq_subsections_section_slug")
                        .table(Subsections::Table)
                        .col(Subsections::SectionId)
                        .col(Subsections::Slug)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Subsections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Sections::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Subcategories::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Categories::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Categories {
        Table,
        Id,
        Title,
        Slug,
        Description,
        IsActive,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Subcategories {
        Table,
        Id,
        CategoryId,
        Title,
        Slug,
        Description,
        IsActive,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sections {
        Table,
        Id,
        SubcategoryId,
        Title,
        Slug,
        Description,
        IsActive,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Subsections {
        Table,
        Id,
        SectionId,
        Title,
        Slug,
        Description,
        IsActive,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240301_000002_create_products_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000002_create_products_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Products::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Products::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        // Products survive the removal of their section
                        .col(ColumnDef::new(Products::SectionId).integer().null())
                        .col(ColumnDef::new(Products::Title).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Products::Slug)
                                .string_len(255)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Products::Sku)
                                .string_len(100)
                                .not_null()
                                .unique_key(),
                        )
                        .col(
                            ColumnDef::new(Products::ShortDescription)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Products::FullDescription)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Products::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::PriceSpecial)
                                .decimal_len(12, 2)
                                .null(),
                        )
                        .col(ColumnDef::new(Products::PriceRetail).decimal_len(12, 2).null())
                        .col(
                            ColumnDef::new(Products::Stock)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Products::Image).string_len(255).null())
                        .col(
                            ColumnDef::new(Products::ImageCode)
                                .string_len(500)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Products::Unit)
                                .string_len(50)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Products::WireSection)
                                .string_len(100)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Products::LoadLimit)
                                .string_len(100)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Products::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(
                            ColumnDef::new(Products::SortOrder)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Products::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Products::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_products_section_id")
                                .from(Products::Table, Products::SectionId)
                                .to(Sections::Table, Sections::Id)
                                .on_delete(ForeignKeyAction::SetNull)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_products_section_active")
                        .table(Products::Table)
                        .col(Products::SectionId)
                        .col(Products::IsActive)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Products::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
        SectionId,
        Title,
        Slug,
        Sku,
        ShortDescription,
        FullDescription,
        Price,
        PriceSpecial,
        PriceRetail,
        Stock,
        Image,
        ImageCode,
        Unit,
        WireSection,
        LoadLimit,
        IsActive,
        SortOrder,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum Sections {
        Table,
        Id,
    }
}

mod m20240301_000003_create_orders_tables {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000003_create_orders_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Orders::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Orders::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Orders::CustomerName)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::CustomerEmail)
                                .string_len(254)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Orders::CustomerPhone)
                                .string_len(50)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Orders::Status)
                                .string_len(20)
                                .not_null()
                                .default("new"),
                        )
                        .col(
                            ColumnDef::new(Orders::Comment)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Orders::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Orders::UpdatedAt)
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
                        .name("idx_orders_status")
                        .table(Orders::Table)
                        .col(Orders::Status)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_orders_created_at")
                        .table(Orders::Table)
                        .col(Orders::CreatedAt)
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(OrderItems::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(OrderItems::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                        .col(ColumnDef::new(OrderItems::ProductId).integer().null())
                        .col(
                            ColumnDef::new(OrderItems::ProductTitle)
                                .string_len(255)
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(OrderItems::ProductSku)
                                .string_len(100)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Quantity)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(
                            ColumnDef::new(OrderItems::Price)
                                .decimal_len(12, 2)
                                .not_null()
                                .default(0),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_order_id")
                                .from(OrderItems::Table, OrderItems::OrderId)
                                .to(Orders::Table, Orders::Id)
                                .on_delete(ForeignKeyAction::Cascade)
                                .on_update(ForeignKeyAction::Cascade),
                        )
                        // Ordered products cannot disappear from under their history
                        .foreign_key(
                            ForeignKey::create()
                                .name("fk_order_items_product_id")
                                .from(OrderItems::Table, OrderItems::ProductId)
                                .to(Products::Table, Products::Id)
                                .on_delete(ForeignKeyAction::Restrict)
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
                .await?;

            manager
                .create_index(
                    Index::create()
                        .if_not_exists()
                        .name("idx_order_items_product_id")
                        .table(OrderItems::Table)
                        .col(OrderItems::ProductId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(OrderItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(Orders::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Orders {
        Table,
        Id,
        CustomerName,
        CustomerEmail,
        CustomerPhone,
        Status,
        Comment,
        CreatedAt,
        UpdatedAt,
    }

    #[derive(DeriveIden)]
    enum OrderItems {
        Table,
        Id,
        OrderId,
        ProductId,
        ProductTitle,
        ProductSku,
        Quantity,
        Price,
    }

    #[derive(DeriveIden)]
    enum Products {
        Table,
        Id,
    }
}

mod m20240301_000004_create_leads_table {

    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240301_000004_create_leads_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Leads::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Leads::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(
                            ColumnDef::new(Leads::LeadType)
                                .string_len(20)
                                .not_null()
                                .default("feedback"),
                        )
                        .col(ColumnDef::new(Leads::Name).string_len(255).not_null())
                        .col(
                            ColumnDef::new(Leads::Email)
                                .string_len(254)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Leads::Phone)
                                .string_len(50)
                                .not_null()
                                .default(""),
                        )
                        .col(
                            ColumnDef::new(Leads::Message)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .col(ColumnDef::new(Leads::Meta).json().null())
                        .col(
                            ColumnDef::new(Leads::Processed)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Leads::CreatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Leads::UpdatedAt)
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
                        .name("idx_leads_processed_created_at")
                        .table(Leads::Table)
                        .col(Leads::Processed)
                        .col(Leads::CreatedAt)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Leads::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Leads {
        Table,
        Id,
        LeadType,
        Name,
        Email,
        Phone,
        Message,
        Meta,
        Processed,
        CreatedAt,
        UpdatedAt,
    }
}
