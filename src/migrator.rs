use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_coupons_table::Migration),
            Box::new(m20240101_000002_create_coupon_usages_table::Migration),
            Box::new(m20240101_000003_create_coupon_customer_usages_table::Migration),
        ]
    }
}

mod m20240101_000001_create_coupons_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_coupons_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(Coupons::Table)
                        .if_not_exists()
                        .col(ColumnDef::new(Coupons::Id).uuid().primary_key().not_null())
                        .col(ColumnDef::new(Coupons::Code).string().not_null())
                        .col(ColumnDef::new(Coupons::Description).string().null())
                        .col(ColumnDef::new(Coupons::DiscountType).string().not_null())
                        .col(
                            ColumnDef::new(Coupons::Value)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Coupons::Scope).string().not_null())
                        .col(
                            ColumnDef::new(Coupons::ApplicableCategories)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::ApplicableProducts)
                                .json()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::MinPurchase)
                                .decimal()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Coupons::MaxDiscount).decimal().null())
                        .col(
                            ColumnDef::new(Coupons::MinItems)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(ColumnDef::new(Coupons::StartsAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Coupons::ExpiresAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Coupons::UsageLimit).integer().null())
                        .col(
                            ColumnDef::new(Coupons::UsedCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(Coupons::PerUserLimit)
                                .integer()
                                .not_null()
                                .default(1),
                        )
                        .col(ColumnDef::new(Coupons::VendorId).uuid().null())
                        .col(
                            ColumnDef::new(Coupons::Stackable)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Coupons::AutoApply)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(
                            ColumnDef::new(Coupons::CommissionAbsorber)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(Coupons::BuyQuantity).integer().null())
                        .col(ColumnDef::new(Coupons::GetQuantity).integer().null())
                        .col(
                            ColumnDef::new(Coupons::GetDiscountPercent)
                                .decimal()
                                .null(),
                        )
                        .col(
                            ColumnDef::new(Coupons::FirstOrderOnly)
                                .boolean()
                                .not_null()
                                .default(false),
                        )
                        .col(ColumnDef::new(Coupons::CustomerGroups).json().not_null())
                        .col(
                            ColumnDef::new(Coupons::IsActive)
                                .boolean()
                                .not_null()
                                .default(true),
                        )
                        .col(ColumnDef::new(Coupons::CreatedAt).timestamp_with_time_zone().not_null())
                        .col(ColumnDef::new(Coupons::UpdatedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_coupons_code")
                        .table(Coupons::Table)
                        .col(Coupons::Code)
                        .unique()
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_coupons_vendor")
                        .table(Coupons::Table)
                        .col(Coupons::VendorId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Coupons::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum Coupons {
        Table,
        Id,
        Code,
        Description,
        DiscountType,
        Value,
        Scope,
        ApplicableCategories,
        ApplicableProducts,
        MinPurchase,
        MaxDiscount,
        MinItems,
        StartsAt,
        ExpiresAt,
        UsageLimit,
        UsedCount,
        PerUserLimit,
        VendorId,
        Stackable,
        AutoApply,
        CommissionAbsorber,
        BuyQuantity,
        GetQuantity,
        GetDiscountPercent,
        FirstOrderOnly,
        CustomerGroups,
        IsActive,
        CreatedAt,
        UpdatedAt,
    }
}

mod m20240101_000002_create_coupon_usages_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_coupon_usages_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CouponUsages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CouponUsages::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CouponUsages::CouponId).uuid().not_null())
                        .col(
                            ColumnDef::new(CouponUsages::CouponCode)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponUsages::DiscountType)
                                .string()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CouponUsages::CustomerId).uuid().not_null())
                        .col(ColumnDef::new(CouponUsages::OrderId).uuid().not_null())
                        .col(ColumnDef::new(CouponUsages::SubOrderId).uuid().null())
                        .col(ColumnDef::new(CouponUsages::VendorId).uuid().null())
                        .col(
                            ColumnDef::new(CouponUsages::DiscountAmount)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponUsages::OrderTotal)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponUsages::AbsorbedBy)
                                .string()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponUsages::PlatformAbsorption)
                                .decimal()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponUsages::VendorAbsorption)
                                .decimal()
                                .not_null(),
                        )
                        .col(ColumnDef::new(CouponUsages::UsedAt).timestamp_with_time_zone().not_null())
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_coupon_usages_coupon")
                        .table(CouponUsages::Table)
                        .col(CouponUsages::CouponId)
                        .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    Index::create()
                        .name("idx_coupon_usages_customer")
                        .table(CouponUsages::Table)
                        .col(CouponUsages::CustomerId)
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CouponUsages::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum CouponUsages {
        Table,
        Id,
        CouponId,
        CouponCode,
        DiscountType,
        CustomerId,
        OrderId,
        SubOrderId,
        VendorId,
        DiscountAmount,
        OrderTotal,
        AbsorbedBy,
        PlatformAbsorption,
        VendorAbsorption,
        UsedAt,
    }
}

mod m20240101_000003_create_coupon_customer_usages_table {
    use sea_orm_migration::prelude::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000003_create_coupon_customer_usages_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    Table::create()
                        .table(CouponCustomerUsages::Table)
                        .if_not_exists()
                        .col(
                            ColumnDef::new(CouponCustomerUsages::Id)
                                .uuid()
                                .primary_key()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponCustomerUsages::CouponId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponCustomerUsages::CustomerId)
                                .uuid()
                                .not_null(),
                        )
                        .col(
                            ColumnDef::new(CouponCustomerUsages::UsageCount)
                                .integer()
                                .not_null()
                                .default(0),
                        )
                        .col(
                            ColumnDef::new(CouponCustomerUsages::UpdatedAt)
                                .timestamp_with_time_zone()
                                .not_null(),
                        )
                        .to_owned(),
                )
                .await?;

            // The uniqueness is what makes the per-user guard race-safe.
            manager
                .create_index(
                    Index::create()
                        .name("idx_coupon_customer_usages_pair")
                        .table(CouponCustomerUsages::Table)
                        .col(CouponCustomerUsages::CouponId)
                        .col(CouponCustomerUsages::CustomerId)
                        .unique()
                        .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(CouponCustomerUsages::Table).to_owned())
                .await
        }
    }

    #[derive(Iden)]
    enum CouponCustomerUsages {
        Table,
        Id,
        CouponId,
        CustomerId,
        UsageCount,
        UpdatedAt,
    }
}
