//! Create guild_info table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(GuildInfo::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GuildInfo::GuildId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(GuildInfo::DefaultChannelId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(GuildInfo::ManagerRoleId)
                            .array(ColumnType::BigInteger)
                            .not_null()
                            .default(Expr::cust("'{}'::bigint[]")),
                    )
                    .col(ColumnDef::new(GuildInfo::DefaultColour).integer())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GuildInfo::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum GuildInfo {
    Table,
    GuildId,
    DefaultChannelId,
    ManagerRoleId,
    DefaultColour,
}
