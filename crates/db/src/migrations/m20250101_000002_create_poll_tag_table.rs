//! Create poll_tag table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollTag::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(PollTag::Tag)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(PollTag::GuildId).big_integer().not_null())
                    .col(ColumnDef::new(PollTag::Name).string_len(256).not_null())
                    .col(ColumnDef::new(PollTag::ChannelId).big_integer().not_null())
                    .col(ColumnDef::new(PollTag::Colour).integer())
                    .col(
                        ColumnDef::new(PollTag::Persistent)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_tag_guild_id")
                    .table(PollTag::Table)
                    .col(PollTag::GuildId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollTag::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollTag {
    Table,
    Tag,
    GuildId,
    Name,
    ChannelId,
    Colour,
    Persistent,
}
