//! Create poll table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Poll::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Poll::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Poll::GuildId).big_integer().not_null())
                    .col(ColumnDef::new(Poll::Question).text().not_null())
                    .col(ColumnDef::new(Poll::Description).text())
                    .col(
                        ColumnDef::new(Poll::Choices)
                            .array(ColumnType::Text)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Poll::Published)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::Active)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Poll::ShowQuestion)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Poll::ShowOptions)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(
                        ColumnDef::new(Poll::ShowVoting)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Poll::Tag).integer())
                    .col(ColumnDef::new(Poll::Time).timestamp_with_time_zone())
                    .col(ColumnDef::new(Poll::Num).integer())
                    .col(ColumnDef::new(Poll::Image).string_len(1024))
                    .col(ColumnDef::new(Poll::ThreadQuestion).text())
                    .col(
                        ColumnDef::new(Poll::Fallback)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_tag")
                            .from(Poll::Table, Poll::Tag)
                            .to(PollTag::Table, PollTag::Tag)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: (guild_id, published) for listing
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_guild_published")
                    .table(Poll::Table)
                    .col(Poll::GuildId)
                    .col(Poll::Published)
                    .to_owned(),
            )
            .await?;

        // Index: time (for ordering)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_time")
                    .table(Poll::Table)
                    .col(Poll::Time)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_poll_tag")
                    .table(Poll::Table)
                    .col(Poll::Tag)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Poll::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
    GuildId,
    Question,
    Description,
    Choices,
    Published,
    Active,
    ShowQuestion,
    ShowOptions,
    ShowVoting,
    Tag,
    Time,
    Num,
    Image,
    ThreadQuestion,
    Fallback,
}

#[derive(Iden)]
enum PollTag {
    Table,
    Tag,
}
