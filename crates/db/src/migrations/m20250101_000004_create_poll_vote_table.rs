//! Create poll_vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(PollVote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PollVote::PollId).integer().not_null())
                    .col(ColumnDef::new(PollVote::UserId).big_integer().not_null())
                    .col(ColumnDef::new(PollVote::Choice).small_integer().not_null())
                    .primary_key(
                        Index::create()
                            .name("pk_poll_vote")
                            .col(PollVote::PollId)
                            .col(PollVote::UserId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_poll_vote_poll")
                            .from(PollVote::Table, PollVote::PollId)
                            .to(Poll::Table, Poll::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Choices are indexed 0..=7
        manager
            .get_connection()
            .execute_unprepared(
                "ALTER TABLE poll_vote ADD CONSTRAINT chk_poll_vote_choice CHECK (choice BETWEEN 0 AND 7)",
            )
            .await?;

        // Index: user_id (for listing a user's votes)
        manager
            .create_index(
                Index::create()
                    .name("idx_poll_vote_user_id")
                    .table(PollVote::Table)
                    .col(PollVote::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(PollVote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum PollVote {
    Table,
    PollId,
    UserId,
    Choice,
}

#[derive(Iden)]
enum Poll {
    Table,
    Id,
}
