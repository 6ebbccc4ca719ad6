//! Create `participants` table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Participants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Participants::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Participants::ThreadId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Participants::UserId)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(Participants::LastRead).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(Participants::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Participants::UpdatedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Participants::DeletedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participants_thread")
                            .from(Participants::Table, Participants::ThreadId)
                            .to(Threads::Table, Threads::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_participants_user")
                            .from(Participants::Table, Participants::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Composite index for membership lookup. Deliberately not unique:
        // uniqueness of the active row is enforced by first-or-create,
        // and removed rows may coexist with a later active one.
        manager
            .create_index(
                Index::create()
                    .name("idx_participants_thread_user")
                    .table(Participants::Table)
                    .col(Participants::ThreadId)
                    .col(Participants::UserId)
                    .to_owned(),
            )
            .await?;

        // Index: user_id for per-user thread listings
        manager
            .create_index(
                Index::create()
                    .name("idx_participants_user_id")
                    .table(Participants::Table)
                    .col(Participants::UserId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Participants::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Participants {
    Table,
    Id,
    ThreadId,
    UserId,
    LastRead,
    CreatedAt,
    UpdatedAt,
    DeletedAt,
}

#[derive(Iden)]
enum Threads {
    Table,
    Id,
}

#[derive(Iden)]
enum Users {
    Table,
    Id,
}
