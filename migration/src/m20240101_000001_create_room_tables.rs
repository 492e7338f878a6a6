use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Rooms::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Rooms::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Rooms::Code).string().not_null().unique_key())
                    .col(ColumnDef::new(Rooms::StateJson).text().null())
                    .col(
                        ColumnDef::new(Rooms::Revision)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Rooms::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Rooms::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(RoomParticipants::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RoomParticipants::ParticipantRef)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RoomParticipants::RoomId).uuid().not_null())
                    .col(ColumnDef::new(RoomParticipants::Name).string().not_null())
                    .col(ColumnDef::new(RoomParticipants::PlayerId).uuid().not_null())
                    .col(
                        ColumnDef::new(RoomParticipants::IsHost)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(RoomParticipants::PendingGuess).string().null())
                    .col(
                        ColumnDef::new(RoomParticipants::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_room_participants_room")
                            .from(RoomParticipants::Table, RoomParticipants::RoomId)
                            .to(Rooms::Table, Rooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(PrivateRoles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(PrivateRoles::Id).string().not_null().primary_key())
                    .col(ColumnDef::new(PrivateRoles::RoomId).uuid().not_null())
                    .col(ColumnDef::new(PrivateRoles::ParticipantRef).uuid().not_null())
                    .col(ColumnDef::new(PrivateRoles::Role).string().not_null())
                    .col(ColumnDef::new(PrivateRoles::Word).string().not_null())
                    .col(
                        ColumnDef::new(PrivateRoles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_private_roles_room")
                            .from(PrivateRoles::Table, PrivateRoles::RoomId)
                            .to(Rooms::Table, Rooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Votes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Votes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Votes::RoomId).uuid().not_null())
                    .col(ColumnDef::new(Votes::VoterId).uuid().not_null())
                    .col(ColumnDef::new(Votes::TargetId).uuid().not_null())
                    .col(ColumnDef::new(Votes::GameNumber).integer().not_null())
                    .col(ColumnDef::new(Votes::Round).integer().not_null())
                    .col(
                        ColumnDef::new(Votes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_votes_room")
                            .from(Votes::Table, Votes::RoomId)
                            .to(Rooms::Table, Rooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Tallies filter the vote log by room, game and round
        manager
            .create_index(
                Index::create()
                    .name("idx_votes_room_game_round")
                    .table(Votes::Table)
                    .col(Votes::RoomId)
                    .col(Votes::GameNumber)
                    .col(Votes::Round)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(GameResults::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(GameResults::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(GameResults::RoomId).uuid().not_null())
                    .col(ColumnDef::new(GameResults::GameNumber).integer().not_null())
                    .col(ColumnDef::new(GameResults::Winner).string().not_null())
                    .col(ColumnDef::new(GameResults::ResultsJson).text().not_null())
                    .col(
                        ColumnDef::new(GameResults::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_game_results_room")
                            .from(GameResults::Table, GameResults::RoomId)
                            .to(Rooms::Table, Rooms::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(GameResults::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Votes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(PrivateRoles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RoomParticipants::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Rooms::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Rooms {
    Table,
    Id,
    Code,
    StateJson,
    Revision,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum RoomParticipants {
    Table,
    ParticipantRef,
    RoomId,
    Name,
    PlayerId,
    IsHost,
    PendingGuess,
    JoinedAt,
}

#[derive(DeriveIden)]
enum PrivateRoles {
    Table,
    Id,
    RoomId,
    ParticipantRef,
    Role,
    Word,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Votes {
    Table,
    Id,
    RoomId,
    VoterId,
    TargetId,
    GameNumber,
    Round,
    CreatedAt,
}

#[derive(DeriveIden)]
enum GameResults {
    Table,
    Id,
    RoomId,
    GameNumber,
    Winner,
    ResultsJson,
    CreatedAt,
}
