use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Tracks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Tracks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Tracks::Title)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tracks::Artist)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tracks::Album)
                            .string_len(500),
                    )
                    .col(
                        ColumnDef::new(Tracks::Duration)
                            .double(),
                    )
                    .col(
                        ColumnDef::new(Tracks::FilePath)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Tracks::ArtworkPath)
                            .text(),
                    )
                    .col(
                        ColumnDef::new(Tracks::TrackOrder)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Tracks::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tracks_track_order")
                    .table(Tracks::Table)
                    .col(Tracks::TrackOrder)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Tracks::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Tracks {
    Table,
    Id,
    Title,
    Artist,
    Album,
    Duration,
    FilePath,
    ArtworkPath,
    TrackOrder,
    CreatedAt,
}
