use sea_orm_migration::{prelude::*, schema::*};

use super::m20240512_000003_create_trains::Train;
use super::m20240512_000004_create_routes::Route;
use super::m20240512_000005_create_crews::Crew;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Journey::Table)
                    .if_not_exists()
                    .col(uuid(Journey::Id).primary_key())
                    .col(integer(Journey::RouteId).not_null())
                    .col(integer(Journey::TrainId).not_null())
                    .col(timestamp_with_time_zone(Journey::DepartureTime).not_null())
                    .col(timestamp_with_time_zone(Journey::ArrivalTime).not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journey_route")
                            .from(Journey::Table, Journey::RouteId)
                            .to(Route::Table, Route::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journey_train")
                            .from(Journey::Table, Journey::TrainId)
                            .to(Train::Table, Train::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Crew assignments, many-to-many
        manager
            .create_table(
                Table::create()
                    .table(JourneyCrew::Table)
                    .if_not_exists()
                    .col(uuid(JourneyCrew::JourneyId))
                    .col(integer(JourneyCrew::CrewId))
                    .primary_key(
                        Index::create()
                            .name("pk_journey_crew")
                            .col(JourneyCrew::JourneyId)
                            .col(JourneyCrew::CrewId),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journey_crew_journey")
                            .from(JourneyCrew::Table, JourneyCrew::JourneyId)
                            .to(Journey::Table, Journey::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_journey_crew_crew")
                            .from(JourneyCrew::Table, JourneyCrew::CrewId)
                            .to(Crew::Table, Crew::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JourneyCrew::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(Journey::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Journey {
    Table,
    Id,
    RouteId,
    TrainId,
    DepartureTime,
    ArrivalTime,
}

#[derive(DeriveIden)]
pub enum JourneyCrew {
    Table,
    JourneyId,
    CrewId,
}
