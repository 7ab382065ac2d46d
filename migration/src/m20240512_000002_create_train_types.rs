use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(TrainType::Table)
                    .if_not_exists()
                    .col(pk_auto(TrainType::Id))
                    .col(string_len(TrainType::Name, 255).not_null())
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(TrainType::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum TrainType {
    Table,
    Id,
    Name,
}
