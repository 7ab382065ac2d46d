pub use sea_orm_migration::prelude::*;

mod m20240512_000001_create_stations;
mod m20240512_000002_create_train_types;
mod m20240512_000003_create_trains;
mod m20240512_000004_create_routes;
mod m20240512_000005_create_crews;
mod m20240512_000006_create_users;
mod m20240512_000007_create_journeys;
mod m20240512_000008_create_orders;
mod m20240512_000009_create_tickets;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240512_000001_create_stations::Migration),
            Box::new(m20240512_000002_create_train_types::Migration),
            Box::new(m20240512_000003_create_trains::Migration),
            Box::new(m20240512_000004_create_routes::Migration),
            Box::new(m20240512_000005_create_crews::Migration),
            Box::new(m20240512_000006_create_users::Migration),
            Box::new(m20240512_000007_create_journeys::Migration),
            Box::new(m20240512_000008_create_orders::Migration),
            Box::new(m20240512_000009_create_tickets::Migration),
        ]
    }
}
