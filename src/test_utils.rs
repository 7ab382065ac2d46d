//! Shared fixtures for database-backed tests.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use migration::{Migrator, MigratorTrait};
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use tracing::field::{Field, Visit};
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{
    crew, journey, journey_crew, order, route, station, ticket, train, train_type, user,
};
use crate::utils::jwt::Claims;
use crate::AppState;

/// Fresh in-memory database with the full schema applied.
/// One pooled connection so every query sees the same database.
pub async fn setup_db() -> DatabaseConnection {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1);
    let db = Database::connect(options).await.expect("connect");
    Migrator::up(&db, None).await.expect("migrate");
    db
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expiration_hours: 1,
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        booking_timeout_secs: 5,
    }
}

pub async fn test_state() -> AppState {
    AppState {
        db: setup_db().await,
        config: test_config(),
    }
}

pub fn claims_for(account: &user::Model) -> Claims {
    let now = Utc::now();
    Claims {
        sub: account.id,
        email: account.email.clone(),
        role: account.role.clone(),
        exp: (now + Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    }
}

pub async fn seed_station(
    db: &DatabaseConnection,
    name: &str,
    latitude: f64,
    longitude: f64,
) -> station::Model {
    station::ActiveModel {
        name: Set(name.to_string()),
        latitude: Set(latitude),
        longitude: Set(longitude),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert station")
}

pub async fn seed_route(
    db: &DatabaseConnection,
    source: &station::Model,
    destination: &station::Model,
    distance: i32,
) -> route::Model {
    route::ActiveModel {
        source_id: Set(source.id),
        destination_id: Set(destination.id),
        distance: Set(distance),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert route")
}

pub async fn seed_train_type(db: &DatabaseConnection, name: &str) -> train_type::Model {
    train_type::ActiveModel {
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert train type")
}

pub async fn seed_train(
    db: &DatabaseConnection,
    name: &str,
    cargo_num: i32,
    places_in_cargo: i32,
    kind: &train_type::Model,
) -> train::Model {
    train::ActiveModel {
        name: Set(name.to_string()),
        cargo_num: Set(cargo_num),
        places_in_cargo: Set(places_in_cargo),
        train_type_id: Set(kind.id),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert train")
}

pub async fn seed_journey(
    db: &DatabaseConnection,
    route: &route::Model,
    train: &train::Model,
    departure: DateTime<Utc>,
    arrival: DateTime<Utc>,
) -> journey::Model {
    journey::ActiveModel {
        id: Set(Uuid::new_v4()),
        route_id: Set(route.id),
        train_id: Set(train.id),
        departure_time: Set(departure.into()),
        arrival_time: Set(arrival.into()),
    }
    .insert(db)
    .await
    .expect("insert journey")
}

pub async fn seed_crew(db: &DatabaseConnection, first_name: &str, last_name: &str) -> crew::Model {
    crew::ActiveModel {
        first_name: Set(first_name.to_string()),
        last_name: Set(last_name.to_string()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert crew")
}

pub async fn assign_crew(db: &DatabaseConnection, journey: &journey::Model, member: &crew::Model) {
    journey_crew::ActiveModel {
        journey_id: Set(journey.id),
        crew_id: Set(member.id),
    }
    .insert(db)
    .await
    .expect("assign crew");
}

pub async fn seed_passenger(db: &DatabaseConnection) -> user::Model {
    user::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(format!("{}@example.com", Uuid::new_v4())),
        password_hash: Set("hash".to_string()),
        name: Set("Passenger".to_string()),
        role: Set(user::UserRole::Passenger),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert user")
}

/// A journey with its own stations, route, type and train, for tests that
/// only care about seating dimensions.
pub async fn seed_simple_journey(
    db: &DatabaseConnection,
    cargo_num: i32,
    places_in_cargo: i32,
) -> (journey::Model, train::Model) {
    let source = seed_station(db, "North Terminal", 50.45, 30.52).await;
    let destination = seed_station(db, "South Terminal", 49.84, 24.03).await;
    let route = seed_route(db, &source, &destination, 540).await;
    let kind = seed_train_type(db, "Intercity").await;
    let train = seed_train(db, "Aurora", cargo_num, places_in_cargo, &kind).await;
    let journey = seed_journey(
        db,
        &route,
        &train,
        Utc::now(),
        Utc::now() + Duration::hours(5),
    )
    .await;

    (journey, train)
}

/// Book seats directly, bypassing the order pipeline.
pub async fn sell_seats(db: &DatabaseConnection, journey: &journey::Model, seats: &[(i32, i32)]) {
    let passenger = seed_passenger(db).await;

    let owner = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(passenger.id),
        created_at: Set(Utc::now().into()),
    }
    .insert(db)
    .await
    .expect("insert order");

    for &(cargo, seat) in seats {
        ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            cargo: Set(cargo),
            seat: Set(seat),
            journey_id: Set(journey.id),
            order_id: Set(owner.id),
        }
        .insert(db)
        .await
        .expect("insert ticket");
    }
}

/// Collects every tracing event emitted on the current thread.
#[derive(Clone, Default)]
pub struct LogCapture {
    events: Arc<Mutex<Vec<String>>>,
}

impl LogCapture {
    /// Events seen so far, one line per event: "LEVEL message=... field=...".
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

struct FieldWriter(String);

impl Visit for FieldWriter {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        use std::fmt::Write;
        let _ = write!(self.0, " {}={:?}", field.name(), value);
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for LogCapture {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut line = FieldWriter(event.metadata().level().to_string());
        event.record(&mut line);
        self.events.lock().unwrap().push(line.0);
    }
}

/// Route tracing output into a capture until the returned guard drops.
pub fn capture_logs() -> (LogCapture, tracing::subscriber::DefaultGuard) {
    let capture = LogCapture::default();
    let guard =
        tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
    (capture, guard)
}
