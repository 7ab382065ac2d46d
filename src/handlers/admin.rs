use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::entities::{crew, journey, journey_crew, route, station, ticket, train, train_type};
use crate::error::{AppError, AppResult};
use crate::utils::geo::haversine_distance;
use crate::AppState;

// ============ Station Management ============

#[derive(Debug, Deserialize)]
pub struct CreateStationRequest {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateStationRequest {
    pub name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// Create a station (admin)
pub async fn create_station(
    State(state): State<AppState>,
    Json(payload): Json<CreateStationRequest>,
) -> AppResult<Json<station::Model>> {
    let station = station::ActiveModel {
        name: Set(payload.name),
        latitude: Set(payload.latitude),
        longitude: Set(payload.longitude),
        ..Default::default()
    };

    let result = station.insert(&state.db).await?;
    Ok(Json(result))
}

/// Update a station (admin)
pub async fn update_station(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateStationRequest>,
) -> AppResult<Json<station::Model>> {
    let station = station::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    let mut active: station::ActiveModel = station.into();

    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(latitude) = payload.latitude {
        active.latitude = Set(latitude);
    }
    if let Some(longitude) = payload.longitude {
        active.longitude = Set(longitude);
    }

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

// ============ Route Management ============

#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    pub source_id: i32,
    pub destination_id: i32,
    pub distance: Option<i32>,
}

/// Create a route; omitted distance falls back to the great-circle estimate (admin)
pub async fn create_route(
    State(state): State<AppState>,
    Json(payload): Json<CreateRouteRequest>,
) -> AppResult<Json<route::Model>> {
    let source = station::Entity::find_by_id(payload.source_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid source station".to_string()))?;

    let destination = station::Entity::find_by_id(payload.destination_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid destination station".to_string()))?;

    if source.id == destination.id {
        return Err(AppError::BadRequest(
            "Source can't be equal to Destination".to_string(),
        ));
    }

    let distance = match payload.distance {
        Some(distance) => distance,
        None => haversine_distance(
            source.latitude,
            source.longitude,
            destination.latitude,
            destination.longitude,
        )
        .round() as i32,
    };

    let route = route::ActiveModel {
        source_id: Set(source.id),
        destination_id: Set(destination.id),
        distance: Set(distance),
        ..Default::default()
    };

    // The unique pair index rejects a second route over the same stations
    let result = match route.insert(&state.db).await {
        Ok(created) => created,
        Err(err) if is_unique_violation(&err) => {
            return Err(AppError::Conflict(
                "Route between these stations already exists".to_string(),
            ));
        }
        Err(err) => return Err(err.into()),
    };

    Ok(Json(result))
}

// ============ Train Management ============

#[derive(Debug, Deserialize)]
pub struct CreateTrainTypeRequest {
    pub name: String,
}

/// Create a train type (admin)
pub async fn create_train_type(
    State(state): State<AppState>,
    Json(payload): Json<CreateTrainTypeRequest>,
) -> AppResult<Json<train_type::Model>> {
    let kind = train_type::ActiveModel {
        name: Set(payload.name),
        ..Default::default()
    };

    let result = kind.insert(&state.db).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct CreateTrainRequest {
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub train_type_id: i32,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateTrainRequest {
    pub name: Option<String>,
    pub cargo_num: Option<i32>,
    pub places_in_cargo: Option<i32>,
    pub train_type_id: Option<i32>,
}

/// Create a train (admin)
pub async fn create_train(
    State(state): State<AppState>,
    Json(payload): Json<CreateTrainRequest>,
) -> AppResult<Json<train::Model>> {
    if payload.cargo_num < 0 || payload.places_in_cargo < 0 {
        return Err(AppError::BadRequest(
            "Train dimensions can't be negative".to_string(),
        ));
    }

    train_type::Entity::find_by_id(payload.train_type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid train type".to_string()))?;

    let train = train::ActiveModel {
        name: Set(payload.name),
        cargo_num: Set(payload.cargo_num),
        places_in_cargo: Set(payload.places_in_cargo),
        train_type_id: Set(payload.train_type_id),
        ..Default::default()
    };

    let result = train.insert(&state.db).await?;
    Ok(Json(result))
}

/// Highest committed (cargo, seat) across every journey served by a train
async fn peak_committed_seat(
    db: &DatabaseConnection,
    train_id: i32,
) -> Result<(Option<i32>, Option<i32>), DbErr> {
    let journey_ids: Vec<Uuid> = journey::Entity::find()
        .filter(journey::Column::TrainId.eq(train_id))
        .all(db)
        .await?
        .into_iter()
        .map(|j| j.id)
        .collect();

    if journey_ids.is_empty() {
        return Ok((None, None));
    }

    let peak = ticket::Entity::find()
        .select_only()
        .column_as(ticket::Column::Cargo.max(), "max_cargo")
        .column_as(ticket::Column::Seat.max(), "max_seat")
        .filter(ticket::Column::JourneyId.is_in(journey_ids))
        .into_tuple::<(Option<i32>, Option<i32>)>()
        .one(db)
        .await?;

    Ok(peak.unwrap_or((None, None)))
}

/// Update a train; committed tickets block shrinking its dimensions (admin)
pub async fn update_train(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateTrainRequest>,
) -> AppResult<Json<train::Model>> {
    if payload.cargo_num.is_some_and(|n| n < 0) || payload.places_in_cargo.is_some_and(|n| n < 0) {
        return Err(AppError::BadRequest(
            "Train dimensions can't be negative".to_string(),
        ));
    }

    let train = train::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Train not found".to_string()))?;

    // Sold tickets must keep fitting inside the train
    let (max_cargo, max_seat) = peak_committed_seat(&state.db, train.id).await?;

    if let (Some(new_cargo), Some(held)) = (payload.cargo_num, max_cargo) {
        if new_cargo < held {
            return Err(AppError::Conflict(format!(
                "Cannot reduce cargo_num to {}: cargo {} already holds sold tickets",
                new_cargo, held
            )));
        }
    }
    if let (Some(new_places), Some(held)) = (payload.places_in_cargo, max_seat) {
        if new_places < held {
            return Err(AppError::Conflict(format!(
                "Cannot reduce places_in_cargo to {}: seat {} is already sold",
                new_places, held
            )));
        }
    }

    if let Some(type_id) = payload.train_type_id {
        train_type::Entity::find_by_id(type_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid train type".to_string()))?;
    }

    let mut active: train::ActiveModel = train.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(cargo_num) = payload.cargo_num {
        active.cargo_num = Set(cargo_num);
    }
    if let Some(places_in_cargo) = payload.places_in_cargo {
        active.places_in_cargo = Set(places_in_cargo);
    }
    if let Some(type_id) = payload.train_type_id {
        active.train_type_id = Set(type_id);
    }

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

// ============ Crew Management ============

#[derive(Debug, Deserialize)]
pub struct CreateCrewRequest {
    pub first_name: String,
    pub last_name: String,
}

/// Create a crew member (admin)
pub async fn create_crew(
    State(state): State<AppState>,
    Json(payload): Json<CreateCrewRequest>,
) -> AppResult<Json<crew::Model>> {
    let member = crew::ActiveModel {
        first_name: Set(payload.first_name),
        last_name: Set(payload.last_name),
        ..Default::default()
    };

    let result = member.insert(&state.db).await?;
    Ok(Json(result))
}

// ============ Journey Management ============

#[derive(Debug, Deserialize)]
pub struct CreateJourneyRequest {
    pub route_id: i32,
    pub train_id: i32,
    #[serde(default)]
    pub crew: Vec<i32>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateJourneyRequest {
    pub route_id: Option<i32>,
    pub train_id: Option<i32>,
    pub crew: Option<Vec<i32>>,
    pub departure_time: Option<DateTime<Utc>>,
    pub arrival_time: Option<DateTime<Utc>>,
}

/// Crew ids must all resolve; duplicates collapse to one assignment
async fn checked_crew_ids(db: &DatabaseConnection, ids: &[i32]) -> AppResult<Vec<i32>> {
    let mut wanted = ids.to_vec();
    wanted.sort_unstable();
    wanted.dedup();

    let found = crew::Entity::find()
        .filter(crew::Column::Id.is_in(wanted.clone()))
        .all(db)
        .await?
        .len();

    if found != wanted.len() {
        return Err(AppError::BadRequest("Invalid crew member".to_string()));
    }

    Ok(wanted)
}

/// Create a journey with its crew assignments (admin)
pub async fn create_journey(
    State(state): State<AppState>,
    Json(payload): Json<CreateJourneyRequest>,
) -> AppResult<Json<journey::Model>> {
    if payload.departure_time >= payload.arrival_time {
        return Err(AppError::BadRequest(
            "Departure time can't be bigger than arrival time".to_string(),
        ));
    }

    route::Entity::find_by_id(payload.route_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid route".to_string()))?;

    train::Entity::find_by_id(payload.train_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid train".to_string()))?;

    let crew_ids = checked_crew_ids(&state.db, &payload.crew).await?;

    let journey = journey::ActiveModel {
        id: Set(Uuid::new_v4()),
        route_id: Set(payload.route_id),
        train_id: Set(payload.train_id),
        departure_time: Set(payload.departure_time.into()),
        arrival_time: Set(payload.arrival_time.into()),
    };

    // The journey row and its crew assignments land together or not at all
    let txn = state.db.begin().await?;

    let result = journey.insert(&txn).await?;

    if !crew_ids.is_empty() {
        let assignments = crew_ids
            .into_iter()
            .map(|crew_id| journey_crew::ActiveModel {
                journey_id: Set(result.id),
                crew_id: Set(crew_id),
            });
        journey_crew::Entity::insert_many(assignments)
            .exec(&txn)
            .await?;
    }

    txn.commit().await?;

    Ok(Json(result))
}

/// Update a journey; a provided crew list replaces the old one (admin)
pub async fn update_journey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateJourneyRequest>,
) -> AppResult<Json<journey::Model>> {
    let journey = journey::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;

    // The time invariant must hold on the merged record, not just the patch
    let departure = payload
        .departure_time
        .unwrap_or_else(|| journey.departure_time.with_timezone(&Utc));
    let arrival = payload
        .arrival_time
        .unwrap_or_else(|| journey.arrival_time.with_timezone(&Utc));

    if departure >= arrival {
        return Err(AppError::BadRequest(
            "Departure time can't be bigger than arrival time".to_string(),
        ));
    }

    if let Some(route_id) = payload.route_id {
        route::Entity::find_by_id(route_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid route".to_string()))?;
    }
    if let Some(train_id) = payload.train_id {
        train::Entity::find_by_id(train_id)
            .one(&state.db)
            .await?
            .ok_or_else(|| AppError::BadRequest("Invalid train".to_string()))?;
    }

    let crew_ids = match &payload.crew {
        Some(ids) => Some(checked_crew_ids(&state.db, ids).await?),
        None => None,
    };

    let journey_id = journey.id;
    let mut active: journey::ActiveModel = journey.into();
    if let Some(route_id) = payload.route_id {
        active.route_id = Set(route_id);
    }
    if let Some(train_id) = payload.train_id {
        active.train_id = Set(train_id);
    }
    active.departure_time = Set(departure.into());
    active.arrival_time = Set(arrival.into());

    let txn = state.db.begin().await?;

    let result = active.update(&txn).await?;

    if let Some(crew_ids) = crew_ids {
        journey_crew::Entity::delete_many()
            .filter(journey_crew::Column::JourneyId.eq(journey_id))
            .exec(&txn)
            .await?;

        if !crew_ids.is_empty() {
            let assignments = crew_ids
                .into_iter()
                .map(|crew_id| journey_crew::ActiveModel {
                    journey_id: Set(journey_id),
                    crew_id: Set(crew_id),
                });
            journey_crew::Entity::insert_many(assignments)
                .exec(&txn)
                .await?;
        }
    }

    txn.commit().await?;

    Ok(Json(result))
}

/// Delete a journey and its tickets (admin)
pub async fn delete_journey(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = journey::Entity::delete_by_id(id).exec(&state.db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Journey not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Journey deleted" })))
}
