use std::collections::HashMap;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ColumnTrait, EntityTrait, ItemsAndPagesNumber, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder,
};
use serde::{Deserialize, Serialize};
use tokio::time::timeout;
use uuid::Uuid;

use crate::booking::{self, availability, TicketRequest};
use crate::entities::{crew, journey, order, route, station, ticket, train, train_type};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::Claims;
use crate::AppState;

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============ Stations ============

/// List all stations
pub async fn list_stations(State(state): State<AppState>) -> AppResult<Json<Vec<station::Model>>> {
    let stations = station::Entity::find().all(&state.db).await?;
    Ok(Json(stations))
}

/// Get station details
pub async fn get_station(
    State(state): State<AppState>,
    Path(station_id): Path<i32>,
) -> AppResult<Json<station::Model>> {
    let station = station::Entity::find_by_id(station_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Station not found".to_string()))?;

    Ok(Json(station))
}

// ============ Routes ============

#[derive(Debug, Default, Deserialize)]
pub struct RouteFilter {
    pub source: Option<i32>,
    pub destination: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub id: i32,
    pub source: String,
    pub destination: String,
    pub distance: i32,
}

#[derive(Debug, Serialize)]
pub struct RouteDetail {
    pub id: i32,
    pub source: station::Model,
    pub destination: station::Model,
    pub distance: i32,
}

/// List routes, optionally narrowed to a source or destination station
pub async fn list_routes(
    State(state): State<AppState>,
    Query(filter): Query<RouteFilter>,
) -> AppResult<Json<Vec<RouteInfo>>> {
    let mut query = route::Entity::find();
    if let Some(source) = filter.source {
        query = query.filter(route::Column::SourceId.eq(source));
    }
    if let Some(destination) = filter.destination {
        query = query.filter(route::Column::DestinationId.eq(destination));
    }

    let routes = query.all(&state.db).await?;
    let stations = station::Entity::find().all(&state.db).await?;

    let responses = routes
        .into_iter()
        .map(|r| {
            let source = stations.iter().find(|s| s.id == r.source_id);
            let destination = stations.iter().find(|s| s.id == r.destination_id);

            RouteInfo {
                id: r.id,
                source: source.map(|s| s.name.clone()).unwrap_or_default(),
                destination: destination.map(|s| s.name.clone()).unwrap_or_default(),
                distance: r.distance,
            }
        })
        .collect();

    Ok(Json(responses))
}

/// Get route details with both stations embedded
pub async fn get_route(
    State(state): State<AppState>,
    Path(route_id): Path<i32>,
) -> AppResult<Json<RouteDetail>> {
    let route = route::Entity::find_by_id(route_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))?;

    let source = station::Entity::find_by_id(route.source_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Source station not found".to_string()))?;
    let destination = station::Entity::find_by_id(route.destination_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Destination station not found".to_string()))?;

    Ok(Json(RouteDetail {
        id: route.id,
        source,
        destination,
        distance: route.distance,
    }))
}

// ============ Trains ============

#[derive(Debug, Default, Deserialize)]
pub struct TrainFilter {
    pub name: Option<String>,
    pub train_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TrainInfo {
    pub id: i32,
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub train_type: i32,
    pub train_capacity: i64,
}

#[derive(Debug, Serialize)]
pub struct TrainDetail {
    pub id: i32,
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub train_type: String,
    pub train_capacity: i64,
}

/// List trains, filterable by name substring and type ids
pub async fn list_trains(
    State(state): State<AppState>,
    Query(filter): Query<TrainFilter>,
) -> AppResult<Json<Vec<TrainInfo>>> {
    let type_filter: Option<Vec<i32>> = match filter.train_type.as_deref() {
        None => None,
        Some(raw) => Some(
            raw.split(',')
                .map(|part| part.trim().parse::<i32>())
                .collect::<Result<_, _>>()
                .map_err(|_| {
                    AppError::BadRequest(
                        "train_type must be a comma-separated list of ids".to_string(),
                    )
                })?,
        ),
    };

    let trains = train::Entity::find().all(&state.db).await?;

    let mut responses = Vec::new();
    for t in trains {
        if let Some(wanted) = &filter.name {
            if !contains_ci(&t.name, wanted) {
                continue;
            }
        }
        if let Some(wanted) = &type_filter {
            if !wanted.contains(&t.train_type_id) {
                continue;
            }
        }

        let train_capacity = t.capacity();
        responses.push(TrainInfo {
            id: t.id,
            name: t.name,
            cargo_num: t.cargo_num,
            places_in_cargo: t.places_in_cargo,
            train_type: t.train_type_id,
            train_capacity,
        });
    }

    Ok(Json(responses))
}

/// Get train details with its type spelled out
pub async fn get_train(
    State(state): State<AppState>,
    Path(train_id): Path<i32>,
) -> AppResult<Json<TrainDetail>> {
    let train = train::Entity::find_by_id(train_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Train not found".to_string()))?;

    let kind = train_type::Entity::find_by_id(train.train_type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Train type not found".to_string()))?;

    let train_capacity = train.capacity();
    Ok(Json(TrainDetail {
        id: train.id,
        name: train.name,
        cargo_num: train.cargo_num,
        places_in_cargo: train.places_in_cargo,
        train_type: kind.name,
        train_capacity,
    }))
}

/// List train types
pub async fn list_train_types(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<train_type::Model>>> {
    let kinds = train_type::Entity::find().all(&state.db).await?;
    Ok(Json(kinds))
}

// ============ Crews ============

#[derive(Debug, Serialize)]
pub struct CrewInfo {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

/// List crew members
pub async fn list_crews(State(state): State<AppState>) -> AppResult<Json<Vec<CrewInfo>>> {
    let crews = crew::Entity::find().all(&state.db).await?;

    let responses = crews
        .into_iter()
        .map(|member| {
            let full_name = member.full_name();
            CrewInfo {
                id: member.id,
                first_name: member.first_name,
                last_name: member.last_name,
                full_name,
            }
        })
        .collect();

    Ok(Json(responses))
}

// ============ Journeys ============

#[derive(Debug, Default, Deserialize)]
pub struct JourneyFilter {
    pub train_type: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub arrival_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct JourneySummary {
    pub id: Uuid,
    pub route_name: String,
    pub train_name: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub tickets_available: i64,
}

#[derive(Debug, Serialize)]
pub struct JourneyDetail {
    pub id: Uuid,
    pub route: RouteDetail,
    pub train: TrainDetail,
    pub crew: Vec<CrewInfo>,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub tickets_available: i64,
}

fn route_display_name(route: &route::Model, stations: &[station::Model]) -> String {
    let station_name = |id: i32| {
        stations
            .iter()
            .find(|s| s.id == id)
            .map(|s| s.name.clone())
            .unwrap_or_default()
    };

    format!(
        "{} to {}",
        station_name(route.source_id),
        station_name(route.destination_id)
    )
}

/// List journeys with seat availability, filterable by stations, type and day
pub async fn list_journeys(
    State(state): State<AppState>,
    Query(filter): Query<JourneyFilter>,
) -> AppResult<Json<Vec<JourneySummary>>> {
    let journeys = journey::Entity::find().all(&state.db).await?;
    let routes = route::Entity::find().all(&state.db).await?;
    let stations = station::Entity::find().all(&state.db).await?;
    let trains = train::Entity::find().all(&state.db).await?;
    let kinds = train_type::Entity::find().all(&state.db).await?;

    let mut kept: Vec<(journey::Model, String, train::Model)> = Vec::new();
    for j in journeys {
        let Some(route) = routes.iter().find(|r| r.id == j.route_id) else {
            continue;
        };
        let Some(train) = trains.iter().find(|t| t.id == j.train_id) else {
            continue;
        };

        let source = stations.iter().find(|s| s.id == route.source_id);
        let destination = stations.iter().find(|s| s.id == route.destination_id);

        if let Some(wanted) = &filter.from {
            if !source.is_some_and(|s| contains_ci(&s.name, wanted)) {
                continue;
            }
        }
        if let Some(wanted) = &filter.to {
            if !destination.is_some_and(|s| contains_ci(&s.name, wanted)) {
                continue;
            }
        }
        if let Some(wanted) = &filter.train_type {
            let kind = kinds.iter().find(|k| k.id == train.train_type_id);
            if !kind.is_some_and(|k| contains_ci(&k.name, wanted)) {
                continue;
            }
        }
        if let Some(day) = filter.departure_date {
            if j.departure_time.with_timezone(&Utc).date_naive() != day {
                continue;
            }
        }
        if let Some(day) = filter.arrival_date {
            if j.arrival_time.with_timezone(&Utc).date_naive() != day {
                continue;
            }
        }

        kept.push((j, route_display_name(route, &stations), train.clone()));
    }

    // One grouped count covers the whole listing
    let ids: Vec<Uuid> = kept.iter().map(|(j, _, _)| j.id).collect();
    let counts = availability::ticket_counts(&state.db, &ids).await?;

    let mut responses = Vec::new();
    for (j, route_name, train) in kept {
        let sold = counts.get(&j.id).copied().unwrap_or(0);
        let tickets_available = train.capacity() - sold;

        responses.push(JourneySummary {
            id: j.id,
            route_name,
            train_name: train.name,
            departure_time: j.departure_time.with_timezone(&Utc),
            arrival_time: j.arrival_time.with_timezone(&Utc),
            tickets_available,
        });
    }

    Ok(Json(responses))
}

/// Journey details with route, train, crew and live seat availability
pub async fn get_journey(
    State(state): State<AppState>,
    Path(journey_id): Path<Uuid>,
) -> AppResult<Json<JourneyDetail>> {
    let journey = journey::Entity::find_by_id(journey_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Journey not found".to_string()))?;

    let route = route::Entity::find_by_id(journey.route_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Route not found".to_string()))?;

    let stations = station::Entity::find().all(&state.db).await?;
    let source = stations
        .iter()
        .find(|s| s.id == route.source_id)
        .ok_or_else(|| AppError::Internal("Source station not found".to_string()))?;
    let destination = stations
        .iter()
        .find(|s| s.id == route.destination_id)
        .ok_or_else(|| AppError::Internal("Destination station not found".to_string()))?;

    let train = train::Entity::find_by_id(journey.train_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Train not found".to_string()))?;
    let kind = train_type::Entity::find_by_id(train.train_type_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::Internal("Train type not found".to_string()))?;

    let crew = journey
        .find_related(crew::Entity)
        .order_by_asc(crew::Column::Id)
        .all(&state.db)
        .await?;

    let tickets_available = availability::tickets_available(&state.db, journey.id, &train).await?;

    let train_capacity = train.capacity();
    Ok(Json(JourneyDetail {
        id: journey.id,
        route: RouteDetail {
            id: route.id,
            source: source.clone(),
            destination: destination.clone(),
            distance: route.distance,
        },
        train: TrainDetail {
            id: train.id,
            name: train.name,
            cargo_num: train.cargo_num,
            places_in_cargo: train.places_in_cargo,
            train_type: kind.name,
            train_capacity,
        },
        crew: crew
            .into_iter()
            .map(|member| {
                let full_name = member.full_name();
                CrewInfo {
                    id: member.id,
                    first_name: member.first_name,
                    last_name: member.last_name,
                    full_name,
                }
            })
            .collect(),
        departure_time: journey.departure_time.with_timezone(&Utc),
        arrival_time: journey.arrival_time.with_timezone(&Utc),
        tickets_available,
    }))
}

// ============ Orders ============

#[derive(Debug, Deserialize)]
pub struct CreateOrderRequest {
    pub tickets: Vec<TicketRequest>,
}

#[derive(Debug, Serialize)]
pub struct TicketInfo {
    pub id: Uuid,
    pub cargo: i32,
    pub seat: i32,
    pub journey: Uuid,
}

#[derive(Debug, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub tickets: Vec<TicketInfo>,
    pub created_at: DateTime<Utc>,
}

/// Book every requested seat in one order, or none of them
pub async fn create_order(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<OrderResponse>> {
    let deadline = Duration::from_secs(state.config.booking_timeout_secs);

    // A timed-out future is dropped mid-transaction, so nothing gets committed
    let (order, tickets) = match timeout(
        deadline,
        booking::create_order(&state.db, claims.sub, &payload.tickets),
    )
    .await
    {
        Ok(outcome) => outcome?,
        Err(_) => {
            return Err(AppError::Timeout(
                "Order processing timed out, nothing was booked".to_string(),
            ));
        }
    };

    Ok(Json(OrderResponse {
        id: order.id,
        tickets: tickets
            .into_iter()
            .map(|t| TicketInfo {
                id: t.id,
                cargo: t.cargo,
                seat: t.seat,
                journey: t.journey_id,
            })
            .collect(),
        created_at: order.created_at.with_timezone(&Utc),
    }))
}

#[derive(Debug, Deserialize)]
pub struct OrderPageQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    10
}

#[derive(Debug, Serialize)]
pub struct JourneyRef {
    pub id: Uuid,
    pub route_name: String,
    pub train_name: String,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TicketSummary {
    pub id: Uuid,
    pub cargo: i32,
    pub seat: i32,
    pub journey: JourneyRef,
}

#[derive(Debug, Serialize)]
pub struct OrderListItem {
    pub id: Uuid,
    pub tickets: Vec<TicketSummary>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct OrderPage {
    pub items: Vec<OrderListItem>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
    pub total_pages: u64,
}

/// List the caller's orders, newest first
pub async fn my_orders(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<OrderPageQuery>,
) -> AppResult<Json<OrderPage>> {
    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);

    let paginator = order::Entity::find()
        .filter(order::Column::UserId.eq(claims.sub))
        .order_by_desc(order::Column::CreatedAt)
        .paginate(&state.db, page_size);

    let ItemsAndPagesNumber {
        number_of_items,
        number_of_pages,
    } = paginator.num_items_and_pages().await?;
    let orders = paginator.fetch_page(page - 1).await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let tickets = ticket::Entity::find()
        .filter(ticket::Column::OrderId.is_in(order_ids))
        .order_by_asc(ticket::Column::Cargo)
        .order_by_asc(ticket::Column::Seat)
        .all(&state.db)
        .await?;

    let journeys = journey::Entity::find().all(&state.db).await?;
    let routes = route::Entity::find().all(&state.db).await?;
    let stations = station::Entity::find().all(&state.db).await?;
    let trains = train::Entity::find().all(&state.db).await?;

    let mut tickets_by_order: HashMap<Uuid, Vec<TicketSummary>> = HashMap::new();
    for t in tickets {
        let Some(journey) = journeys.iter().find(|j| j.id == t.journey_id) else {
            continue;
        };
        let route_name = routes
            .iter()
            .find(|r| r.id == journey.route_id)
            .map(|r| route_display_name(r, &stations))
            .unwrap_or_default();
        let train_name = trains
            .iter()
            .find(|tr| tr.id == journey.train_id)
            .map(|tr| tr.name.clone())
            .unwrap_or_default();

        tickets_by_order
            .entry(t.order_id)
            .or_default()
            .push(TicketSummary {
                id: t.id,
                cargo: t.cargo,
                seat: t.seat,
                journey: JourneyRef {
                    id: journey.id,
                    route_name,
                    train_name,
                    departure_time: journey.departure_time.with_timezone(&Utc),
                    arrival_time: journey.arrival_time.with_timezone(&Utc),
                },
            });
    }

    let items: Vec<OrderListItem> = orders
        .into_iter()
        .map(|o| OrderListItem {
            id: o.id,
            tickets: tickets_by_order.remove(&o.id).unwrap_or_default(),
            created_at: o.created_at.with_timezone(&Utc),
        })
        .collect();

    Ok(Json(OrderPage {
        items,
        total: number_of_items,
        page,
        page_size,
        total_pages: number_of_pages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

    use crate::entities::user;
    use crate::test_utils::{
        assign_crew, claims_for, seed_crew, seed_journey, seed_passenger, seed_route,
        seed_simple_journey, seed_station, seed_train, seed_train_type, sell_seats, test_config,
        test_state,
    };

    async fn seed_order(
        db: &DatabaseConnection,
        owner: &user::Model,
        journey: &journey::Model,
        seats: &[(i32, i32)],
        created_at: DateTime<Utc>,
    ) -> order::Model {
        let created = order::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(owner.id),
            created_at: Set(created_at.into()),
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
                order_id: Set(created.id),
            }
            .insert(db)
            .await
            .expect("insert ticket");
        }

        created
    }

    #[tokio::test]
    async fn test_station_detail_and_missing() {
        let state = test_state().await;
        let riverside = seed_station(&state.db, "Riverside", 50.0, 30.0).await;

        let Json(found) = get_station(State(state.clone()), Path(riverside.id))
            .await
            .unwrap();
        assert_eq!(found.name, "Riverside");

        let err = get_station(State(state.clone()), Path(riverside.id + 1))
            .await
            .expect_err("missing station");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_route_listing_resolves_station_names() {
        let state = test_state().await;
        let db = &state.db;
        let riverside = seed_station(db, "Riverside", 50.0, 30.0).await;
        let hillcrest = seed_station(db, "Hillcrest", 49.0, 24.0).await;
        let seaview = seed_station(db, "Seaview", 46.4, 30.7).await;
        seed_route(db, &riverside, &hillcrest, 540).await;
        seed_route(db, &seaview, &hillcrest, 330).await;

        let Json(all) = list_routes(State(state.clone()), Query(RouteFilter::default()))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let Json(filtered) = list_routes(
            State(state.clone()),
            Query(RouteFilter {
                source: Some(riverside.id),
                destination: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].source, "Riverside");
        assert_eq!(filtered[0].destination, "Hillcrest");

        let Json(detail) = get_route(State(state.clone()), Path(filtered[0].id))
            .await
            .unwrap();
        assert_eq!(detail.source.name, "Riverside");
        assert_eq!(detail.destination.name, "Hillcrest");
    }

    #[tokio::test]
    async fn test_train_filters_by_name_and_type() {
        let state = test_state().await;
        let db = &state.db;
        let express = seed_train_type(db, "Express").await;
        let freight = seed_train_type(db, "Freight").await;
        seed_train(db, "Aurora", 5, 20, &express).await;
        seed_train(db, "Auriga", 4, 10, &freight).await;
        seed_train(db, "Meridian", 3, 30, &freight).await;

        let Json(by_name) = list_trains(
            State(state.clone()),
            Query(TrainFilter {
                name: Some("aur".to_string()),
                train_type: None,
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_name.len(), 2);

        let Json(both) = list_trains(
            State(state.clone()),
            Query(TrainFilter {
                name: Some("aur".to_string()),
                train_type: Some(freight.id.to_string()),
            }),
        )
        .await
        .unwrap();
        assert_eq!(both.len(), 1);
        assert_eq!(both[0].name, "Auriga");
        assert_eq!(both[0].train_capacity, 40);

        let err = list_trains(
            State(state.clone()),
            Query(TrainFilter {
                name: None,
                train_type: Some("abc".to_string()),
            }),
        )
        .await
        .expect_err("ids must be numeric");
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_journey_listing_reports_availability() {
        let state = test_state().await;
        let (journey, _) = seed_simple_journey(&state.db, 10, 50).await;
        sell_seats(&state.db, &journey, &[(1, 1), (2, 5)]).await;

        let Json(listed) = list_journeys(State(state.clone()), Query(JourneyFilter::default()))
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tickets_available, 498);
        assert_eq!(listed[0].route_name, "North Terminal to South Terminal");
        assert_eq!(listed[0].train_name, "Aurora");
    }

    #[tokio::test]
    async fn test_journey_filters_narrow_by_station_and_day() {
        let state = test_state().await;
        let db = &state.db;
        let riverside = seed_station(db, "Riverside", 50.0, 30.0).await;
        let hillcrest = seed_station(db, "Hillcrest", 49.0, 24.0).await;
        let seaview = seed_station(db, "Seaview", 46.4, 30.7).await;
        let north = seed_route(db, &riverside, &hillcrest, 540).await;
        let south = seed_route(db, &riverside, &seaview, 470).await;
        let kind = seed_train_type(db, "Express").await;
        let train = seed_train(db, "Meridian", 5, 20, &kind).await;

        let morning = Utc.with_ymd_and_hms(2026, 3, 14, 8, 0, 0).unwrap();
        let to_hills = seed_journey(
            db,
            &north,
            &train,
            morning,
            morning + chrono::Duration::hours(4),
        )
        .await;
        let to_sea = seed_journey(
            db,
            &south,
            &train,
            morning + chrono::Duration::days(1),
            morning + chrono::Duration::days(1) + chrono::Duration::hours(6),
        )
        .await;

        let Json(by_destination) = list_journeys(
            State(state.clone()),
            Query(JourneyFilter {
                to: Some("hill".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_destination.len(), 1);
        assert_eq!(by_destination[0].id, to_hills.id);

        let Json(by_day) = list_journeys(
            State(state.clone()),
            Query(JourneyFilter {
                departure_date: NaiveDate::from_ymd_opt(2026, 3, 15),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_day.len(), 1);
        assert_eq!(by_day[0].id, to_sea.id);

        let Json(by_kind) = list_journeys(
            State(state.clone()),
            Query(JourneyFilter {
                train_type: Some("exp".to_string()),
                ..Default::default()
            }),
        )
        .await
        .unwrap();
        assert_eq!(by_kind.len(), 2);
    }

    #[tokio::test]
    async fn test_journey_detail_embeds_route_train_and_crew() {
        let state = test_state().await;
        let db = &state.db;
        let (journey, _) = seed_simple_journey(db, 5, 20).await;
        let dana = seed_crew(db, "Dana", "Willis").await;
        assign_crew(db, &journey, &dana).await;
        sell_seats(db, &journey, &[(1, 1)]).await;

        let Json(detail) = get_journey(State(state.clone()), Path(journey.id))
            .await
            .unwrap();
        assert_eq!(detail.route.source.name, "North Terminal");
        assert_eq!(detail.route.destination.name, "South Terminal");
        assert_eq!(detail.train.train_type, "Intercity");
        assert_eq!(detail.train.train_capacity, 100);
        assert_eq!(detail.crew.len(), 1);
        assert_eq!(detail.crew[0].full_name, "Dana Willis");
        assert_eq!(detail.tickets_available, 99);
    }

    #[tokio::test]
    async fn test_unknown_journey_detail_is_not_found() {
        let state = test_state().await;

        let err = get_journey(State(state.clone()), Path(Uuid::new_v4()))
            .await
            .expect_err("no such journey");
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_order_endpoint_books_and_rejects_retake() {
        let state = test_state().await;
        let (journey, _) = seed_simple_journey(&state.db, 5, 20).await;
        let passenger = seed_passenger(&state.db).await;
        let claims = claims_for(&passenger);

        let request = CreateOrderRequest {
            tickets: vec![TicketRequest {
                cargo: 1,
                seat: 2,
                journey: journey.id,
            }],
        };

        let Json(created) = create_order(
            State(state.clone()),
            Extension(claims.clone()),
            Json(request),
        )
        .await
        .unwrap();
        assert_eq!(created.tickets.len(), 1);
        assert_eq!(created.tickets[0].journey, journey.id);

        let retry = CreateOrderRequest {
            tickets: vec![TicketRequest {
                cargo: 1,
                seat: 2,
                journey: journey.id,
            }],
        };
        let err = create_order(State(state.clone()), Extension(claims), Json(retry))
            .await
            .expect_err("seat already sold");
        assert!(matches!(err, AppError::OrderValidation(_)));
    }

    #[tokio::test]
    async fn test_zero_deadline_times_out_without_booking() {
        let mut config = test_config();
        config.booking_timeout_secs = 0;
        let state = AppState {
            db: crate::test_utils::setup_db().await,
            config,
        };
        let (journey, _) = seed_simple_journey(&state.db, 5, 20).await;
        let passenger = seed_passenger(&state.db).await;

        let err = create_order(
            State(state.clone()),
            Extension(claims_for(&passenger)),
            Json(CreateOrderRequest {
                tickets: vec![TicketRequest {
                    cargo: 1,
                    seat: 1,
                    journey: journey.id,
                }],
            }),
        )
        .await
        .expect_err("deadline is zero");
        assert!(matches!(err, AppError::Timeout(_)));

        let orders = order::Entity::find().count(&state.db).await.unwrap();
        assert_eq!(orders, 0);
    }

    #[tokio::test]
    async fn test_my_orders_scoped_paginated_newest_first() {
        let state = test_state().await;
        let db = &state.db;
        let (journey, _) = seed_simple_journey(db, 5, 20).await;
        let alice = seed_passenger(db).await;
        let bob = seed_passenger(db).await;

        let start = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        seed_order(db, &alice, &journey, &[(1, 1)], start).await;
        seed_order(
            db,
            &alice,
            &journey,
            &[(1, 2)],
            start + chrono::Duration::hours(1),
        )
        .await;
        seed_order(
            db,
            &alice,
            &journey,
            &[(1, 3)],
            start + chrono::Duration::hours(2),
        )
        .await;
        seed_order(db, &bob, &journey, &[(2, 1)], start).await;

        let Json(first_page) = my_orders(
            State(state.clone()),
            Extension(claims_for(&alice)),
            Query(OrderPageQuery {
                page: 1,
                page_size: 2,
            }),
        )
        .await
        .unwrap();
        assert_eq!(first_page.total, 3);
        assert_eq!(first_page.total_pages, 2);
        assert_eq!(first_page.items.len(), 2);
        assert_eq!(first_page.items[0].tickets[0].seat, 3);
        assert_eq!(first_page.items[1].tickets[0].seat, 2);
        assert_eq!(
            first_page.items[0].tickets[0].journey.route_name,
            "North Terminal to South Terminal"
        );

        let Json(second_page) = my_orders(
            State(state.clone()),
            Extension(claims_for(&alice)),
            Query(OrderPageQuery {
                page: 2,
                page_size: 2,
            }),
        )
        .await
        .unwrap();
        assert_eq!(second_page.items.len(), 1);
        assert_eq!(second_page.items[0].tickets[0].seat, 1);
    }

    #[tokio::test]
    async fn test_order_tickets_sorted_by_cargo_then_seat() {
        let state = test_state().await;
        let db = &state.db;
        let (journey, _) = seed_simple_journey(db, 5, 20).await;
        let alice = seed_passenger(db).await;

        let start = Utc.with_ymd_and_hms(2026, 5, 1, 10, 0, 0).unwrap();
        seed_order(db, &alice, &journey, &[(2, 1), (1, 5), (1, 2)], start).await;

        let Json(page) = my_orders(
            State(state.clone()),
            Extension(claims_for(&alice)),
            Query(OrderPageQuery {
                page: 1,
                page_size: 10,
            }),
        )
        .await
        .unwrap();

        let seats: Vec<(i32, i32)> = page.items[0]
            .tickets
            .iter()
            .map(|t| (t.cargo, t.seat))
            .collect();
        assert_eq!(seats, vec![(1, 2), (1, 5), (2, 1)]);
    }
}
