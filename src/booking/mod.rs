pub mod availability;

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::is_unique_violation;
use crate::entities::{journey, order, ticket, train};

// ============ Types ============

/// One requested seat within an order
#[derive(Debug, Clone, Deserialize)]
pub struct TicketRequest {
    pub cargo: i32,
    pub seat: i32,
    pub journey: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketField {
    Journey,
    Cargo,
    Seat,
}

/// A rejected ticket, reported against its position in the request batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TicketViolation {
    pub index: usize,
    pub field: TicketField,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("order must contain at least one ticket")]
    EmptyOrder,

    #[error("{} ticket request(s) failed validation", .0.len())]
    Invalid(Vec<TicketViolation>),

    #[error("seat {seat} in cargo {cargo} on journey {journey} is already taken")]
    SeatTaken {
        index: usize,
        journey: Uuid,
        cargo: i32,
        seat: i32,
    },

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

// ============ Order creation ============

/// Create an order with all requested tickets, or nothing at all.
///
/// Validation and inserts run inside a single transaction. Seats lost to a
/// concurrent order surface either as an "already taken" violation (seen
/// during validation) or as `SeatTaken` when the unique index rejects the
/// insert at commit time.
pub async fn create_order(
    db: &DatabaseConnection,
    user_id: Uuid,
    requests: &[TicketRequest],
) -> Result<(order::Model, Vec<ticket::Model>), BookingError> {
    if requests.is_empty() {
        return Err(BookingError::EmptyOrder);
    }

    let txn = db.begin().await?;

    let journey_ids: Vec<Uuid> = requests
        .iter()
        .map(|r| r.journey)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let journeys = journey::Entity::find()
        .filter(journey::Column::Id.is_in(journey_ids.iter().copied()))
        .all(&txn)
        .await?;

    let train_ids: Vec<i32> = journeys
        .iter()
        .map(|j| j.train_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();

    let trains: HashMap<i32, train::Model> = train::Entity::find()
        .filter(train::Column::Id.is_in(train_ids))
        .all(&txn)
        .await?
        .into_iter()
        .map(|t| (t.id, t))
        .collect();

    // Seat bounds come from the train serving each journey
    let trains_by_journey: HashMap<Uuid, train::Model> = journeys
        .iter()
        .filter_map(|j| trains.get(&j.train_id).map(|t| (j.id, t.clone())))
        .collect();

    let taken: HashSet<(Uuid, i32, i32)> = ticket::Entity::find()
        .select_only()
        .column(ticket::Column::JourneyId)
        .column(ticket::Column::Cargo)
        .column(ticket::Column::Seat)
        .filter(ticket::Column::JourneyId.is_in(journey_ids))
        .into_tuple::<(Uuid, i32, i32)>()
        .all(&txn)
        .await?
        .into_iter()
        .collect();

    let violations = validate_requests(requests, &trains_by_journey, &taken);
    if !violations.is_empty() {
        txn.rollback().await?;
        return Err(BookingError::Invalid(violations));
    }

    let (created, tickets) = match insert_order_rows(&txn, user_id, requests).await {
        Ok(rows) => rows,
        Err(err) => {
            txn.rollback().await?;
            return Err(err);
        }
    };

    txn.commit().await?;

    tracing::info!(
        order_id = %created.id,
        user_id = %user_id,
        tickets = tickets.len(),
        "Order committed"
    );

    Ok((created, tickets))
}

/// Write the order row and its tickets; a unique-index rejection becomes `SeatTaken`
async fn insert_order_rows(
    txn: &DatabaseTransaction,
    user_id: Uuid,
    requests: &[TicketRequest],
) -> Result<(order::Model, Vec<ticket::Model>), BookingError> {
    let new_order = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        created_at: Set(Utc::now().into()),
    };
    let created = new_order.insert(txn).await?;

    let mut tickets = Vec::with_capacity(requests.len());
    for (index, request) in requests.iter().enumerate() {
        let new_ticket = ticket::ActiveModel {
            id: Set(Uuid::new_v4()),
            cargo: Set(request.cargo),
            seat: Set(request.seat),
            journey_id: Set(request.journey),
            order_id: Set(created.id),
        };

        match new_ticket.insert(txn).await {
            Ok(ticket) => tickets.push(ticket),
            Err(err) if is_unique_violation(&err) => {
                // A concurrent order committed this seat after our validation read
                tracing::warn!(
                    journey = %request.journey,
                    cargo = request.cargo,
                    seat = request.seat,
                    "Seat lost to a concurrent order"
                );
                return Err(BookingError::SeatTaken {
                    index,
                    journey: request.journey,
                    cargo: request.cargo,
                    seat: request.seat,
                });
            }
            Err(err) => return Err(err.into()),
        }
    }

    Ok((created, tickets))
}

/// Collect every violation in the batch so the caller can fix them in one go
fn validate_requests(
    requests: &[TicketRequest],
    trains_by_journey: &HashMap<Uuid, train::Model>,
    taken: &HashSet<(Uuid, i32, i32)>,
) -> Vec<TicketViolation> {
    let mut violations = Vec::new();
    let mut seen_in_batch = HashSet::new();

    for (index, request) in requests.iter().enumerate() {
        let Some(train) = trains_by_journey.get(&request.journey) else {
            violations.push(TicketViolation {
                index,
                field: TicketField::Journey,
                message: format!("journey {} does not exist", request.journey),
            });
            continue;
        };

        let mut in_range = true;

        if !(1..=train.cargo_num).contains(&request.cargo) {
            in_range = false;
            violations.push(TicketViolation {
                index,
                field: TicketField::Cargo,
                message: format!(
                    "cargo number must be in available range: (1, cargo_num): (1, {})",
                    train.cargo_num
                ),
            });
        }

        if !(1..=train.places_in_cargo).contains(&request.seat) {
            in_range = false;
            violations.push(TicketViolation {
                index,
                field: TicketField::Seat,
                message: format!(
                    "seat number must be in available range: (1, places_in_cargo): (1, {})",
                    train.places_in_cargo
                ),
            });
        }

        if !in_range {
            continue;
        }

        let key = (request.journey, request.cargo, request.seat);
        if taken.contains(&key) {
            violations.push(TicketViolation {
                index,
                field: TicketField::Seat,
                message: format!(
                    "seat {} in cargo {} is already taken",
                    request.seat, request.cargo
                ),
            });
        } else if !seen_in_batch.insert(key) {
            violations.push(TicketViolation {
                index,
                field: TicketField::Seat,
                message: format!(
                    "seat {} in cargo {} is duplicated within this order",
                    request.seat, request.cargo
                ),
            });
        }
    }

    violations
}
