use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect,
};
use uuid::Uuid;

use crate::entities::{ticket, train};

/// Committed ticket counts per journey, one grouped query for a whole listing.
/// Journeys without tickets are simply absent from the map.
pub async fn ticket_counts<C>(db: &C, journey_ids: &[Uuid]) -> Result<HashMap<Uuid, i64>, DbErr>
where
    C: ConnectionTrait,
{
    if journey_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rows: Vec<(Uuid, i64)> = ticket::Entity::find()
        .select_only()
        .column(ticket::Column::JourneyId)
        .column_as(ticket::Column::Id.count(), "ticket_count")
        .filter(ticket::Column::JourneyId.is_in(journey_ids.iter().copied()))
        .group_by(ticket::Column::JourneyId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows.into_iter().collect())
}

/// Open seats on one journey, derived from the train currently serving it
pub async fn tickets_available<C>(
    db: &C,
    journey_id: Uuid,
    train: &train::Model,
) -> Result<i64, DbErr>
where
    C: ConnectionTrait,
{
    let sold = ticket::Entity::find()
        .filter(ticket::Column::JourneyId.eq(journey_id))
        .count(db)
        .await?;

    Ok(train.capacity() - sold as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::test_utils::{seed_simple_journey, sell_seats, setup_db};

    #[tokio::test]
    async fn test_fresh_journey_offers_full_capacity() {
        let db = setup_db().await;
        let (journey, train) = seed_simple_journey(&db, 10, 50).await;

        let available = tickets_available(&db, journey.id, &train).await.unwrap();
        assert_eq!(available, 500);
    }

    #[tokio::test]
    async fn test_availability_drops_as_seats_sell() {
        let db = setup_db().await;
        let (journey, train) = seed_simple_journey(&db, 10, 50).await;
        sell_seats(&db, &journey, &[(1, 1), (1, 2), (2, 1)]).await;

        let available = tickets_available(&db, journey.id, &train).await.unwrap();
        assert_eq!(available, 497);
    }

    #[tokio::test]
    async fn test_zero_dimension_train_has_nothing_to_sell() {
        let db = setup_db().await;
        let (journey, train) = seed_simple_journey(&db, 0, 50).await;

        assert_eq!(train.capacity(), 0);
        let available = tickets_available(&db, journey.id, &train).await.unwrap();
        assert_eq!(available, 0);
    }

    #[tokio::test]
    async fn test_grouped_counts_one_entry_per_booked_journey() {
        let db = setup_db().await;
        let (busy, _) = seed_simple_journey(&db, 5, 20).await;
        let (quiet, _) = seed_simple_journey(&db, 5, 20).await;
        let (empty, _) = seed_simple_journey(&db, 5, 20).await;

        sell_seats(&db, &busy, &[(1, 1), (1, 2), (1, 3)]).await;
        sell_seats(&db, &quiet, &[(2, 5)]).await;

        let counts = ticket_counts(&db, &[busy.id, quiet.id, empty.id])
            .await
            .unwrap();

        assert_eq!(counts.get(&busy.id), Some(&3));
        assert_eq!(counts.get(&quiet.id), Some(&1));
        assert_eq!(counts.get(&empty.id), None);
    }

    #[tokio::test]
    async fn test_counts_scoped_to_requested_journeys() {
        let db = setup_db().await;
        let (inside, _) = seed_simple_journey(&db, 5, 20).await;
        let (outside, _) = seed_simple_journey(&db, 5, 20).await;

        sell_seats(&db, &inside, &[(1, 1)]).await;
        sell_seats(&db, &outside, &[(1, 1)]).await;

        let counts = ticket_counts(&db, &[inside.id]).await.unwrap();
        assert_eq!(counts.len(), 1);
        assert!(counts.contains_key(&inside.id));
    }

    #[tokio::test]
    async fn test_empty_journey_list_needs_no_query() {
        let db = setup_db().await;
        let counts = ticket_counts(&db, &[]).await.unwrap();
        assert!(counts.is_empty());
    }
}
