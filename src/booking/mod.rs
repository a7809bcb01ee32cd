use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::{ServiceError, NON_FIELD_ERRORS};
use crate::models::{Order, Ticket, Train};
use crate::schema::{orders, tickets, trains, trips};

pub const ORDER_PAGE_SIZE: i64 = 5;
pub const ORDER_MAX_PAGE_SIZE: i64 = 10;

/// One requested seat within an order.
#[derive(Debug, Clone, Deserialize)]
pub struct TicketSpec {
    pub cargo: i32,
    pub seat: i32,
    pub trip: i32,
}

/// Checks a seat request against the train layout. Runs once before the
/// write path and again inside the order transaction.
pub fn validate_seat(cargo: i32, seat: i32, train: &Train) -> Result<(), ServiceError> {
    let checks = [
        ("cargo", cargo, "cargo_num", train.cargo_num),
        ("seat", seat, "places_in_cargo", train.places_in_cargo),
    ];
    for (attribute, value, bound_name, bound) in checks {
        if !(1..=bound).contains(&value) {
            return Err(ServiceError::validation(
                attribute,
                format!(
                    "{} number must be in available range: (1, {}): (1, {})",
                    attribute, bound_name, bound
                ),
            ));
        }
    }
    Ok(())
}

fn validate_specs(specs: &[TicketSpec]) -> Result<(), ServiceError> {
    if specs.is_empty() {
        return Err(ServiceError::validation(
            "tickets",
            "This list may not be empty.",
        ));
    }
    Ok(())
}

/// Resolves the order list page parameters: page starts at 1, page size
/// defaults to 5 and is capped at 10.
pub fn order_page_bounds(
    page: Option<i64>,
    page_size: Option<i64>,
) -> Result<(i64, i64), ServiceError> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return Err(ServiceError::validation("page", "Invalid page."));
    }
    let size = page_size.unwrap_or(ORDER_PAGE_SIZE);
    if size < 1 {
        return Err(ServiceError::validation("page_size", "Invalid page size."));
    }
    Ok((page, size.min(ORDER_MAX_PAGE_SIZE)))
}

/// Creates an order and all its tickets in one serializable transaction.
/// Any failed ticket rolls back the whole order, so partial orders never
/// persist. The unique index on (trip_id, cargo, seat) is the final arbiter
/// between concurrent claims of the same seat.
pub fn place_order(
    conn: &mut PgConnection,
    user_id: Uuid,
    specs: &[TicketSpec],
) -> Result<(Order, Vec<Ticket>), ServiceError> {
    validate_specs(specs)?;

    conn.build_transaction().serializable().run(|conn| {
        let order: Order = diesel::insert_into(orders::table)
            .values((
                orders::created_at.eq(Utc::now()),
                orders::user_id.eq(user_id),
            ))
            .get_result(conn)?;

        let mut created = Vec::with_capacity(specs.len());
        for spec in specs {
            created.push(create_ticket(conn, order.id, spec)?);
        }
        Ok((order, created))
    })
}

fn create_ticket(
    conn: &mut PgConnection,
    order_id: i32,
    spec: &TicketSpec,
) -> Result<Ticket, ServiceError> {
    // Re-read the train inside the transaction; a validation result from
    // before the transaction opened must not be trusted at write time.
    let train: Train = trips::table
        .inner_join(trains::table)
        .filter(trips::id.eq(spec.trip))
        .select(Train::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(|| {
            ServiceError::validation(
                "trip",
                format!("Invalid pk \"{}\" - object does not exist.", spec.trip),
            )
        })?;

    validate_seat(spec.cargo, spec.seat, &train)?;

    diesel::insert_into(tickets::table)
        .values((
            tickets::cargo.eq(spec.cargo),
            tickets::seat.eq(spec.seat),
            tickets::trip_id.eq(spec.trip),
            tickets::order_id.eq(order_id),
        ))
        .get_result::<Ticket>(conn)
        .map_err(|err| match err {
            diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                ServiceError::conflict(
                    NON_FIELD_ERRORS,
                    "The fields trip, cargo, seat must make a unique set.",
                )
            }
            other => ServiceError::from(other),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn train(cargo_num: i32, places_in_cargo: i32) -> Train {
        Train {
            id: 1,
            name: "Test Train".to_string(),
            cargo_num,
            places_in_cargo,
            train_type_id: 1,
        }
    }

    #[test]
    fn seat_is_valid_iff_both_values_are_within_bounds() {
        let train = train(10, 20);
        for cargo in 0..=11 {
            for seat in 0..=21 {
                let in_bounds = (1..=10).contains(&cargo) && (1..=20).contains(&seat);
                assert_eq!(
                    validate_seat(cargo, seat, &train).is_ok(),
                    in_bounds,
                    "cargo={} seat={}",
                    cargo,
                    seat
                );
            }
        }
    }

    #[test]
    fn out_of_range_cargo_reports_the_bound() {
        let err = validate_seat(15, 1, &train(10, 20)).unwrap_err();
        match err {
            ServiceError::Validation { field, message } => {
                assert_eq!(field, "cargo");
                assert_eq!(
                    message,
                    "cargo number must be in available range: (1, cargo_num): (1, 10)"
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn out_of_range_seat_reports_the_bound() {
        let err = validate_seat(1, 25, &train(10, 20)).unwrap_err();
        match err {
            ServiceError::Validation { field, message } => {
                assert_eq!(field, "seat");
                assert_eq!(
                    message,
                    "seat number must be in available range: (1, places_in_cargo): (1, 20)"
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn cargo_is_checked_before_seat() {
        let err = validate_seat(0, 0, &train(10, 20)).unwrap_err();
        match err {
            ServiceError::Validation { field, .. } => assert_eq!(field, "cargo"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn empty_ticket_list_is_rejected() {
        let err = validate_specs(&[]).unwrap_err();
        match err {
            ServiceError::Validation { field, .. } => assert_eq!(field, "tickets"),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(validate_specs(&[TicketSpec {
            cargo: 1,
            seat: 1,
            trip: 1
        }])
        .is_ok());
    }

    #[test]
    fn order_page_defaults_and_cap() {
        assert_eq!(order_page_bounds(None, None).unwrap(), (1, 5));
        assert_eq!(order_page_bounds(Some(3), Some(8)).unwrap(), (3, 8));
        assert_eq!(order_page_bounds(None, Some(50)).unwrap(), (1, 10));
        assert!(order_page_bounds(Some(0), None).is_err());
        assert!(order_page_bounds(None, Some(0)).is_err());
    }
}
