use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use std::collections::HashMap;

use crate::auth::{self, Action, Resource};
use crate::database::DbPool;
use crate::errors::ServiceError;
use crate::filters::{contains_pattern, TripFilter};
use crate::models::{NewTrip, Route, Station, Train, Trip};
use crate::routes::{RouteDetail, RouteListItem, SeatRef};
use crate::schema::{routes, stations, tickets, trains, trips};

#[derive(Serialize, Debug)]
pub struct TripListItem {
    pub id: i32,
    pub route: RouteListItem,
    pub train_name: String,
    pub train_capacity: i64,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub tickets_available: i64,
}

#[derive(Serialize, Debug)]
pub struct TripDetail {
    pub id: i32,
    pub route: RouteDetail,
    pub train: Train,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
    pub taken_places: Vec<SeatRef>,
    pub tickets_available: i64,
}

fn check_time_order(input: &NewTrip) -> Result<(), ServiceError> {
    if input.departure_time >= input.arrival_time {
        return Err(ServiceError::non_field(
            "Departure time must be before arrival time.",
        ));
    }
    Ok(())
}

fn check_trip_references(conn: &mut PgConnection, input: &NewTrip) -> Result<(), ServiceError> {
    let route: Option<Route> = routes::table.find(input.route_id).first(conn).optional()?;
    if route.is_none() {
        return Err(ServiceError::validation(
            "route",
            format!("Invalid pk \"{}\" - object does not exist.", input.route_id),
        ));
    }
    let train: Option<Train> = trains::table.find(input.train_id).first(conn).optional()?;
    if train.is_none() {
        return Err(ServiceError::validation(
            "train",
            format!("Invalid pk \"{}\" - object does not exist.", input.train_id),
        ));
    }
    Ok(())
}

// GET /trips
//
// Upcoming trips only, AND-composed optional filters on departure day and
// endpoint station names. The ticket count rides along as a correlated
// subquery so capacity and count come from one statement.
pub async fn list_trips(
    pool: web::Data<DbPool>,
    filter: web::Query<TripFilter>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Trips)?;

    let filter = filter.into_inner();
    let window = filter.departure_window()?;

    let items = web::block(move || -> Result<Vec<TripListItem>, ServiceError> {
        let mut conn = pool.get()?;

        let sold = tickets::table
            .filter(tickets::trip_id.eq(trips::id))
            .count()
            .single_value();

        let mut query = trips::table
            .inner_join(trains::table)
            .select((Trip::as_select(), Train::as_select(), sold))
            .filter(trips::departure_time.gt(Utc::now()))
            .into_boxed();

        if let Some((start, end)) = window {
            query = query
                .filter(trips::departure_time.ge(start))
                .filter(trips::departure_time.lt(end));
        }
        if let Some(source) = &filter.source {
            query = query.filter(
                trips::route_id.eq_any(
                    routes::table
                        .filter(
                            routes::source_id.eq_any(
                                stations::table
                                    .filter(stations::name.ilike(contains_pattern(source)))
                                    .select(stations::id),
                            ),
                        )
                        .select(routes::id),
                ),
            );
        }
        if let Some(destination) = &filter.destination {
            query = query.filter(
                trips::route_id.eq_any(
                    routes::table
                        .filter(
                            routes::destination_id.eq_any(
                                stations::table
                                    .filter(stations::name.ilike(contains_pattern(destination)))
                                    .select(stations::id),
                            ),
                        )
                        .select(routes::id),
                ),
            );
        }

        let rows: Vec<(Trip, Train, Option<i64>)> = query
            .order(trips::departure_time.asc())
            .load(&mut conn)?;

        let mut route_ids: Vec<i32> = rows.iter().map(|(trip, _, _)| trip.route_id).collect();
        route_ids.sort_unstable();
        route_ids.dedup();

        let route_map: HashMap<i32, Route> = routes::table
            .filter(routes::id.eq_any(route_ids))
            .load::<Route>(&mut conn)?
            .into_iter()
            .map(|route| (route.id, route))
            .collect();

        let mut station_ids: Vec<i32> = route_map
            .values()
            .flat_map(|route| [route.source_id, route.destination_id])
            .collect();
        station_ids.sort_unstable();
        station_ids.dedup();

        let station_names: HashMap<i32, String> = stations::table
            .filter(stations::id.eq_any(station_ids))
            .load::<Station>(&mut conn)?
            .into_iter()
            .map(|station| (station.id, station.name))
            .collect();

        Ok(rows
            .into_iter()
            .filter_map(|(trip, train, sold)| {
                let route = route_map.get(&trip.route_id)?;
                Some(TripListItem {
                    id: trip.id,
                    route: RouteListItem {
                        id: route.id,
                        source: station_names
                            .get(&route.source_id)
                            .cloned()
                            .unwrap_or_default(),
                        destination: station_names
                            .get(&route.destination_id)
                            .cloned()
                            .unwrap_or_default(),
                        distance: route.distance,
                    },
                    train_name: train.name.clone(),
                    train_capacity: train.capacity(),
                    departure_time: trip.departure_time,
                    arrival_time: trip.arrival_time,
                    tickets_available: train.capacity() - sold.unwrap_or(0),
                })
            })
            .collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(items))
}

// GET /trips/{id}
pub async fn get_trip(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Trips)?;
    let id = path.into_inner();

    let detail = web::block(move || -> Result<TripDetail, ServiceError> {
        let mut conn = pool.get()?;

        let sold = tickets::table
            .filter(tickets::trip_id.eq(trips::id))
            .count()
            .single_value();

        let (trip, train, sold): (Trip, Train, Option<i64>) = trips::table
            .inner_join(trains::table)
            .select((Trip::as_select(), Train::as_select(), sold))
            .filter(trips::id.eq(id))
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        let route: Route = routes::table
            .find(trip.route_id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)?;
        let source: Station = stations::table
            .find(route.source_id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)?;
        let destination: Station = stations::table
            .find(route.destination_id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)?;

        let taken_places: Vec<SeatRef> = tickets::table
            .filter(tickets::trip_id.eq(trip.id))
            .order((tickets::cargo.asc(), tickets::seat.asc()))
            .select((tickets::cargo, tickets::seat))
            .load::<(i32, i32)>(&mut conn)?
            .into_iter()
            .map(|(cargo, seat)| SeatRef { cargo, seat })
            .collect();

        Ok(TripDetail {
            id: trip.id,
            route: RouteDetail {
                id: route.id,
                source,
                destination,
                distance: route.distance,
            },
            tickets_available: train.capacity() - sold.unwrap_or(0),
            train,
            departure_time: trip.departure_time,
            arrival_time: trip.arrival_time,
            taken_places,
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(detail))
}

// POST /trips
pub async fn create_trip(
    pool: web::Data<DbPool>,
    body: web::Json<NewTrip>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Trips)?;
    let new_trip = body.into_inner();
    check_time_order(&new_trip)?;

    let trip = web::block(move || -> Result<Trip, ServiceError> {
        let mut conn = pool.get()?;
        check_trip_references(&mut conn, &new_trip)?;
        Ok(diesel::insert_into(trips::table)
            .values(&new_trip)
            .get_result::<Trip>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Created().json(trip))
}

// PUT /trips/{id}
pub async fn update_trip(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    body: web::Json<NewTrip>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Trips)?;
    let id = path.into_inner();
    let changes = body.into_inner();
    check_time_order(&changes)?;

    let trip = web::block(move || -> Result<Trip, ServiceError> {
        let mut conn = pool.get()?;
        check_trip_references(&mut conn, &changes)?;
        diesel::update(trips::table.find(id))
            .set(&changes)
            .get_result::<Trip>(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)
    })
    .await??;

    Ok(HttpResponse::Ok().json(trip))
}

// DELETE /trips/{id}
pub async fn delete_trip(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Trips)?;
    let id = path.into_inner();

    web::block(move || -> Result<(), ServiceError> {
        let mut conn = pool.get()?;
        let deleted = diesel::delete(trips::table.find(id)).execute(&mut conn)?;
        if deleted == 0 {
            return Err(ServiceError::NotFound);
        }
        Ok(())
    })
    .await??;

    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trip_input(departure: &str, arrival: &str) -> NewTrip {
        NewTrip {
            route_id: 1,
            train_id: 1,
            departure_time: departure.parse().unwrap(),
            arrival_time: arrival.parse().unwrap(),
        }
    }

    #[test]
    fn departure_must_precede_arrival() {
        let ok = trip_input("2025-01-10T11:30:00Z", "2025-01-10T15:00:00Z");
        assert!(check_time_order(&ok).is_ok());

        let equal = trip_input("2025-01-10T11:30:00Z", "2025-01-10T11:30:00Z");
        let reversed = trip_input("2025-01-10T15:00:00Z", "2025-01-10T11:30:00Z");
        for input in [equal, reversed] {
            match check_time_order(&input).unwrap_err() {
                ServiceError::Validation { field, message } => {
                    assert_eq!(field, crate::errors::NON_FIELD_ERRORS);
                    assert_eq!(message, "Departure time must be before arrival time.");
                }
                other => panic!("unexpected error: {:?}", other),
            }
        }
    }
}
