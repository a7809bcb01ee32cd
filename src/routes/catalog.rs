use actix_web::{web, HttpRequest, HttpResponse};
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use serde::Serialize;

use std::collections::HashMap;

use crate::auth::{self, Action, Resource};
use crate::database::DbPool;
use crate::errors::ServiceError;
use crate::filters::{contains_pattern, RouteFilter};
use crate::models::{
    Crew, NewCrew, NewRoute, NewStation, NewTrain, NewTrainType, Route, Station, Train, TrainType,
};
use crate::routes::{RouteDetail, RouteListItem};
use crate::schema::{crew, routes, stations, train_types, trains};

#[derive(Serialize, Debug)]
pub struct CrewItem {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
}

#[derive(Serialize, Debug)]
pub struct TrainDetail {
    pub id: i32,
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    pub capacity: i64,
    pub train_type: TrainType,
}

fn check_route_endpoints(input: &NewRoute) -> Result<(), ServiceError> {
    if input.source_id == input.destination_id {
        return Err(ServiceError::non_field(
            "Source and destination stations cannot be the same",
        ));
    }
    Ok(())
}

fn check_min(field: &'static str, value: i32, min: i32) -> Result<(), ServiceError> {
    if value < min {
        return Err(ServiceError::validation(
            field,
            format!("Ensure this value is greater than or equal to {}.", min),
        ));
    }
    Ok(())
}

fn station_by_id(conn: &mut PgConnection, id: i32) -> Result<Option<Station>, ServiceError> {
    Ok(stations::table
        .find(id)
        .first::<Station>(conn)
        .optional()?)
}

// /stations

pub async fn list_stations(
    pool: web::Data<DbPool>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Stations)?;

    let rows = web::block(move || -> Result<Vec<Station>, ServiceError> {
        let mut conn = pool.get()?;
        Ok(stations::table
            .order(stations::id.asc())
            .load::<Station>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Ok().json(rows))
}

pub async fn get_station(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Stations)?;
    let id = path.into_inner();

    let station = web::block(move || -> Result<Station, ServiceError> {
        let mut conn = pool.get()?;
        station_by_id(&mut conn, id)?.ok_or(ServiceError::NotFound)
    })
    .await??;

    Ok(HttpResponse::Ok().json(station))
}

pub async fn create_station(
    pool: web::Data<DbPool>,
    body: web::Json<NewStation>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Stations)?;
    let new_station = body.into_inner();

    let station = web::block(move || -> Result<Station, ServiceError> {
        let mut conn = pool.get()?;
        diesel::insert_into(stations::table)
            .values(&new_station)
            .get_result::<Station>(&mut conn)
            .map_err(|err| match err {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    ServiceError::conflict("name", "station with this name already exists.")
                }
                other => ServiceError::from(other),
            })
    })
    .await??;

    Ok(HttpResponse::Created().json(station))
}

// /routes

pub async fn list_routes(
    pool: web::Data<DbPool>,
    filter: web::Query<RouteFilter>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Routes)?;
    let filter = filter.into_inner();

    let items = web::block(move || -> Result<Vec<RouteListItem>, ServiceError> {
        let mut conn = pool.get()?;

        let mut query = routes::table.into_boxed();
        if let Some(source) = &filter.source {
            query = query.filter(
                routes::source_id.eq_any(
                    stations::table
                        .filter(stations::name.ilike(contains_pattern(source)))
                        .select(stations::id),
                ),
            );
        }
        if let Some(destination) = &filter.destination {
            query = query.filter(
                routes::destination_id.eq_any(
                    stations::table
                        .filter(stations::name.ilike(contains_pattern(destination)))
                        .select(stations::id),
                ),
            );
        }

        let rows: Vec<Route> = query.order(routes::id.asc()).load(&mut conn)?;

        let mut station_ids: Vec<i32> = rows
            .iter()
            .flat_map(|route| [route.source_id, route.destination_id])
            .collect();
        station_ids.sort_unstable();
        station_ids.dedup();

        let names: HashMap<i32, String> = stations::table
            .filter(stations::id.eq_any(station_ids))
            .load::<Station>(&mut conn)?
            .into_iter()
            .map(|station| (station.id, station.name))
            .collect();

        Ok(rows
            .into_iter()
            .map(|route| RouteListItem {
                id: route.id,
                source: names.get(&route.source_id).cloned().unwrap_or_default(),
                destination: names
                    .get(&route.destination_id)
                    .cloned()
                    .unwrap_or_default(),
                distance: route.distance,
            })
            .collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(items))
}

pub async fn get_route(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Routes)?;
    let id = path.into_inner();

    let detail = web::block(move || -> Result<RouteDetail, ServiceError> {
        let mut conn = pool.get()?;
        let route: Route = routes::table
            .find(id)
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)?;
        let source = station_by_id(&mut conn, route.source_id)?.ok_or(ServiceError::NotFound)?;
        let destination =
            station_by_id(&mut conn, route.destination_id)?.ok_or(ServiceError::NotFound)?;
        Ok(RouteDetail {
            id: route.id,
            source,
            destination,
            distance: route.distance,
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(detail))
}

pub async fn create_route(
    pool: web::Data<DbPool>,
    body: web::Json<NewRoute>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Routes)?;
    let new_route = body.into_inner();

    check_route_endpoints(&new_route)?;
    check_min("distance", new_route.distance, 0)?;

    let route = web::block(move || -> Result<Route, ServiceError> {
        let mut conn = pool.get()?;
        if station_by_id(&mut conn, new_route.source_id)?.is_none() {
            return Err(ServiceError::validation(
                "source",
                format!(
                    "Invalid pk \"{}\" - object does not exist.",
                    new_route.source_id
                ),
            ));
        }
        if station_by_id(&mut conn, new_route.destination_id)?.is_none() {
            return Err(ServiceError::validation(
                "destination",
                format!(
                    "Invalid pk \"{}\" - object does not exist.",
                    new_route.destination_id
                ),
            ));
        }
        Ok(diesel::insert_into(routes::table)
            .values(&new_route)
            .get_result::<Route>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Created().json(route))
}

// /train_types

pub async fn list_train_types(
    pool: web::Data<DbPool>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::TrainTypes)?;

    let rows = web::block(move || -> Result<Vec<TrainType>, ServiceError> {
        let mut conn = pool.get()?;
        Ok(train_types::table
            .order(train_types::id.asc())
            .load::<TrainType>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Ok().json(rows))
}

pub async fn create_train_type(
    pool: web::Data<DbPool>,
    body: web::Json<NewTrainType>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::TrainTypes)?;
    let new_type = body.into_inner();

    let train_type = web::block(move || -> Result<TrainType, ServiceError> {
        let mut conn = pool.get()?;
        Ok(diesel::insert_into(train_types::table)
            .values(&new_type)
            .get_result::<TrainType>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Created().json(train_type))
}

// /trains

fn check_train_input(conn: &mut PgConnection, input: &NewTrain) -> Result<(), ServiceError> {
    check_min("cargo_num", input.cargo_num, 1)?;
    check_min("places_in_cargo", input.places_in_cargo, 1)?;
    let known: Option<TrainType> = train_types::table
        .find(input.train_type_id)
        .first(conn)
        .optional()?;
    if known.is_none() {
        return Err(ServiceError::validation(
            "train_type",
            format!(
                "Invalid pk \"{}\" - object does not exist.",
                input.train_type_id
            ),
        ));
    }
    Ok(())
}

pub async fn list_trains(
    pool: web::Data<DbPool>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Trains)?;

    let rows = web::block(move || -> Result<Vec<Train>, ServiceError> {
        let mut conn = pool.get()?;
        Ok(trains::table
            .order(trains::id.asc())
            .load::<Train>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Ok().json(rows))
}

pub async fn get_train(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Trains)?;
    let id = path.into_inner();

    let detail = web::block(move || -> Result<TrainDetail, ServiceError> {
        let mut conn = pool.get()?;
        let (train, train_type): (Train, TrainType) = trains::table
            .inner_join(train_types::table)
            .filter(trains::id.eq(id))
            .select((Train::as_select(), TrainType::as_select()))
            .first(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)?;
        Ok(TrainDetail {
            id: train.id,
            capacity: train.capacity(),
            name: train.name,
            cargo_num: train.cargo_num,
            places_in_cargo: train.places_in_cargo,
            train_type,
        })
    })
    .await??;

    Ok(HttpResponse::Ok().json(detail))
}

pub async fn create_train(
    pool: web::Data<DbPool>,
    body: web::Json<NewTrain>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Trains)?;
    let new_train = body.into_inner();

    let train = web::block(move || -> Result<Train, ServiceError> {
        let mut conn = pool.get()?;
        check_train_input(&mut conn, &new_train)?;
        Ok(diesel::insert_into(trains::table)
            .values(&new_train)
            .get_result::<Train>(&mut conn)?)
    })
    .await??;

    Ok(HttpResponse::Created().json(train))
}

pub async fn update_train(
    pool: web::Data<DbPool>,
    path: web::Path<i32>,
    body: web::Json<NewTrain>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Trains)?;
    let id = path.into_inner();
    let changes = body.into_inner();

    let train = web::block(move || -> Result<Train, ServiceError> {
        let mut conn = pool.get()?;
        check_train_input(&mut conn, &changes)?;
        diesel::update(trains::table.find(id))
            .set(&changes)
            .get_result::<Train>(&mut conn)
            .optional()?
            .ok_or(ServiceError::NotFound)
    })
    .await??;

    Ok(HttpResponse::Ok().json(train))
}

// /crew

pub async fn list_crew(
    pool: web::Data<DbPool>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Crew)?;

    let items = web::block(move || -> Result<Vec<CrewItem>, ServiceError> {
        let mut conn = pool.get()?;
        let rows: Vec<Crew> = crew::table.order(crew::id.asc()).load(&mut conn)?;
        Ok(rows
            .into_iter()
            .map(|member| CrewItem {
                id: member.id,
                full_name: member.full_name(),
                first_name: member.first_name,
                last_name: member.last_name,
            })
            .collect())
    })
    .await??;

    Ok(HttpResponse::Ok().json(items))
}

pub async fn create_crew(
    pool: web::Data<DbPool>,
    body: web::Json<NewCrew>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Crew)?;
    let new_crew = body.into_inner();

    let item = web::block(move || -> Result<CrewItem, ServiceError> {
        let mut conn = pool.get()?;
        let member: Crew = diesel::insert_into(crew::table)
            .values(&new_crew)
            .get_result(&mut conn)?;
        Ok(CrewItem {
            id: member.id,
            full_name: member.full_name(),
            first_name: member.first_name,
            last_name: member.last_name,
        })
    })
    .await??;

    Ok(HttpResponse::Created().json(item))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn route_endpoints_must_differ() {
        let same = NewRoute {
            source_id: 3,
            destination_id: 3,
            distance: 100,
        };
        match check_route_endpoints(&same).unwrap_err() {
            ServiceError::Validation { field, message } => {
                assert_eq!(field, crate::errors::NON_FIELD_ERRORS);
                assert_eq!(message, "Source and destination stations cannot be the same");
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let distinct = NewRoute {
            source_id: 3,
            destination_id: 4,
            distance: 100,
        };
        assert!(check_route_endpoints(&distinct).is_ok());
    }

    #[test]
    fn check_min_bounds() {
        assert!(check_min("distance", 0, 0).is_ok());
        assert!(check_min("cargo_num", 1, 1).is_ok());
        match check_min("cargo_num", 0, 1).unwrap_err() {
            ServiceError::Validation { field, message } => {
                assert_eq!(field, "cargo_num");
                assert_eq!(message, "Ensure this value is greater than or equal to 1.");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
