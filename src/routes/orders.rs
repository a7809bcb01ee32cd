use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use crate::auth::{self, Action, Resource};
use crate::booking::{self, TicketSpec};
use crate::database::DbPool;
use crate::errors::ServiceError;
use crate::models::{Order, Ticket, Trip};
use crate::routes::{PageQuery, Paginated};
use crate::schema::{orders, tickets, trips};

#[derive(Deserialize, Debug)]
pub struct OrderRequest {
    pub tickets: Vec<TicketSpec>,
}

#[derive(Serialize, Debug)]
pub struct OrderResponse {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<Ticket>,
}

#[derive(Serialize, Debug)]
pub struct TicketWithTrip {
    pub id: i32,
    pub cargo: i32,
    pub seat: i32,
    pub trip: Trip,
}

#[derive(Serialize, Debug)]
pub struct OrderListItem {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    pub tickets: Vec<TicketWithTrip>,
}

// GET /orders
//
// Always scoped to the requesting identity, newest first.
pub async fn list_orders(
    pool: web::Data<DbPool>,
    query: web::Query<PageQuery>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Read, Resource::Orders)?;
    let (page, page_size) = booking::order_page_bounds(query.page, query.page_size)?;
    let user_id = identity.user_id;

    let body = web::block(
        move || -> Result<Paginated<OrderListItem>, ServiceError> {
            let mut conn = pool.get()?;

            let count: i64 = orders::table
                .filter(orders::user_id.eq(user_id))
                .count()
                .get_result(&mut conn)?;

            let page_rows: Vec<Order> = orders::table
                .filter(orders::user_id.eq(user_id))
                .order(orders::created_at.desc())
                .offset((page - 1) * page_size)
                .limit(page_size)
                .load(&mut conn)?;

            let order_ids: Vec<i32> = page_rows.iter().map(|order| order.id).collect();

            let ticket_rows: Vec<Ticket> = tickets::table
                .filter(tickets::order_id.eq_any(order_ids))
                .order((tickets::cargo.asc(), tickets::seat.asc()))
                .load(&mut conn)?;

            let mut trip_ids: Vec<i32> = ticket_rows.iter().map(|ticket| ticket.trip_id).collect();
            trip_ids.sort_unstable();
            trip_ids.dedup();

            let trip_map: HashMap<i32, Trip> = trips::table
                .filter(trips::id.eq_any(trip_ids))
                .load::<Trip>(&mut conn)?
                .into_iter()
                .map(|trip| (trip.id, trip))
                .collect();

            let mut by_order: HashMap<i32, Vec<TicketWithTrip>> = HashMap::new();
            for ticket in ticket_rows {
                if let Some(trip) = trip_map.get(&ticket.trip_id) {
                    by_order
                        .entry(ticket.order_id)
                        .or_default()
                        .push(TicketWithTrip {
                            id: ticket.id,
                            cargo: ticket.cargo,
                            seat: ticket.seat,
                            trip: trip.clone(),
                        });
                }
            }

            let results = page_rows
                .into_iter()
                .map(|order| OrderListItem {
                    id: order.id,
                    created_at: order.created_at,
                    tickets: by_order.remove(&order.id).unwrap_or_default(),
                })
                .collect();

            Ok(Paginated {
                count,
                page,
                page_size,
                results,
            })
        },
    )
    .await??;

    Ok(HttpResponse::Ok().json(body))
}

// POST /orders
//
// The whole order is one transaction; see booking::place_order.
pub async fn create_order(
    pool: web::Data<DbPool>,
    body: web::Json<OrderRequest>,
    req: HttpRequest,
) -> Result<HttpResponse, ServiceError> {
    let identity = auth::authenticate(&pool, &req).await?;
    auth::require(&identity, Action::Write, Resource::Orders)?;
    let specs = body.into_inner().tickets;
    let user_id = identity.user_id;

    let (order, created) = web::block(move || -> Result<(Order, Vec<Ticket>), ServiceError> {
        let mut conn = pool.get()?;
        booking::place_order(&mut conn, user_id, &specs)
    })
    .await??;

    Ok(HttpResponse::Created().json(OrderResponse {
        id: order.id,
        created_at: order.created_at,
        tickets: created,
    }))
}
