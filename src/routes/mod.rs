pub mod catalog;
pub mod orders;
pub mod trips;

use serde::{Deserialize, Serialize};

use crate::models::Station;

/// Route row with its endpoint station names resolved, as rendered in
/// listings.
#[derive(Serialize, Debug)]
pub struct RouteListItem {
    pub id: i32,
    pub source: String,
    pub destination: String,
    pub distance: i32,
}

/// Route row with the full endpoint stations, as rendered in detail views.
#[derive(Serialize, Debug)]
pub struct RouteDetail {
    pub id: i32,
    pub source: Station,
    pub destination: Station,
    pub distance: i32,
}

/// A taken (cargo, seat) pair on a trip.
#[derive(Serialize, Debug)]
pub struct SeatRef {
    pub cargo: i32,
    pub seat: i32,
}

#[derive(Deserialize, Debug)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub page_size: Option<i64>,
}

#[derive(Serialize, Debug)]
pub struct Paginated<T> {
    pub count: i64,
    pub page: i64,
    pub page_size: i64,
    pub results: Vec<T>,
}
