use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{crew, orders, routes, stations, tickets, train_types, trains, trips, users};

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub token: Option<String>,
    pub is_admin: bool,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = stations)]
pub struct Station {
    pub id: i32,
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Deserialize, Insertable, Debug)]
#[diesel(table_name = stations)]
pub struct NewStation {
    pub name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = routes)]
pub struct Route {
    pub id: i32,
    pub source_id: i32,
    pub destination_id: i32,
    pub distance: i32,
}

#[derive(Deserialize, Insertable, Debug)]
#[diesel(table_name = routes)]
pub struct NewRoute {
    #[serde(rename = "source")]
    #[diesel(column_name = source_id)]
    pub source_id: i32,
    #[serde(rename = "destination")]
    #[diesel(column_name = destination_id)]
    pub destination_id: i32,
    pub distance: i32,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = train_types)]
pub struct TrainType {
    pub id: i32,
    pub name: String,
}

#[derive(Deserialize, Insertable, Debug)]
#[diesel(table_name = train_types)]
pub struct NewTrainType {
    pub name: String,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = trains)]
pub struct Train {
    pub id: i32,
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    #[serde(rename = "train_type")]
    pub train_type_id: i32,
}

impl Train {
    pub fn capacity(&self) -> i64 {
        self.cargo_num as i64 * self.places_in_cargo as i64
    }
}

#[derive(Deserialize, Insertable, AsChangeset, Debug)]
#[diesel(table_name = trains)]
pub struct NewTrain {
    pub name: String,
    pub cargo_num: i32,
    pub places_in_cargo: i32,
    #[serde(rename = "train_type")]
    #[diesel(column_name = train_type_id)]
    pub train_type_id: i32,
}

#[derive(Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = crew)]
pub struct Crew {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
}

impl Crew {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Deserialize, Insertable, Debug)]
#[diesel(table_name = crew)]
pub struct NewCrew {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = trips)]
pub struct Trip {
    pub id: i32,
    #[serde(rename = "route")]
    pub route_id: i32,
    #[serde(rename = "train")]
    pub train_id: i32,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Deserialize, Insertable, AsChangeset, Debug)]
#[diesel(table_name = trips)]
pub struct NewTrip {
    #[serde(rename = "route")]
    #[diesel(column_name = route_id)]
    pub route_id: i32,
    #[serde(rename = "train")]
    #[diesel(column_name = train_id)]
    pub train_id: i32,
    pub departure_time: DateTime<Utc>,
    pub arrival_time: DateTime<Utc>,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = orders)]
pub struct Order {
    pub id: i32,
    pub created_at: DateTime<Utc>,
    #[serde(skip)]
    pub user_id: Uuid,
}

#[derive(Serialize, Queryable, Selectable, Debug, Clone)]
#[diesel(table_name = tickets)]
pub struct Ticket {
    pub id: i32,
    pub cargo: i32,
    pub seat: i32,
    #[serde(rename = "trip")]
    pub trip_id: i32,
    #[serde(skip)]
    pub order_id: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_capacity_is_cargo_times_places() {
        let train = Train {
            id: 1,
            name: "Test Train".to_string(),
            cargo_num: 10,
            places_in_cargo: 20,
            train_type_id: 1,
        };
        assert_eq!(train.capacity(), 200);
    }

    #[test]
    fn crew_full_name_concatenates() {
        let crew = Crew {
            id: 1,
            first_name: "Test".to_string(),
            last_name: "Crew".to_string(),
        };
        assert_eq!(crew.full_name(), "Test Crew");
    }
}
