mod auth;
mod booking;
mod database;
mod errors;
mod filters;
mod models;
mod routes;
mod schema;

use actix_web::{web, App, HttpServer};
use actix_web_prom::PrometheusMetricsBuilder;
use clap::Parser;
use log::info;

use routes::{catalog, orders, trips};

#[derive(Parser, Debug)]
#[clap(name = "train-booking")]
#[clap(version = "0.1.0")]
#[clap(about = "train ticket booking backend with seat reservation", long_about = None)]
pub struct Args {
    #[clap(long, default_value_t = String::from("127.0.0.1"))]
    pub host: String,

    #[clap(short, long, default_value_t = 8080)]
    pub port: u16,

    #[clap(short, long, action)]
    pub verbose: bool,
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::from_default_env()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::init();
    }

    let pool = database::create_pool()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err))?;

    let prometheus = PrometheusMetricsBuilder::new("train_booking")
        .endpoint("/metrics")
        .build()
        .map_err(|err| std::io::Error::new(std::io::ErrorKind::Other, err.to_string()))?;

    info!("Listening on: {}:{}", &args.host, args.port);

    HttpServer::new(move || {
        App::new()
            .wrap(prometheus.clone())
            .app_data(web::Data::new(pool.clone()))
            .route("/stations", web::get().to(catalog::list_stations))
            .route("/stations", web::post().to(catalog::create_station))
            .route("/stations/{id}", web::get().to(catalog::get_station))
            .route("/routes", web::get().to(catalog::list_routes))
            .route("/routes", web::post().to(catalog::create_route))
            .route("/routes/{id}", web::get().to(catalog::get_route))
            .route("/train_types", web::get().to(catalog::list_train_types))
            .route("/train_types", web::post().to(catalog::create_train_type))
            .route("/trains", web::get().to(catalog::list_trains))
            .route("/trains", web::post().to(catalog::create_train))
            .route("/trains/{id}", web::get().to(catalog::get_train))
            .route("/trains/{id}", web::put().to(catalog::update_train))
            .route("/crew", web::get().to(catalog::list_crew))
            .route("/crew", web::post().to(catalog::create_crew))
            .route("/trips", web::get().to(trips::list_trips))
            .route("/trips", web::post().to(trips::create_trip))
            .route("/trips/{id}", web::get().to(trips::get_trip))
            .route("/trips/{id}", web::put().to(trips::update_trip))
            .route("/trips/{id}", web::delete().to(trips::delete_trip))
            .route("/orders", web::get().to(orders::list_orders))
            .route("/orders", web::post().to(orders::create_order))
    })
    .bind((args.host.as_str(), args.port))?
    .run()
    .await
}
