use dotenv::dotenv;
use rocket::fairing::AdHoc;
use rocket_okapi::openapi_get_routes;
use rocket_okapi::swagger_ui::make_swagger_ui;
use tour_agency_backend::services::recommendation_engine::RecommendationEngineClient;
use tour_agency_backend::services::seed_service::SeedService;
use tour_agency_backend::swagger::swagger_ui;
use tour_agency_backend::utils::config::AppConfig;
use tour_agency_backend::{db, routes, services};

#[rocket::launch]
async fn rocket() -> _ {
    dotenv().ok();

    let config = AppConfig::from_env();

    let database = db::Database::new(&config.database_url)
        .await
        .expect("Failed to connect to database");
    let pool = database.pool.clone();

    db::ensure_schema(&pool)
        .await
        .expect("Failed to create database schema");
    SeedService::new(pool.clone())
        .run(&config)
        .await
        .expect("Failed to seed startup data");

    let engine = RecommendationEngineClient::new(&config);

    let user_service = services::user_service::UserService::new(pool.clone());
    let city_service = services::city_service::CityService::new(pool.clone());
    let airport_service = services::airport_service::AirportService::new(pool.clone());
    let flight_service = services::flight_service::FlightService::new(pool.clone());
    let tour_service = services::tour_service::TourService::new(pool.clone());
    let departure_service =
        services::tour_departure_service::TourDepartureService::new(pool.clone());
    let booking_service = services::booking_service::BookingService::new(pool.clone());
    let search_service = services::user_search_service::UserSearchService::new(pool.clone());
    let recommendation_service =
        services::recommendation_service::RecommendationService::new(pool.clone(), engine);

    rocket::build()
        .manage(user_service)
        .manage(city_service)
        .manage(airport_service)
        .manage(flight_service)
        .manage(tour_service)
        .manage(departure_service)
        .manage(booking_service)
        .manage(search_service)
        .manage(recommendation_service)
        .mount(
            "/api",
            openapi_get_routes![
                routes::user_route::register,
                routes::user_route::login,
                routes::user_route::list_users,
                routes::user_route::get_user,
                routes::user_route::create_user,
                routes::user_route::update_user,
                routes::user_route::deactivate_user,
                routes::user_route::delete_user,
                routes::city_route::list_cities,
                routes::city_route::get_city,
                routes::city_route::city_airports,
                routes::city_route::create_city,
                routes::city_route::update_city,
                routes::city_route::delete_city,
                routes::airport_route::list_airports,
                routes::airport_route::get_airport,
                routes::airport_route::create_airport,
                routes::airport_route::update_airport,
                routes::airport_route::delete_airport,
                routes::flight_route::list_flights,
                routes::flight_route::get_flight,
                routes::flight_route::get_flight_by_number,
                routes::flight_route::flights_for_city,
                routes::flight_route::flights_for_departure,
                routes::flight_route::create_flight,
                routes::flight_route::update_flight,
                routes::flight_route::delete_flight,
                routes::flight_route::link_departure,
                routes::flight_route::unlink_departure,
                routes::tour_route::list_tours,
                routes::tour_route::list_tours_admin,
                routes::tour_route::list_my_tours,
                routes::tour_route::get_tour,
                routes::tour_route::create_tour,
                routes::tour_route::update_tour,
                routes::tour_route::delete_tour,
                routes::tour_departure_route::list_departures,
                routes::tour_departure_route::list_my_departures,
                routes::tour_departure_route::departures_for_flight,
                routes::tour_departure_route::get_departure,
                routes::tour_departure_route::create_departure,
                routes::tour_departure_route::update_departure,
                routes::tour_departure_route::delete_departure,
                routes::booking_route::create_booking,
                routes::booking_route::list_my_bookings,
                routes::booking_route::list_bookings,
                routes::booking_route::search_bookings_by_email,
                routes::booking_route::get_booking,
                routes::booking_route::update_booking_status,
                routes::booking_route::update_booking,
                routes::booking_route::delete_booking,
                routes::booking_route::cancel_my_booking,
                routes::recommendation_route::create_search,
                routes::recommendation_route::get_recommendations,
                routes::recommendation_route::select_recommendation,
            ],
        )
        .mount("/swagger", make_swagger_ui(&swagger_ui()))
        .attach(AdHoc::on_response("CORS", |_, res| {
            Box::pin(async move {
                res.set_header(rocket::http::Header::new(
                    "Access-Control-Allow-Origin",
                    "*",
                ));
            })
        }))
}
