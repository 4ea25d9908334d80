pub mod airport_service;
pub mod booking_service;
pub mod capacity;
pub mod city_service;
pub mod flight_service;
pub mod recommendation_engine;
pub mod recommendation_service;
pub mod seed_service;
pub mod tour_departure_service;
pub mod tour_service;
pub mod user_search_service;
pub mod user_service;
