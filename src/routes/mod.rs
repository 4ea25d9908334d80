pub mod airport_route;
pub mod booking_route;
pub mod city_route;
pub mod flight_route;
pub mod recommendation_route;
pub mod tour_departure_route;
pub mod tour_route;
pub mod user_route;
