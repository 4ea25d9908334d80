pub mod airport;
pub mod booking;
pub mod city;
pub mod flight;
pub mod pagination;
pub mod recommendation;
pub mod tour;
pub mod tour_departure;
pub mod user;
