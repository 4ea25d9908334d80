#[macro_use]
extern crate rocket;
extern crate rocket_okapi;

pub mod db;
pub mod models;
pub mod routes;
pub mod services;
pub mod swagger;
pub mod utils;
