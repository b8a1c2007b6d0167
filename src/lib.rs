#[macro_use]
extern crate serde_with;

pub mod cmd;
pub mod config;
pub mod context;
pub mod driver;
pub mod error;
pub mod metadata;
pub mod models;
pub mod planner;
pub mod recovery;
pub mod registry;
pub mod schema_manager;
pub mod shaper;
pub mod startup;
pub mod ulid;
pub mod validator;

mod controllers;
mod cors;
mod routes;
