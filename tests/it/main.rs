#[macro_use]
extern crate insta;

mod aggregation;
mod collections;
mod health_check;
mod records;
mod recovery;
mod support;
