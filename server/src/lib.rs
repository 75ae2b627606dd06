mod booking_rules;
pub mod cli;
pub mod cli_error;
mod data_store;
mod image_store;
mod setup;
pub mod web;
