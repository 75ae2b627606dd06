use crate::cli::database_migration::check_migration_state;
use crate::cli_error::CliError;
use crate::data_store::{get_store_from_env, EventEaseStore};
use crate::image_store::{get_image_store_from_env, ImageStore};
use crate::setup::{get_listen_address_from_env, get_listen_port_from_env};
use actix_web::{middleware, web, App, HttpServer};
use log::info;
use std::sync::Arc;

mod api;
mod http_error_logging;

pub fn serve() -> Result<(), CliError> {
    check_migration_state()?;
    let state = AppState::new()?;
    let listen_address = get_listen_address_from_env()?;
    let listen_port = get_listen_port_from_env()?;
    info!("Serving EventEase on {}:{}", listen_address, listen_port);
    actix_web::rt::System::new()
        .block_on(
            HttpServer::new(move || {
                App::new()
                    .configure(api::configure_app)
                    .app_data(web::Data::new(state.clone()))
                    .wrap(middleware::from_fn(
                        http_error_logging::error_logging_middleware,
                    ))
                    .wrap(middleware::Compress::default())
            })
            .bind((listen_address, listen_port))
            .map_err(CliError::BindError)?
            .run(),
        )
        .map_err(CliError::ServerError)
}

#[derive(Clone)]
pub struct AppState {
    store: Arc<dyn EventEaseStore>,
    images: Arc<dyn ImageStore>,
}

impl AppState {
    pub fn new() -> Result<Self, CliError> {
        Ok(Self {
            store: Arc::new(get_store_from_env()?),
            images: Arc::new(get_image_store_from_env()?),
        })
    }
}
