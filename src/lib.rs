mod database {
    pub mod actions;
    pub mod error;
    pub mod form;
    pub mod memory;
    pub mod schema;
    pub mod store;
}
mod authentication {
    pub mod accounts;
    pub mod cryptography;
    pub mod jwt;
    pub mod middleware;
}
mod api {
    pub mod extract;
    pub mod labels;
    pub mod recipes;
    pub mod rejection;
    pub mod routes;
    pub mod state;
    pub mod users;
}
pub mod config;
mod constants;
mod media;

pub use api::routes::routes;
pub use api::state::AppState;
pub use api::*;
pub use authentication::*;
pub use constants::*;
pub use database::error::Error;
pub use database::*;
pub use media::*;
