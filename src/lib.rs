// src/lib.rs

pub mod api;
pub mod config;
pub mod controllers;
pub mod error;
pub mod models;
pub mod notice;
pub mod routes;
pub mod state;
pub mod utils;

pub use api::{HttpApi, SocialApi};
pub use error::AppError;
pub use state::{AppState, Session};
