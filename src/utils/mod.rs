// src/utils/mod.rs

pub mod entity_lock;
pub mod jwt;
pub mod lifecycle;
pub mod session_store;
pub mod video;
