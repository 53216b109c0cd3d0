// src/utils/mod.rs

pub mod extract;
pub mod session_id;
