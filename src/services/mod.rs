// src/services/mod.rs

pub mod questions;
pub mod sessions;
