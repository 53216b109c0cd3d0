// src/handlers/mod.rs

pub mod courses;
pub mod questions;
pub mod sessions;
pub mod system;
