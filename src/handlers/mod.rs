// src/handlers/mod.rs

pub mod boss;
pub mod challenge;
pub mod character;
pub mod health;
pub mod realm;
