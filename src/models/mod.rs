// src/models/mod.rs

pub mod attempt;
pub mod boss;
pub mod challenge;
pub mod character;
pub mod reward;
