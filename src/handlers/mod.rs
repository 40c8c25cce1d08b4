// src/handlers/mod.rs

pub mod config;
pub mod general;
pub mod incentive;
pub mod penalty;
pub mod session;
pub mod team_pool;
