// src/services/mod.rs

pub mod incentive;
pub mod team_pool;
