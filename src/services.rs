// src/services.rs

pub mod aggregation;
pub mod auth;
pub mod catalog;
pub mod classifier;
pub mod dashboard_service;
pub mod opportunity_service;
