pub mod auth;
pub mod catalog;
pub mod opportunity;
pub mod stats;
