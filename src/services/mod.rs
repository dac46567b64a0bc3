pub mod ranking;
pub mod repository;
pub mod seed;
pub mod views;
