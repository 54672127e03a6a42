pub mod config;
pub mod linking;
pub mod matching;
pub mod models;
pub mod store;
pub mod utils;
