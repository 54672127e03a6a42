pub mod db_connect;
pub mod env;
pub mod logging;
pub mod progress;
