pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod utils;
