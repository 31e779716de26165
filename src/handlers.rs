pub mod admin;
pub mod auth;
pub mod exports;
pub mod health;
pub mod nszu;
pub mod records;
