pub mod account;
pub mod config;
pub mod context;
pub mod logging;
pub mod retry;
pub mod work_code;
