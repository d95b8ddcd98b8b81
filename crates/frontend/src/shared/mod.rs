pub mod api_utils;
pub mod debug_log;
pub mod export;
