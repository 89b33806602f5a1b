// src/models/mod.rs

pub mod mcq;
pub mod quiz_result;
pub mod session_log;
pub mod summary;
pub mod user;
