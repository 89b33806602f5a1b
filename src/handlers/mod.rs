// src/handlers/mod.rs

pub mod activity;
pub mod auth;
pub mod chat;
pub mod content;
pub mod documents;
pub mod form;
pub mod quiz;
