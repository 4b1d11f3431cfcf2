pub mod config;
pub mod dictionary;
pub mod error;
pub mod ir;
pub mod models;
pub mod pipeline;
pub mod server;
pub mod textutil;
