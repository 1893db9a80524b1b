pub mod camera;
pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod input;
pub mod pose;
pub mod render;
pub mod tracker;
