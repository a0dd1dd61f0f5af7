pub mod animation;
pub mod commands;
pub mod config;
pub mod error;
pub mod events;
pub mod export;
pub mod geometry;
pub mod mesh;
pub mod params;
pub mod render;
pub mod scene;
pub mod session;
pub mod synthesis;
pub mod tessellation;
pub mod texture;
pub mod tasks {
    pub mod controller;
    pub mod viewer;
}
