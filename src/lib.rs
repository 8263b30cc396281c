pub mod autopilot;
pub mod constants;
pub mod engine;
pub mod levels;
pub mod maze;
pub mod rng;
pub mod server_protocol;
pub mod server_utils;
pub mod types;
