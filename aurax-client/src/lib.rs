pub mod client;
pub mod insights;
pub mod wire;

pub use client::{ClientConfig, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, RemoteClient};
pub use insights::InsightsCollector;
