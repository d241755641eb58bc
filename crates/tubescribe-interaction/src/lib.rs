pub mod gemini_gateway;
pub mod supported_models;

pub use gemini_gateway::GeminiGateway;
