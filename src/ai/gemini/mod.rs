pub mod client;
pub mod generator;
pub mod types;

pub use client::GeminiHttpClient;
pub use generator::GeminiGenerator;
