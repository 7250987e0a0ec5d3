pub mod client;

pub use client::{HttpResponse, RateLimitedHttpClient};
