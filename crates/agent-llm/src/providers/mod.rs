//! Concrete provider implementations
//!
//! The scripted provider is always available; the HTTP provider sits behind
//! the `http` feature.

pub mod scripted;

#[cfg(feature = "http")]
pub mod http;

pub use scripted::ScriptedProvider;

#[cfg(feature = "http")]
pub use http::HttpProvider;
