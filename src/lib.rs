pub mod clients;
pub mod commands;
pub mod config;
pub mod error;
pub mod job;
pub mod manager;
pub mod pipeline;
pub mod store;
pub mod workspace;

mod app;

// Re-export the service surface
pub use app::App;
pub use config::Config;

// Disable colors for all tests to get clean output
#[cfg(test)]
#[ctor::ctor]
fn init_tests() {
    colored::control::set_override(false);
}
