pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

/// Logs con `tracing` (RUST_LOG=info por defecto).
pub fn init_tracing() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    let _ = tracing_subscriber::fmt::try_init();
}
