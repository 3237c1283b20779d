pub mod backoff;
pub mod models;
pub mod settings;
pub mod sink;
