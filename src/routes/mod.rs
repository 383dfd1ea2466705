pub mod audio;
pub mod chat;
pub mod documents;
pub mod generation;
pub mod health;
pub mod metrics;
pub mod sources;
