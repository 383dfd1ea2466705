pub mod callback;
pub mod dispatcher;
pub mod webhook;
