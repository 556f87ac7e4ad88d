pub mod alert;
pub mod engine;
pub mod error;
pub mod model;
pub mod rules;
pub mod window;
