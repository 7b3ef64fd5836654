//! Inference module
//!
//! Scores one tender at a time: loads the stored bundle, replays the trained
//! feature layout on the request and averages the forest's trees.

mod predictor;
mod request;

pub use predictor::Predictor;
pub use request::PredictionRequest;
