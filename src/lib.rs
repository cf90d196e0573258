//! # immo-pipeline
//!
//! Preprocessing and batch inference for a real-estate sale price model, built on Apache
//! DataFusion. Raw listings are imputed and encoded by fixed per-column rule tables, the encoded
//! training columns are recorded in a versioned schema artifact, and inference frames are
//! reconciled onto that schema before a ridge regression scores them.
//!
//! Set `DEBUG_IMMO_PIPELINE` to enable debug logging.

pub mod batch;
pub mod diagnostics;
pub mod exceptions;
pub mod io;
mod logging;
pub mod matrix;
pub mod model;
pub mod pipeline;
pub mod registry;
pub mod schema;
pub mod settings;
pub mod transformers;
pub mod workflow;
