//! Video upload service. Uploaded videos are remuxed for fast-start playback
//! and stored in S3 under orientation-namespaced keys, with the resulting
//! reference recorded on the video's metadata row.

pub mod config;
pub mod db;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
