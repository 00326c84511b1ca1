//! Domain services: authentication, metadata store, media tooling, object
//! storage, and the upload pipeline that ties them together.

pub mod auth;
pub mod keys;
pub mod object_store;
pub mod probe;
pub mod remux;
pub mod upload_pipeline;
pub mod video_repository;
