//! Core data models for the bucket metadata store.
//!
//! These entities are stored as JSON documents under keys produced by
//! `services::keyspace`, and serialize the same way on the wire.

pub mod bucket;
pub mod cors;
pub mod notification;
pub mod target;
