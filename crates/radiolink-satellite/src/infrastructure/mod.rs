//! Infrastructure layer for the satellite.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `radiolink_core`, but MUST NOT be imported by the `application` layer.

pub mod storage;
