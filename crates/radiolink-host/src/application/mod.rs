//! Application layer use cases for the host.
//!
//! # What is the "application" layer? (for beginners)
//!
//! Use cases here orchestrate a [`radiolink_core::PairingSession`] to fulfil
//! a goal ("pair with my satellites", "greet everyone").  They depend on the
//! [`radiolink_core::Radio`] trait rather than a concrete driver, so they run
//! unchanged against the UDP emulation and the scripted mock.
//!
//! # Sub-modules
//!
//! - **`pair_satellites`** – Polls the session until pairing finishes or the
//!   pairing timeout expires with at least one satellite found.
//!
//! - **`broadcast`** – Sends a text message to every paired satellite.

pub mod broadcast;
pub mod pair_satellites;
