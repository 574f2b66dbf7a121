//! Crux Core - Record Types, Scoring and Ranking
//!
//! Plain data and pure functions shared by every other crate. This crate
//! performs no I/O: the record store lives in `crux-storage` and the
//! scheduled/on-demand runs live in `crux-engine`.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod ranking;
pub mod scoring;

pub use config::*;
pub use entities::*;
pub use enums::*;
pub use error::*;
pub use identity::*;
pub use ranking::*;
pub use scoring::*;
