//! Hostsmith
//!
//! A hostname naming service. Hostnames are assembled from ordered, validated groups declared
//! by templates, numbered by a per-template sequence counter, optionally reserved so that a
//! number is never handed out twice, and checked against DNS one at a time or in bounded
//! concurrent scans.
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod assembler;
pub mod config;
pub mod dns;
pub mod error;
pub mod reservation;
pub mod sequence;
pub mod template;

pub use api::AppState;
pub use assembler::{Assembler, Candidate, Params};
pub use config::{Config, SharedConfig};
pub use reservation::{FileReservationStore, InMemoryReservationStore, Reservation};
pub use sequence::SequenceAllocator;
pub use template::{Template, TemplateStore};

