//! Host collaborator contracts and concrete hosts.
//!
//! The migration engine never talks to a game platform directly; it
//! consumes the [`contract::WorldHost`] and [`contract::CompendiumBundle`]
//! traits. Two implementations ship here: a file-backed host over a world
//! export directory ([`fs::FsHost`], driven by the worker binary) and an
//! in-memory host for orchestrator tests ([`memory::MemoryHost`]).

pub mod contract;
pub mod error;
pub mod fs;
pub mod memory;

pub use contract::{CompendiumBundle, WorldHost};
pub use error::{HostError, HostResult};
