//! Upload engine for FlowPan.
//!
//! Resumable chunked uploads with content-addressed dedup:
//! - [`SessionRegistry`] tracks sessions and accepts chunks
//! - [`HashIndex`] maps file hashes to committed manifests (instant upload)
//! - [`AssemblyEngine`] commits a session once every chunk is stored
//! - [`EventBus`] announces committed files to downstream collaborators

pub mod assembly;
pub mod error;
pub mod events;
pub mod index;
pub mod registry;
pub mod session;

pub use assembly::AssemblyEngine;
pub use error::{ErrorClass, Result, UploadError};
pub use events::EventBus;
pub use index::{HashIndex, InMemoryHashIndex, RegisterOutcome};
pub use registry::{ChunkReceipt, CreateOutcome, RegistrySettings, SessionRegistry, SweepStats};
pub use session::{Mark, UploadSession};
