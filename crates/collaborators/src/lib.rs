//! Cutline Collaborator Contracts
//!
//! Interfaces to the services around the media pipeline:
//! - **Storage:** upload/download of intermediate assets by reference
//! - **Generation:** replacement-clip synthesis from a source clip and mask
//! - **Separation:** vocal/instrumental stem classification
//!
//! Only the local filesystem store ships here; remote services implement
//! the traits elsewhere.

pub mod generation;
pub mod separation;
pub mod storage;

pub use generation::*;
pub use separation::*;
pub use storage::*;
