// src/services/mod.rs
//
// External service clients used by the address form modules:
// the administrative directory lookup and the profile submission API

pub mod directory;
pub mod submission;

// Re-export commonly used types for convenience
pub use directory::{DirectoryApi, DirectoryService, FetchScope};
pub use submission::SubmissionService;
