//! Output generation.
//!
//! # Submodules
//!
//! - [`json`]: Writes the [`Snapshot`](crate::models::Snapshot) consumed by the website
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! └── tenders.json   # replaced on every run
//! ```

pub mod json;
