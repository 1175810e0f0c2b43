//! Compare two versions of a package tarball and emit a unified text patch.
//!
//! The pipeline decodes both tar buffers (gzip-wrapped or raw) with a
//! from-scratch block parser, pairs files across the two sides (renames
//! are detected by greedy fingerprint-similarity matching), and renders a
//! multi-file unified-diff document with rename and mode-change blocks.
//!
//! ```
//! use tardiff::{compare_tarballs, DiffOptions, Versions};
//!
//! # fn main() -> anyhow::Result<()> {
//! // Two (possibly gzip-wrapped) tarball buffers, already fetched.
//! let (side_a, side_b) = (Vec::new(), Vec::new());
//!
//! let rt = tokio::runtime::Runtime::new()?;
//! let patch = rt.block_on(compare_tarballs(
//!     side_a,
//!     side_b,
//!     Versions { a: "1.0.0".into(), b: "1.0.1".into() },
//!     DiffOptions::default(),
//! ))?;
//! assert_eq!(patch, "");
//! # Ok(())
//! # }
//! ```

pub mod compare;
pub mod fingerprint;
pub mod format;
pub mod heap;
pub mod matcher;
pub mod options;
pub mod untar;

pub use compare::{compare_tarballs, read_tarballs, TarballSource};
pub use format::{format_patch, two_file_patch, Versions};
pub use matcher::{match_similar_files, MatchPair};
pub use options::DiffOptions;
pub use untar::{normalize, untar, ArchiveIndex, FileEntry};
