use anyhow::Result;

use crate::format::{format_patch, Versions};
use crate::options::DiffOptions;
use crate::untar::{untar, ArchiveIndex};

/// One raw tarball buffer plus the side prefix its entries are tagged with.
pub struct TarballSource {
    pub bytes: Vec<u8>,
    pub prefix: String,
}

/// Compare two package tarballs and return the unified patch text.
///
/// The buffers may be gzip-wrapped. Both sides decode concurrently; each
/// fills its own accumulator (side A under `a/`, side B under `b/`) and
/// the results are merged A-then-B before matching and formatting. Two
/// archives with no differences yield an empty string.
pub async fn compare_tarballs(
    a: Vec<u8>,
    b: Vec<u8>,
    versions: Versions,
    opts: DiffOptions,
) -> Result<String> {
    let filter_a = opts.diff_files.clone();
    let filter_b = opts.diff_files.clone();

    let (index_a, index_b) = tokio::try_join!(
        tokio::task::spawn_blocking(move || -> Result<ArchiveIndex> {
            let mut index = ArchiveIndex::new();
            untar(&mut index, &a, "a/", &filter_a)?;
            Ok(index)
        }),
        tokio::task::spawn_blocking(move || -> Result<ArchiveIndex> {
            let mut index = ArchiveIndex::new();
            untar(&mut index, &b, "b/", &filter_b)?;
            Ok(index)
        }),
    )?;

    let mut index = index_a?;
    index.merge(index_b?);

    Ok(format_patch(&index, &versions, &opts))
}

/// Decode several tarballs into one shared accumulator, in order.
///
/// Sequential counterpart to the two-sided decode in [`compare_tarballs`],
/// for callers that already hold the buffers and want the merged index
/// itself.
pub fn read_tarballs(tarballs: &[TarballSource], filter_files: &[String]) -> Result<ArchiveIndex> {
    let mut index = ArchiveIndex::new();
    for tarball in tarballs {
        untar(&mut index, &tarball.bytes, &tarball.prefix, filter_files)?;
    }
    Ok(index)
}
