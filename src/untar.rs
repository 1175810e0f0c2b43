use std::collections::{HashMap, HashSet};
use std::io::Read;

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use tracing::{debug, warn};

/// One decoded archive member: UTF-8 content (truncated at the first NUL)
/// and the permission mode rendered as `"100"` + octal digits, e.g.
/// `"100644"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub content: String,
    pub mode: String,
}

/// Accumulator filled by [`untar`] calls and consumed by the matcher.
///
/// Holds the distinct relative paths seen on either side, in insertion
/// order (which fixes the output order of the patch), plus a side-tagged
/// lookup keyed by `prefix + path`. Each decode call fills its own index;
/// the comparison routine merges side B's into side A's, so no two writers
/// ever share one.
#[derive(Debug, Default)]
pub struct ArchiveIndex {
    names: Vec<String>,
    seen: HashSet<String>,
    refs: HashMap<String, FileEntry>,
}

impl ArchiveIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Distinct relative paths seen on either side, in insertion order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Look up a side's entry for a relative path; `prefix` is `"a/"` or
    /// `"b/"`.
    pub fn entry(&self, prefix: &str, name: &str) -> Option<&FileEntry> {
        self.refs.get(&format!("{prefix}{name}"))
    }

    /// Insert a decoded entry under the given side prefix. A later insert
    /// for the same side and path replaces the earlier one.
    pub fn insert(&mut self, prefix: &str, name: String, entry: FileEntry) {
        if self.seen.insert(name.clone()) {
            self.names.push(name.clone());
        }
        self.refs.insert(format!("{prefix}{name}"), entry);
    }

    /// Append another index's entries, keeping this index's name order
    /// first.
    pub fn merge(&mut self, other: ArchiveIndex) {
        for name in other.names {
            if self.seen.insert(name.clone()) {
                self.names.push(name);
            }
        }
        self.refs.extend(other.refs);
    }
}

/// Collapse backslash runs to `/` and strip a single leading `./` or `.`.
pub fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    let mut prev_backslash = false;
    for ch in path.chars() {
        if ch == '\\' {
            if !prev_backslash {
                out.push('/');
            }
            prev_backslash = true;
        } else {
            out.push(ch);
            prev_backslash = false;
        }
    }
    match out.strip_prefix("./").or_else(|| out.strip_prefix('.')) {
        Some(stripped) => stripped.to_string(),
        None => out,
    }
}

/// `path`/`size` overrides carried by a PAX extended header record.
#[derive(Debug, Default, Clone)]
struct PaxOverrides {
    path: Option<String>,
    size: Option<u64>,
}

/// Decode one tar buffer into `index`, tagging entries with `prefix`
/// (`"a/"` or `"b/"`).
///
/// The buffer may be gzip-wrapped (detected by the `0x1F 0x8B` magic).
/// Regular-file members are normalized, filtered against `filter_files`
/// (kept when the list is empty, or when the member name, bare or under
/// `package/`, is a string prefix of some filter entry), stripped of
/// their leading package-root segment and inserted. PAX `g` headers
/// override all following entries, PAX `x` headers only the next one;
/// local values win over global ones.
///
/// Malformed records never raise errors: an unparseable mode degrades to
/// mode 0 and an unparseable size stops the decode loop, both reported on
/// the warning channel. The only failure surfaced is a corrupt gzip
/// wrapper.
pub fn untar(
    index: &mut ArchiveIndex,
    bytes: &[u8],
    prefix: &str,
    filter_files: &[String],
) -> Result<()> {
    let filter: Vec<String> = filter_files.iter().map(|f| normalize(f)).collect();

    let inflated;
    let buf: &[u8] = if bytes.starts_with(&[0x1f, 0x8b]) {
        inflated = inflate(bytes)?;
        &inflated
    } else {
        bytes
    };

    let mut global_pax: Option<PaxOverrides> = None;
    let mut local_pax: Option<PaxOverrides> = None;

    let mut kept = 0usize;
    let mut offset = 0usize;
    while offset + 4 < buf.len() && read_u32_le(buf, offset) != 0 {
        let mut name = read_string(buf, offset, 100);
        let mode = read_octal(buf, offset + 100, 8);
        let size = read_octal(buf, offset + 124, 12);
        let type_flag = read_string(buf, offset + 156, 1);

        let magic = read_string(buf, offset + 257, 6);
        if magic.contains("ustar") {
            let name_prefix = read_string(buf, offset + 345, 155);
            if !name_prefix.is_empty() {
                name = format!("{name_prefix}/{name}");
            }
        }

        let Some(size) = size else {
            warn!(offset, name = %name, "unparseable size field in tar header, stopping decode");
            break;
        };
        let mode = mode.unwrap_or_else(|| {
            warn!(offset, name = %name, "unparseable mode field in tar header, defaulting to 0");
            0
        });

        offset += 512;
        let size = size as usize;
        let mut content = String::new();
        match type_flag.as_str() {
            "0" | "" => content = read_string(buf, offset, size),
            "g" => global_pax = Some(read_pax(buf, offset, size)),
            "x" => local_pax = Some(read_pax(buf, offset, size)),
            _ => {}
        }
        offset = offset.saturating_add(size.div_ceil(512) * 512);

        if type_flag == "g" || type_flag == "x" {
            continue;
        }

        // Global values apply first, then the one-shot local values on top.
        // A PAX size override takes part in this precedence but the content
        // extent is already fixed by the raw header field above.
        if let Some(global) = &global_pax {
            if let Some(path) = &global.path {
                name = path.clone();
            }
        }
        if let Some(local) = local_pax.take() {
            if let Some(path) = local.path {
                name = path;
            }
        }

        if type_flag == "0" || type_flag.is_empty() {
            let name = normalize(&name);

            let under_package = format!("package/{name}");
            if filter.is_empty()
                || filter
                    .iter()
                    .any(|f| f.starts_with(name.as_str()) || f.starts_with(under_package.as_str()))
            {
                // Drop the leading package-root segment.
                let key = if name.starts_with('/') {
                    name.clone()
                } else if let Some(i) = name.find('/') {
                    name[i + 1..].to_string()
                } else {
                    String::new()
                };

                index.insert(
                    prefix,
                    key,
                    FileEntry {
                        content,
                        mode: format!("100{mode:o}"),
                    },
                );
                kept += 1;
            }
        }
    }

    debug!(prefix, kept, "decoded tar archive");
    Ok(())
}

fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    GzDecoder::new(bytes)
        .read_to_end(&mut out)
        .context("Failed to decompress gzip-wrapped tarball")?;
    Ok(out)
}

fn read_u32_le(buf: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        buf[offset],
        buf[offset + 1],
        buf[offset + 2],
        buf[offset + 3],
    ])
}

/// Read a fixed-width field as UTF-8, stopping at the first NUL. The
/// window is clamped to the buffer end so truncated archives never panic.
fn read_string(buf: &[u8], offset: usize, len: usize) -> String {
    let start = offset.min(buf.len());
    let end = offset.saturating_add(len).min(buf.len());
    let field = &buf[start..end];
    let field = match field.iter().position(|&b| b == 0) {
        Some(i) => &field[..i],
        None => field,
    };
    String::from_utf8_lossy(field).into_owned()
}

fn read_octal(buf: &[u8], offset: usize, len: usize) -> Option<u64> {
    u64::from_str_radix(read_string(buf, offset, len).trim(), 8).ok()
}

/// Parse PAX `<decimal-length> <key>=<value>` records. Only `path` and
/// `size` are recognized; an empty path or zero size counts as absent.
fn read_pax(buf: &[u8], offset: usize, len: usize) -> PaxOverrides {
    let raw = read_string(buf, offset, len);
    let mut out = PaxOverrides::default();
    for line in raw.split('\n') {
        let Some((length, rest)) = line.split_once(' ') else {
            continue;
        };
        if length.is_empty() || !length.bytes().all(|b| b.is_ascii_digit()) {
            continue;
        }
        let Some((key, value)) = rest.split_once('=') else {
            continue;
        };
        match key {
            "path" if !value.is_empty() => out.path = Some(value.to_string()),
            "size" => {
                if let Ok(n) = value.parse::<u64>() {
                    if n != 0 {
                        out.size = Some(n);
                    }
                }
            }
            _ => {}
        }
    }
    out
}
