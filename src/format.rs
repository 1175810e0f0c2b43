use similar::{capture_diff_slices, group_diff_ops, Algorithm, DiffOp};

use crate::matcher::{match_similar_files, MatchPair};
use crate::options::DiffOptions;
use crate::untar::ArchiveIndex;

/// Version labels of the two archives, used verbatim in `index` lines.
#[derive(Debug, Clone)]
pub struct Versions {
    pub a: String,
    pub b: String,
}

/// File extensions treated as binary: their pairs get bare `---`/`+++`
/// headers instead of a hunk body.
const BINARY_EXTENSIONS: &[&str] = &[
    // Images
    "3ds", "avif", "bmp", "cur", "dds", "gif", "heic", "heif", "icns", "ico", "jpeg", "jpg",
    "jxl", "png", "psd", "tga", "tif", "tiff", "webp", "xcf",
    // Video
    "3g2", "3gp", "avi", "flv", "m4v", "mkv", "mov", "mp4", "mpeg", "mpg", "ogv", "webm", "wmv",
    // Audio
    "aac", "aiff", "flac", "m4a", "mid", "mp3", "oga", "ogg", "opus", "wav", "wma",
    // Archives
    "7z", "br", "bz2", "gz", "jar", "lz", "lzma", "rar", "tar", "tgz", "xz", "zip", "zst",
    // Fonts
    "eot", "otf", "ttf", "woff", "woff2",
    // Documents and office containers
    "docx", "odp", "ods", "odt", "pdf", "pptx", "xlsx",
    // Executables and objects
    "a", "class", "dll", "dylib", "exe", "lib", "node", "o", "obj", "so", "wasm",
    // Other
    "bin", "dat", "db", "sqlite", "swf",
];

/// Whether to print a hunk body for this pair's file, by extension.
fn should_print_patch(path: &str, opts: &DiffOptions) -> bool {
    if opts.diff_text {
        return true;
    }
    let extension = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    !BINARY_EXTENSIONS.contains(&extension.as_str())
}

/// Render the patch document for all match pairs in `index`.
///
/// Each pair yields one `diff --git` block: an optional rename block (with
/// the fixed `similarity index 99%` placeholder), an optional mode-change
/// block, the `index <vA>..<vB> <mode>` line, then either a unified diff
/// body or a bare `---`/`+++` pair for binary files. Names-only mode emits
/// just one resolved filename per pair. The result is trimmed of
/// surrounding whitespace; two archives with no differences produce an
/// empty string.
pub fn format_patch(index: &ArchiveIndex, versions: &Versions, opts: &DiffOptions) -> String {
    let mut res = String::new();
    let (src_prefix, dst_prefix) = if opts.diff_no_prefix {
        ("", "")
    } else {
        (opts.diff_src_prefix.as_str(), opts.diff_dst_prefix.as_str())
    };

    let entries = match_similar_files(index);
    for MatchPair { a, b } in &entries {
        let a_filename = a.as_deref();
        let b_filename = b.as_deref();
        let name_a = format!("{src_prefix}{}", a_filename.unwrap_or("/dev/null"));
        let name_b = format!("{dst_prefix}{}", b_filename.unwrap_or("/dev/null"));

        if opts.diff_name_only {
            res.push_str(a_filename.or(b_filename).unwrap_or_default());
            res.push('\n');
            continue;
        }

        let data_a = a_filename.and_then(|n| index.entry("a/", n));
        let data_b = b_filename.and_then(|n| index.entry("b/", n));
        let mode_a = data_a.map(|e| e.mode.as_str());
        let mode_b = data_b.map(|e| e.mode.as_str());

        let mut patch = String::new();
        patch.push_str(&format!("diff --git {name_a} {name_b}\n"));

        if let (Some(from), Some(to)) = (a_filename, b_filename) {
            if from != to {
                // Computing the real similarity would need a full diff; a
                // fixed placeholder is almost always right for a rename.
                patch.push_str("similarity index 99%\n");
                patch.push_str(&format!("rename from {name_a}\n"));
                patch.push_str(&format!("rename to {name_b}\n"));
            }
        }

        let mut mode = "";
        match (mode_a, mode_b) {
            (Some(a), Some(b)) if a == b => mode = a,
            (Some(a), None) => patch.push_str(&format!("deleted file mode {a}\n")),
            (None, Some(b)) => patch.push_str(&format!("new file mode {b}\n")),
            (Some(a), Some(b)) => {
                patch.push_str(&format!("old mode {a}\n"));
                patch.push_str(&format!("new mode {b}\n"));
            }
            (None, None) => {}
        }

        let tag = &opts.tag_version_prefix;
        patch.push_str(&format!(
            "index {tag}{}..{tag}{} {mode}\n",
            versions.a, versions.b
        ));

        let display_name = a_filename.or(b_filename).unwrap_or_default();
        if should_print_patch(display_name, opts) {
            let content_a = data_a.map(|e| e.content.as_str()).unwrap_or("");
            let content_b = data_b.map(|e| e.content.as_str()).unwrap_or("");
            patch.push_str(&two_file_patch(
                &name_a,
                &name_b,
                content_a,
                content_b,
                opts.diff_unified as usize,
                opts.diff_ignore_all_space,
            ));
        } else {
            patch.push_str(&format!("--- {name_a}\n"));
            patch.push_str(&format!("+++ {name_b}\n"));
        }

        res.push_str(&patch);
    }

    res.trim().to_string()
}

/// Render a two-file unified diff.
///
/// The line-diff computation is delegated to `similar`; this function owns
/// only the presentation: `---`/`+++` headers, hunk ranges, and the
/// ignore-whitespace rule (lines compared by trimmed form, emitted
/// verbatim). Equal inputs yield the headers alone with no hunks.
pub fn two_file_patch(
    old_name: &str,
    new_name: &str,
    old: &str,
    new: &str,
    context: usize,
    ignore_whitespace: bool,
) -> String {
    let old_lines = split_text_lines(old);
    let new_lines = split_text_lines(new);

    let (old_keys, new_keys): (Vec<&str>, Vec<&str>) = if ignore_whitespace {
        (
            old_lines.iter().map(|l| l.trim()).collect(),
            new_lines.iter().map(|l| l.trim()).collect(),
        )
    } else {
        (old_lines.clone(), new_lines.clone())
    };

    let ops = capture_diff_slices(Algorithm::Myers, &old_keys, &new_keys);
    let groups = group_diff_ops(ops, context);

    let mut out = String::new();
    out.push_str(&format!("--- {old_name}\n"));
    out.push_str(&format!("+++ {new_name}\n"));

    for group in &groups {
        let old_start = group.first().map_or(0, |op| op.old_range().start);
        let old_end = group.last().map_or(0, |op| op.old_range().end);
        let new_start = group.first().map_or(0, |op| op.new_range().start);
        let new_end = group.last().map_or(0, |op| op.new_range().end);
        out.push_str(&format!(
            "@@ -{} +{} @@\n",
            hunk_range(old_start, old_end - old_start),
            hunk_range(new_start, new_end - new_start),
        ));

        for op in group {
            match *op {
                DiffOp::Equal { old_index, len, .. } => {
                    for line in &old_lines[old_index..old_index + len] {
                        out.push_str(&format!(" {line}\n"));
                    }
                }
                DiffOp::Delete { old_index, old_len, .. } => {
                    for line in &old_lines[old_index..old_index + old_len] {
                        out.push_str(&format!("-{line}\n"));
                    }
                }
                DiffOp::Insert { new_index, new_len, .. } => {
                    for line in &new_lines[new_index..new_index + new_len] {
                        out.push_str(&format!("+{line}\n"));
                    }
                }
                DiffOp::Replace { old_index, old_len, new_index, new_len } => {
                    for line in &old_lines[old_index..old_index + old_len] {
                        out.push_str(&format!("-{line}\n"));
                    }
                    for line in &new_lines[new_index..new_index + new_len] {
                        out.push_str(&format!("+{line}\n"));
                    }
                }
            }
        }
    }

    out
}

/// `start,count` with a 1-based start; an empty range anchors to the line
/// before it, as in `@@ -0,0 +1,3 @@` for a pure insertion.
fn hunk_range(start: usize, len: usize) -> String {
    if len == 0 {
        format!("{start},0")
    } else {
        format!("{},{len}", start + 1)
    }
}

/// Split into lines on `\n` (tolerating `\r\n`), dropping the empty tail a
/// trailing newline produces. Empty content means zero lines.
fn split_text_lines(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    let mut lines: Vec<&str> = text
        .split('\n')
        .map(|l| l.strip_suffix('\r').unwrap_or(l))
        .collect();
    if lines.last() == Some(&"") {
        lines.pop();
    }
    lines
}
