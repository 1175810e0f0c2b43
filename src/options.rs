use serde::{Deserialize, Serialize};

/// Options controlling archive decoding and patch formatting.
///
/// Serialized field names use camelCase so the struct round-trips the same
/// option keys callers pass through query strings or config files.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DiffOptions {
    /// Treat all files as text and print a diff even for files classified
    /// as binary by extension. Defaults to `false`.
    pub diff_text: bool,
    /// Skip printing any prefixes in filenames. Defaults to `false`.
    pub diff_no_prefix: bool,
    /// Prefix used for filenames from the first archive. Defaults to `"a/"`.
    pub diff_src_prefix: String,
    /// Prefix used for filenames from the second archive. Defaults to `"b/"`.
    pub diff_dst_prefix: String,
    /// Print only file names and no patch bodies. Defaults to `false`.
    pub diff_name_only: bool,
    /// Prefix for version labels in `index` lines. Defaults to `"v"`.
    pub tag_version_prefix: String,
    /// Context lines around each hunk. Defaults to `3`; `0` is valid and
    /// disables context.
    pub diff_unified: u32,
    /// Ignore whitespace when comparing lines. Defaults to `false`.
    pub diff_ignore_all_space: bool,
    /// Restrict decoding to these relative paths. Empty means no filter.
    pub diff_files: Vec<String>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            diff_text: false,
            diff_no_prefix: false,
            diff_src_prefix: "a/".to_string(),
            diff_dst_prefix: "b/".to_string(),
            diff_name_only: false,
            tag_version_prefix: "v".to_string(),
            diff_unified: 3,
            diff_ignore_all_space: false,
            diff_files: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = DiffOptions::default();
        assert_eq!(opts.diff_src_prefix, "a/");
        assert_eq!(opts.diff_dst_prefix, "b/");
        assert_eq!(opts.tag_version_prefix, "v");
        assert_eq!(opts.diff_unified, 3);
        assert!(!opts.diff_name_only);
        assert!(opts.diff_files.is_empty());
    }

    #[test]
    fn test_deserialize_partial() {
        let opts: DiffOptions =
            serde_json::from_str(r#"{"diffUnified": 0, "diffNameOnly": true}"#).unwrap();
        assert_eq!(opts.diff_unified, 0);
        assert!(opts.diff_name_only);
        assert_eq!(opts.diff_src_prefix, "a/");
    }
}
