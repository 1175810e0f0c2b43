use crate::heap::Heap;

/// FNV-1a parameters from http://www.isthe.com/chongo/tech/comp/fnv/
const FNV_OFFSET_BASIS: u32 = 2166136261;
const FNV_PRIME: u32 = 16777619;

/// Hash at most the first 80 UTF-16 code units of a line.
///
/// The truncation keeps per-line cost bounded regardless of line length;
/// lines sharing an 80-unit prefix hash identically on purpose.
pub fn hash_line(line: &str) -> u32 {
    let mut hash = FNV_OFFSET_BASIS;
    for unit in line.encode_utf16().take(80) {
        hash ^= unit as u32;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Compute a file's content fingerprint: the bounded set of line hashes,
/// ascending. Lines are split on `\r\n`, `\r`, or `\n`, trimmed, and empty
/// lines are skipped, so the fingerprint is insensitive to indentation and
/// blank-line changes.
pub fn fingerprint(text: &str) -> Vec<u32> {
    let mut heap = Heap::new();
    for line in split_lines(text) {
        let line = line.trim();
        if !line.is_empty() {
            heap.add(hash_line(line));
        }
    }
    heap.get()
}

/// Split on `\r\n`, `\r`, or `\n`, treating `\r\n` as a single terminator.
fn split_lines(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut lines = Vec::new();
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'\r' => {
                lines.push(&text[start..i]);
                i += if bytes.get(i + 1) == Some(&b'\n') { 2 } else { 1 };
                start = i;
            }
            b'\n' => {
                lines.push(&text[start..i]);
                i += 1;
                start = i;
            }
            _ => i += 1,
        }
    }
    lines.push(&text[start..]);
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_values() {
        assert_eq!(hash_line(""), 2166136261);
        assert_eq!(hash_line("a"), 3826002220);
        assert_eq!(hash_line("hello world"), 3582672807);
    }

    #[test]
    fn test_truncates_at_80_units() {
        let long = "x".repeat(200);
        let prefix = "x".repeat(80);
        assert_eq!(hash_line(&long), hash_line(&prefix));
        assert_ne!(hash_line(&"x".repeat(79)), hash_line(&prefix));
    }

    #[test]
    fn test_split_lines_mixed_endings() {
        assert_eq!(split_lines("a\r\nb\rc\nd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
    }

    #[test]
    fn test_fingerprint_ignores_blank_lines_and_indent() {
        let a = fingerprint("foo\nbar\n");
        let b = fingerprint("  foo\r\n\r\n\tbar");
        assert_eq!(a, b);
        assert_eq!(a.len(), 2);
    }

    #[test]
    fn test_fingerprint_sorted_ascending() {
        let values = fingerprint("one\ntwo\nthree\nfour\nfive\n");
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(values, sorted);
    }
}
