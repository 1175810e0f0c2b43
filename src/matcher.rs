use rayon::prelude::*;
use tracing::debug;

use crate::fingerprint::fingerprint;
use crate::untar::ArchiveIndex;

/// One logical comparison unit in the output patch. At least one side is
/// present: both = changed or renamed, A only = delete, B only = add.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPair {
    pub a: Option<String>,
    pub b: Option<String>,
}

/// Pair filenames across the two archive sides.
///
/// Files identical in content and mode on both sides are dropped entirely.
/// Same-name changed files pair immediately. One-sided files are candidates
/// for rename detection: every A-only/B-only combination is scored by
/// fingerprint similarity, combinations are accepted greedily in descending
/// score order until the score falls below 0.5, and whatever remains is
/// emitted as plain deletes then adds.
pub fn match_similar_files(index: &ArchiveIndex) -> Vec<MatchPair> {
    let mut pairs = Vec::new();

    let mut a_candidates = Vec::new();
    let mut b_candidates = Vec::new();
    for name in index.names() {
        let a = index.entry("a/", name);
        let b = index.entry("b/", name);
        match (a, b) {
            (Some(a), Some(b)) if a.content == b.content && a.mode == b.mode => {}
            (Some(_), Some(_)) => pairs.push(MatchPair {
                a: Some(name.clone()),
                b: Some(name.clone()),
            }),
            (Some(a), None) => a_candidates.push((name.clone(), a)),
            (None, Some(b)) => b_candidates.push((name.clone(), b)),
            (None, None) => {}
        }
    }

    let a_uniq: Vec<(String, Vec<u32>)> = a_candidates
        .into_par_iter()
        .map(|(name, entry)| (name, fingerprint(&entry.content)))
        .collect();
    let b_uniq: Vec<(String, Vec<u32>)> = b_candidates
        .into_par_iter()
        .map(|(name, entry)| (name, fingerprint(&entry.content)))
        .collect();

    let mut scores = Vec::with_capacity(a_uniq.len() * b_uniq.len());
    for i in 0..a_uniq.len() {
        for j in 0..b_uniq.len() {
            scores.push((i, j, similarity(&a_uniq[i].1, &b_uniq[j].1)));
        }
    }
    // Stable sort keeps generation order on ties. NaN scores (two files
    // with no hashable lines at all) compare as equal here and do not trip
    // the cutoff below, so such files still pair up.
    scores.sort_by(|x, y| y.2.partial_cmp(&x.2).unwrap_or(std::cmp::Ordering::Equal));

    let mut a_used = vec![false; a_uniq.len()];
    let mut b_used = vec![false; b_uniq.len()];
    for (i, j, score) in scores {
        if a_used[i] || b_used[j] {
            continue;
        }
        if score < 0.5 {
            break;
        }
        debug!(from = %a_uniq[i].0, to = %b_uniq[j].0, score, "matched rename");
        pairs.push(MatchPair {
            a: Some(a_uniq[i].0.clone()),
            b: Some(b_uniq[j].0.clone()),
        });
        a_used[i] = true;
        b_used[j] = true;
    }

    for (i, (name, _)) in a_uniq.iter().enumerate() {
        if !a_used[i] {
            pairs.push(MatchPair {
                a: Some(name.clone()),
                b: None,
            });
        }
    }
    for (j, (name, _)) in b_uniq.iter().enumerate() {
        if !b_used[j] {
            pairs.push(MatchPair {
                a: None,
                b: Some(name.clone()),
            });
        }
    }

    pairs
}

/// Similarity of two sorted fingerprint sequences: the count of positions
/// where they hold equal values (index-aligned, over the shorter length),
/// scaled into a 0..=100 range against the combined length.
fn similarity(a: &[u32], b: &[u32]) -> f64 {
    let count = a.iter().zip(b).filter(|(x, y)| x == y).count();
    (100 * 2 * count) as f64 / (a.len() + b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::untar::FileEntry;

    fn entry(content: &str, mode: &str) -> FileEntry {
        FileEntry {
            content: content.to_string(),
            mode: mode.to_string(),
        }
    }

    fn both(index: &mut ArchiveIndex, name: &str, a: FileEntry, b: FileEntry) {
        index.insert("a/", name.to_string(), a);
        index.insert("b/", name.to_string(), b);
    }

    #[test]
    fn test_identical_files_dropped() {
        let mut index = ArchiveIndex::new();
        both(
            &mut index,
            "same.js",
            entry("alpha\n", "100644"),
            entry("alpha\n", "100644"),
        );
        assert!(match_similar_files(&index).is_empty());
    }

    #[test]
    fn test_changed_file_pairs_by_name() {
        let mut index = ArchiveIndex::new();
        both(
            &mut index,
            "main.js",
            entry("old\n", "100644"),
            entry("new\n", "100644"),
        );
        let pairs = match_similar_files(&index);
        assert_eq!(
            pairs,
            vec![MatchPair {
                a: Some("main.js".into()),
                b: Some("main.js".into()),
            }]
        );
    }

    #[test]
    fn test_mode_change_alone_pairs_by_name() {
        let mut index = ArchiveIndex::new();
        both(
            &mut index,
            "run.sh",
            entry("echo hi\n", "100644"),
            entry("echo hi\n", "100755"),
        );
        let pairs = match_similar_files(&index);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].a, pairs[0].b);
    }

    #[test]
    fn test_rename_detected_for_similar_content() {
        let content = "fn main() {\n    run();\n}\n";
        let mut index = ArchiveIndex::new();
        index.insert("a/", "old.rs".to_string(), entry(content, "100644"));
        index.insert("b/", "new.rs".to_string(), entry(content, "100644"));

        let pairs = match_similar_files(&index);
        assert_eq!(
            pairs,
            vec![MatchPair {
                a: Some("old.rs".into()),
                b: Some("new.rs".into()),
            }]
        );
    }

    #[test]
    fn test_disjoint_content_never_pairs() {
        let mut index = ArchiveIndex::new();
        index.insert("a/", "gone.js".to_string(), entry("alpha\nbeta\n", "100644"));
        index.insert("b/", "other.js".to_string(), entry("gamma\ndelta\n", "100644"));

        let pairs = match_similar_files(&index);
        assert_eq!(
            pairs,
            vec![
                MatchPair { a: Some("gone.js".into()), b: None },
                MatchPair { a: None, b: Some("other.js".into()) },
            ]
        );
    }

    #[test]
    fn test_best_score_wins() {
        let shared = "one\ntwo\nthree\nfour\n";
        let mut index = ArchiveIndex::new();
        index.insert("a/", "src.js".to_string(), entry(shared, "100644"));
        index.insert(
            "b/",
            "partial.js".to_string(),
            entry("one\ntwo\nunrelated\nlines\n", "100644"),
        );
        index.insert("b/", "exact.js".to_string(), entry(shared, "100644"));

        let pairs = match_similar_files(&index);
        assert_eq!(pairs[0].a, Some("src.js".into()));
        assert_eq!(pairs[0].b, Some("exact.js".into()));
        assert_eq!(
            pairs[1],
            MatchPair { a: None, b: Some("partial.js".into()) }
        );
    }

    #[test]
    fn test_same_name_pairs_come_first() {
        let mut index = ArchiveIndex::new();
        index.insert("a/", "moved.js".to_string(), entry("shared\nlines\n", "100644"));
        both(
            &mut index,
            "changed.js",
            entry("v1\n", "100644"),
            entry("v2\n", "100644"),
        );
        index.insert("b/", "landed.js".to_string(), entry("shared\nlines\n", "100644"));

        let pairs = match_similar_files(&index);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].a, Some("changed.js".into()));
        assert_eq!(pairs[1].a, Some("moved.js".into()));
        assert_eq!(pairs[1].b, Some("landed.js".into()));
    }

    #[test]
    fn test_similarity_positional() {
        // Positional equality on the sorted sequences, not set overlap.
        assert_eq!(similarity(&[1, 2, 3], &[1, 2, 3]), 100.0);
        assert_eq!(similarity(&[1, 2, 3], &[4, 5, 6]), 0.0);
        assert_eq!(similarity(&[1, 2], &[1, 2, 3]), 80.0);
        assert_eq!(similarity(&[2, 3], &[1, 2, 3]), 0.0);
    }
}
