//! Tests for skip-list loading and matching.

use std::io::Write;

use vcexport::error::Error;
use vcexport::skiplist::{SkipList, BUILTIN_PATTERNS};

#[test]
fn test_matches_anywhere_in_name() {
    let list = SkipList::compile(["^test-", "backup"]).unwrap();
    assert!(list.matches("test-web-01"));
    assert!(list.matches("nightly-backup-db"));
    assert!(!list.matches("prod-web-01"));
}

#[test]
fn test_matching_is_case_sensitive() {
    let list = SkipList::compile(["^test-"]).unwrap();
    assert!(!list.matches("Test-web-01"));
}

#[test]
fn test_order_independent() {
    let forward = SkipList::compile(["^a", "b$", "mid"]).unwrap();
    let reversed = SkipList::compile(["mid", "b$", "^a"]).unwrap();
    for name in ["alpha", "club", "amidships", "none-of-these", "b"] {
        assert_eq!(forward.matches(name), reversed.matches(name), "name {name}");
    }
}

#[test]
fn test_builtin_vcls_rule_always_applies() {
    let list = SkipList::compile(std::iter::empty::<&str>()).unwrap();
    assert_eq!(list.len(), BUILTIN_PATTERNS.len());
    assert!(list.matches("vCLS-1a2b3c"));
    // Anchored: only names beginning with vCLS are agent VMs.
    assert!(!list.matches("app-vCLS-lookalike"));
}

#[test]
fn test_malformed_pattern_fails_at_load() {
    let result = SkipList::compile(["[unclosed"]);
    assert!(matches!(result, Err(Error::SkipPattern { .. })));
}

#[test]
fn test_load_skips_comments_and_blank_lines() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "# decommissioned test range").unwrap();
    writeln!(file).unwrap();
    writeln!(file, "^test-").unwrap();
    writeln!(file, "  ^tmp-  ").unwrap();
    file.flush().unwrap();

    let list = SkipList::load(file.path()).unwrap();
    assert_eq!(list.len(), BUILTIN_PATTERNS.len() + 2);
    assert!(list.matches("test-01"));
    assert!(list.matches("tmp-scratch"));
}

#[test]
fn test_missing_file_leaves_builtins_only() {
    let dir = tempfile::tempdir().unwrap();
    let list = SkipList::load(&dir.path().join("no-such-file.txt")).unwrap();
    assert_eq!(list.len(), BUILTIN_PATTERNS.len());
}
