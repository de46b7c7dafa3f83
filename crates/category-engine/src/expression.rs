use std::fs;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::error::StoreError;

/// An ordered list of case-insensitive expressions, loaded fully into memory.
///
/// Expressions are compiled eagerly at load time so that a bad pattern is a
/// startup error instead of a silent per-request non-match.  Evaluation is in
/// file order, first match wins.
#[derive(Debug)]
pub struct ExpressionList {
    patterns: Vec<Regex>,
}

impl ExpressionList {
    /// Read and compile the expression file at `path`.
    ///
    /// Blank lines and `#`-comment lines are skipped.  Each remaining line is
    /// one regular expression, compiled case-insensitively.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let text = fs::read_to_string(path).map_err(|e| StoreError::ReadSource {
            path: path.to_path_buf(),
            source: e,
        })?;

        let mut patterns = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let regex = RegexBuilder::new(line)
                .case_insensitive(true)
                .build()
                .map_err(|e| StoreError::Expression {
                    path: path.to_path_buf(),
                    line: idx + 1,
                    source: e,
                })?;
            patterns.push(regex);
        }
        Ok(Self { patterns })
    }

    /// Test `url` against every expression in file order.
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|re| re.is_match(url))
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn list_from(contents: &str) -> ExpressionList {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expressions");
        fs::write(&path, contents).unwrap();
        ExpressionList::load(&path).unwrap()
    }

    #[test]
    fn matches_are_case_insensitive() {
        let list = list_from(r"\.exe$");
        assert!(list.matches("http://foo.com/setup.EXE"));
        assert!(list.matches("http://foo.com/setup.exe"));
        assert!(!list.matches("http://foo.com/setup.txt"));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let list = list_from("# header comment\n\nporn\n");
        assert_eq!(list.len(), 1);
        assert!(list.matches("http://PORN.example/"));
    }

    #[test]
    fn invalid_expression_reports_its_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("expressions");
        fs::write(&path, "good\n[broken\n").unwrap();

        let err = ExpressionList::load(&path).unwrap_err();
        match err {
            StoreError::Expression { line, .. } => assert_eq!(line, 2),
            other => panic!("expected Expression error, got {other:?}"),
        }
    }

    #[test]
    fn empty_file_yields_empty_list() {
        let list = list_from("");
        assert!(list.is_empty());
        assert!(!list.matches("http://anything/"));
    }
}
