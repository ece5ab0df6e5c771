// src/watch/patterns.rs

use std::borrow::Cow;
use std::path::Path;

use globset::{GlobBuilder, GlobMatcher};
use tracing::debug;

/// Patterns used when no ignore list is configured.
///
/// Covers the partial-download names used by common browsers and download
/// managers, editor/office lock files, and OS metadata droppings.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "*.part",
    "*.partial",
    "*.crdownload",
    "*.download",
    "*.opdownload",
    "*.!ut",
    "*.tmp",
    "*.temp",
    "*.swp",
    "*.lock",
    "*.lck",
    ".~lock.*",
    "~$*",
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
];

const GLOB_META: &[char] = &['*', '?', '['];

/// One configured pattern, compiled once.
#[derive(Debug, Clone)]
struct IgnoreRule {
    pattern: String,
    /// `None` when the pattern is not a valid glob.
    glob: Option<GlobMatcher>,
    /// Lower-cased suffix for plain dotted patterns like `.tmp`.
    suffix: Option<String>,
}

impl IgnoreRule {
    fn compile(pattern: &str) -> Self {
        let glob = match GlobBuilder::new(&escape_braces(pattern))
            .literal_separator(true)
            .build()
        {
            Ok(glob) => Some(glob.compile_matcher()),
            Err(err) => {
                debug!(pattern, error = %err, "invalid ignore glob; it will never match");
                None
            }
        };

        let suffix = (pattern.starts_with('.') && !pattern.contains(GLOB_META))
            .then(|| pattern.to_lowercase());

        Self {
            pattern: pattern.to_string(),
            glob,
            suffix,
        }
    }

    fn matches(&self, name: &str, name_lower: &str) -> bool {
        if let Some(glob) = &self.glob {
            if glob.is_match(name) {
                return true;
            }
        }
        match &self.suffix {
            Some(suffix) => name_lower.ends_with(suffix.as_str()),
            None => false,
        }
    }
}

/// Braces are plain characters here, so hide them from globset's `{a,b}`
/// alternation by wrapping each one in a character class.
fn escape_braces(pattern: &str) -> Cow<'_, str> {
    if !pattern.contains(['{', '}']) {
        return Cow::Borrowed(pattern);
    }
    let mut escaped = String::with_capacity(pattern.len() + 4);
    let mut in_class = false;
    for ch in pattern.chars() {
        match ch {
            '[' if !in_class => in_class = true,
            ']' if in_class => in_class = false,
            '{' | '}' if !in_class => {
                escaped.push('[');
                escaped.push(ch);
                escaped.push(']');
                continue;
            }
            _ => {}
        }
        escaped.push(ch);
    }
    Cow::Owned(escaped)
}

/// Decides whether a path names a transient file that must never reach the
/// handler.
///
/// Only the base name is inspected. Glob matches are case-sensitive; plain
/// dotted patterns (`.tmp`) additionally match as a case-insensitive suffix.
/// Supported glob syntax is `*`, `?` and `[...]`; braces match literally.
#[derive(Debug, Clone)]
pub struct IgnoreFilter {
    rules: Vec<IgnoreRule>,
}

impl IgnoreFilter {
    /// Build a filter from `patterns`. An empty list means "use the
    /// defaults", never "ignore nothing".
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Self {
        let rules: Vec<IgnoreRule> = if patterns.is_empty() {
            DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| IgnoreRule::compile(p))
                .collect()
        } else {
            patterns
                .iter()
                .map(|p| IgnoreRule::compile(p.as_ref()))
                .collect()
        };
        Self { rules }
    }

    pub fn should_ignore(&self, path: &Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        let name = name.to_string_lossy();
        let name_lower = name.to_lowercase();

        self.rules.iter().any(|rule| rule.matches(&name, &name_lower))
    }

    pub fn add_pattern(&mut self, pattern: impl AsRef<str>) {
        self.rules.push(IgnoreRule::compile(pattern.as_ref()));
    }

    /// Configured patterns in insertion order. Returns a copy.
    pub fn patterns(&self) -> Vec<String> {
        self.rules.iter().map(|r| r.pattern.clone()).collect()
    }
}

impl Default for IgnoreFilter {
    fn default() -> Self {
        Self::new::<&str>(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_list_falls_back_to_defaults() {
        let filter = IgnoreFilter::new::<String>(&[]);
        assert_eq!(filter.patterns().len(), DEFAULT_IGNORE_PATTERNS.len());
        assert!(filter.should_ignore(Path::new("/dl/movie.mkv.part")));
        assert!(filter.should_ignore(Path::new("/dl/setup.exe.crdownload")));
        assert!(filter.should_ignore(Path::new("/dl/.~lock.report.odt#")));
        assert!(!filter.should_ignore(Path::new("/dl/report.pdf")));
    }

    #[test]
    fn glob_matches_base_name_only() {
        let filter = IgnoreFilter::new(&["tmp*"]);
        assert!(filter.should_ignore(Path::new("/a/b/tmp123")));
        // The directory name must not count.
        assert!(!filter.should_ignore(Path::new("/tmpdir/file.txt")));
    }

    #[test]
    fn glob_is_case_sensitive() {
        let filter = IgnoreFilter::new(&["*.part"]);
        assert!(filter.should_ignore(Path::new("video.part")));
        assert!(!filter.should_ignore(Path::new("VIDEO.PART")));
    }

    #[test]
    fn plain_extension_matches_any_case() {
        let filter = IgnoreFilter::new(&[".tmp"]);
        assert!(filter.should_ignore(Path::new("FILE.TMP")));
        assert!(filter.should_ignore(Path::new("/x/file.Tmp")));
        assert!(!filter.should_ignore(Path::new("file.tmpl")));
    }

    #[test]
    fn question_mark_and_class() {
        let filter = IgnoreFilter::new(&["file?.[0-9]"]);
        assert!(filter.should_ignore(Path::new("fileA.7")));
        assert!(!filter.should_ignore(Path::new("fileAB.7")));
        assert!(!filter.should_ignore(Path::new("fileA.x")));
    }

    #[test]
    fn malformed_pattern_never_matches() {
        let filter = IgnoreFilter::new(&["[unclosed", "*.part"]);
        assert!(!filter.should_ignore(Path::new("[unclosed")));
        assert!(filter.should_ignore(Path::new("a.part")));
    }

    #[test]
    fn add_pattern_appends_and_patterns_is_a_copy() {
        let mut filter = IgnoreFilter::new(&["*.part"]);
        filter.add_pattern("*.bak");

        let mut copy = filter.patterns();
        assert_eq!(copy, vec!["*.part".to_string(), "*.bak".to_string()]);
        copy.clear();
        assert_eq!(filter.patterns().len(), 2);
        assert!(filter.should_ignore(Path::new("notes.bak")));
    }

    #[test]
    fn braces_are_literal_not_alternation() {
        let filter = IgnoreFilter::new(&["{a,b}.txt"]);
        assert!(!filter.should_ignore(Path::new("a.txt")));
        assert!(!filter.should_ignore(Path::new("b.txt")));
        assert!(filter.should_ignore(Path::new("{a,b}.txt")));
    }

    #[test]
    fn dotted_pattern_with_braces_keeps_suffix_rule() {
        let filter = IgnoreFilter::new(&[".v{1}"]);
        assert!(filter.should_ignore(Path::new("backup.v{1}")));
        assert!(filter.should_ignore(Path::new("BACKUP.V{1}")));
    }

    #[test]
    fn braces_inside_a_class_are_left_alone() {
        assert_eq!(escape_braces("*.[{x]"), "*.[{x]");
        assert_eq!(escape_braces("a{b}"), "a[{]b[}]");
        assert_eq!(escape_braces("*.part"), "*.part");
    }

    #[test]
    fn path_without_base_name_is_kept() {
        let filter = IgnoreFilter::new(&["*"]);
        assert!(!filter.should_ignore(Path::new("/")));
    }
}
