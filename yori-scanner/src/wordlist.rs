// Generator inputs: the wordlist and the extension / directory sets

use crate::error::{Result, ScanError};
use std::collections::HashSet;

/// Extensions merged into every scan unless `no_common` is set.
pub const COMMON_EXTENSIONS: &[&str] = &[
    "php", "html", "txt", "xml", "js", "json", "log", "bak", "config",
];

/// Directory names merged into every scan unless `no_common` is set.
pub const COMMON_DIRECTORIES: &[&str] = &[
    "admin", "backup", "uploads", "api", "include", "config", "tmp",
];

/// Word used for extension probing when no wordlist was supplied.
pub const DEFAULT_WORD: &str = "index";

/// Ordered, trimmed, deduplicated words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Wordlist {
    words: Vec<String>,
}

impl Wordlist {
    /// Build from raw entries. Fails when nothing usable is left.
    pub fn new<I, S>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = dedup_ordered(entries.into_iter().filter_map(|entry| {
            let word = entry.as_ref().trim().trim_start_matches('/');
            (!word.is_empty()).then(|| word.to_string())
        }));

        if words.is_empty() {
            return Err(ScanError::EmptyWordlist);
        }
        Ok(Self { words })
    }

    /// A list with no words, for scans driven by directories only.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// File extensions, stored without a leading dot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionSet {
    extensions: Vec<String>,
}

impl ExtensionSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let extensions = dedup_ordered(entries.into_iter().filter_map(|entry| {
            let ext = entry.as_ref().trim().trim_start_matches('.');
            (!ext.is_empty()).then(|| ext.to_string())
        }));
        Self { extensions }
    }

    /// User entries first, then any defaults not already present.
    pub fn merged_with_common(self, no_common: bool) -> Self {
        if no_common {
            return self;
        }
        Self::new(
            self.extensions
                .iter()
                .map(String::as_str)
                .chain(COMMON_EXTENSIONS.iter().copied()),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.extensions
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// Directory names, stored without surrounding slashes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectorySet {
    directories: Vec<String>,
}

impl DirectorySet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let directories = dedup_ordered(entries.into_iter().filter_map(|entry| {
            let dir = entry.as_ref().trim().trim_matches('/');
            (!dir.is_empty()).then(|| dir.to_string())
        }));
        Self { directories }
    }

    pub fn merged_with_common(self, no_common: bool) -> Self {
        if no_common {
            return self;
        }
        Self::new(
            self.directories
                .iter()
                .map(String::as_str)
                .chain(COMMON_DIRECTORIES.iter().copied()),
        )
    }

    pub fn as_slice(&self) -> &[String] {
        &self.directories
    }

    pub fn len(&self) -> usize {
        self.directories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.directories.is_empty()
    }
}

fn dedup_ordered(items: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items.filter(|item| seen.insert(item.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wordlist_trims_and_dedups() {
        let wordlist = Wordlist::new(["  admin ", "backup", "admin", "", "/login"]).unwrap();
        assert_eq!(wordlist.words(), &["admin", "backup", "login"]);
    }

    #[test]
    fn test_wordlist_rejects_blank_input() {
        assert!(matches!(
            Wordlist::new(["", "   "]),
            Err(ScanError::EmptyWordlist)
        ));
        assert!(matches!(
            Wordlist::new(Vec::<String>::new()),
            Err(ScanError::EmptyWordlist)
        ));
    }

    #[test]
    fn test_extensions_strip_leading_dot() {
        let extensions = ExtensionSet::new([".php", "php", "html", " .txt "]);
        assert_eq!(extensions.as_slice(), &["php", "html", "txt"]);
    }

    #[test]
    fn test_directories_strip_slashes() {
        let directories = DirectorySet::new(["/img/", "img", "css/"]);
        assert_eq!(directories.as_slice(), &["img", "css"]);
    }

    #[test]
    fn test_merge_with_common() {
        let merged = ExtensionSet::new(["asp", "php"]).merged_with_common(false);
        assert_eq!(merged.as_slice()[0], "asp");
        assert_eq!(merged.as_slice()[1], "php");
        assert_eq!(merged.len(), COMMON_EXTENSIONS.len() + 1);

        let untouched = DirectorySet::new(["img"]).merged_with_common(true);
        assert_eq!(untouched.as_slice(), &["img"]);

        let merged = DirectorySet::new(["img"]).merged_with_common(false);
        assert_eq!(merged.len(), COMMON_DIRECTORIES.len() + 1);
    }
}
