// Candidate generation: wordlist x extensions x directories
//
// Every source below is a pure iterator over the shared inputs. They are
// chained in a fixed order (bare forms first, suffixed forms last) and
// deduplicated on the resolved URL.

use crate::error::{Result, ScanError};
use crate::target::Target;
use crate::wordlist::{DirectorySet, ExtensionSet, Wordlist};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

/// How a candidate came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// A bare word or directory name at the scan root.
    Seed,
    /// A combined form (word + extension) at the scan root.
    WordlistCombo,
    /// Anything generated while re-seeding a discovered directory.
    Recursive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    File,
    Directory,
}

/// A single path waiting to be probed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    segments: Vec<String>,
    depth: usize,
    origin: Origin,
    kind: CandidateKind,
    url: String,
}

impl Candidate {
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn origin(&self) -> Origin {
        self.origin
    }

    pub fn is_directory(&self) -> bool {
        self.kind == CandidateKind::Directory
    }

    /// Fully resolved URL; the identity of the candidate.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Path relative to the scope root, with a trailing slash for directories.
    pub fn path(&self) -> String {
        let mut path = self.segments.join("/");
        if self.is_directory() {
            path.push('/');
        }
        path
    }
}

/// Everything a generator combines. Shared read-only between the generators
/// of every scope in a run.
#[derive(Debug, Clone, Default)]
pub struct CandidateSources {
    pub wordlist: Wordlist,
    pub extensions: ExtensionSet,
    pub directories: DirectorySet,
    /// Also probe `dir.ext` for every directory name and extension.
    pub directory_extensions: bool,
}

impl CandidateSources {
    pub fn new(wordlist: Wordlist, extensions: ExtensionSet, directories: DirectorySet) -> Self {
        Self {
            wordlist,
            extensions,
            directories,
            directory_extensions: false,
        }
    }

    pub fn with_directory_extensions(mut self, enabled: bool) -> Self {
        self.directory_extensions = enabled;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Form {
    Bare,
    Combined,
}

struct Draft {
    segments: Vec<String>,
    kind: CandidateKind,
    form: Form,
}

impl Draft {
    fn file(segments: Vec<String>, form: Form) -> Self {
        Self {
            segments,
            kind: CandidateKind::File,
            form,
        }
    }

    fn directory(name: String) -> Self {
        Self {
            segments: vec![name],
            kind: CandidateKind::Directory,
            form: Form::Bare,
        }
    }
}

/// Produces the candidates of one scope (a root and a depth). Cheap to build;
/// `candidates()` can be called again to restart the sequence.
#[derive(Debug, Clone)]
pub struct Generator {
    root: Arc<Target>,
    sources: Arc<CandidateSources>,
    depth: usize,
}

impl Generator {
    pub fn new(root: Target, sources: Arc<CandidateSources>, depth: usize) -> Result<Self> {
        if sources.wordlist.is_empty() && sources.directories.is_empty() {
            return Err(ScanError::NothingToGenerate);
        }
        Ok(Self {
            root: Arc::new(root),
            sources,
            depth,
        })
    }

    /// Lazy, finite sequence of unique candidates for this scope.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + Send + use<> {
        let sources = &self.sources;
        let drafts = bare_words(sources.clone())
            .chain(bare_directories(sources.clone()))
            .chain(word_extensions(sources.clone()))
            .chain(directory_extensions(sources.clone()))
            .chain(nested_words(sources.clone(), self.depth));

        let root = self.root.clone();
        let scope = self.root.clone();
        let depth = self.depth;
        let mut emitted = HashSet::new();

        drafts
            .map(move |draft| build_candidate(&root, draft, depth))
            // Dot segments in a word can climb out of the scope.
            .filter(move |candidate| {
                scope
                    .relative_path(&candidate.url)
                    .is_some_and(|rest| !rest.is_empty())
            })
            .filter(move |candidate| emitted.insert(candidate.url.clone()))
    }

    /// Upper bound of candidates before dedup; used for progress display.
    pub fn estimated_len(&self) -> usize {
        let words = self.sources.wordlist.len();
        let extensions = self.sources.extensions.len();
        let directories = self.sources.directories.len();

        let mut total = words + directories + words * extensions * 2;
        if self.sources.directory_extensions {
            total += directories * extensions;
        }
        if self.depth > 0 {
            total += directories * words;
        }
        total
    }
}

fn build_candidate(root: &Target, draft: Draft, depth: usize) -> Candidate {
    let origin = match (depth, draft.form) {
        (0, Form::Bare) => Origin::Seed,
        (0, Form::Combined) => Origin::WordlistCombo,
        _ => Origin::Recursive,
    };
    let directory = draft.kind == CandidateKind::Directory;
    let url = root.resolve(&draft.segments, directory);

    Candidate {
        segments: draft.segments,
        depth,
        origin,
        kind: draft.kind,
        url,
    }
}

fn bare_words(sources: Arc<CandidateSources>) -> impl Iterator<Item = Draft> + Send + 'static {
    (0..sources.wordlist.len()).map(move |i| {
        let word = &sources.wordlist.words()[i];
        match word.strip_suffix('/') {
            Some(directory) => Draft::directory(directory.to_string()),
            None => Draft::file(vec![word.clone()], Form::Bare),
        }
    })
}

fn bare_directories(
    sources: Arc<CandidateSources>,
) -> impl Iterator<Item = Draft> + Send + 'static {
    (0..sources.directories.len())
        .map(move |i| Draft::directory(sources.directories.as_slice()[i].clone()))
}

fn word_extensions(
    sources: Arc<CandidateSources>,
) -> impl Iterator<Item = Draft> + Send + 'static {
    let extension_count = sources.extensions.len();
    (0..sources.wordlist.len()).flat_map(move |w| {
        let sources = sources.clone();
        (0..extension_count).flat_map(move |e| {
            let word = &sources.wordlist.words()[w];
            let extension = &sources.extensions.as_slice()[e];
            extension_forms(word, extension)
                .into_iter()
                .map(|name| Draft::file(vec![name], Form::Combined))
        })
    })
}

fn directory_extensions(
    sources: Arc<CandidateSources>,
) -> impl Iterator<Item = Draft> + Send + 'static {
    let enabled = sources.directory_extensions;
    let extension_count = sources.extensions.len();
    let directory_count = if enabled { sources.directories.len() } else { 0 };

    (0..directory_count).flat_map(move |d| {
        let sources = sources.clone();
        (0..extension_count).map(move |e| {
            let name = format!(
                "{}.{}",
                sources.directories.as_slice()[d],
                sources.extensions.as_slice()[e]
            );
            Draft::file(vec![name], Form::Combined)
        })
    })
}

/// `dir/word` pairs. Only generated below the scan root to keep the root
/// scan at O(words + directories).
fn nested_words(
    sources: Arc<CandidateSources>,
    depth: usize,
) -> impl Iterator<Item = Draft> + Send + 'static {
    let word_count = sources.wordlist.len();
    let directory_count = if depth > 0 { sources.directories.len() } else { 0 };

    (0..directory_count).flat_map(move |d| {
        let sources = sources.clone();
        (0..word_count).map(move |w| {
            let directory = sources.directories.as_slice()[d].clone();
            let word = sources.wordlist.words()[w].clone();
            Draft::file(vec![directory, word], Form::Combined)
        })
    })
}

/// `word.ext`, plus `stem.ext` when the word already carries an extension
/// (`index.html` + `bak` gives `index.html.bak` and `index.bak`).
pub fn extension_forms(word: &str, extension: &str) -> Vec<String> {
    if word.ends_with('/') {
        return Vec::new();
    }

    let mut forms = vec![format!("{}.{}", word, extension)];
    if let Some(dot) = word.rfind('.')
        && dot > 0
    {
        let stem = &word[..dot];
        let swapped = format!("{}.{}", stem, extension);
        if !forms.contains(&swapped) {
            forms.push(swapped);
        }
    }
    forms
}
