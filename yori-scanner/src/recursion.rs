// Recursion into discovered directories
//
// Directories live in an arena indexed by a growing id. Scopes are handed out
// from a FIFO queue; nothing here recurses on the call stack.

use crate::generator::Candidate;
use crate::prober::RawResponse;
use crate::result::ScanWarning;
use crate::target::{Target, normalize_directory_url};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_DIRECTORY_WARN_THRESHOLD: usize = 100;

pub type DirectoryId = usize;

/// Normalized directory URL when the response shows `candidate` to be a
/// directory: a directory candidate, a URL ending in `/`, or a redirect to
/// the same URL with a trailing slash.
pub fn directory_url(candidate: &Candidate, response: &RawResponse) -> Option<String> {
    if candidate.is_directory() || candidate.url().ends_with('/') {
        return normalize_directory_url(candidate.url());
    }

    if !response.is_redirect() {
        return None;
    }
    let location = response.location.as_deref()?;
    let base = Url::parse(candidate.url()).ok()?;
    let resolved = base.join(location).ok()?;
    let expected = format!("{}/", candidate.url());

    if resolved.as_str() == expected {
        normalize_directory_url(&expected)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DirState {
    NotVisited,
    Queued,
    InProgress,
    Done,
}

#[derive(Debug)]
struct DirectoryEntry {
    target: Target,
    depth: usize,
    parent: Option<DirectoryId>,
    state: DirState,
    scanned: bool,
    open_children: usize,
}

/// What happened to a directory offered to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer {
    Queued(DirectoryId),
    AlreadyKnown,
    TooDeep,
    OffOrigin,
}

/// A directory ready to be scanned.
#[derive(Debug, Clone)]
pub struct Scope {
    pub id: DirectoryId,
    pub target: Target,
    pub depth: usize,
}

/// Owns the directory table and the depth budget of a run.
#[derive(Debug)]
pub struct RecursionController {
    entries: Vec<DirectoryEntry>,
    index: HashMap<String, DirectoryId>,
    queue: VecDeque<DirectoryId>,
    max_depth: usize,
    warn_threshold: usize,
    warned: bool,
    pending_warning: Option<ScanWarning>,
}

impl RecursionController {
    /// `max_depth` of 0 disables recursion; only the root is scanned.
    pub fn new(root: Target, max_depth: usize) -> Self {
        let mut controller = Self {
            entries: Vec::new(),
            index: HashMap::new(),
            queue: VecDeque::new(),
            max_depth,
            warn_threshold: DEFAULT_DIRECTORY_WARN_THRESHOLD,
            warned: false,
            pending_warning: None,
        };
        let id = controller.insert(root, 0, None);
        controller.enqueue(id);
        controller
    }

    pub fn with_warn_threshold(mut self, threshold: usize) -> Self {
        self.warn_threshold = threshold;
        self
    }

    /// Directories found below the root.
    pub fn discovered(&self) -> usize {
        self.entries.len().saturating_sub(1)
    }

    pub fn state(&self, id: DirectoryId) -> Option<DirState> {
        self.entries.get(id).map(|entry| entry.state)
    }

    pub fn is_finished(&self) -> bool {
        self.entries.iter().all(|entry| entry.state == DirState::Done)
    }

    /// Take the next queued directory and mark it in progress.
    pub fn next_scope(&mut self) -> Option<Scope> {
        let id = self.queue.pop_front()?;
        let entry = &mut self.entries[id];
        entry.state = DirState::InProgress;
        Some(Scope {
            id,
            target: entry.target.clone(),
            depth: entry.depth,
        })
    }

    /// Offer a directory found while scanning `parent`.
    pub fn offer(&mut self, parent: DirectoryId, directory_url: &str) -> Offer {
        let Some(normalized) = normalize_directory_url(directory_url) else {
            return Offer::OffOrigin;
        };
        if self.index.contains_key(&normalized) {
            return Offer::AlreadyKnown;
        }

        let parent_entry = &self.entries[parent];
        let depth = parent_entry.depth + 1;
        if depth > self.max_depth {
            debug!("Not descending into {}: depth {} over limit", normalized, depth);
            return Offer::TooDeep;
        }
        let Ok(target) = parent_entry.target.child(&normalized) else {
            return Offer::OffOrigin;
        };

        let id = self.insert(target, depth, Some(parent));
        self.entries[parent].open_children += 1;
        self.enqueue(id);
        debug!("Queued directory {} at depth {}", normalized, depth);

        let discovered = self.discovered();
        if !self.warned && discovered >= self.warn_threshold {
            self.warned = true;
            warn!("{} directories discovered", discovered);
            self.pending_warning = Some(ScanWarning::ManyDirectories { count: discovered });
        }

        Offer::Queued(id)
    }

    /// Warning raised by the last `offer`, if any. Each warning is returned once.
    pub fn take_warning(&mut self) -> Option<ScanWarning> {
        self.pending_warning.take()
    }

    /// Mark a scope's own scan finished and propagate `Done` to every
    /// ancestor whose children are now all done.
    pub fn finish_scope(&mut self, id: DirectoryId) {
        self.entries[id].scanned = true;

        let mut current = Some(id);
        while let Some(id) = current {
            let entry = &mut self.entries[id];
            if !entry.scanned || entry.open_children > 0 || entry.state == DirState::Done {
                break;
            }
            entry.state = DirState::Done;
            current = entry.parent;
            if let Some(parent) = current {
                self.entries[parent].open_children -= 1;
            }
        }
    }

    /// Stop handing out scopes. Queued directories stay unvisited.
    pub fn abandon_queue(&mut self) {
        for id in self.queue.drain(..) {
            self.entries[id].state = DirState::NotVisited;
        }
    }

    fn insert(&mut self, target: Target, depth: usize, parent: Option<DirectoryId>) -> DirectoryId {
        let id = self.entries.len();
        self.index.insert(target.as_str().to_string(), id);
        self.entries.push(DirectoryEntry {
            target,
            depth,
            parent,
            state: DirState::NotVisited,
            scanned: false,
            open_children: 0,
        });
        id
    }

    fn enqueue(&mut self, id: DirectoryId) {
        self.entries[id].state = DirState::Queued;
        self.queue.push_back(id);
    }
}
