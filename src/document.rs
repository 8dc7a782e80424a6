//! In-flight document state: the [`Document`], its [`Page`]s, and the
//! lifecycle state machine the pipeline drives it through.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Lifecycle of one document inside the pipeline.
///
/// ```text
/// Discovered → Rasterizing → Ocring → Merging → (Translating) → (Summarizing) → Done
///      └────────────┴───────────┴─────────┴────────────┴──────────────┴──────→ Failed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentState {
    Discovered,
    Rasterizing,
    Ocring,
    Merging,
    Translating,
    Summarizing,
    Done,
    Failed,
}

impl DocumentState {
    /// `Done` and `Failed` accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentState::Done | DocumentState::Failed)
    }

    /// Whether `self → next` is a legal transition.
    pub fn can_advance_to(self, next: DocumentState) -> bool {
        use DocumentState::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Failed)
                | (Discovered, Rasterizing)
                | (Rasterizing, Ocring)
                | (Ocring, Merging)
                | (Merging, Translating)
                | (Merging, Done)
                | (Translating, Done)
                | (Merging, Summarizing)
                | (Translating, Summarizing)
                | (Summarizing, Done)
        )
    }
}

impl fmt::Display for DocumentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentState::Discovered => "discovered",
            DocumentState::Rasterizing => "rasterizing",
            DocumentState::Ocring => "ocring",
            DocumentState::Merging => "merging",
            DocumentState::Translating => "translating",
            DocumentState::Summarizing => "summarizing",
            DocumentState::Done => "done",
            DocumentState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// One rasterized page of a [`Document`].
#[derive(Debug, Clone)]
pub struct Page {
    /// 1-based, contiguous within the document.
    pub index: usize,
    /// Image inside the document's temporary working area.
    pub image: PathBuf,
    /// Present only after successful OCR.
    pub text: Option<String>,
}

/// One input PDF and the pages derived from it.
#[derive(Debug)]
pub struct Document {
    id: String,
    source: PathBuf,
    pages: Vec<Page>,
    state: DocumentState,
}

impl Document {
    /// A freshly discovered document. The id is the file stem.
    pub fn discover(source: impl Into<PathBuf>) -> Self {
        let source = source.into();
        Self {
            id: document_stem(&source),
            source,
            pages: Vec::new(),
            state: DocumentState::Discovered,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn state(&self) -> DocumentState {
        self.state
    }

    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn pages_mut(&mut self) -> &mut [Page] {
        &mut self.pages
    }

    /// Attach rasterized images in order, numbering them from 1.
    pub fn attach_pages(&mut self, images: Vec<PathBuf>) {
        self.pages = images
            .into_iter()
            .enumerate()
            .map(|(i, image)| Page {
                index: i + 1,
                image,
                text: None,
            })
            .collect();
    }

    /// Move to `next`. Illegal transitions are ignored and return `false`.
    pub fn advance(&mut self, next: DocumentState) -> bool {
        if !self.state.can_advance_to(next) {
            debug!(
                "{}: ignoring illegal transition {} → {}",
                self.id, self.state, next
            );
            return false;
        }
        debug!("{}: {} → {}", self.id, self.state, next);
        self.state = next;
        true
    }
}

/// Stable identity of a document: its file name without extension.
///
/// Falls back to `"document"` for paths with no usable file name.
pub fn document_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "document".to_string())
}
