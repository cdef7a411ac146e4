// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader: open source documents and answer page-geometry and resource
// queries using the `lopdf` crate.

use std::path::{Path, PathBuf};

use farbwerk_core::PageSize;
use farbwerk_core::error::FarbwerkError;
use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info, instrument};

/// US Letter, used when a page tree carries no /MediaBox at all.
const DEFAULT_MEDIA_BOX: MediaBox = MediaBox {
    llx: 0.0,
    lly: 0.0,
    urx: 612.0,
    ury: 792.0,
};

/// Guard against cyclic /Parent chains in damaged files.
const MAX_TREE_DEPTH: usize = 32;

/// A page's /MediaBox in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub llx: f32,
    pub lly: f32,
    pub urx: f32,
    pub ury: f32,
}

impl MediaBox {
    pub fn width(&self) -> f32 {
        self.urx - self.llx
    }

    pub fn height(&self) -> f32 {
        self.ury - self.lly
    }

    pub fn size(&self) -> PageSize {
        PageSize::new(self.width(), self.height())
    }

    /// Map a user-space point to page space (origin top-left, y down).
    pub fn to_page_space(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.llx, self.ury - y)
    }

    fn from_array(values: &[Object]) -> Option<Self> {
        if values.len() != 4 {
            return None;
        }
        let n: Vec<f32> = values.iter().filter_map(number).collect();
        if n.len() != 4 {
            return None;
        }
        // Corners may be given in any order.
        Some(Self {
            llx: n[0].min(n[2]),
            lly: n[1].min(n[3]),
            urx: n[0].max(n[2]),
            ury: n[1].max(n[3]),
        })
    }
}

/// An opened source PDF.
///
/// Wraps `lopdf::Document` and exposes pages by zero-based index. The handle
/// is read-only: nothing in Farbwerk mutates a source document.
#[derive(Clone)]
pub struct SourceDocument {
    /// The underlying lopdf document.
    document: Document,
    /// Page object ids in page order.
    page_ids: Vec<ObjectId>,
    /// Source path, if opened from a file.
    source_path: Option<PathBuf>,
}

impl SourceDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, FarbwerkError> {
        let path_ref = path.as_ref();
        info!("Opening PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            FarbwerkError::InvalidDocument(format!("{}: {}", path_ref.display(), err))
        })?;

        let mut source = Self::from_document(document);
        source.source_path = Some(path_ref.to_path_buf());
        debug!(pages = source.page_count(), "PDF loaded");
        Ok(source)
    }

    /// Create a reader from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self, FarbwerkError> {
        let document = Document::load_mem(data).map_err(|err| {
            FarbwerkError::InvalidDocument(format!("failed to load PDF from memory: {}", err))
        })?;

        let source = Self::from_document(document);
        debug!(pages = source.page_count(), "PDF loaded from bytes");
        Ok(source)
    }

    fn from_document(document: Document) -> Self {
        // lopdf pages are keyed by 1-indexed page number, already sorted.
        let page_ids = document.get_pages().into_values().collect();
        Self {
            document,
            page_ids,
            source_path: None,
        }
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Return the source path if the reader was created via [`SourceDocument::open`].
    pub fn source_path(&self) -> Option<&Path> {
        self.source_path.as_deref()
    }

    /// The underlying lopdf document.
    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Object id of the page at zero-based `index`.
    pub fn page_id(&self, index: usize) -> Option<ObjectId> {
        self.page_ids.get(index).copied()
    }

    /// The page's /MediaBox, following inheritance up the page tree.
    pub fn media_box(&self, index: usize) -> Option<MediaBox> {
        let page_id = self.page_id(index)?;
        let media_box = self
            .inherited(page_id, b"MediaBox")
            .and_then(|obj| obj.as_array().ok())
            .and_then(|arr| MediaBox::from_array(arr))
            .unwrap_or(DEFAULT_MEDIA_BOX);
        Some(media_box)
    }

    /// Width and height of the page at `index`.
    pub fn page_size(&self, index: usize) -> Option<PageSize> {
        self.media_box(index).map(|mb| mb.size())
    }

    /// The page's /Rotate in degrees, normalised to 0, 90, 180 or 270.
    ///
    /// Missing or invalid values count as 0.
    pub fn rotation(&self, index: usize) -> Option<i64> {
        let page_id = self.page_id(index)?;
        let rotate = self
            .inherited(page_id, b"Rotate")
            .and_then(|obj| obj.as_i64().ok())
            .filter(|deg| deg % 90 == 0)
            .map_or(0, |deg| deg.rem_euclid(360));
        Some(rotate)
    }

    /// The page's /Resources dictionary, following inheritance.
    pub fn page_resources(&self, index: usize) -> Option<&Dictionary> {
        let page_id = self.page_id(index)?;
        self.inherited(page_id, b"Resources")
            .and_then(|obj| obj.as_dict().ok())
    }

    /// Decoded (decompressed, concatenated) content of the page at `index`.
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>, lopdf::Error> {
        let page_id = self
            .page_id(index)
            .ok_or(lopdf::Error::PageNumberNotFound(index as u32 + 1))?;
        self.document.get_page_content(page_id)
    }

    // -- Object helpers -------------------------------------------------------

    /// Follow a single indirect reference; direct objects are returned as-is.
    pub fn resolve<'a>(&'a self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.document.get_object(*id).unwrap_or(object),
            other => other,
        }
    }

    /// Look `key` up on the page dictionary, then on its ancestors.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut current = Some(page_id);
        let mut depth = 0;
        while let Some(id) = current {
            let dict = self.document.get_dictionary(id).ok()?;
            if let Ok(value) = dict.get(key) {
                return Some(self.resolve(value));
            }
            current = dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok());
            depth += 1;
            if depth > MAX_TREE_DEPTH {
                break;
            }
        }
        None
    }
}

/// Attempt an open-and-close round trip on `path`. Never fails loudly.
pub fn is_valid_pdf(path: impl AsRef<Path>) -> bool {
    match Document::load(path.as_ref()) {
        Ok(_) => true,
        Err(err) => {
            debug!(path = %path.as_ref().display(), %err, "not a valid PDF");
            false
        }
    }
}

/// Numeric value of an Integer or Real object.
pub(crate) fn number(object: &Object) -> Option<f32> {
    match object {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}
