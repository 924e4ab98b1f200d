//! Resolving which document an operation targets.

use docsync_types::Document;

/// Pick the document id an operation should use.
///
/// The id set by login or save wins; otherwise the id embedded in the cached
/// document is used, unless it is empty. `None` means the operation has no
/// target.
pub fn resolve_document_id<'a, D: Document>(
    current: Option<&'a str>,
    cached: Option<&'a D>,
) -> Option<&'a str> {
    current.or_else(|| cached.map(Document::id).filter(|id| !id.is_empty()))
}
