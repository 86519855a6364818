//! Pattern definitions.
//!
//! A [`Pattern`] couples a search key with an optional replacement and an
//! opaque caller-supplied title. Key and replacement bytes are reference
//! counted, so a pattern registered with several automatons (or carried into
//! per-node match sets) shares one allocation.

use std::fmt;
use std::sync::Arc;

/// Maximum accepted key length, in bytes.
///
/// Keys longer than this are rejected at registration time. The replace
/// engine's backlog buffer is sized by this constant: a chunk tail that is
/// still a viable pattern prefix can never exceed it.
pub const MAX_PATTERN_LEN: usize = 1024;

/// A search pattern: a non-empty byte key, an optional replacement and an
/// optional caller tag.
///
/// The tag type `X` is opaque to the engine; it is only cloned and handed
/// back inside match events. It defaults to `String`.
///
/// The replacement, when present, may be empty -- that deletes the matched
/// key from the rewritten stream.
pub struct Pattern<X = String> {
    key: Arc<[u8]>,
    replacement: Option<Arc<[u8]>>,
    title: Option<X>,
}

impl<X> Pattern<X> {
    /// Create a pattern from a copy of the given key bytes.
    pub fn new(key: impl AsRef<[u8]>) -> Self {
        Self {
            key: Arc::from(key.as_ref()),
            replacement: None,
            title: None,
        }
    }

    /// Create a pattern that shares an existing allocation instead of
    /// copying it.
    pub fn from_shared(key: Arc<[u8]>) -> Self {
        Self {
            key,
            replacement: None,
            title: None,
        }
    }

    /// Attach a replacement, copied from the given bytes. An empty
    /// replacement deletes the key from replace output.
    pub fn with_replacement(mut self, replacement: impl AsRef<[u8]>) -> Self {
        self.replacement = Some(Arc::from(replacement.as_ref()));
        self
    }

    /// Attach a replacement that shares an existing allocation.
    pub fn with_shared_replacement(mut self, replacement: Arc<[u8]>) -> Self {
        self.replacement = Some(replacement);
        self
    }

    /// Attach a caller tag.
    pub fn with_title(mut self, title: X) -> Self {
        self.title = Some(title);
        self
    }

    /// The search key.
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    /// The key's shared allocation.
    pub fn shared_key(&self) -> Arc<[u8]> {
        Arc::clone(&self.key)
    }

    /// The replacement bytes, if any.
    pub fn replacement(&self) -> Option<&[u8]> {
        self.replacement.as_deref()
    }

    /// The caller tag, if any.
    pub fn title(&self) -> Option<&X> {
        self.title.as_ref()
    }
}

impl<X: Clone> Clone for Pattern<X> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            replacement: self.replacement.clone(),
            title: self.title.clone(),
        }
    }
}

impl<X> fmt::Debug for Pattern<X> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pattern")
            .field("key", &String::from_utf8_lossy(&self.key))
            .field(
                "replacement",
                &self
                    .replacement
                    .as_deref()
                    .map(String::from_utf8_lossy),
            )
            .finish()
    }
}
