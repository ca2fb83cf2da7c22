//! Read-only virtual documents holding synthesized host text.
//!
//! Each dialect document owns at most one virtual document, addressed as
//!
//! ```text
//! brewline-embedded://compiled/<url-encoded original uri>.js
//! ```
//!
//! The `.js` suffix is what routes the document to the JavaScript service.
//! Contents are overwritten on every completion request and live until the
//! server exits.

use std::collections::HashMap;
use std::sync::Mutex;

use tower_lsp::lsp_types::Url;

pub const SCHEME: &str = "brewline-embedded";
pub const AUTHORITY: &str = "compiled";
pub const HOST_EXTENSION: &str = ".js";

/// Virtual URI for the document at `original`.
pub fn virtual_uri(original: &Url) -> Option<Url> {
    let encoded = urlencoding::encode(original.as_str());
    Url::parse(&format!("{SCHEME}://{AUTHORITY}/{encoded}{HOST_EXTENSION}")).ok()
}

/// Recover the original document URI string from a virtual URI.
pub fn original_uri(virtual_uri: &Url) -> Option<String> {
    if virtual_uri.scheme() != SCHEME {
        return None;
    }
    let encoded = virtual_uri
        .path()
        .strip_prefix('/')?
        .strip_suffix(HOST_EXTENSION)?;
    urlencoding::decode(encoded).ok().map(|s| s.into_owned())
}

/// Registry of synthesized host texts keyed by original document URI.
#[derive(Default)]
pub struct VirtualDocuments {
    contents: Mutex<HashMap<String, String>>,
}

impl VirtualDocuments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `text` for `original` and return the virtual URI serving it.
    pub fn publish(&self, original: &Url, text: String) -> Option<Url> {
        let uri = virtual_uri(original)?;
        self.contents
            .lock()
            .unwrap()
            .insert(original.as_str().to_string(), text);
        Some(uri)
    }

    /// Current text for a virtual URI, if one was registered.
    pub fn resolve(&self, virtual_uri: &Url) -> Option<String> {
        let key = original_uri(virtual_uri)?;
        self.contents.lock().unwrap().get(&key).cloned()
    }

    /// Current text registered for an original document.
    pub fn get(&self, original: &Url) -> Option<String> {
        self.contents.lock().unwrap().get(original.as_str()).cloned()
    }
}
