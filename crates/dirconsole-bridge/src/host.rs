//! The page environment the bridge runs in.
//!
//! In a browser this is `window`: its address bar, its history, its
//! parent frame and its `message` events. [`Host`] captures exactly the
//! parts the authentication flow touches, so the flow can run against a
//! real window, a desktop webview shell, or the in-process
//! [`ScriptedHost`].

use std::sync::Mutex;

use tokio::sync::mpsc;
use url::Url;

/// A cross-document message as delivered to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowMessage {
    /// The sender's origin (`scheme://host[:port]`), as reported by the
    /// platform. Never taken from the message body.
    pub origin: String,
    /// The message data, serialized as JSON text.
    pub data: String,
}

impl WindowMessage {
    pub fn new(origin: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            data: data.into(),
        }
    }
}

/// Everything the authentication flow needs from its page.
///
/// Methods are synchronous: they mirror window APIs that return
/// immediately. Inbound messages arrive asynchronously through the
/// channel handed out by [`take_messages`](Host::take_messages).
pub trait Host: Send + Sync + 'static {
    /// The current absolute address.
    fn location(&self) -> Url;

    /// Replaces the current history entry with `relative`
    /// (`path[?query][#fragment]`) without adding a new entry, so the old
    /// address can't be reached with back/forward.
    fn replace_location(&self, relative: &str);

    /// `true` when the page runs inside another window's frame.
    fn is_embedded(&self) -> bool;

    /// Posts `message` (JSON text) to the parent frame, delivered only if
    /// the parent's origin equals `target_origin`.
    fn post_to_parent(&self, message: &str, target_origin: &str);

    /// Hands out the inbound message stream. Returns `None` once taken.
    fn take_messages(&self) -> Option<mpsc::UnboundedReceiver<WindowMessage>>;

    /// Client-side redirect to `path`.
    fn navigate(&self, path: &str);
}

// ---------------------------------------------------------------------------
// ScriptedHost
// ---------------------------------------------------------------------------

/// An in-process [`Host`] whose environment is set up front and whose
/// effects are recorded.
///
/// Used by headless shells (CLI tools, desktop wrappers that inject the
/// console token themselves) and by every test in this workspace.
#[derive(Debug)]
pub struct ScriptedHost {
    location: Mutex<Url>,
    embedded: bool,
    inbound: mpsc::UnboundedSender<WindowMessage>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<WindowMessage>>>,
    posted: Mutex<Vec<(String, String)>>,
    navigations: Mutex<Vec<String>>,
}

impl ScriptedHost {
    /// A top-level page at `location`.
    pub fn new(location: Url) -> Self {
        let (inbound, receiver) = mpsc::unbounded_channel();
        Self {
            location: Mutex::new(location),
            embedded: false,
            inbound,
            receiver: Mutex::new(Some(receiver)),
            posted: Mutex::new(Vec::new()),
            navigations: Mutex::new(Vec::new()),
        }
    }

    /// Marks the page as running inside a parent frame.
    pub fn embedded(mut self) -> Self {
        self.embedded = true;
        self
    }

    /// Delivers a message to the page as if `origin` had posted it.
    ///
    /// Returns `false` once the page stopped listening.
    pub fn deliver(&self, origin: &str, data: &str) -> bool {
        self.inbound.send(WindowMessage::new(origin, data)).is_ok()
    }

    /// Messages posted to the parent, as `(message, target_origin)`.
    pub fn posted(&self) -> Vec<(String, String)> {
        lock(&self.posted).clone()
    }

    /// Every path passed to [`Host::navigate`], in order.
    pub fn navigations(&self) -> Vec<String> {
        lock(&self.navigations).clone()
    }
}

impl Host for ScriptedHost {
    fn location(&self) -> Url {
        lock(&self.location).clone()
    }

    fn replace_location(&self, relative: &str) {
        let mut location = lock(&self.location);
        match location.join(relative) {
            Ok(next) => *location = next,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unparsable location");
            }
        }
    }

    fn is_embedded(&self) -> bool {
        self.embedded
    }

    fn post_to_parent(&self, message: &str, target_origin: &str) {
        if self.embedded {
            lock(&self.posted)
                .push((message.to_string(), target_origin.to_string()));
        }
    }

    fn take_messages(&self) -> Option<mpsc::UnboundedReceiver<WindowMessage>> {
        lock(&self.receiver).take()
    }

    fn navigate(&self, path: &str) {
        lock(&self.navigations).push(path.to_string());
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
