//! Path canonicalization and the self-context cell.
//!
//! Incoming updates carry paths relative to a vessel context. The store
//! keys records by a canonical, context-prefixed path: updates for the
//! local vessel land under the literal `self.` prefix, everything else
//! under its raw context. The self identifier arrives asynchronously
//! from either wire decoder (server hello or snapshot), so it lives in
//! an explicit, versioned value cell instead of an ambient global;
//! canonicalization is then a pure function of `(context, SelfContext)`.

/// The process-wide self identifier, as a single-writer value cell.
///
/// Accepts both bare URNs (`urn:mrn:signalk:uuid:...`) and
/// `vessels.`-prefixed identifiers; comparisons normalize the prefix.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelfContext {
    id: Option<String>,
    version: u64,
}

impl SelfContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// The raw self identifier, if announced.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Bumped on every change, so observers can detect resets.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Set the self identifier. Returns true if it actually changed.
    pub fn set(&mut self, id: impl Into<String>) -> bool {
        let id = id.into();
        if self.id.as_deref() == Some(id.as_str()) {
            return false;
        }
        self.id = Some(id);
        self.version += 1;
        true
    }

    /// Clear the identifier on a full connection reset.
    pub fn clear(&mut self) {
        if self.id.is_some() {
            self.id = None;
            self.version += 1;
        }
    }

    /// Whether a wire context refers to the local vessel.
    ///
    /// The literal `self`/`vessels.self` always does; otherwise the
    /// context must equal the announced identifier, ignoring an optional
    /// `vessels.` prefix on either side.
    pub fn matches(&self, context: &str) -> bool {
        if context == "self" || context == "vessels.self" {
            return true;
        }
        match self.id.as_deref() {
            Some(id) => strip_vessels(context) == strip_vessels(id),
            None => false,
        }
    }
}

fn strip_vessels(s: &str) -> &str {
    s.strip_prefix("vessels.").unwrap_or(s)
}

/// Resolve the canonical store key for an update.
///
/// An absent context means the local vessel. A context matching the
/// current self identifier is substituted with the literal `self`;
/// anything else is kept verbatim as the prefix.
pub fn canonical_path(context: Option<&str>, path: &str, self_ctx: &SelfContext) -> String {
    match context {
        None => format!("self.{path}"),
        Some(ctx) if self_ctx.matches(ctx) => format!("self.{path}"),
        Some(ctx) => format!("{ctx}.{path}"),
    }
}

/// Whether a canonical path belongs to the local vessel.
pub fn is_self_path(path: &str) -> bool {
    path.starts_with("self.")
}
