//! Regex: pluggable pattern capability for `:R:` field extraction.
//!
//! The compiler only sees the [`RegexEngine`] trait. Deployments that do not
//! want regex extraction simply build the compiler without an engine, and
//! `R` in a frompos is then diagnosed like any other malformed character.

use std::fmt;
use std::sync::Arc;

use grep_matcher::Matcher;
use grep_regex::RegexMatcher;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid regex pattern: {0}")]
pub struct RegexError(pub String);

/// Compiles patterns found in field descriptors.
pub trait RegexEngine: Send + Sync {
    fn compile(&self, pattern: &str) -> Result<Arc<dyn CompiledRegex>, RegexError>;
}

/// A compiled pattern, shared by every render of its template.
pub trait CompiledRegex: Send + Sync + fmt::Debug {
    /// Leftmost match in `text`, if any.
    fn find<'t>(&self, text: &'t str) -> Option<&'t str>;
}

/// [`RegexEngine`] backed by the ripgrep regex matcher.
#[derive(Debug, Default, Clone, Copy)]
pub struct GrepRegexEngine;

impl RegexEngine for GrepRegexEngine {
    fn compile(&self, pattern: &str) -> Result<Arc<dyn CompiledRegex>, RegexError> {
        let matcher = RegexMatcher::new(pattern).map_err(|e| RegexError(e.to_string()))?;
        Ok(Arc::new(GrepRegex {
            pattern: pattern.to_string(),
            matcher,
        }))
    }
}

struct GrepRegex {
    pattern: String,
    matcher: RegexMatcher,
}

impl fmt::Debug for GrepRegex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GrepRegex").field("pattern", &self.pattern).finish()
    }
}

impl CompiledRegex for GrepRegex {
    fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        let m = self.matcher.find(text.as_bytes()).ok()??;
        text.get(m.start()..m.end())
    }
}
