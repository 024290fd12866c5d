//! Capability handles shared by every step of a run.
//!
//! A [`Toolbox`] is built once per [`crate::Navigator`] (normally from the
//! environment) and handed to the engine with each request. Nothing reads
//! the environment on the step path.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// One external capability a step may be granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Persist files under the output directories. Always available.
    FileWriter,
    /// General web search.
    WebSearch,
    /// Source-code repository search.
    CodeSearch,
    /// Link and page discovery.
    LinkSearch,
    /// Academic / scientific literature search.
    ScienceSearch,
}

impl Capability {
    /// Environment variable whose presence enables this capability.
    pub fn env_var(self) -> Option<&'static str> {
        match self {
            Capability::FileWriter => None,
            Capability::WebSearch => Some("SERPER_API_KEY"),
            Capability::CodeSearch => Some("GITHUB_TOKEN"),
            Capability::LinkSearch => Some("LINKUP_API_KEY"),
            Capability::ScienceSearch => Some("EXA_API_KEY"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Capability::FileWriter => "file writer",
            Capability::WebSearch => "web search",
            Capability::CodeSearch => "code search",
            Capability::LinkSearch => "link search",
            Capability::ScienceSearch => "science search",
        }
    }

    pub const ALL: [Capability; 5] = [
        Capability::FileWriter,
        Capability::WebSearch,
        Capability::CodeSearch,
        Capability::LinkSearch,
        Capability::ScienceSearch,
    ];
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The set of capabilities configured for this process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Toolbox {
    available: BTreeSet<Capability>,
}

impl Default for Toolbox {
    fn default() -> Self {
        Self::new([Capability::FileWriter])
    }
}

impl Toolbox {
    /// A toolbox with exactly `caps` plus the file writer.
    pub fn new(caps: impl IntoIterator<Item = Capability>) -> Self {
        let mut available: BTreeSet<Capability> = caps.into_iter().collect();
        available.insert(Capability::FileWriter);
        Self { available }
    }

    /// Detect configured providers from their API-key variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self::new(Capability::ALL.into_iter().filter(|c| match c.env_var() {
            None => true,
            Some(var) => lookup(var).is_some_and(|v| !v.trim().is_empty()),
        }))
    }

    pub fn has(&self, cap: Capability) -> bool {
        self.available.contains(&cap)
    }

    pub fn available(&self) -> impl Iterator<Item = Capability> + '_ {
        self.available.iter().copied()
    }

    /// Capabilities both declared by `declared` and configured here, in
    /// declaration order.
    pub fn for_role(&self, declared: &[Capability]) -> Vec<Capability> {
        declared.iter().copied().filter(|c| self.has(*c)).collect()
    }
}
