//! # Contribution Kinds
//!
//! Defines the [`ContributionKind`] enum. Every contribution directory has
//! exactly one kind, decided by where it sits in the tree. The mapping from
//! kind to layout lives in [`crate::table::KindTable`]; this enum only names
//! the kinds so that every `match` over them stays exhaustive.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Directory names must be lowercase and hyphen-separated.
pub const NAMING_PATTERN: &str = "^[a-z0-9]+(-[a-z0-9]+)*$";

/// The kind of a contribution directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ContributionKind {
    /// A skill: `SKILL.md` with a front-matter manifest.
    Skill,
    /// A subagent configuration: `config.json`.
    Subagent,
    /// An MCP server: entry point, README, and optional `manifest.json`.
    McpServer,
}

impl ContributionKind {
    /// All contribution kinds, in table order.
    pub fn all() -> &'static [ContributionKind] {
        &[Self::Skill, Self::Subagent, Self::McpServer]
    }

    /// The stable string form used in reports and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Skill => "skill",
            Self::Subagent => "subagent",
            Self::McpServer => "mcp-server",
        }
    }
}

impl std::fmt::Display for ContributionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContributionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" => Ok(Self::Skill),
            "subagent" => Ok(Self::Subagent),
            "mcp-server" => Ok(Self::McpServer),
            other => Err(format!(
                "unknown contribution kind \"{other}\" (expected skill, subagent or mcp-server)"
            )),
        }
    }
}

/// Returns `true` if `name` follows the lowercase, hyphen-separated
/// directory naming convention.
pub fn is_conventional_name(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(NAMING_PATTERN).expect("naming pattern is a valid regex"))
        .is_match(name)
}
