//! # Kind Table
//!
//! The explicit configuration table that maps each [`ContributionKind`] to
//! its place in the tree, the files it must and should carry, where its
//! manifest lives, and which schema checks it. The engine reads only this
//! table; adding a contribution kind means adding a row, not touching rule
//! logic.
//!
//! [`KindTable::builtin`] reproduces the conventions of the toolkit
//! repository:
//!
//! | kind | parent | required | manifest | schema |
//! |---|---|---|---|---|
//! | skill | `skills/examples` | `SKILL.md` | `SKILL.md` front-matter | `skill` |
//! | subagent | `subagents/examples` | `config.json` | `config.json` | `subagent` |
//! | mcp-server | `mcps/servers` | `README.md`, entry point | `manifest.json` (optional) | `mcp-server` |
//!
//! Rows also carry content checks: a skill should show an example heading
//! and a README that points at `SKILL.md`; a Python MCP server should create
//! a `Server` and register `list_tools()`/`call_tool()` handlers.

use std::collections::BTreeSet;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::finding::Severity;
use crate::kind::ContributionKind;

/// How a manifest file is parsed into a value tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ManifestFormat {
    /// A JSON document.
    Json,
    /// The front-matter block of a markdown document.
    FrontMatter,
}

/// Where an entry's manifest lives and which schema validates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestSpec {
    /// File name relative to the entry directory.
    pub file: String,
    /// Parse format.
    pub format: ManifestFormat,
    /// Schema identifier in the registry; `None` skips schema evaluation.
    #[serde(default)]
    pub schema: Option<String>,
    /// Whether the manifest may be absent without a structural error.
    #[serde(default)]
    pub optional: bool,
}

/// A requirement satisfied by any one of several files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequiredFile {
    /// Accepted file names; the first is the canonical one.
    pub any_of: Vec<String>,
    /// Optional description used in messages, e.g. "server entry point".
    #[serde(default)]
    pub label: Option<String>,
}

impl RequiredFile {
    /// A requirement for exactly one file.
    pub fn single(file: &str) -> Self {
        Self {
            any_of: vec![file.to_string()],
            label: None,
        }
    }

    /// A requirement satisfied by any of `files`.
    pub fn any(label: &str, files: &[&str]) -> Self {
        Self {
            any_of: files.iter().map(|f| f.to_string()).collect(),
            label: Some(label.to_string()),
        }
    }

    /// Human-readable description of what is missing.
    pub fn describe(&self) -> String {
        match (&self.label, self.any_of.as_slice()) {
            (_, [only]) => only.clone(),
            (Some(label), files) => format!("{label} (one of {})", files.join(", ")),
            (None, files) => format!("one of {}", files.join(", ")),
        }
    }
}

/// A file whose absence is reported at a configurable severity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecommendedFile {
    /// File name relative to the entry directory.
    pub file: String,
    /// Severity of the `missing-recommended-file` finding.
    #[serde(default = "default_recommended_severity")]
    pub severity: Severity,
}

fn default_recommended_severity() -> Severity {
    Severity::Warning
}

/// Authoring guidance for a markdown document: recommended sections and a
/// minimum length. Violations are info findings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Guidance {
    /// The document to inspect.
    pub file: String,
    /// Section names expected somewhere in the document (case-insensitive).
    #[serde(default)]
    pub sections: Vec<String>,
    /// Minimum document length in characters.
    #[serde(default)]
    pub min_chars: Option<usize>,
}

/// An expectation on the text of one file, checked only when the file
/// exists and is readable. Each unmet expectation is one `missing-content`
/// finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContentCheck {
    /// The file to inspect.
    pub file: String,
    /// What the file should contain, e.g. "Server instance".
    pub label: String,
    /// Any one of these substrings satisfies the check.
    #[serde(default)]
    pub contains: Vec<String>,
    /// Match `contains` case-insensitively.
    #[serde(default)]
    pub ignore_case: bool,
    /// Minimum file length in characters.
    #[serde(default)]
    pub min_chars: Option<usize>,
    /// Severity of a failed check.
    #[serde(default = "default_recommended_severity")]
    pub severity: Severity,
}

impl ContentCheck {
    /// A check that `file` contains one of `any_of`.
    pub fn contains(file: &str, label: &str, any_of: &[&str], severity: Severity) -> Self {
        Self {
            file: file.to_string(),
            label: label.to_string(),
            contains: any_of.iter().map(|s| s.to_string()).collect(),
            ignore_case: false,
            min_chars: None,
            severity,
        }
    }

    /// Match case-insensitively.
    pub fn ignoring_case(mut self) -> Self {
        self.ignore_case = true;
        self
    }

    /// A check that `file` is at least `min_chars` characters long.
    pub fn min_length(file: &str, min_chars: usize, severity: Severity) -> Self {
        Self {
            file: file.to_string(),
            label: format!("at least {min_chars} characters"),
            contains: Vec::new(),
            ignore_case: false,
            min_chars: Some(min_chars),
            severity,
        }
    }
}

/// One row of the kind table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KindSpec {
    /// The kind this row describes.
    pub kind: ContributionKind,
    /// Parent directory, relative to a scan root, whose subdirectories are
    /// entries of this kind.
    pub parent: String,
    /// Requirement groups; each unmet group is one error.
    #[serde(default)]
    pub required: Vec<RequiredFile>,
    /// Recommended files.
    #[serde(default)]
    pub recommended: Vec<RecommendedFile>,
    /// Files that must not be committed.
    #[serde(default)]
    pub forbidden: Vec<String>,
    /// The structured manifest, if the kind has one.
    #[serde(default)]
    pub manifest: Option<ManifestSpec>,
    /// Files scanned for credential-like assignments.
    #[serde(default)]
    pub secret_scan: Vec<String>,
    /// Dependency every `requirements.txt` of this kind should declare.
    #[serde(default)]
    pub required_dependency: Option<String>,
    /// Authoring guidance.
    #[serde(default)]
    pub guidance: Option<Guidance>,
    /// Expected content of individual files.
    #[serde(default)]
    pub content_checks: Vec<ContentCheck>,
}

/// The full kind table. Kinds are unique; row order is scan order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<KindSpec>", into = "Vec<KindSpec>")]
pub struct KindTable {
    specs: Vec<KindSpec>,
}

impl KindTable {
    /// Build a table, checking that it is well-formed.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a kind appears twice, a parent
    /// path is empty or escapes the scan root, a requirement group is
    /// empty, or a content check checks nothing.
    pub fn new(specs: Vec<KindSpec>) -> Result<Self, ConfigError> {
        let mut seen = BTreeSet::new();
        for spec in &specs {
            if !seen.insert(spec.kind) {
                return Err(ConfigError::Invalid(format!(
                    "kind \"{}\" is declared more than once",
                    spec.kind
                )));
            }
            if !is_contained_relative(&spec.parent) {
                return Err(ConfigError::Invalid(format!(
                    "kind \"{}\": parent \"{}\" must be a non-empty relative path inside the root",
                    spec.kind, spec.parent
                )));
            }
            if spec.required.iter().any(|group| group.any_of.is_empty()) {
                return Err(ConfigError::Invalid(format!(
                    "kind \"{}\": required file groups must name at least one file",
                    spec.kind
                )));
            }
            if let Some(check) = spec
                .content_checks
                .iter()
                .find(|check| check.contains.is_empty() && check.min_chars.is_none())
            {
                return Err(ConfigError::Invalid(format!(
                    "kind \"{}\": content check \"{}\" on {} needs `contains` or `min_chars`",
                    spec.kind, check.label, check.file
                )));
            }
        }
        Ok(Self { specs })
    }

    /// The conventions of the toolkit repository.
    pub fn builtin() -> Self {
        Self {
            specs: vec![
                KindSpec {
                    kind: ContributionKind::Skill,
                    parent: "skills/examples".to_string(),
                    required: vec![RequiredFile::single("SKILL.md")],
                    recommended: vec![RecommendedFile {
                        file: "README.md".to_string(),
                        severity: Severity::Info,
                    }],
                    forbidden: vec![".env".to_string()],
                    manifest: Some(ManifestSpec {
                        file: "SKILL.md".to_string(),
                        format: ManifestFormat::FrontMatter,
                        schema: Some("skill".to_string()),
                        optional: false,
                    }),
                    secret_scan: vec!["SKILL.md".to_string(), "README.md".to_string()],
                    required_dependency: None,
                    guidance: Some(Guidance {
                        file: "SKILL.md".to_string(),
                        sections: vec![
                            "overview".to_string(),
                            "when to use".to_string(),
                            "instructions".to_string(),
                            "examples".to_string(),
                        ],
                        min_chars: Some(500),
                    }),
                    content_checks: vec![
                        ContentCheck::contains(
                            "SKILL.md",
                            "example heading ('## Example')",
                            &["## example"],
                            Severity::Warning,
                        )
                        .ignoring_case(),
                        ContentCheck::contains(
                            "README.md",
                            "link to SKILL.md",
                            &["SKILL.md"],
                            Severity::Info,
                        ),
                        ContentCheck::min_length("README.md", 100, Severity::Info),
                    ],
                },
                KindSpec {
                    kind: ContributionKind::Subagent,
                    parent: "subagents/examples".to_string(),
                    required: vec![RequiredFile::single("config.json")],
                    recommended: vec![RecommendedFile {
                        file: "README.md".to_string(),
                        severity: Severity::Info,
                    }],
                    forbidden: vec![".env".to_string()],
                    manifest: Some(ManifestSpec {
                        file: "config.json".to_string(),
                        format: ManifestFormat::Json,
                        schema: Some("subagent".to_string()),
                        optional: false,
                    }),
                    secret_scan: vec!["config.json".to_string()],
                    required_dependency: None,
                    guidance: None,
                    content_checks: Vec::new(),
                },
                KindSpec {
                    kind: ContributionKind::McpServer,
                    parent: "mcps/servers".to_string(),
                    required: vec![
                        RequiredFile::single("README.md"),
                        RequiredFile::any(
                            "server entry point",
                            &[
                                "server.py",
                                "server.js",
                                "server.ts",
                                "main.py",
                                "index.js",
                                "index.ts",
                            ],
                        ),
                    ],
                    recommended: vec![
                        RecommendedFile {
                            file: "requirements.txt".to_string(),
                            severity: Severity::Warning,
                        },
                        RecommendedFile {
                            file: ".env.example".to_string(),
                            severity: Severity::Warning,
                        },
                    ],
                    forbidden: vec![".env".to_string()],
                    manifest: Some(ManifestSpec {
                        file: "manifest.json".to_string(),
                        format: ManifestFormat::Json,
                        schema: Some("mcp-server".to_string()),
                        optional: true,
                    }),
                    secret_scan: vec![
                        "server.py".to_string(),
                        "server.js".to_string(),
                        "server.ts".to_string(),
                        "main.py".to_string(),
                        "index.js".to_string(),
                        "index.ts".to_string(),
                    ],
                    required_dependency: Some("mcp".to_string()),
                    guidance: None,
                    content_checks: vec![
                        ContentCheck::contains(
                            "server.py",
                            "Server instance",
                            &["Server("],
                            Severity::Error,
                        ),
                        ContentCheck::contains(
                            "server.py",
                            "'mcp.server' import",
                            &["mcp.server"],
                            Severity::Warning,
                        ),
                        ContentCheck::contains(
                            "server.py",
                            "'asyncio' import",
                            &["asyncio"],
                            Severity::Warning,
                        ),
                        ContentCheck::contains(
                            "server.py",
                            "list_tools() handler",
                            &["@app.list_tools()", "@server.list_tools()"],
                            Severity::Warning,
                        ),
                        ContentCheck::contains(
                            "server.py",
                            "call_tool() handler",
                            &["@app.call_tool()", "@server.call_tool()"],
                            Severity::Warning,
                        ),
                    ],
                },
            ],
        }
    }

    /// The row for `kind`, if the table declares it.
    pub fn spec(&self, kind: ContributionKind) -> Option<&KindSpec> {
        self.specs.iter().find(|spec| spec.kind == kind)
    }

    /// Rows in scan order.
    pub fn iter(&self) -> impl Iterator<Item = &KindSpec> {
        self.specs.iter()
    }

    /// Every schema identifier referenced by the table, deduplicated and
    /// sorted.
    pub fn schema_ids(&self) -> BTreeSet<&str> {
        self.specs
            .iter()
            .filter_map(|spec| spec.manifest.as_ref())
            .filter_map(|manifest| manifest.schema.as_deref())
            .collect()
    }
}

impl Default for KindTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TryFrom<Vec<KindSpec>> for KindTable {
    type Error = ConfigError;

    fn try_from(specs: Vec<KindSpec>) -> Result<Self, Self::Error> {
        Self::new(specs)
    }
}

impl From<KindTable> for Vec<KindSpec> {
    fn from(table: KindTable) -> Self {
        table.specs
    }
}

fn is_contained_relative(path: &str) -> bool {
    let path = Path::new(path);
    !path.as_os_str().is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_covers_every_kind() {
        let table = KindTable::builtin();
        for kind in ContributionKind::all() {
            assert!(table.spec(*kind).is_some(), "missing row for {kind}");
        }
    }

    #[test]
    fn builtin_passes_validation() {
        let specs: Vec<KindSpec> = KindTable::builtin().into();
        assert!(KindTable::new(specs).is_ok());
    }

    #[test]
    fn builtin_schema_ids() {
        let table = KindTable::builtin();
        let ids: Vec<&str> = table.schema_ids().into_iter().collect();
        assert_eq!(ids, vec!["mcp-server", "skill", "subagent"]);
    }

    #[test]
    fn duplicate_kind_is_rejected() {
        let mut specs: Vec<KindSpec> = KindTable::builtin().into();
        specs.push(specs[0].clone());
        let err = KindTable::new(specs).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn escaping_parent_is_rejected() {
        let mut specs: Vec<KindSpec> = KindTable::builtin().into();
        specs[0].parent = "../outside".to_string();
        assert!(KindTable::new(specs).is_err());

        let mut specs: Vec<KindSpec> = KindTable::builtin().into();
        specs[1].parent = "/abs/path".to_string();
        assert!(KindTable::new(specs).is_err());
    }

    #[test]
    fn empty_required_group_is_rejected() {
        let mut specs: Vec<KindSpec> = KindTable::builtin().into();
        specs[2].required.push(RequiredFile {
            any_of: vec![],
            label: None,
        });
        assert!(KindTable::new(specs).is_err());
    }

    #[test]
    fn empty_content_check_is_rejected() {
        let mut specs: Vec<KindSpec> = KindTable::builtin().into();
        specs[1].content_checks.push(ContentCheck {
            file: "config.json".to_string(),
            label: "nothing".to_string(),
            contains: vec![],
            ignore_case: false,
            min_chars: None,
            severity: Severity::Warning,
        });
        let err = KindTable::new(specs).unwrap_err();
        assert!(err.to_string().contains("content check \"nothing\""));
    }

    #[test]
    fn content_checks_deserialize_with_defaults() {
        let yaml = r#"
- kind: mcp-server
  parent: servers
  content_checks:
    - file: server.py
      label: Server instance
      contains: ["Server("]
"#;
        let table: KindTable = serde_yaml::from_str(yaml).unwrap();
        let check = &table.spec(ContributionKind::McpServer).unwrap().content_checks[0];
        assert_eq!(check.severity, Severity::Warning);
        assert!(!check.ignore_case);
        assert_eq!(check.min_chars, None);
    }

    #[test]
    fn required_file_descriptions() {
        assert_eq!(RequiredFile::single("SKILL.md").describe(), "SKILL.md");
        assert_eq!(
            RequiredFile::any("server entry point", &["server.py", "index.js"]).describe(),
            "server entry point (one of server.py, index.js)"
        );
    }

    #[test]
    fn table_deserializes_from_yaml() {
        let yaml = r#"
- kind: skill
  parent: contrib/skills
  required:
    - any_of: [SKILL.md]
  manifest:
    file: SKILL.md
    format: front-matter
    schema: skill
"#;
        let table: KindTable = serde_yaml::from_str(yaml).unwrap();
        let spec = table.spec(ContributionKind::Skill).unwrap();
        assert_eq!(spec.parent, "contrib/skills");
        assert_eq!(
            spec.manifest.as_ref().unwrap().format,
            ManifestFormat::FrontMatter
        );
        assert!(table.spec(ContributionKind::Subagent).is_none());
    }

    #[test]
    fn invalid_table_fails_deserialization() {
        let yaml = r#"
- kind: skill
  parent: ""
"#;
        assert!(serde_yaml::from_str::<KindTable>(yaml).is_err());
    }
}
