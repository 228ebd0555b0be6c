//! # Compiled Schemas
//!
//! A [`Schema`] is one JSON Schema document, checked and compiled once.
//! Compilation is strict: the document must be a JSON object in a
//! supported dialect, and every `$ref` must be a local fragment that
//! resolves inside the document. A schema that passes compilation can be
//! evaluated from any number of threads.
//!
//! Evaluation returns [`Violation`]s, a small classification of the
//! underlying `jsonschema` errors that the rest of the workspace can map to
//! rule identifiers without depending on `jsonschema` types.

use jsonschema::{Retrieve, Uri};
use serde_json::Value;

use crate::error::RegistryError;

/// Identifier used for documents compiled without an explicit identifier
/// and without a `$id`.
pub const ANONYMOUS_SCHEMA: &str = "anonymous";

/// A supported JSON Schema dialect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// Draft 4.
    Draft4,
    /// Draft 6.
    Draft6,
    /// Draft 7.
    Draft7,
    /// Draft 2019-09.
    Draft201909,
    /// Draft 2020-12, the default when `$schema` is absent.
    Draft202012,
}

impl Dialect {
    /// Resolve a `$schema` URI. Scheme (`http`/`https`) and a trailing `#`
    /// are ignored.
    pub fn from_uri(uri: &str) -> Option<Self> {
        let normalized = uri
            .trim()
            .trim_end_matches('#')
            .trim_start_matches("https://")
            .trim_start_matches("http://");
        match normalized {
            "json-schema.org/draft-04/schema" => Some(Self::Draft4),
            "json-schema.org/draft-06/schema" => Some(Self::Draft6),
            "json-schema.org/draft-07/schema" => Some(Self::Draft7),
            "json-schema.org/draft/2019-09/schema" => Some(Self::Draft201909),
            "json-schema.org/draft/2020-12/schema" => Some(Self::Draft202012),
            _ => None,
        }
    }

    /// Canonical meta-schema URI.
    pub fn uri(&self) -> &'static str {
        match self {
            Self::Draft4 => "http://json-schema.org/draft-04/schema#",
            Self::Draft6 => "http://json-schema.org/draft-06/schema#",
            Self::Draft7 => "http://json-schema.org/draft-07/schema#",
            Self::Draft201909 => "https://json-schema.org/draft/2019-09/schema",
            Self::Draft202012 => "https://json-schema.org/draft/2020-12/schema",
        }
    }

    fn draft(&self) -> jsonschema::Draft {
        match self {
            Self::Draft4 => jsonschema::Draft::Draft4,
            Self::Draft6 => jsonschema::Draft::Draft6,
            Self::Draft7 => jsonschema::Draft::Draft7,
            Self::Draft201909 => jsonschema::Draft::Draft201909,
            Self::Draft202012 => jsonschema::Draft::Draft202012,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.uri())
    }
}

/// Classification of a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ViolationKind {
    /// A required property is missing.
    Required,
    /// A value has the wrong JSON type.
    Type,
    /// A string does not match a `pattern`.
    Pattern,
    /// A string does not match a `format`.
    Format,
    /// An object has properties the schema does not allow.
    AdditionalProperties,
    /// Any other keyword.
    Other,
}

/// One schema violation in an instance document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// What kind of constraint was violated.
    pub kind: ViolationKind,
    /// JSON pointer to the offending value. For missing required
    /// properties this points at the missing property itself.
    pub pointer: String,
    /// Human-readable description from the schema engine.
    pub message: String,
}

/// A compiled JSON Schema document.
pub struct Schema {
    identifier: String,
    uri: Option<String>,
    dialect: Dialect,
    validator: jsonschema::Validator,
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Schema")
            .field("identifier", &self.identifier)
            .field("uri", &self.uri)
            .field("dialect", &self.dialect)
            .finish()
    }
}

impl Schema {
    /// Parse and compile a schema document.
    ///
    /// The identifier is the document's `$id`, or [`ANONYMOUS_SCHEMA`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::SchemaLoad`] on malformed JSON, a
    /// non-object document, an unsupported dialect, an external or
    /// unresolvable `$ref`, or a compile failure.
    pub fn compile(text: &str) -> Result<Self, RegistryError> {
        let document = parse_document(ANONYMOUS_SCHEMA, text)?;
        let identifier = document
            .get("$id")
            .and_then(Value::as_str)
            .unwrap_or(ANONYMOUS_SCHEMA)
            .to_string();
        Self::compile_value(identifier, document)
    }

    /// Compile a document under an explicit registry identifier.
    pub(crate) fn compile_as(identifier: &str, text: &str) -> Result<Self, RegistryError> {
        let document = parse_document(identifier, text)?;
        Self::compile_value(identifier.to_string(), document)
    }

    fn compile_value(identifier: String, document: Value) -> Result<Self, RegistryError> {
        let load_error = |reason: String| RegistryError::SchemaLoad {
            identifier: identifier.clone(),
            reason,
        };

        if !document.is_object() {
            return Err(load_error("schema document must be a JSON object".to_string()));
        }

        let dialect = match document.get("$schema") {
            None => Dialect::Draft202012,
            Some(Value::String(uri)) => Dialect::from_uri(uri)
                .ok_or_else(|| load_error(format!("unsupported schema dialect \"{uri}\"")))?,
            Some(_) => return Err(load_error("\"$schema\" must be a string".to_string())),
        };

        check_refs(&document, &document, &mut String::new()).map_err(load_error)?;

        let mut opts = jsonschema::options();
        opts.with_draft(dialect.draft());
        opts.should_validate_formats(true);
        opts.with_retriever(OfflineRetriever);
        let validator = opts
            .build(&document)
            .map_err(|e| load_error(format!("failed to compile: {e}")))?;

        let uri = document
            .get("$id")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Self {
            identifier,
            uri,
            dialect,
            validator,
        })
    }

    /// The registry identifier.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The document's `$id`, if declared.
    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    /// The dialect the document was compiled under.
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Whether `instance` satisfies the schema.
    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validator.is_valid(instance)
    }

    /// Evaluate `instance` and classify every violation.
    pub fn evaluate(&self, instance: &Value) -> Vec<Violation> {
        use jsonschema::error::ValidationErrorKind as Kind;

        self.validator
            .iter_errors(instance)
            .map(|err| {
                let instance_path = err.instance_path.to_string();
                let message = err.to_string();
                let (kind, pointer) = match &err.kind {
                    Kind::Required { property } => {
                        let name = match property {
                            Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (
                            ViolationKind::Required,
                            format!("{instance_path}/{}", escape_pointer_token(&name)),
                        )
                    }
                    Kind::Type { .. } => (ViolationKind::Type, instance_path),
                    Kind::Pattern { .. } => (ViolationKind::Pattern, instance_path),
                    Kind::Format { .. } => (ViolationKind::Format, instance_path),
                    Kind::AdditionalProperties { .. } => {
                        (ViolationKind::AdditionalProperties, instance_path)
                    }
                    _ => (ViolationKind::Other, instance_path),
                };
                Violation {
                    kind,
                    pointer,
                    message,
                }
            })
            .collect()
    }
}

/// Retriever that never touches the network. Documents may only reference
/// themselves, so any retrieval request is an error.
struct OfflineRetriever;

impl Retrieve for OfflineRetriever {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        Err(format!("external schema \"{}\" is not available offline", uri.as_str()).into())
    }
}

fn parse_document(identifier: &str, text: &str) -> Result<Value, RegistryError> {
    serde_json::from_str(text).map_err(|e| RegistryError::SchemaLoad {
        identifier: identifier.to_string(),
        reason: format!("malformed JSON: {e}"),
    })
}

/// Keywords whose value is a map from names to subschemas.
const SCHEMA_MAP_KEYWORDS: &[&str] = &[
    "properties",
    "patternProperties",
    "$defs",
    "definitions",
    "dependentSchemas",
    "dependencies",
];

/// Keywords whose value is instance data, never a schema.
const DATA_KEYWORDS: &[&str] = &["enum", "const", "examples", "default"];

/// Walk every subschema and check each `$ref` resolves locally.
///
/// `location` tracks the JSON pointer of the node being visited, for
/// diagnostics. Only schema positions are inspected: property names and
/// instance data may legitimately be called `$ref`.
fn check_refs(root: &Value, node: &Value, location: &mut String) -> Result<(), String> {
    match node {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref") {
                check_ref(root, reference, location)?;
            }
            for (key, child) in map {
                if key == "$ref" || DATA_KEYWORDS.contains(&key.as_str()) {
                    continue;
                }
                let len = location.len();
                push_token(location, key);
                let result = match child {
                    Value::Object(named) if SCHEMA_MAP_KEYWORDS.contains(&key.as_str()) => {
                        named.iter().try_for_each(|(name, subschema)| {
                            let len = location.len();
                            push_token(location, name);
                            let result = check_refs(root, subschema, location);
                            location.truncate(len);
                            result
                        })
                    }
                    _ => check_refs(root, child, location),
                };
                location.truncate(len);
                result?;
            }
            Ok(())
        }
        Value::Array(items) => {
            for (index, child) in items.iter().enumerate() {
                let len = location.len();
                push_token(location, &index.to_string());
                let result = check_refs(root, child, location);
                location.truncate(len);
                result?;
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn check_ref(root: &Value, reference: &Value, location: &str) -> Result<(), String> {
    let Some(reference) = reference.as_str() else {
        return Err(format!("\"$ref\" at \"{location}\" must be a string"));
    };
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(format!(
            "\"$ref\" \"{reference}\" at \"{location}\" is not a local reference"
        ));
    };
    // Fragments are URI-encoded JSON pointers.
    let pointer = urlencoding::decode(fragment).map_err(|_| {
        format!("\"$ref\" \"{reference}\" at \"{location}\" is not valid percent-encoding")
    })?;
    if !pointer.is_empty() && root.pointer(&pointer).is_none() {
        return Err(format!(
            "\"$ref\" \"{reference}\" at \"{location}\" does not resolve"
        ));
    }
    Ok(())
}

fn push_token(location: &mut String, token: &str) {
    location.push('/');
    location.push_str(&escape_pointer_token(token));
}

/// Escape one JSON pointer reference token (RFC 6901).
pub fn escape_pointer_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const PERSON: &str = r##"{
        "$schema": "https://json-schema.org/draft/2020-12/schema",
        "$id": "https://example.test/person.schema.json",
        "type": "object",
        "required": ["name"],
        "properties": {
            "name": { "type": "string", "pattern": "^[a-z]+$" },
            "age": { "$ref": "#/$defs/age" }
        },
        "$defs": { "age": { "type": "integer", "minimum": 0 } }
    }"##;

    #[test]
    fn compile_uses_id_as_identifier() {
        let schema = Schema::compile(PERSON).unwrap();
        assert_eq!(schema.identifier(), "https://example.test/person.schema.json");
        assert_eq!(schema.uri(), Some("https://example.test/person.schema.json"));
        assert_eq!(schema.dialect(), Dialect::Draft202012);
    }

    #[test]
    fn compile_without_id_is_anonymous() {
        let schema = Schema::compile(r#"{"type": "string"}"#).unwrap();
        assert_eq!(schema.identifier(), ANONYMOUS_SCHEMA);
        assert_eq!(schema.uri(), None);
    }

    #[test]
    fn dialect_detection() {
        assert_eq!(
            Dialect::from_uri("http://json-schema.org/draft-07/schema#"),
            Some(Dialect::Draft7)
        );
        assert_eq!(
            Dialect::from_uri("https://json-schema.org/draft-07/schema"),
            Some(Dialect::Draft7)
        );
        assert_eq!(
            Dialect::from_uri("https://json-schema.org/draft/2019-09/schema"),
            Some(Dialect::Draft201909)
        );
        assert_eq!(Dialect::from_uri("https://example.test/my-dialect"), None);
        for dialect in [
            Dialect::Draft4,
            Dialect::Draft6,
            Dialect::Draft7,
            Dialect::Draft201909,
            Dialect::Draft202012,
        ] {
            assert_eq!(Dialect::from_uri(dialect.uri()), Some(dialect));
        }
    }

    #[test]
    fn draft7_document_compiles() {
        let schema = Schema::compile(
            r##"{"$schema": "http://json-schema.org/draft-07/schema#", "type": "object",
                "definitions": {"n": {"type": "number"}},
                "properties": {"n": {"$ref": "#/definitions/n"}}}"##,
        )
        .unwrap();
        assert_eq!(schema.dialect(), Dialect::Draft7);
        assert!(schema.is_valid(&json!({"n": 1})));
        assert!(!schema.is_valid(&json!({"n": "one"})));
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        let err = Schema::compile("{ not json").unwrap_err();
        assert!(matches!(err, RegistryError::SchemaLoad { .. }));
        assert!(err.to_string().contains("malformed JSON"));
    }

    #[test]
    fn non_object_document_is_rejected() {
        let err = Schema::compile("[1, 2]").unwrap_err();
        assert!(err.to_string().contains("JSON object"));
    }

    #[test]
    fn unsupported_dialect_is_rejected() {
        let err = Schema::compile(r#"{"$schema": "https://example.test/custom"}"#).unwrap_err();
        assert!(err.to_string().contains("unsupported schema dialect"));
    }

    #[test]
    fn unresolvable_local_ref_is_rejected() {
        let err = Schema::compile(
            r##"{"type": "object", "properties": {"a": {"$ref": "#/$defs/missing"}}}"##,
        )
        .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("#/$defs/missing"), "{msg}");
        assert!(msg.contains("/properties/a"), "{msg}");
    }

    #[test]
    fn external_ref_is_rejected() {
        let err = Schema::compile(r##"{"$ref": "other.schema.json#/$defs/x"}"##).unwrap_err();
        assert!(err.to_string().contains("not a local reference"));
    }

    #[test]
    fn property_named_ref_is_not_a_reference() {
        let schema = Schema::compile(
            r#"{"type": "object", "properties": {"$ref": {"type": "string"}},
                "examples": [{"$ref": 3}], "enum": [{"$ref": "elsewhere.json"}]}"#,
        )
        .unwrap();
        assert!(!schema.is_valid(&json!({"$ref": 3})));
    }

    #[test]
    fn percent_encoded_fragment_resolves() {
        let schema = Schema::compile(
            r##"{"$defs": {"my def": {"type": "integer"}},
                 "properties": {"a": {"$ref": "#/$defs/my%20def"}}}"##,
        )
        .unwrap();
        assert!(schema.is_valid(&json!({"a": 1})));
        assert!(!schema.is_valid(&json!({"a": "one"})));
    }

    #[test]
    fn refs_inside_named_subschemas_are_still_checked() {
        let err = Schema::compile(
            r##"{"$defs": {"a": {"items": {"$ref": "#/$defs/b"}}}}"##,
        )
        .unwrap_err();
        assert!(err.to_string().contains("/$defs/a/items"), "{err}");
    }

    #[test]
    fn root_ref_is_accepted() {
        let schema = Schema::compile(
            r##"{"type": "object", "properties": {"child": {"$ref": "#"}}}"##,
        )
        .unwrap();
        assert!(schema.is_valid(&json!({"child": {"child": {}}})));
    }

    #[test]
    fn evaluate_classifies_required() {
        let schema = Schema::compile(PERSON).unwrap();
        let violations = schema.evaluate(&json!({}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Required);
        assert_eq!(violations[0].pointer, "/name");
        assert!(violations[0].message.contains("name"));
    }

    #[test]
    fn evaluate_classifies_type_pattern_and_other() {
        let schema = Schema::compile(PERSON).unwrap();

        let violations = schema.evaluate(&json!({"name": 7}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Type);
        assert_eq!(violations[0].pointer, "/name");

        let violations = schema.evaluate(&json!({"name": "Ada"}));
        assert_eq!(violations[0].kind, ViolationKind::Pattern);

        let violations = schema.evaluate(&json!({"name": "ada", "age": -1}));
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind, ViolationKind::Other);
        assert_eq!(violations[0].pointer, "/age");
    }

    #[test]
    fn pointer_tokens_are_escaped() {
        assert_eq!(escape_pointer_token("a/b~c"), "a~1b~0c");
    }

    #[test]
    fn debug_omits_validator() {
        let schema = Schema::compile(PERSON).unwrap();
        let debug = format!("{schema:?}");
        assert!(debug.contains("Schema"));
        assert!(debug.contains("person.schema.json"));
    }
}
