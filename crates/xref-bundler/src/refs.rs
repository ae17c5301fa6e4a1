//! Reference classification and JSON tree helpers.
//!
//! Everything here is pure: no I/O and no state. The walker uses these to
//! decide what a `$ref` points at, to resolve it against its origin, and to
//! read and write nodes by path.

use std::path::{Path, PathBuf};

use path_clean::PathClean;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;

use crate::{Error, Result};

/// Multi-line text with at least one `key: value` line.
static YAML_MAPPING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*(-\s+)?["']?[\w$.\-/]+["']?\s*:(\s|$)"#).expect("valid yaml regex")
});

/// Returns true for absolute `http://` and `https://` URLs.
pub fn is_remote_url(value: &str) -> bool {
    let lower = value.get(..8).unwrap_or(value).to_ascii_lowercase();
    (lower.starts_with("http://") || lower.starts_with("https://"))
        && url::Url::parse(value).is_ok()
}

/// Returns true for refs that address the current document (`#...`).
pub fn is_local_ref(value: &str) -> bool {
    value.starts_with('#')
}

/// Returns true for raw JSON object or array text.
pub fn looks_like_json(value: &str) -> bool {
    let trimmed = value.trim();
    (trimmed.starts_with('{') && trimmed.ends_with('}'))
        || (trimmed.starts_with('[') && trimmed.ends_with(']'))
}

/// Returns true for raw multi-line YAML mapping text.
pub fn looks_like_yaml(value: &str) -> bool {
    value.contains('\n') && YAML_MAPPING_LINE.is_match(value)
}

/// Returns true for candidate filesystem paths.
///
/// A path is anything that is not a remote URL, not a local ref and not raw
/// JSON or YAML text.
pub fn is_file_path(value: &str) -> bool {
    !value.is_empty()
        && !is_remote_url(value)
        && !is_local_ref(value)
        && !looks_like_json(value)
        && !looks_like_yaml(value)
}

/// Splits a ref into its resource part and its fragment.
///
/// The fragment is returned without the leading `#` and normalized by
/// [`fragment_pointer`].
pub fn split_ref(reference: &str) -> (&str, String) {
    match reference.split_once('#') {
        Some((resource, fragment)) => (resource, fragment_pointer(fragment)),
        None => (reference, String::new()),
    }
}

/// Turns a fragment (without `#`) into a pointer suffix: empty, or starting
/// with `/`. Anchors such as `foo` become `/foo`.
pub fn fragment_pointer(fragment: &str) -> String {
    if fragment.is_empty() || fragment.starts_with('/') {
        fragment.to_string()
    } else {
        format!("/{fragment}")
    }
}

/// Resolves `reference` against the location of the document that contains it.
///
/// Absolute URLs are returned verbatim. Relative refs inside a remote
/// document follow URL joining rules; relative refs inside a file are joined
/// to the file's directory and lexically cleaned.
pub fn resolve_reference_path(origin: &str, reference: &str) -> String {
    if is_remote_url(reference) {
        return reference.to_string();
    }

    if is_remote_url(origin) {
        if let Ok(joined) = url::Url::parse(origin).and_then(|base| base.join(reference)) {
            return joined.to_string();
        }
        return reference.to_string();
    }

    let relative = Path::new(reference);
    if relative.is_absolute() {
        return path_to_string(relative.to_path_buf().clean());
    }

    let base = Path::new(origin).parent().unwrap_or(Path::new(""));
    path_to_string(base.join(relative).clean())
}

fn path_to_string(path: PathBuf) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Escapes a single path segment for use in a JSON pointer.
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverses [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Splits a JSON pointer (`/a/b`, with or without a leading `#`) into segments.
pub fn pointer_segments(pointer: &str) -> Vec<String> {
    let pointer = pointer.strip_prefix('#').unwrap_or(pointer);
    pointer
        .split('/')
        .skip(1)
        .map(unescape_segment)
        .collect()
}

/// Joins segments into a JSON pointer. The empty path yields `""`.
pub fn to_pointer<S: AsRef<str>>(segments: &[S]) -> String {
    segments
        .iter()
        .map(|segment| format!("/{}", escape_segment(segment.as_ref())))
        .collect()
}

fn child<'a>(node: &'a Value, segment: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(items) => segment
            .parse::<usize>()
            .ok()
            .and_then(move |i| items.get_mut(i)),
        _ => None,
    }
}

/// Returns the value at `segments`, the node itself for an empty path, or
/// `None` when a segment is missing.
pub fn get_nested_value<'a, S: AsRef<str>>(node: &'a Value, segments: &[S]) -> Option<&'a Value> {
    segments
        .iter()
        .try_fold(node, |current, segment| child(current, segment.as_ref()))
}

/// Mutable variant of [`get_nested_value`].
pub fn get_nested_value_mut<'a, S: AsRef<str>>(
    node: &'a mut Value,
    segments: &[S],
) -> Option<&'a mut Value> {
    segments
        .iter()
        .try_fold(node, |current, segment| child_mut(current, segment.as_ref()))
}

/// Sets `value` at a `/`-delimited path, creating intermediate mappings.
///
/// Existing non-object intermediates are replaced by empty mappings.
pub fn set_value_at_path(node: &mut Value, path: &str, value: Value) {
    let segments = pointer_segments(path);
    let Some((last, parents)) = segments.split_last() else {
        *node = value;
        return;
    };

    let mut current = node;
    for segment in parents {
        current = ensure_object(current)
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    ensure_object(current).insert(last.clone(), value);
}

fn ensure_object(node: &mut Value) -> &mut Map<String, Value> {
    if !node.is_object() {
        *node = Value::Object(Map::new());
    }
    match node {
        Value::Object(map) => map,
        _ => unreachable!("node was just replaced by an object"),
    }
}

/// Rewrites a local ref so it points below `prefix`.
///
/// `#/a/b` with prefix `["x-ext", "abc"]` becomes `#/x-ext/abc/a/b`. Anchor
/// fragments follow [`fragment_pointer`], so `#a` becomes `#/x-ext/abc/a`.
pub fn prefix_internal_ref<S: AsRef<str>>(reference: &str, prefix: &[S]) -> Result<String> {
    let Some(fragment) = reference.strip_prefix('#') else {
        return Err(Error::NotALocalRef(reference.to_string()));
    };
    Ok(format!("#{}{}", to_pointer(prefix), fragment_pointer(fragment)))
}

/// Applies [`prefix_internal_ref`] to every local `$ref` in `node`.
///
/// Non-local refs are left untouched.
pub fn prefix_internal_ref_recursive<S: AsRef<str>>(node: &mut Value, prefix: &[S]) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get_mut("$ref") {
                if let Ok(prefixed) = prefix_internal_ref(reference, prefix) {
                    *reference = prefixed;
                }
            }
            for (key, value) in map.iter_mut() {
                if key != "$ref" {
                    prefix_internal_ref_recursive(value, prefix);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                prefix_internal_ref_recursive(item, prefix);
            }
        }
        _ => {}
    }
}

/// Reads the string `$ref` of a node, if it has one.
pub fn ref_of(node: &Value) -> Option<&str> {
    node.as_object()?.get("$ref")?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_is_remote_url() {
        let cases = [
            ("https://example.com/schema.json", true),
            ("http://api.example.com/schemas/user.json", true),
            ("file://some/path", false),
            ("random-string", false),
            ("#/components/schemas/User", false),
            ("./local-schema.json", false),
        ];
        for (input, expected) in cases {
            assert_eq!(is_remote_url(input), expected, "{input}");
        }
    }

    #[test]
    fn test_is_local_ref() {
        assert!(is_local_ref("#/components/schemas/User"));
        assert!(!is_local_ref("https://example.com/schema.json"));
        assert!(!is_local_ref("./local-schema.json"));
    }

    #[test]
    fn test_is_file_path() {
        assert!(is_file_path("./schemas/user.json"));
        assert!(is_file_path("/abs/openapi.yaml"));
        assert!(is_file_path("hello"));
        assert!(!is_file_path("https://example.com/a.json"));
        assert!(!is_file_path("#/a"));
        assert!(!is_file_path(r#"{ "openapi": "3.1" }"#));
        assert!(!is_file_path("openapi: 3.1\ninfo:\n  title: x\n"));
    }

    #[test]
    fn test_split_ref() {
        assert_eq!(split_ref("http://a.com/x#/b/c"), ("http://a.com/x", "/b/c".to_string()));
        assert_eq!(split_ref("./x.json#"), ("./x.json", String::new()));
        assert_eq!(split_ref("./x.json"), ("./x.json", String::new()));
        assert_eq!(split_ref("./x.json#anchor"), ("./x.json", "/anchor".to_string()));
    }

    #[test]
    fn test_resolve_reference_path_urls() {
        let base = "http://localhost:7289/nested/chunk1.json";
        assert_eq!(
            resolve_reference_path(base, "./another-file.json"),
            "http://localhost:7289/nested/another-file.json"
        );
        assert_eq!(
            resolve_reference_path("http://localhost:7289/base/openapi.json", "../nested/chunk1.json"),
            "http://localhost:7289/nested/chunk1.json"
        );
        assert_eq!(
            resolve_reference_path("http://localhost:7289/a/b/c", "/d"),
            "http://localhost:7289/d"
        );
        assert_eq!(resolve_reference_path("http://localhost:7289", "/"), "http://localhost:7289/");
        // Absolute URLs are never normalized
        assert_eq!(
            resolve_reference_path("./x.json", "http://localhost:7289"),
            "http://localhost:7289"
        );
    }

    #[test]
    fn test_resolve_reference_path_files() {
        assert_eq!(resolve_reference_path("", "./chunk.json"), "chunk.json");
        assert_eq!(resolve_reference_path("", "hello"), "hello");
        assert_eq!(resolve_reference_path("nested/b.json", "./c.json"), "nested/c.json");
        assert_eq!(resolve_reference_path("a/b/c.yaml", "../d.yaml"), "a/d.yaml");
        assert_eq!(resolve_reference_path("a/b/c.yaml", "/etc/x.yaml"), "/etc/x.yaml");
    }

    #[test]
    fn test_get_nested_value() {
        let doc = json!({ "a": { "b": { "c": "hello" } } });
        assert_eq!(get_nested_value(&doc, &["a", "b", "c"]), Some(&json!("hello")));
        assert_eq!(get_nested_value::<&str>(&doc, &[]), Some(&doc));

        let doc = json!({ "foo": { "bar": { "baz": 42 } } });
        assert_eq!(get_nested_value(&doc, &["foo", "bar", "baz"]), Some(&json!(42)));
        assert_eq!(get_nested_value(&doc, &["foo", "non-existing", "baz"]), None);

        let doc = json!({ "list": [{ "x": 1 }, { "x": 2 }] });
        assert_eq!(get_nested_value(&doc, &["list", "1", "x"]), Some(&json!(2)));
    }

    #[test]
    fn test_set_value_at_path() {
        let mut doc = json!({});
        set_value_at_path(&mut doc, "/a/b/c", json!({ "hello": "hi" }));
        assert_eq!(doc, json!({ "a": { "b": { "c": { "hello": "hi" } } } }));

        let mut doc = json!({ "a": { "b": "b" } });
        set_value_at_path(&mut doc, "/a/c", json!({ "hello": "hi" }));
        assert_eq!(doc, json!({ "a": { "b": "b", "c": { "hello": "hi" } } }));
    }

    #[test]
    fn test_prefix_internal_ref() {
        assert_eq!(prefix_internal_ref("#/hello", &["prefix"]).unwrap(), "#/prefix/hello");
        assert_eq!(
            prefix_internal_ref("#/a/b/c", &["prefixA", "prefixB"]).unwrap(),
            "#/prefixA/prefixB/a/b/c"
        );
        assert_eq!(prefix_internal_ref("#", &["x-ext", "abc"]).unwrap(), "#/x-ext/abc");
    }

    #[test]
    fn test_anchor_fragments_match_split_ref() {
        assert_eq!(prefix_internal_ref("#foo", &["x-ext", "abc"]).unwrap(), "#/x-ext/abc/foo");

        let (_, fragment) = split_ref("./defs.json#foo");
        assert_eq!(format!("#/x-ext/abc{fragment}"), "#/x-ext/abc/foo");
    }

    #[test]
    fn test_prefix_internal_ref_rejects_external() {
        let err = prefix_internal_ref("http://example.com#/prefix", &["a", "b"]).unwrap_err();
        assert!(matches!(err, Error::NotALocalRef(_)));
    }

    #[test]
    fn test_prefix_internal_ref_recursive() {
        let mut doc = json!({ "a": { "$ref": "#/a/b" }, "b": { "$ref": "#" } });
        prefix_internal_ref_recursive(&mut doc, &["d", "e", "f"]);
        assert_eq!(doc, json!({ "a": { "$ref": "#/d/e/f/a/b" }, "b": { "$ref": "#/d/e/f" } }));

        let mut doc = json!({
            "a": { "$ref": "#/a/b" },
            "b": { "$ref": "http://example.com#/external" },
            "list": [{ "$ref": "#/a" }]
        });
        prefix_internal_ref_recursive(&mut doc, &["d", "e", "f"]);
        assert_eq!(
            doc,
            json!({
                "a": { "$ref": "#/d/e/f/a/b" },
                "b": { "$ref": "http://example.com#/external" },
                "list": [{ "$ref": "#/d/e/f/a" }]
            })
        );
    }

    proptest::proptest! {
        #[test]
        fn prop_prefix_keeps_original_pointer(
            segments in proptest::collection::vec("[a-z~/]{1,6}", 0..4),
            prefix in proptest::collection::vec("[a-z0-9]{1,7}", 1..3),
        ) {
            let reference = format!("#{}", to_pointer(&segments));
            let prefixed = prefix_internal_ref(&reference, &prefix).unwrap();

            let mut expected = prefix.clone();
            expected.extend(segments);
            proptest::prop_assert_eq!(pointer_segments(&prefixed), expected);
        }
    }

    #[test]
    fn test_pointer_round_trip_escapes() {
        let segments = pointer_segments("#/paths/~1users~1{id}/get");
        assert_eq!(segments, vec!["paths", "/users/{id}", "get"]);
        assert_eq!(to_pointer(&segments), "/paths/~1users~1{id}/get");
    }
}
