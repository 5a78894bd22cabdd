//! Minimal JSON path lookup for test assertions.
//!
//! Paths are dot-separated keys with optional `[n]` indices and a trailing
//! `len()`: `errors[0].field`, `paths./users.get.tags`, `errors.len()`.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathToken {
    Key(String),
    Index(usize),
    Len,
}

/// Split `path` into tokens.
///
/// Panics on a malformed index, since a typo in a test path should fail loudly.
pub fn tokenize_path(path: &str) -> Vec<PathToken> {
    let mut tokens = Vec::new();
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        if segment == "len()" {
            tokens.push(PathToken::Len);
            continue;
        }
        let (key, mut indices) = match segment.find('[') {
            Some(pos) => segment.split_at(pos),
            None => (segment, ""),
        };
        if !key.is_empty() {
            tokens.push(PathToken::Key(key.to_string()));
        }
        while let Some(rest) = indices.strip_prefix('[') {
            let Some((index, tail)) = rest.split_once(']') else {
                panic!("unclosed `[` in JSON path {path:?}");
            };
            let index = index
                .parse()
                .unwrap_or_else(|_| panic!("index {index:?} in JSON path {path:?} is not a number"));
            tokens.push(PathToken::Index(index));
            indices = tail;
        }
    }
    tokens
}

/// Resolve `path` against `root`. Missing keys and indices resolve to `null`.
pub fn resolve_path(root: &Value, path: &str) -> Value {
    let mut current = root;
    let tokens = tokenize_path(path);
    for (position, token) in tokens.iter().enumerate() {
        match token {
            PathToken::Key(key) => match current.get(key) {
                Some(next) => current = next,
                None => return Value::Null,
            },
            PathToken::Index(index) => match current.get(*index) {
                Some(next) => current = next,
                None => return Value::Null,
            },
            PathToken::Len => {
                let len = match current {
                    Value::Array(items) => items.len(),
                    Value::Object(map) => map.len(),
                    Value::String(s) => s.chars().count(),
                    other => panic!("len() at token {position} of {path:?} applied to {other}"),
                };
                return Value::from(len);
            }
        }
    }
    current.clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tokenizes_keys_indices_and_len() {
        assert_eq!(
            tokenize_path("errors[0].field"),
            vec![PathToken::Key("errors".into()), PathToken::Index(0), PathToken::Key("field".into())]
        );
        assert_eq!(tokenize_path("grid[1][2]"), vec![
            PathToken::Key("grid".into()),
            PathToken::Index(1),
            PathToken::Index(2)
        ]);
        assert_eq!(tokenize_path("items.len()").last(), Some(&PathToken::Len));
    }

    #[test]
    fn resolves_nested_values() {
        let body = json!({ "errors": [{ "field": "body.email" }], "success": false });
        assert_eq!(resolve_path(&body, "errors[0].field"), json!("body.email"));
        assert_eq!(resolve_path(&body, "errors.len()"), json!(1));
        assert_eq!(resolve_path(&body, "success"), json!(false));
        assert_eq!(resolve_path(&body, "missing.deeper"), Value::Null);
    }
}
