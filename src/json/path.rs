//! JSON location identifiers: RFC 6901 JSON Pointers.
//!
//! A pointer is a pure function of the structural position (object keys and
//! array indices from the root), which makes it the JSON twin of the XML
//! path scheme; `serde_json::Value::pointer` resolves it natively. Keys
//! containing `~` or `/` are escaped per the RFC, so pathological keys can
//! never produce colliding identifiers.

/// Escape one reference token: `~` -> `~0`, then `/` -> `~1`.
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

pub fn append_key(pointer: &str, key: &str) -> String {
    format!("{pointer}/{}", escape_token(key))
}

pub fn append_index(pointer: &str, index: usize) -> String {
    format!("{pointer}/{index}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn escaping_order_matters() {
        // `~1` must not be produced by escaping `~` after `/`.
        assert_eq!(escape_token("a/b"), "a~1b");
        assert_eq!(escape_token("a~b"), "a~0b");
        assert_eq!(escape_token("~/"), "~0~1");
    }

    #[test]
    fn built_pointers_resolve() {
        let value = json!({"a/b": {"x~y": ["zero", "one"]}});
        let pointer = append_index(&append_key(&append_key("", "a/b"), "x~y"), 1);
        assert_eq!(pointer, "/a~1b/x~0y/1");
        assert_eq!(value.pointer(&pointer), Some(&json!("one")));
    }
}
