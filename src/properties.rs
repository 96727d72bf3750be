//! Build property dump (`getprop`), parsed into a key/value map.
//!
//! `getprop` runs unprivileged; it does not go through the elevated shell.

use std::collections::BTreeMap;
use std::process::{Command, Stdio};

use serde::Serialize;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PropertyMap(BTreeMap<String, String>);

impl PropertyMap {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Later duplicates overwrite earlier ones.
    fn insert(&mut self, key: String, value: String) {
        self.0.insert(key, value);
    }
}

/// Parse `[key]: [value]` lines. Lines without a `": "` separator are skipped.
pub fn parse(output: &str) -> PropertyMap {
    let mut map = PropertyMap::default();
    for line in output.lines() {
        let Some((key, value)) = line.split_once(": ") else {
            continue;
        };
        map.insert(unbracket(key).to_string(), unbracket(value).to_string());
    }
    map
}

/// Trim, then drop one `[` ... `]` pair if both are present.
fn unbracket(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix('[')
        .and_then(|inner| inner.strip_suffix(']'))
        .unwrap_or(s)
}

#[derive(Debug, Clone)]
pub struct PropertyStore {
    program: String,
}

impl PropertyStore {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Run the dump command and parse it. Spawn failures yield an empty map.
    pub fn load(&self) -> PropertyMap {
        let output = match Command::new(&self.program)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                warn!(program = %self.program, error = %e, "failed to run property dump");
                return PropertyMap::default();
            }
        };

        let map = parse(&String::from_utf8_lossy(&output.stdout));
        debug!(count = map.len(), status = %output.status, "loaded properties");
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bracketed_line() {
        let map = parse("[ro.build.id]: [TP1A.1]\n");
        assert_eq!(map.get("ro.build.id"), Some("TP1A.1"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn lines_without_separator_are_dropped() {
        let map = parse("garbage line\n[a]: [1]\n[b]:[2]\n\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some("1"));
    }

    #[test]
    fn last_duplicate_wins() {
        let map = parse("[k]: [first]\n[k]: [second]\n");
        assert_eq!(map.get("k"), Some("second"));
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn splits_on_first_separator_only() {
        let map = parse("[ro.product.name]: [a: b]\n");
        assert_eq!(map.get("ro.product.name"), Some("a: b"));
    }

    #[test]
    fn strips_one_bracket_layer_and_keeps_empty_values() {
        let map = parse("[x]: [[nested]]\n[empty]: []\n[bare]: value\n");
        assert_eq!(map.get("x"), Some("[nested]"));
        assert_eq!(map.get("empty"), Some(""));
        assert_eq!(map.get("bare"), Some("value"));
    }

    #[test]
    fn get_or_falls_back() {
        let map = parse("[ro.repack.version]: [2.1]\n");
        assert_eq!(map.get_or("ro.repack.version", "N/A"), "2.1");
        assert_eq!(map.get_or("ro.repack.author", "N/A"), "N/A");
    }

    #[test]
    fn missing_program_yields_empty_map() {
        let store = PropertyStore::new("/nonexistent/getprop");
        assert!(store.load().is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn load_is_repeatable_against_unchanged_output() {
        let dir = tempfile::tempdir().unwrap();
        let getprop = crate::shell::tests::fake_binary(
            dir.path(),
            "getprop",
            "printf '[ro.build.id]: [TP1A.1]\\n[ro.build.display.id]: [ASR-1.0]\\nnoise\\n'",
        );
        let store = PropertyStore::new(getprop.to_str().unwrap());

        let first = store.load();
        let second = store.load();
        assert_eq!(first, second);
        assert_eq!(first.get("ro.build.display.id"), Some("ASR-1.0"));
        assert_eq!(first.len(), 2);
    }
}
