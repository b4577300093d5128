//! Role keys: the personas a round can involve.
//!
//! Role keys are plain strings on the wire. The table below only supplies
//! display names; any key the server accepts may be selected, and keys not in
//! the table display verbatim.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::RoundtableError;

/// The search persona. The moderator asks it for a search query instead of a
/// question.
pub const RESEARCHER: &str = "researcher";

/// Roles selected when the user has not chosen any.
pub const DEFAULT_ROLES: &[&str] = &["creator", "critic", "analyst"];

static DISPLAY_NAMES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("creator", "생성자"),
        ("critic", "비판자"),
        ("analyst", "분석가"),
        (RESEARCHER, "웹 검색"),
        ("summarizer", "요약자"),
        ("optimizer", "최적화 전문가"),
    ])
});

/// Human-readable name for `key`, or `key` itself when unknown.
pub fn display_name(key: &str) -> &str {
    DISPLAY_NAMES.get(key).copied().unwrap_or(key)
}

/// Ordered, de-duplicated, non-empty set of role keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleSelection {
    keys: Vec<String>,
}

impl RoleSelection {
    /// Build a selection, keeping first-seen order and dropping duplicates and
    /// blank keys.
    ///
    /// # Errors
    /// [`RoundtableError::NoRolesSelected`] when nothing usable remains.
    pub fn new<I, S>(keys: I) -> Result<Self, RoundtableError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for key in keys {
            let key = key.as_ref().trim();
            if key.is_empty() || out.iter().any(|k| k == key) {
                continue;
            }
            out.push(key.to_string());
        }
        if out.is_empty() {
            return Err(RoundtableError::NoRolesSelected);
        }
        Ok(Self { keys: out })
    }

    /// Parse a comma-separated list such as `creator,critic`.
    pub fn parse(list: &str) -> Result<Self, RoundtableError> {
        Self::new(list.split(','))
    }

    /// Flip `key` in or out of the selection.
    ///
    /// Removing the last remaining key is refused; returns whether the
    /// selection changed.
    pub fn toggle(&mut self, key: &str) -> bool {
        if let Some(pos) = self.keys.iter().position(|k| k == key) {
            if self.keys.len() == 1 {
                return false;
            }
            self.keys.remove(pos);
        } else {
            self.keys.push(key.to_string());
        }
        true
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn into_keys(self) -> Vec<String> {
        self.keys
    }
}

impl Default for RoleSelection {
    fn default() -> Self {
        Self {
            keys: DEFAULT_ROLES.iter().map(|k| k.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for RoleSelection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.keys.iter().map(|k| display_name(k)).collect();
        write!(f, "{}", names.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_keys_have_display_names() {
        assert_eq!(display_name("creator"), "생성자");
        assert_eq!(display_name("critic"), "비판자");
        assert_eq!(display_name("analyst"), "분석가");
        assert_eq!(display_name("researcher"), "웹 검색");
        assert_eq!(display_name("summarizer"), "요약자");
        assert_eq!(display_name("optimizer"), "최적화 전문가");
    }

    #[test]
    fn unknown_key_passes_through() {
        assert_eq!(display_name("historian"), "historian");
    }

    #[test]
    fn selection_collapses_duplicates_in_order() {
        let sel = RoleSelection::new(["critic", "creator", "critic", " creator "]).unwrap();
        assert_eq!(sel.keys(), &["critic".to_string(), "creator".to_string()]);
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = RoleSelection::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, RoundtableError::NoRolesSelected));
        assert!(RoleSelection::parse(" , ,").is_err());
    }

    #[test]
    fn parse_comma_list() {
        let sel = RoleSelection::parse("creator, researcher").unwrap();
        assert_eq!(sel.len(), 2);
        assert!(sel.contains("researcher"));
    }

    #[test]
    fn toggle_adds_and_removes() {
        let mut sel = RoleSelection::default();
        assert!(sel.toggle("researcher"));
        assert!(sel.contains("researcher"));
        assert!(sel.toggle("creator"));
        assert!(!sel.contains("creator"));
    }

    #[test]
    fn toggle_keeps_last_role() {
        let mut sel = RoleSelection::new(["analyst"]).unwrap();
        assert!(!sel.toggle("analyst"));
        assert_eq!(sel.keys(), &["analyst".to_string()]);
    }

    #[test]
    fn default_selection_matches_ui_default() {
        let sel = RoleSelection::default();
        assert_eq!(sel.keys(), &["creator", "critic", "analyst"]);
    }

    #[test]
    fn display_uses_names() {
        let sel = RoleSelection::new(["creator", "x"]).unwrap();
        assert_eq!(sel.to_string(), "생성자, x");
    }
}
