//! Regex search over a namespace.

use crate::error::Result;
use crate::namespace::Entries;
use crate::value::Value;
use regex::Regex;
use std::borrow::Cow;
use std::str::FromStr;

/// Anything usable as a key search pattern.
///
/// Strings are compiled with [`Regex::new`]; a bad pattern fails here.
pub trait IntoPattern<'a> {
    fn into_pattern(self) -> Result<Cow<'a, Regex>>;
}

impl<'a> IntoPattern<'a> for &'a Regex {
    fn into_pattern(self) -> Result<Cow<'a, Regex>> {
        Ok(Cow::Borrowed(self))
    }
}

impl IntoPattern<'static> for Regex {
    fn into_pattern(self) -> Result<Cow<'static, Regex>> {
        Ok(Cow::Owned(self))
    }
}

impl IntoPattern<'static> for &str {
    fn into_pattern(self) -> Result<Cow<'static, Regex>> {
        Ok(Cow::Owned(Regex::new(self)?))
    }
}

impl IntoPattern<'static> for String {
    fn into_pattern(self) -> Result<Cow<'static, Regex>> {
        Ok(Cow::Owned(Regex::new(&self)?))
    }
}

impl IntoPattern<'static> for &String {
    fn into_pattern(self) -> Result<Cow<'static, Regex>> {
        Ok(Cow::Owned(Regex::new(self)?))
    }
}

/// Shape of a search result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FindMode {
    /// Matching keys
    #[default]
    Keys,
    /// Values of the matching keys, in key order
    Values,
    /// Matching key → value pairs
    Entries,
    /// The value of the first matching key
    One,
}

impl FromStr for FindMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "keys" => Ok(Self::Keys),
            "values" => Ok(Self::Values),
            "entries" => Ok(Self::Entries),
            "one" => Ok(Self::One),
            other => Err(format!("unknown find mode '{other}'")),
        }
    }
}

/// Result of a search, shaped by [`FindMode`].
#[derive(Debug, Clone, PartialEq)]
pub enum Found {
    Keys(Vec<String>),
    Values(Vec<Value>),
    Entries(Entries),
    One(Option<Value>),
}

impl Found {
    /// Converts the result into plain JSON for display.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Self::Keys(keys) => keys.into(),
            Self::Values(values) => values.into_iter().map(Value::into_json).collect(),
            Self::Entries(entries) => entries
                .into_iter()
                .map(|(k, v)| (k, v.into_json()))
                .collect::<serde_json::Map<_, _>>()
                .into(),
            Self::One(value) => value.map(Value::into_json).unwrap_or(serde_json::Value::Null),
        }
    }

    /// Shapes already-matched rows per `mode`.
    pub fn shape(matched: Entries, mode: FindMode) -> Self {
        match mode {
            FindMode::Keys => Self::Keys(matched.into_keys().collect()),
            FindMode::Values => Self::Values(matched.into_values().collect()),
            FindMode::Entries => Self::Entries(matched),
            FindMode::One => Self::One(matched.into_values().next()),
        }
    }
}

/// Keeps the rows of `data` whose key `pattern` matches anywhere.
pub(crate) fn matching(data: Entries, pattern: &Regex) -> Entries {
    data.into_iter()
        .filter(|(key, _)| pattern.is_match(key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> Entries {
        [("key1", "data1"), ("key2", "data2"), ("other", "data3"), ("key1_expire", "9")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::from(v)))
            .collect()
    }

    #[test]
    fn test_modes_are_consistent() {
        let pattern = Regex::new("^key").unwrap();

        let shape = |mode| Found::shape(matching(data(), &pattern), mode);

        let Found::Keys(keys) = shape(FindMode::Keys) else {
            panic!("expected keys");
        };
        let Found::Values(values) = shape(FindMode::Values) else {
            panic!("expected values");
        };
        let Found::Entries(entries) = shape(FindMode::Entries) else {
            panic!("expected entries");
        };

        // Markers are not filtered out by a plain search
        assert_eq!(keys.len(), 3);
        assert!(keys.contains(&"key1_expire".to_string()));

        assert_eq!(entries.keys().cloned().collect::<Vec<_>>(), keys);
        let zipped: Entries = keys.into_iter().zip(values).collect();
        assert_eq!(zipped, entries);
    }

    #[test]
    fn test_one_mode() {
        let pattern = Regex::new("other").unwrap();
        assert_eq!(
            Found::shape(matching(data(), &pattern), FindMode::One),
            Found::One(Some(Value::from("data3")))
        );

        let pattern = Regex::new("^nothing$").unwrap();
        assert_eq!(Found::shape(matching(data(), &pattern), FindMode::One), Found::One(None));
    }

    #[test]
    fn test_unanchored_match() {
        let pattern = Regex::new("ey").unwrap();
        assert_eq!(
            Found::shape(matching(data(), &pattern), FindMode::Keys),
            Found::Keys(vec!["key1".into(), "key1_expire".into(), "key2".into()])
        );
    }

    #[test]
    fn test_string_patterns_compile() {
        assert!("key.*".into_pattern().is_ok());
        assert!(String::from("^k").into_pattern().is_ok());
        assert!("key(".into_pattern().is_err());
    }

    #[test]
    fn test_find_mode_from_str() {
        assert_eq!("VALUES".parse::<FindMode>().unwrap(), FindMode::Values);
        assert_eq!("one".parse::<FindMode>().unwrap(), FindMode::One);
        assert!("all".parse::<FindMode>().is_err());
    }

    #[test]
    fn test_found_into_json() {
        let json = Found::Entries(data()).into_json();
        assert_eq!(json["key2"], serde_json::json!("data2"));
        assert_eq!(Found::One(None).into_json(), serde_json::Value::Null);
    }
}
