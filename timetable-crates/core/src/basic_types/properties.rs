use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use super::PropertyError;

/// A flat bag of named configuration values.
///
/// Components read their settings once, when they are constructed, through the typed getters; a
/// key which is absent yields the provided default while a key whose value cannot be parsed is an
/// error.
///
/// # Example
/// ```rust
/// # use timetable_core::Properties;
/// let properties = Properties::default()
///     .set("Spread.SpreadFactor", 1.5)
///     .set("General.InteractiveMode", true);
///
/// assert_eq!(properties.get_f64("Spread.SpreadFactor", 1.2).unwrap(), 1.5);
/// assert_eq!(properties.get_i32("Spread.Unassignments2Weaken", 50).unwrap(), 50);
/// assert!(properties.get_bool("General.InteractiveMode", false).unwrap());
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    /// Returns the properties with `key` set to `value`, replacing any previous value.
    pub fn set(mut self, key: impl Into<String>, value: impl Display) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Display) {
        let _ = self.values.insert(key.into(), value.to_string());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|value| value.as_str())
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or(default).to_owned()
    }

    pub fn get_bool(&self, key: &str, default: bool) -> Result<bool, PropertyError> {
        match self.get(key).map(|value| value.trim().to_lowercase()) {
            None => Ok(default),
            Some(value) if value == "true" || value == "1" || value == "yes" => Ok(true),
            Some(value) if value == "false" || value == "0" || value == "no" => Ok(false),
            Some(value) => Err(PropertyError {
                key: key.to_owned(),
                value,
                expected: "a boolean",
            }),
        }
    }

    pub fn get_i32(&self, key: &str, default: i32) -> Result<i32, PropertyError> {
        self.parse(key, default, "an integer")
    }

    pub fn get_u32(&self, key: &str, default: u32) -> Result<u32, PropertyError> {
        self.parse(key, default, "a non-negative integer")
    }

    pub fn get_u64(&self, key: &str, default: u64) -> Result<u64, PropertyError> {
        self.parse(key, default, "a non-negative integer")
    }

    pub fn get_f64(&self, key: &str, default: f64) -> Result<f64, PropertyError> {
        self.parse(key, default, "a number")
    }

    /// Reads an optional number; absent keys yield [`None`].
    pub fn get_optional_f64(&self, key: &str) -> Result<Option<f64>, PropertyError> {
        if self.contains(key) {
            self.parse(key, 0.0, "a number").map(Some)
        } else {
            Ok(None)
        }
    }

    fn parse<T: FromStr>(
        &self,
        key: &str,
        default: T,
        expected: &'static str,
    ) -> Result<T, PropertyError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.trim().parse::<T>().map_err(|_| PropertyError {
                key: key.to_owned(),
                value: value.to_owned(),
                expected,
            }),
        }
    }
}

impl<K: Into<String>, V: Display> FromIterator<(K, V)> for Properties {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut properties = Properties::default();
        for (key, value) in iter {
            properties.insert(key, value);
        }
        properties
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_keys_yield_defaults() {
        let properties = Properties::default();

        assert_eq!(properties.get_i32("A", -1).unwrap(), -1);
        assert_eq!(properties.get_string("B", "x"), "x");
        assert_eq!(properties.get_optional_f64("C").unwrap(), None);
    }

    #[test]
    fn malformed_values_are_errors() {
        let properties: Properties = [("A", "often"), ("B", "maybe")].into_iter().collect();

        let error = properties.get_f64("A", 0.0).unwrap_err();
        assert_eq!(error.key, "A");
        assert_eq!(error.expected, "a number");
        assert!(properties.get_bool("B", true).is_err());
    }

    #[test]
    fn booleans_accept_common_spellings() {
        let properties = Properties::default()
            .set("A", "TRUE")
            .set("B", 0)
            .set("C", "yes");

        assert!(properties.get_bool("A", false).unwrap());
        assert!(!properties.get_bool("B", true).unwrap());
        assert!(properties.get_bool("C", false).unwrap());
    }
}
