//! Preference levels shared by time patterns, rooms and distribution constraints.
//!
//! Preferences are written as prolog-like tokens (`R`, `-2`, `-1`, `0`, `1`, `2`, `P`) and are
//! stored as integer levels; negative levels are preferred, positive levels are discouraged.

use super::ReferenceError;

pub const REQUIRED: &str = "R";
pub const STRONGLY_PREFERRED: &str = "-2";
pub const PREFERRED: &str = "-1";
pub const NEUTRAL: &str = "0";
pub const DISCOURAGED: &str = "1";
pub const STRONGLY_DISCOURAGED: &str = "2";
pub const PROHIBITED: &str = "P";

pub const LEVEL_REQUIRED: i32 = -100;
pub const LEVEL_STRONGLY_PREFERRED: i32 = -4;
pub const LEVEL_PREFERRED: i32 = -1;
pub const LEVEL_NEUTRAL: i32 = 0;
pub const LEVEL_DISCOURAGED: i32 = 1;
pub const LEVEL_STRONGLY_DISCOURAGED: i32 = 4;
pub const LEVEL_PROHIBITED: i32 = 100;

/// Converts a preference token into its level.
///
/// Tokens other than the seven named ones are accepted when they are plain integers, in which
/// case the integer is the level.
pub fn preference_to_level(preference: &str) -> Result<i32, ReferenceError> {
    let preference = preference.trim();
    match preference {
        REQUIRED => Ok(LEVEL_REQUIRED),
        STRONGLY_PREFERRED => Ok(LEVEL_STRONGLY_PREFERRED),
        PREFERRED => Ok(LEVEL_PREFERRED),
        NEUTRAL => Ok(LEVEL_NEUTRAL),
        DISCOURAGED => Ok(LEVEL_DISCOURAGED),
        STRONGLY_DISCOURAGED => Ok(LEVEL_STRONGLY_DISCOURAGED),
        PROHIBITED => Ok(LEVEL_PROHIBITED),
        other => other
            .parse::<i32>()
            .map_err(|_| ReferenceError::InvalidPreference(other.to_owned())),
    }
}

/// Converts a level back into its token, the inverse of [`preference_to_level`] for the named
/// levels.
pub fn level_to_preference(level: i32) -> String {
    match level {
        LEVEL_REQUIRED => REQUIRED.to_owned(),
        LEVEL_STRONGLY_PREFERRED => STRONGLY_PREFERRED.to_owned(),
        LEVEL_PREFERRED => PREFERRED.to_owned(),
        LEVEL_NEUTRAL => NEUTRAL.to_owned(),
        LEVEL_DISCOURAGED => DISCOURAGED.to_owned(),
        LEVEL_STRONGLY_DISCOURAGED => STRONGLY_DISCOURAGED.to_owned(),
        LEVEL_PROHIBITED => PROHIBITED.to_owned(),
        other => other.to_string(),
    }
}

pub fn is_required(level: i32) -> bool {
    level <= LEVEL_REQUIRED
}

pub fn is_prohibited(level: i32) -> bool {
    level >= LEVEL_PROHIBITED
}

/// Whether the level is a hard requirement in either direction.
pub fn is_hard(level: i32) -> bool {
    is_required(level) || is_prohibited(level)
}

/// Whether the level counts towards the min/max preference bounds of a lecture; hard levels do
/// not.
pub fn is_soft_bound(level: f64) -> bool {
    (-50.0..=50.0).contains(&level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_tokens_map_to_levels() {
        assert_eq!(preference_to_level("R").unwrap(), LEVEL_REQUIRED);
        assert_eq!(preference_to_level("-2").unwrap(), LEVEL_STRONGLY_PREFERRED);
        assert_eq!(preference_to_level("2").unwrap(), LEVEL_STRONGLY_DISCOURAGED);
        assert_eq!(preference_to_level(" P ").unwrap(), LEVEL_PROHIBITED);
    }

    #[test]
    fn plain_integers_are_levels() {
        assert_eq!(preference_to_level("7").unwrap(), 7);
        assert!(preference_to_level("often").is_err());
    }

    #[test]
    fn levels_convert_back_to_tokens() {
        assert_eq!(level_to_preference(LEVEL_PROHIBITED), "P");
        assert_eq!(level_to_preference(LEVEL_PREFERRED), "-1");
        assert_eq!(level_to_preference(12), "12");
    }

    #[test]
    fn hard_levels_are_recognised() {
        assert!(is_hard(LEVEL_REQUIRED));
        assert!(is_hard(LEVEL_PROHIBITED));
        assert!(!is_hard(LEVEL_STRONGLY_DISCOURAGED));
        assert!(!is_soft_bound(LEVEL_PROHIBITED as f64));
    }
}
