//! Letter to digit table for the device keypad.
//!
//! The physical keypad does not follow the telephone layout. Its groupings
//! (default shown below) decide which digit a letter reduces to when names
//! are indexed for digit search:
//!
//! ```text
//! 7 abc   8 def   9 ghi
//! 4 jkl   5 mno   6 pqrs
//! 1 tuv   2 wxyz  3 '-+/
//! ```

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// A total mapping from letters (plus a few punctuation marks) to keypad digits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct KeypadLayout {
    keys: BTreeMap<char, String>,
    letter_to_digit: HashMap<char, char>,
}

impl KeypadLayout {
    /// The layout printed on the device keypad.
    pub fn device() -> Self {
        let groups = [
            ('7', "abc"),
            ('8', "def"),
            ('9', "ghi"),
            ('4', "jkl"),
            ('5', "mno"),
            ('6', "pqrs"),
            ('1', "tuv"),
            ('2', "wxyz"),
            ('3', "'-+/"),
        ];
        let mut keys = BTreeMap::new();
        let mut letter_to_digit = HashMap::new();
        for (digit, letters) in groups {
            for c in letters.chars() {
                letter_to_digit.insert(c, digit);
            }
            keys.insert(digit, letters.to_string());
        }
        Self {
            keys,
            letter_to_digit,
        }
    }

    /// Build a layout from `digit -> letters` groups.
    ///
    /// Letters are case-insensitive. A group may repeat its own digit (as in
    /// "7abc"); that character is ignored.
    ///
    /// # Errors
    /// Returns [`CatalogError::InvalidKeypad`] if a key is not a single digit,
    /// a letter is assigned to two keys, a group contains another digit, or
    /// the table does not cover `a`..=`z` and the apostrophe.
    pub fn from_groups(groups: BTreeMap<String, String>) -> CatalogResult<Self> {
        let mut keys = BTreeMap::new();
        let mut letter_to_digit = HashMap::new();

        for (key, letters) in groups {
            let mut chars = key.chars();
            let digit = match (chars.next(), chars.next()) {
                (Some(d), None) if d.is_ascii_digit() => d,
                _ => {
                    return Err(CatalogError::InvalidKeypad(format!(
                        "key {key:?} is not a single digit"
                    )))
                }
            };

            let mut group = String::new();
            for c in letters.chars().map(|c| c.to_ascii_lowercase()) {
                if c == digit {
                    continue;
                }
                if c.is_ascii_digit() {
                    return Err(CatalogError::InvalidKeypad(format!(
                        "digit {c:?} listed under key {digit}"
                    )));
                }
                if let Some(previous) = letter_to_digit.insert(c, digit) {
                    return Err(CatalogError::InvalidKeypad(format!(
                        "{c:?} assigned to both {previous} and {digit}"
                    )));
                }
                group.push(c);
            }
            keys.insert(digit, group);
        }

        let missing: String = ('a'..='z')
            .chain(std::iter::once('\''))
            .filter(|c| !letter_to_digit.contains_key(c))
            .collect();
        if !missing.is_empty() {
            return Err(CatalogError::InvalidKeypad(format!(
                "no key for {missing:?}"
            )));
        }

        Ok(Self {
            keys,
            letter_to_digit,
        })
    }

    /// Digit for a single character.
    ///
    /// Digits map to themselves; characters absent from the table (spaces,
    /// accented letters, unlisted punctuation) return `None` and are dropped
    /// by [`KeypadLayout::encode`].
    pub fn digit_for(&self, c: char) -> Option<char> {
        if c.is_ascii_digit() {
            return Some(c);
        }
        self.letter_to_digit.get(&c.to_ascii_lowercase()).copied()
    }

    /// Reduce a display name to its keypad digit string.
    pub fn encode(&self, name: &str) -> String {
        name.chars().filter_map(|c| self.digit_for(c)).collect()
    }

    /// Letters grouped under `digit`, if the key exists.
    pub fn letters(&self, digit: char) -> Option<&str> {
        self.keys.get(&digit).map(String::as_str)
    }
}

impl Default for KeypadLayout {
    fn default() -> Self {
        Self::device()
    }
}

impl TryFrom<BTreeMap<String, String>> for KeypadLayout {
    type Error = CatalogError;

    fn try_from(groups: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        Self::from_groups(groups)
    }
}

impl From<KeypadLayout> for BTreeMap<String, String> {
    fn from(layout: KeypadLayout) -> Self {
        layout
            .keys
            .into_iter()
            .map(|(digit, letters)| (digit.to_string(), letters))
            .collect()
    }
}
