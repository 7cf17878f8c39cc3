//! Database Options
//!
//! String-keyed properties controlling fragment building and index creation.
//! Names are upper case, values are parsed from their textual form.

use crate::error::OptionError;

/// Default maximum length of indexed values
pub const DEFAULT_MAXLEN: usize = 96;

/// Runtime options of a database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Build the attribute value index
    pub attrindex: bool,
    /// Drop whitespace-only text nodes while building
    pub chop: bool,
    /// Maximum byte length of indexed values
    pub maxlen: usize,
    /// Build the text value index
    pub textindex: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            attrindex: true,
            chop: true,
            maxlen: DEFAULT_MAXLEN,
            textindex: true,
        }
    }
}

const ATTRINDEX: &str = "ATTRINDEX";
const CHOP: &str = "CHOP";
const MAXLEN: &str = "MAXLEN";
const TEXTINDEX: &str = "TEXTINDEX";

impl Options {
    /// All property names, sorted
    pub fn names() -> Vec<&'static str> {
        let mut names = vec![TEXTINDEX, ATTRINDEX, MAXLEN, CHOP];
        names.sort_unstable();
        names
    }

    /// Property value in textual form
    pub fn get(&self, name: &str) -> Option<String> {
        match name.to_ascii_uppercase().as_str() {
            ATTRINDEX => Some(self.attrindex.to_string()),
            CHOP => Some(self.chop.to_string()),
            MAXLEN => Some(self.maxlen.to_string()),
            TEXTINDEX => Some(self.textindex.to_string()),
            _ => None,
        }
    }

    /// Set a property from its textual form
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), OptionError> {
        let key = name.to_ascii_uppercase();
        let invalid = || OptionError::InvalidValue {
            name: key.clone(),
            value: value.to_string(),
        };
        match key.as_str() {
            ATTRINDEX => self.attrindex = parse_bool(value).ok_or_else(invalid)?,
            CHOP => self.chop = parse_bool(value).ok_or_else(invalid)?,
            MAXLEN => self.maxlen = value.trim().parse().map_err(|_| invalid())?,
            TEXTINDEX => self.textindex = parse_bool(value).ok_or_else(invalid)?,
            _ => return Err(OptionError::Unknown(name.to_string())),
        }
        Ok(())
    }

    /// Build options from `(name, value)` pairs on top of the defaults
    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, OptionError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut options = Options::default();
        for (name, value) in pairs {
            options.set(name, value)?;
        }
        Ok(options)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" | "1" => Some(true),
        "false" | "off" | "no" | "0" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_sorted() {
        assert_eq!(Options::names(), vec!["ATTRINDEX", "CHOP", "MAXLEN", "TEXTINDEX"]);
    }

    #[test]
    fn test_set_and_get() {
        let mut options = Options::default();
        options.set("maxlen", "8").unwrap();
        options.set("TEXTINDEX", "off").unwrap();
        assert_eq!(options.maxlen, 8);
        assert!(!options.textindex);
        assert_eq!(options.get("MaxLen").as_deref(), Some("8"));
        assert_eq!(options.get("unknown"), None);
    }

    #[test]
    fn test_invalid_values() {
        let mut options = Options::default();
        assert_eq!(
            options.set("CHOP", "maybe"),
            Err(OptionError::InvalidValue {
                name: "CHOP".into(),
                value: "maybe".into()
            })
        );
        assert_eq!(
            options.set("WRITEBACK", "true"),
            Err(OptionError::Unknown("WRITEBACK".into()))
        );
    }

    #[test]
    fn test_from_pairs() {
        let options = Options::from_pairs([("ATTRINDEX", "false"), ("MAXLEN", "12")]).unwrap();
        assert!(!options.attrindex);
        assert!(options.textindex);
        assert_eq!(options.maxlen, 12);
    }
}
