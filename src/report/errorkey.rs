use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// The category of a report. Used for filtering reports.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKey {
    Config,
    ParseError,
    Alignment,
    ReservedValue,
    Duplicate,
    MissingFile,
    Unresolved,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_names_round_trip() {
        for key in ErrorKey::iter() {
            assert_eq!(ErrorKey::from_str(&key.to_string()), Ok(key));
        }
        assert_eq!(ErrorKey::ReservedValue.to_string(), "reserved-value");
    }
}
