use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Selects which replica set member serves an operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReadPreference {
    #[default]
    Primary,
    PrimaryPreferred,
    Secondary,
    SecondaryPreferred,
    Nearest,
}

impl ReadPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadPreference::Primary => "primary",
            ReadPreference::PrimaryPreferred => "primaryPreferred",
            ReadPreference::Secondary => "secondary",
            ReadPreference::SecondaryPreferred => "secondaryPreferred",
            ReadPreference::Nearest => "nearest",
        }
    }
}

impl fmt::Display for ReadPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReadPreference {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(ReadPreference::Primary),
            "primaryPreferred" => Ok(ReadPreference::PrimaryPreferred),
            "secondary" => Ok(ReadPreference::Secondary),
            "secondaryPreferred" => Ok(ReadPreference::SecondaryPreferred),
            "nearest" => Ok(ReadPreference::Nearest),
            other => Err(anyhow::anyhow!("Unknown read preference `{}`", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ReadPreference;

    #[test]
    fn read_preference_parses_driver_names() {
        assert_eq!(
            "secondaryPreferred".parse::<ReadPreference>().unwrap(),
            ReadPreference::SecondaryPreferred
        );
        assert!("Secondary".parse::<ReadPreference>().is_err());
    }

    #[test]
    fn read_preference_deserializes_from_camel_case() {
        let pref: ReadPreference = serde_json::from_str("\"primaryPreferred\"").unwrap();

        assert_eq!(pref, ReadPreference::PrimaryPreferred);
        assert_eq!(pref.to_string(), "primaryPreferred");
    }
}
