// Utility domain model
use super::error::IntensityError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Regional utilities whose generation mix is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Utility {
    Tepco,
    Kepco,
    Cepco,
}

impl Utility {
    pub const ALL: [Utility; 3] = [Utility::Tepco, Utility::Kepco, Utility::Cepco];

    pub fn as_str(&self) -> &'static str {
        match self {
            Utility::Tepco => "tepco",
            Utility::Kepco => "kepco",
            Utility::Cepco => "cepco",
        }
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Utility {
    type Err = IntensityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Utility::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| IntensityError::Configuration(format!("unknown utility `{}`", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_utility() {
        assert_eq!("tepco".parse::<Utility>().unwrap(), Utility::Tepco);
        assert_eq!("KEPCO".parse::<Utility>().unwrap(), Utility::Kepco);
        assert_eq!(" Cepco ".parse::<Utility>().unwrap(), Utility::Cepco);
    }

    #[test]
    fn test_unknown_utility_is_configuration_error() {
        let err = "hepco".parse::<Utility>().unwrap_err();
        assert!(matches!(err, IntensityError::Configuration(ref msg) if msg.contains("hepco")));
    }
}
