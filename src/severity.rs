use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How loud a toast is. Controls its style class, icon and default lifetime.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Success,
        Severity::Error,
        Severity::Warning,
        Severity::Info,
    ];

    /// The css class added next to `toast`.
    pub fn class(&self) -> &'static str {
        match self {
            Severity::Success => "success",
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Severity::Success => "✓",
            Severity::Error => "✗",
            Severity::Warning => "⚠",
            Severity::Info => "ⓘ",
        }
    }

    /// Lifetime used by the fixed-severity helpers when no duration is given.
    pub fn default_duration_ms(&self) -> u32 {
        match self {
            Severity::Success => 4000,
            Severity::Error => 7000,
            Severity::Warning => 6000,
            Severity::Info => 4000,
        }
    }

    /// Parses a severity, falling back to [`Severity::Info`] for anything unrecognised.
    pub fn parse_lenient(input: &str) -> Severity {
        input.parse().unwrap_or_else(|_| {
            log::trace!("unrecognised severity {:?}, using info", input);
            Severity::Info
        })
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Severity::ALL
            .into_iter()
            .find(|severity| severity.class().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| Error::UnknownSeverity(s.to_string()))
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.class())
    }
}

#[cfg(test)]
mod tests {
    use crate::severity::Severity;
    use crate::Error;

    #[test]
    fn icons_follow_fixed_mapping() {
        assert_eq!(Severity::Success.icon(), "✓");
        assert_eq!(Severity::Error.icon(), "✗");
        assert_eq!(Severity::Warning.icon(), "⚠");
        assert_eq!(Severity::Info.icon(), "ⓘ");
    }

    #[test]
    fn parses_known_names_loosely() {
        assert_eq!("success".parse::<Severity>().unwrap(), Severity::Success);
        assert_eq!(" Warning ".parse::<Severity>().unwrap(), Severity::Warning);
        assert_eq!("ERROR".parse::<Severity>().unwrap(), Severity::Error);
    }

    #[test]
    fn strict_parse_rejects_unknown() {
        assert!(matches!(
            "danger".parse::<Severity>(),
            Err(Error::UnknownSeverity(name)) if name == "danger"
        ));
    }

    #[test]
    fn lenient_parse_falls_back_to_info() {
        assert_eq!(Severity::parse_lenient("danger"), Severity::Info);
        assert_eq!(Severity::parse_lenient(""), Severity::Info);
        assert_eq!(Severity::parse_lenient("error"), Severity::Error);
    }

    #[test]
    fn serialises_lowercase() {
        assert_eq!(
            serde_json::to_string(&Severity::Warning).unwrap(),
            "\"warning\""
        );
        let severity: Severity = serde_json::from_str("\"success\"").unwrap();
        assert_eq!(severity, Severity::Success);
    }
}
