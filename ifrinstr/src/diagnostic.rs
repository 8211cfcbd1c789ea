use std::fmt;

use log::{error, warn};
use strum::{EnumIs, IntoStaticStr};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIs, IntoStaticStr)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Warning,
    Error,
}

/// Message attributed to a source line of the compiled form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Diagnostic {
    pub severity: Severity,
    /// Source line, `None` when the message concerns the whole package.
    pub line: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(line: Option<u32>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            line,
            message: message.into(),
        }
    }

    pub fn warning(line: Option<u32>, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            line,
            message: message.into(),
        }
    }

    /// Forwards the diagnostic to the `log` facade.
    pub fn emit(&self) {
        match self.severity {
            Severity::Error => error!("{self}"),
            Severity::Warning => warn!("{self}"),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity: &'static str = self.severity.into();
        match self.line {
            Some(line) => write!(f, "line {line}: {severity}: {}", self.message),
            None => write!(f, "{severity}: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_the_line() {
        let diag = Diagnostic::error(Some(42), "question `Q` is not defined");
        assert_eq!(diag.to_string(), "line 42: error: question `Q` is not defined");

        let global = Diagnostic::warning(None, "empty formset");
        assert_eq!(global.to_string(), "warning: empty formset");
    }
}
