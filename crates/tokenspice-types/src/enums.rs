//! Enumeration types for the TokenSPICE simulation.

use serde::{Deserialize, Serialize};

/// A fungible resource held in every wallet.
///
/// Each wallet carries exactly one balance per resource. The declaration
/// order is the iteration order used for reporting and supply checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    /// Stable-value unit pegged to one US dollar.
    Usd,
    /// The native network token.
    Ocean,
}

impl Resource {
    /// Every resource, in declaration order.
    pub const ALL: [Self; 2] = [Self::Usd, Self::Ocean];

    /// Ticker symbol used in logs and reports.
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Usd => "USD",
            Self::Ocean => "OCEAN",
        }
    }
}

impl core::fmt::Display for Resource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.symbol())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_lists_usd_first() {
        assert_eq!(Resource::ALL, [Resource::Usd, Resource::Ocean]);
    }

    #[test]
    fn display_uses_ticker_symbol() {
        assert_eq!(Resource::Usd.to_string(), "USD");
        assert_eq!(Resource::Ocean.to_string(), "OCEAN");
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&Resource::Ocean).ok();
        assert_eq!(json.as_deref(), Some("\"ocean\""));
    }
}
