use std::fmt;

/// Errors raised when building a [`RiskTier`].
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RiskTierError {
    #[error("risk tier must be between 1 and 5, got {0}")]
    OutOfRange(i64),
}

/// Severity classification of an organism.
///
/// Tiers run from 1 (limited) to 5 (critical). The tier selects the threshold profile used to
/// classify a colony count and filters which corrective measures apply.
///
/// Serialised as a bare integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RiskTier(u8);

impl RiskTier {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Every tier, most critical first.
    ///
    /// Administration views list tiers in this order.
    pub const ALL_DESCENDING: [RiskTier; 5] = [
        RiskTier(5),
        RiskTier(4),
        RiskTier(3),
        RiskTier(2),
        RiskTier(1),
    ];

    /// Validates `value` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`RiskTierError::OutOfRange`] unless `1 <= value <= 5`.
    pub fn new(value: i64) -> Result<Self, RiskTierError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            // Range checked above.
            Ok(Self(value as u8))
        } else {
            Err(RiskTierError::OutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Human-readable label for the tier.
    pub fn label(self) -> &'static str {
        match self.0 {
            1 => "Limited",
            2 => "Moderate",
            3 => "Significant",
            4 => "Major",
            _ => "Critical",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for RiskTier {
    type Error = RiskTierError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(i64::from(value))
    }
}

impl From<RiskTier> for u8 {
    fn from(tier: RiskTier) -> Self {
        tier.0
    }
}

impl std::str::FromStr for RiskTier {
    type Err = RiskTierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| RiskTierError::OutOfRange(0))?;
        Self::new(value)
    }
}

impl serde::Serialize for RiskTier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for RiskTier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = i64::deserialize(deserializer)?;
        RiskTier::new(raw).map_err(serde::de::Error::custom)
    }
}
