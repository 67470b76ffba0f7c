//! Bar timeframes.

/// Fixed bar interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Timeframe {
    /// 1 minute
    #[serde(rename = "1m", alias = "M1")]
    M1,
    /// 5 minutes
    #[serde(rename = "5m", alias = "M5")]
    M5,
    /// 15 minutes
    #[serde(rename = "15m", alias = "M15")]
    M15,
    /// 30 minutes
    #[serde(rename = "30m", alias = "M30")]
    M30,
    /// 1 hour
    #[serde(rename = "1h", alias = "H1")]
    H1,
    /// 4 hours
    #[serde(rename = "4h", alias = "H4")]
    H4,
    /// 1 day
    #[serde(rename = "1d", alias = "D1")]
    D1,
}

/// Error parsing timeframe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTimeframeError(pub String);

impl std::fmt::Display for ParseTimeframeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid timeframe: {}", self.0)
    }
}

impl std::error::Error for ParseTimeframeError {}

impl std::str::FromStr for Timeframe {
    type Err = ParseTimeframeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "m1" => Ok(Timeframe::M1),
            "5m" | "m5" => Ok(Timeframe::M5),
            "15m" | "m15" => Ok(Timeframe::M15),
            "30m" | "m30" => Ok(Timeframe::M30),
            "1h" | "h1" => Ok(Timeframe::H1),
            "4h" | "h4" => Ok(Timeframe::H4),
            "1d" | "d1" => Ok(Timeframe::D1),
            _ => Err(ParseTimeframeError(s.to_string())),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Timeframe {
    /// All supported timeframes, shortest first.
    pub const ALL: [Timeframe; 7] = [
        Timeframe::M1,
        Timeframe::M5,
        Timeframe::M15,
        Timeframe::M30,
        Timeframe::H1,
        Timeframe::H4,
        Timeframe::D1,
    ];

    /// Returns duration in seconds
    #[must_use]
    pub fn to_seconds(&self) -> u64 {
        match self {
            Timeframe::M1 => 60,
            Timeframe::M5 => 300,
            Timeframe::M15 => 900,
            Timeframe::M30 => 1800,
            Timeframe::H1 => 3600,
            Timeframe::H4 => 14_400,
            Timeframe::D1 => 86_400,
        }
    }

    /// Bar interval in milliseconds.
    #[must_use]
    #[allow(clippy::cast_possible_wrap)]
    pub fn to_millis(&self) -> i64 {
        self.to_seconds() as i64 * 1000
    }

    /// Start of the bucket containing `ts_ms`.
    #[must_use]
    pub fn align(&self, ts_ms: i64) -> i64 {
        ts_ms - ts_ms.rem_euclid(self.to_millis())
    }

    /// Short label, e.g. `"5m"`.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
            Timeframe::M30 => "30m",
            Timeframe::H1 => "1h",
            Timeframe::H4 => "4h",
            Timeframe::D1 => "1d",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_timeframe_to_millis() {
        assert_eq!(Timeframe::M1.to_millis(), 60_000);
        assert_eq!(Timeframe::M15.to_millis(), 900_000);
        assert_eq!(Timeframe::H1.to_millis(), 3_600_000);
        assert_eq!(Timeframe::D1.to_millis(), 86_400_000);
    }

    #[test]
    fn test_timeframe_from_str_accepts_both_spellings() {
        assert_eq!(Timeframe::from_str("5m"), Ok(Timeframe::M5));
        assert_eq!(Timeframe::from_str("M5"), Ok(Timeframe::M5));
        assert_eq!(Timeframe::from_str("h1"), Ok(Timeframe::H1));
        assert!(Timeframe::from_str("2m").is_err());
    }

    #[test]
    fn test_timeframe_align() {
        assert_eq!(Timeframe::M5.align(299_999), 0);
        assert_eq!(Timeframe::M5.align(300_000), 300_000);
        assert_eq!(Timeframe::M5.align(-1), -300_000);
    }

    #[test]
    fn test_timeframe_serde_uses_short_label() {
        let json = serde_json::to_string(&Timeframe::H4).unwrap();
        assert_eq!(json, "\"4h\"");
        let parsed: Timeframe = serde_json::from_str("\"M15\"").unwrap();
        assert_eq!(parsed, Timeframe::M15);
    }
}
