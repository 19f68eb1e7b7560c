use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// All refund requests are denied.
    NoRefund,
    /// Fixed 7-day money-back window.
    Windowed,
    /// Creator-configured window plus free-text conditions.
    Custom,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::NoRefund => "no_refund",
            PolicyKind::Windowed => "windowed",
            PolicyKind::Custom => "custom",
        }
    }
}

impl std::str::FromStr for PolicyKind {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "no_refund" => Ok(PolicyKind::NoRefund),
            "windowed" => Ok(PolicyKind::Windowed),
            "custom" => Ok(PolicyKind::Custom),
            _ => Err(()),
        }
    }
}

/// One refund policy per creator, upserted on every save (last write wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub creator_id: String,
    pub kind: PolicyKind,
    /// Window length for `Custom` policies. Ignored by other kinds.
    pub custom_days: Option<i64>,
    /// Human-readable extra criteria, communicated in the denial template.
    /// Not machine-evaluated.
    pub custom_condition: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Deserialize)]
pub struct SavePolicy {
    pub policy_id: PolicyKind,
    #[serde(default)]
    pub custom_days: Option<i64>,
    #[serde(default)]
    pub custom_condition: Option<String>,
}
