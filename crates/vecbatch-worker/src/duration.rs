use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A Duration that reads and writes as a humantime string such as "5s" or "1m 30s"
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct HumanDuration(pub Duration);

impl HumanDuration {
  pub const fn from_secs(secs: u64) -> Self {
    HumanDuration(Duration::from_secs(secs))
  }

  pub const fn from_millis(millis: u64) -> Self {
    HumanDuration(Duration::from_millis(millis))
  }

  pub fn inner(&self) -> Duration {
    self.0
  }
}

impl fmt::Display for HumanDuration {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", humantime::format_duration(self.0))
  }
}

impl FromStr for HumanDuration {
  type Err = humantime::DurationError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    humantime::parse_duration(s).map(HumanDuration)
  }
}

impl Serialize for HumanDuration {
  fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
  where
    S: Serializer,
  {
    serializer.serialize_str(&self.to_string())
  }
}

impl<'de> Deserialize<'de> for HumanDuration {
  fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
  where
    D: Deserializer<'de>,
  {
    let s = String::deserialize(deserializer)?;
    HumanDuration::from_str(&s).map_err(serde::de::Error::custom)
  }
}
