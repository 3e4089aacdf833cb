//! Path optimisation objective shared by the routing engine and agents.

use std::str::FromStr;

use crate::CoreError;

/// What a vehicle minimises when it prices a task.
///
/// The first three variants select an edge weight directly.  `Time` is a
/// meta-criterion: the routing engine evaluates the three weight-optimal
/// paths and keeps the one with the smallest travel time.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Criterion {
    Distance,
    Carbon,
    Cost,
    #[default]
    Time,
}

impl Criterion {
    /// Criteria that map to a single edge weight, in the order the `Time`
    /// criterion evaluates them.  Earlier entries win ties.
    pub const WEIGHTED: [Criterion; 3] = [Criterion::Distance, Criterion::Carbon, Criterion::Cost];

    /// Human-readable label, also the serialised form.
    pub fn as_str(self) -> &'static str {
        match self {
            Criterion::Distance => "distance",
            Criterion::Carbon   => "carbon",
            Criterion::Cost     => "cost",
            Criterion::Time     => "time",
        }
    }

    /// Numeric priority used in roster tooling (1 distance … 4 time).
    pub fn priority(self) -> u8 {
        match self {
            Criterion::Distance => 1,
            Criterion::Carbon   => 2,
            Criterion::Cost     => 3,
            Criterion::Time     => 4,
        }
    }

    pub fn from_priority(p: u8) -> Option<Criterion> {
        match p {
            1 => Some(Criterion::Distance),
            2 => Some(Criterion::Carbon),
            3 => Some(Criterion::Cost),
            4 => Some(Criterion::Time),
            _ => None,
        }
    }
}

impl FromStr for Criterion {
    type Err = CoreError;

    /// Accepts either the label (`"carbon"`) or the numeric priority (`"2"`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(p) = s.parse::<u8>() {
            return Criterion::from_priority(p)
                .ok_or_else(|| CoreError::Parse(format!("criterion priority {p} out of range 1..=4")));
        }
        match s.to_ascii_lowercase().as_str() {
            "distance" => Ok(Criterion::Distance),
            "carbon"   => Ok(Criterion::Carbon),
            "cost"     => Ok(Criterion::Cost),
            "time"     => Ok(Criterion::Time),
            other      => Err(CoreError::Parse(format!("unknown criterion {other:?}"))),
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
