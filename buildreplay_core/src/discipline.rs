//! The eight construction disciplines.
//!
//! Declaration order is the layering/display order and the column order of
//! every recorded action row, so `Ord` is derived from it.

use serde::{Deserialize, Serialize};

/// Number of disciplines, i.e. the width of every action row.
pub const DISCIPLINE_COUNT: usize = 8;

/// A construction trade category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    Piling,
    StructuralSteel,
    Piping,
    Equipment,
    Instrumentation,
    CableTray,
    Electrical,
    Insulation,
}

impl Discipline {
    /// All disciplines in their fixed order.
    pub const ALL: [Discipline; DISCIPLINE_COUNT] = [
        Discipline::Piling,
        Discipline::StructuralSteel,
        Discipline::Piping,
        Discipline::Equipment,
        Discipline::Instrumentation,
        Discipline::CableTray,
        Discipline::Electrical,
        Discipline::Insulation,
    ];

    /// Position of this discipline in action rows and catalogs.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Discipline at a row/catalog position.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Returns the discipline name.
    pub fn name(&self) -> &'static str {
        match self {
            Discipline::Piling => "piling",
            Discipline::StructuralSteel => "structural_steel",
            Discipline::Piping => "piping",
            Discipline::Equipment => "equipment",
            Discipline::Instrumentation => "instrumentation",
            Discipline::CableTray => "cable_tray",
            Discipline::Electrical => "electrical",
            Discipline::Insulation => "insulation",
        }
    }

    /// Display colour hint for render and chart sinks.
    pub fn color(&self) -> &'static str {
        match self {
            Discipline::Piling => "#00D4FF",
            Discipline::StructuralSteel => "#FF3B3B",
            Discipline::Piping => "#00C853",
            Discipline::Equipment => "#FF9800",
            Discipline::Instrumentation => "#9C27B0",
            Discipline::CableTray => "#9E9E9E",
            Discipline::Electrical => "#FFEB3B",
            Discipline::Insulation => "#FFFFFF",
        }
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "piling" => Ok(Discipline::Piling),
            "structural_steel" | "steel" => Ok(Discipline::StructuralSteel),
            "piping" => Ok(Discipline::Piping),
            "equipment" => Ok(Discipline::Equipment),
            "instrumentation" => Ok(Discipline::Instrumentation),
            "cable_tray" | "cabletray" => Ok(Discipline::CableTray),
            "electrical" => Ok(Discipline::Electrical),
            "insulation" => Ok(Discipline::Insulation),
            _ => Err(format!("Unknown discipline: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_matches_index() {
        for (i, d) in Discipline::ALL.iter().enumerate() {
            assert_eq!(d.index(), i);
            assert_eq!(Discipline::from_index(i), Some(*d));
        }
        assert_eq!(Discipline::from_index(DISCIPLINE_COUNT), None);
        assert!(Discipline::Piling < Discipline::Insulation);
    }

    #[test]
    fn test_name_round_trip() {
        for d in Discipline::ALL {
            assert_eq!(d.name().parse::<Discipline>(), Ok(d));
        }
        assert!("scaffolding".parse::<Discipline>().is_err());
    }
}
