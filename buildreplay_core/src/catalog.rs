//! Catalog Model - valid-placement catalogs and recorded action rows.
//!
//! Heterogeneous input is normalised here, once, at load time:
//! - Placement entries arrive as a bare coordinate or a `[coordinate, requirement]`
//!   pair (or a `{ "coord": .., "req": .. }` object) and become one canonical record
//! - Each discipline gets an O(1) requirement lookup keyed by coordinate
//! - Action rows are checked for width and numeric content, reject-all on failure

use crate::discipline::{Discipline, DISCIPLINE_COUNT};
use crate::error::EpisodeError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// An exact integer cell coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl CellCoord {
    pub const ORIGIN: CellCoord = CellCoord { x: 0, y: 0, z: 0 };

    pub fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Components as an array `[x, y, z]`.
    pub fn to_array(self) -> [i32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[i32; 3]> for CellCoord {
    fn from(c: [i32; 3]) -> Self {
        Self::new(c[0], c[1], c[2])
    }
}

impl std::fmt::Display for CellCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({},{},{})", self.x, self.y, self.z)
    }
}

/// Placement data in one of the admissible input shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawPlacement {
    /// `[x, y, z]`: no completion tracking at this site
    Bare(CellCoord),
    /// `[[x, y, z], requirement]`
    WithRequirement(CellCoord, u32),
}

impl RawPlacement {
    /// Reads one catalog item from a literal tree.
    ///
    /// Accepts `[x,y,z]`, `[[x,y,z], n]` and `{ "coord": [x,y,z], "req": n }`.
    /// A `null` requirement is treated as absent.
    pub fn from_value(value: &Value) -> Result<Self, String> {
        match value {
            Value::Array(items) if items.len() == 2 && items[0].is_array() => {
                let coord = coord_from_value(&items[0])?;
                Self::with_optional_requirement(coord, &items[1])
            }
            Value::Array(_) => Ok(RawPlacement::Bare(coord_from_value(value)?)),
            Value::Object(map) => {
                let coord = map
                    .get("coord")
                    .ok_or_else(|| "object entry without \"coord\"".to_string())
                    .and_then(coord_from_value)?;
                match map.get("req") {
                    Some(req) => Self::with_optional_requirement(coord, req),
                    None => Ok(RawPlacement::Bare(coord)),
                }
            }
            other => Err(format!(
                "expected a coordinate or [coordinate, requirement], got {}",
                other
            )),
        }
    }

    fn with_optional_requirement(coord: CellCoord, req: &Value) -> Result<Self, String> {
        if req.is_null() {
            return Ok(RawPlacement::Bare(coord));
        }
        Ok(RawPlacement::WithRequirement(coord, requirement_from_value(req)?))
    }

    /// Normalises into the canonical pair form.
    pub fn normalize(self) -> PlacementEntry {
        match self {
            RawPlacement::Bare(coord) => PlacementEntry { coord, requirement: None },
            RawPlacement::WithRequirement(coord, req) => PlacementEntry {
                coord,
                requirement: Some(req),
            },
        }
    }
}

fn coord_from_value(value: &Value) -> Result<CellCoord, String> {
    let items = value
        .as_array()
        .filter(|items| items.len() == 3)
        .ok_or_else(|| format!("expected a 3-integer coordinate, got {}", value))?;

    let mut out = [0i32; 3];
    for (slot, item) in out.iter_mut().zip(items) {
        let n = item
            .as_f64()
            .filter(|n| n.is_finite())
            .ok_or_else(|| format!("coordinate component {} is not a number", item))?;
        if n.fract() != 0.0 || n < i32::MIN as f64 || n > i32::MAX as f64 {
            return Err(format!("coordinate component {} is not an integer", n));
        }
        *slot = n as i32;
    }
    Ok(CellCoord::from(out))
}

fn requirement_from_value(value: &Value) -> Result<u32, String> {
    let n = value
        .as_f64()
        .filter(|n| n.is_finite())
        .ok_or_else(|| format!("requirement {} is not a number", value))?;
    if n < 0.0 {
        return Err(format!("requirement {} is negative", n));
    }
    if n > u32::MAX as f64 {
        return Err(format!("requirement {} is out of range", n));
    }
    Ok(n.trunc() as u32)
}

/// A normalised catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementEntry {
    pub coord: CellCoord,
    /// `None` means "no completion tracking", not zero required
    pub requirement: Option<u32>,
}

/// One discipline's ordered catalog. Entry position is the action index.
#[derive(Debug, Clone)]
pub struct DisciplineCatalog {
    discipline: Discipline,
    entries: Vec<PlacementEntry>,
    requirements: HashMap<CellCoord, u32>,
}

impl DisciplineCatalog {
    /// Builds a catalog and its requirement lookup.
    ///
    /// Lookup is filled in catalog order, so a repeated coordinate takes the
    /// requirement (or absence of one) of its last entry.
    pub fn new(discipline: Discipline, entries: Vec<PlacementEntry>) -> Self {
        let mut requirements = HashMap::with_capacity(entries.len());
        for entry in &entries {
            match entry.requirement {
                Some(req) => {
                    requirements.insert(entry.coord, req);
                }
                None => {
                    requirements.remove(&entry.coord);
                }
            }
        }
        Self {
            discipline,
            entries,
            requirements,
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    /// The no-op sentinel: the index one past the last entry.
    pub fn noop_index(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at an action index, if in range.
    pub fn entry(&self, index: usize) -> Option<&PlacementEntry> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[PlacementEntry] {
        &self.entries
    }

    /// Tracked requirement for this discipline at a coordinate.
    pub fn requirement_at(&self, coord: CellCoord) -> Option<u32> {
        self.requirements.get(&coord).copied()
    }
}

/// The full valid-placement catalog: exactly one list per discipline.
#[derive(Debug, Clone)]
pub struct PlacementCatalog {
    lists: Vec<DisciplineCatalog>,
}

impl PlacementCatalog {
    /// Builds a catalog from raw per-discipline lists in discipline order.
    pub fn from_raw(lists: Vec<Vec<RawPlacement>>) -> Result<Self, EpisodeError> {
        if lists.len() != DISCIPLINE_COUNT {
            return Err(EpisodeError::DisciplineCount {
                expected: DISCIPLINE_COUNT,
                found: lists.len(),
            });
        }
        let lists = Discipline::ALL
            .iter()
            .zip(lists)
            .map(|(d, raw)| {
                let entries = raw.into_iter().map(RawPlacement::normalize).collect();
                DisciplineCatalog::new(*d, entries)
            })
            .collect();
        Ok(Self { lists })
    }

    /// Builds a catalog from a literal tree.
    ///
    /// The top level is either an array of 8 lists in discipline order or an
    /// object keyed by discipline name (missing disciplines are empty).
    pub fn from_value(value: &Value) -> Result<Self, EpisodeError> {
        let missing = Value::Null;
        let lists: Vec<&Value> = match value {
            Value::Array(lists) => {
                if lists.len() != DISCIPLINE_COUNT {
                    return Err(EpisodeError::DisciplineCount {
                        expected: DISCIPLINE_COUNT,
                        found: lists.len(),
                    });
                }
                lists.iter().collect()
            }
            Value::Object(map) => {
                let mut slots: Vec<&Value> = vec![&missing; DISCIPLINE_COUNT];
                for (name, list) in map {
                    let discipline: Discipline = name
                        .parse()
                        .map_err(|_| EpisodeError::UnknownDiscipline(name.clone()))?;
                    slots[discipline.index()] = list;
                }
                slots
            }
            _ => {
                return Err(EpisodeError::shape(
                    "valid",
                    "top-level must be an array of 8 discipline lists",
                ))
            }
        };

        let mut raw = Vec::with_capacity(DISCIPLINE_COUNT);
        for (i, list) in lists.into_iter().enumerate() {
            let items: &[Value] = match list {
                Value::Null => &[],
                Value::Array(items) => items,
                _ => {
                    return Err(EpisodeError::shape(
                        "valid",
                        format!("discipline index {} is not a list", i),
                    ))
                }
            };
            let entries = items
                .iter()
                .enumerate()
                .map(|(j, item)| {
                    RawPlacement::from_value(item)
                        .map_err(|reason| EpisodeError::invalid_entry(i, j, reason))
                })
                .collect::<Result<Vec<_>, _>>()?;
            raw.push(entries);
        }
        Self::from_raw(raw)
    }

    /// Catalog for one discipline.
    pub fn discipline(&self, discipline: Discipline) -> &DisciplineCatalog {
        &self.lists[discipline.index()]
    }

    /// All discipline catalogs in fixed order.
    pub fn iter(&self) -> impl Iterator<Item = &DisciplineCatalog> {
        self.lists.iter()
    }

    /// Total number of catalog entries across disciplines.
    pub fn total_entries(&self) -> usize {
        self.lists.iter().map(DisciplineCatalog::len).sum()
    }
}

/// One recorded step: an action index per discipline, in discipline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRow(pub [i64; DISCIPLINE_COUNT]);

impl ActionRow {
    /// Action index recorded for a discipline.
    pub fn get(&self, discipline: Discipline) -> i64 {
        self.0[discipline.index()]
    }
}

/// The recorded step-count x 8 action matrix.
#[derive(Debug, Clone, Default)]
pub struct ActionMatrix {
    rows: Vec<ActionRow>,
}

impl ActionMatrix {
    pub fn from_rows(rows: Vec<ActionRow>) -> Self {
        Self { rows }
    }

    /// Validates a literal tree as a 2D array of 8-wide numeric rows.
    ///
    /// Any bad row rejects the whole dataset. Entries are truncated toward zero.
    pub fn from_value(value: &Value) -> Result<Self, EpisodeError> {
        let rows = value
            .as_array()
            .filter(|rows| !rows.is_empty() && rows[0].is_array())
            .ok_or_else(|| {
                EpisodeError::shape(
                    "recorded_actions",
                    "expected a 2D array (list of 8-length rows)",
                )
            })?;

        let mut out = Vec::with_capacity(rows.len());
        for (i, row) in rows.iter().enumerate() {
            let entries = match row.as_array() {
                Some(entries) if entries.len() == DISCIPLINE_COUNT => entries,
                Some(entries) => {
                    return Err(EpisodeError::RowLength {
                        row: i,
                        expected: DISCIPLINE_COUNT,
                        found: entries.len(),
                    })
                }
                None => {
                    return Err(EpisodeError::RowLength {
                        row: i,
                        expected: DISCIPLINE_COUNT,
                        found: 0,
                    })
                }
            };

            let mut parsed = [0i64; DISCIPLINE_COUNT];
            for (j, entry) in entries.iter().enumerate() {
                let n = entry
                    .as_f64()
                    .filter(|n| n.is_finite())
                    .ok_or(EpisodeError::NonNumeric { row: i, column: j })?;
                parsed[j] = n.trunc() as i64;
            }
            out.push(ActionRow(parsed));
        }
        Ok(Self { rows: out })
    }

    /// Number of recorded steps.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, step: usize) -> Option<&ActionRow> {
        self.rows.get(step)
    }

    pub fn rows(&self) -> &[ActionRow] {
        &self.rows
    }
}
