use super::notation::{self, NotationError};
use super::operation::{self, OperationKey, SymmetryOperation};
use itertools::Itertools;
use nalgebra::{Matrix4, Vector3};
use phf::{Map, phf_map};
use std::collections::{HashMap, VecDeque};
use thiserror::Error;
use tracing::{debug, trace};

/// Upper bound on the order of any closed group; 1536 covers a primitive-cell group of order 48
/// expanded into a 32-fold supercell.
const MAX_GROUP_ORDER: usize = 1536;

/// Obverse hexagonal to rhombohedral basis change.
pub const RHOMBOHEDRAL: &str = "2a/3+b/3+c/3,-a/3+b/3+c/3,-a/3-2b/3+c/3";
const MONOCLINIC_UNIQUE_C: &str = "c,a,b";

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("Unknown group '{0}'")]
    Unknown(String),
    #[error("Invalid notation in '{token}': {source}")]
    Notation {
        token: String,
        #[source]
        source: NotationError,
    },
    #[error("Generators of '{0}' do not close into a finite group")]
    NotFinite(String),
    #[error("Setting transform of '{0}' is singular")]
    Singular(String),
    #[error("'{0}' contains translations and cannot describe a finite model")]
    NotPointGroup(String),
    #[error("Operations of '{0}' are not isometries on orthogonal or hexagonal axes")]
    NoCartesianFrame(String),
}

/// Lattice centering of a conventional cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Centering {
    P,
    A,
    B,
    C,
    I,
    F,
    /// Rhombohedral centering of a hexagonal cell, obverse setting.
    R,
}

impl Centering {
    /// Non-zero centering translations.
    pub fn translations(&self) -> Vec<Vector3<f64>> {
        let h = 0.5;
        let t = 1.0 / 3.0;
        match self {
            Centering::P => vec![],
            Centering::A => vec![Vector3::new(0.0, h, h)],
            Centering::B => vec![Vector3::new(h, 0.0, h)],
            Centering::C => vec![Vector3::new(h, h, 0.0)],
            Centering::I => vec![Vector3::new(h, h, h)],
            Centering::F => vec![
                Vector3::new(0.0, h, h),
                Vector3::new(h, 0.0, h),
                Vector3::new(h, h, 0.0),
            ],
            Centering::R => vec![
                Vector3::new(2.0 * t, t, t),
                Vector3::new(t, 2.0 * t, 2.0 * t),
            ],
        }
    }
}

/// A space group of the built-in table, in its standard setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupEntry {
    pub number: u16,
    pub symbol: &'static str,
    pub centering: Centering,
    pub generators: &'static [&'static str],
}

const fn entry(
    number: u16,
    symbol: &'static str,
    centering: Centering,
    generators: &'static [&'static str],
) -> GroupEntry {
    GroupEntry {
        number,
        symbol,
        centering,
        generators,
    }
}

const CUBIC_M3M: &[&str] = &["-x,-y,z", "-x,y,-z", "z,x,y", "y,x,-z", "-x,-y,-z"];
const TETRAGONAL_4MMM: &[&str] = &["-y,x,z", "x,-y,-z", "-x,-y,-z"];

static GROUPS: &[GroupEntry] = &[
    entry(1, "P 1", Centering::P, &[]),
    entry(2, "P -1", Centering::P, &["-x,-y,-z"]),
    entry(3, "P 2", Centering::P, &["-x,y,-z"]),
    entry(4, "P 21", Centering::P, &["-x,y+1/2,-z"]),
    entry(5, "C 2", Centering::C, &["-x,y,-z"]),
    entry(6, "P m", Centering::P, &["x,-y,z"]),
    entry(7, "P c", Centering::P, &["x,-y,z+1/2"]),
    entry(10, "P 2/m", Centering::P, &["-x,y,-z", "-x,-y,-z"]),
    entry(14, "P 21/c", Centering::P, &["-x,y+1/2,-z+1/2", "-x,-y,-z"]),
    entry(15, "C 2/c", Centering::C, &["-x,y,-z+1/2", "-x,-y,-z"]),
    entry(16, "P 2 2 2", Centering::P, &["-x,-y,z", "-x,y,-z"]),
    entry(19, "P 21 21 21", Centering::P, &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z+1/2"]),
    entry(47, "P m m m", Centering::P, &["-x,-y,z", "-x,y,-z", "-x,-y,-z"]),
    entry(62, "P n m a", Centering::P, &["-x+1/2,-y,z+1/2", "-x,y+1/2,-z", "-x,-y,-z"]),
    entry(75, "P 4", Centering::P, &["-y,x,z"]),
    entry(83, "P 4/m", Centering::P, &["-y,x,z", "-x,-y,-z"]),
    entry(99, "P 4 m m", Centering::P, &["-y,x,z", "x,-y,z"]),
    entry(123, "P 4/m m m", Centering::P, TETRAGONAL_4MMM),
    entry(139, "I 4/m m m", Centering::I, TETRAGONAL_4MMM),
    entry(143, "P 3", Centering::P, &["-y,x-y,z"]),
    entry(146, "R 3", Centering::R, &["-y,x-y,z"]),
    entry(147, "P -3", Centering::P, &["-y,x-y,z", "-x,-y,-z"]),
    entry(148, "R -3", Centering::R, &["-y,x-y,z", "-x,-y,-z"]),
    entry(166, "R -3 m", Centering::R, &["-y,x-y,z", "y,x,-z", "-x,-y,-z"]),
    entry(168, "P 6", Centering::P, &["-y,x-y,z", "-x,-y,z"]),
    entry(175, "P 6/m", Centering::P, &["-y,x-y,z", "-x,-y,z", "-x,-y,-z"]),
    entry(191, "P 6/m m m", Centering::P, &["-y,x-y,z", "-x,-y,z", "y,x,-z", "-x,-y,-z"]),
    entry(195, "P 2 3", Centering::P, &["-x,-y,z", "-x,y,-z", "z,x,y"]),
    entry(200, "P m -3", Centering::P, &["-x,-y,z", "-x,y,-z", "z,x,y", "-x,-y,-z"]),
    entry(221, "P m -3 m", Centering::P, CUBIC_M3M),
    entry(225, "F m -3 m", Centering::F, CUBIC_M3M),
    entry(229, "I m -3 m", Centering::I, CUBIC_M3M),
];

/// Hermann-Mauguin symbols, normalized by [`normalize_symbol`], to group numbers.
static SYMBOLS: Map<&'static str, u16> = phf_map! {
    "P1" => 1, "P-1" => 2,
    "P2" => 3, "P121" => 3, "P21" => 4, "P1211" => 4, "C2" => 5, "C121" => 5,
    "PM" => 6, "P1M1" => 6, "PC" => 7, "P1C1" => 7,
    "P2/M" => 10, "P12/M1" => 10, "P21/C" => 14, "P121/C1" => 14, "C2/C" => 15, "C12/C1" => 15,
    "P222" => 16, "P212121" => 19, "PMMM" => 47, "P2/M2/M2/M" => 47,
    "PNMA" => 62, "P21/N21/M21/A" => 62,
    "P4" => 75, "P4/M" => 83, "P4MM" => 99, "P4/MMM" => 123, "P4/M2/M2/M" => 123,
    "I4/MMM" => 139, "I4/M2/M2/M" => 139,
    "P3" => 143, "R3" => 146, "P-3" => 147, "R-3" => 148, "R-3M" => 166, "R-32/M" => 166,
    "P6" => 168, "P6/M" => 175, "P6/MMM" => 191, "P6/M2/M2/M" => 191,
    "P23" => 195, "PM-3" => 200, "P2/M-3" => 200,
    "PM-3M" => 221, "P4/M-32/M" => 221, "FM-3M" => 225, "F4/M-32/M" => 225,
    "IM-3M" => 229, "I4/M-32/M" => 229,
};

/// A crystallographic point group, with generators on its conventional axes.
///
/// The principal axis is `z`; trigonal and hexagonal groups use hexagonal axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointGroupEntry {
    pub symbol: &'static str,
    pub generators: &'static [&'static str],
}

const fn point(symbol: &'static str, generators: &'static [&'static str]) -> PointGroupEntry {
    PointGroupEntry { symbol, generators }
}

/// The 32 point groups keyed by normalized Hermann-Mauguin symbol.
static POINT_GROUPS: Map<&'static str, PointGroupEntry> = phf_map! {
    "1" => point("1", &[]),
    "-1" => point("-1", &["-x,-y,-z"]),
    "2" => point("2", &["-x,-y,z"]),
    "M" => point("m", &["x,y,-z"]),
    "2/M" => point("2/m", &["-x,-y,z", "-x,-y,-z"]),
    "222" => point("222", &["-x,-y,z", "x,-y,-z"]),
    "MM2" => point("mm2", &["-x,-y,z", "x,-y,z"]),
    "MMM" => point("mmm", &["-x,-y,z", "x,-y,-z", "-x,-y,-z"]),
    "4" => point("4", &["-y,x,z"]),
    "-4" => point("-4", &["y,-x,-z"]),
    "4/M" => point("4/m", &["-y,x,z", "-x,-y,-z"]),
    "422" => point("422", &["-y,x,z", "x,-y,-z"]),
    "4MM" => point("4mm", &["-y,x,z", "x,-y,z"]),
    "-42M" => point("-42m", &["y,-x,-z", "x,-y,-z"]),
    "4/MMM" => point("4/mmm", TETRAGONAL_4MMM),
    "3" => point("3", &["-y,x-y,z"]),
    "-3" => point("-3", &["-y,x-y,z", "-x,-y,-z"]),
    "32" => point("32", &["-y,x-y,z", "y,x,-z"]),
    "3M" => point("3m", &["-y,x-y,z", "-y,-x,z"]),
    "-3M" => point("-3m", &["-y,x-y,z", "y,x,-z", "-x,-y,-z"]),
    "6" => point("6", &["-y,x-y,z", "-x,-y,z"]),
    "-6" => point("-6", &["-y,x-y,z", "x,y,-z"]),
    "6/M" => point("6/m", &["-y,x-y,z", "-x,-y,z", "-x,-y,-z"]),
    "622" => point("622", &["-y,x-y,z", "-x,-y,z", "y,x,-z"]),
    "6MM" => point("6mm", &["-y,x-y,z", "-x,-y,z", "-y,-x,z"]),
    "-6M2" => point("-6m2", &["-y,x-y,z", "x,y,-z", "-y,-x,z"]),
    "6/MMM" => point("6/mmm", &["-y,x-y,z", "-x,-y,z", "y,x,-z", "-x,-y,-z"]),
    "23" => point("23", &["-x,-y,z", "-x,y,-z", "z,x,y"]),
    "M-3" => point("m-3", &["-x,-y,z", "-x,y,-z", "z,x,y", "-x,-y,-z"]),
    "432" => point("432", &["-x,-y,z", "-x,y,-z", "z,x,y", "y,x,-z"]),
    "-43M" => point("-43m", &["-x,-y,z", "-x,y,-z", "z,x,y", "y,x,z"]),
    "M-3M" => point("m-3m", CUBIC_M3M),
};

/// Schoenflies symbols, normalized, to their Hermann-Mauguin keys in [`POINT_GROUPS`].
static SCHOENFLIES: Map<&'static str, &'static str> = phf_map! {
    "C1" => "1", "CI" => "-1", "C2" => "2", "CS" => "M", "C2H" => "2/M",
    "D2" => "222", "C2V" => "MM2", "D2H" => "MMM",
    "C4" => "4", "S4" => "-4", "C4H" => "4/M", "D4" => "422", "C4V" => "4MM", "D2D" => "-42M",
    "D4H" => "4/MMM",
    "C3" => "3", "S6" => "-3", "C3I" => "-3", "D3" => "32", "C3V" => "3M", "D3D" => "-3M",
    "C6" => "6", "C3H" => "-6", "C6H" => "6/M", "D6" => "622", "C6V" => "6MM", "D3H" => "-6M2",
    "D6H" => "6/MMM",
    "T" => "23", "TH" => "M-3", "O" => "432", "TD" => "-43M", "OH" => "M-3M",
};

/// A non-standard setting of a table group, addressed by its own symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedSetting {
    pub number: u16,
    pub name: &'static str,
    pub transform: &'static str,
}

const fn setting(number: u16, name: &'static str, transform: &'static str) -> NamedSetting {
    NamedSetting {
        number,
        name,
        transform,
    }
}

static SETTINGS: Map<&'static str, NamedSetting> = phf_map! {
    "P112" => setting(3, "P 1 1 2", MONOCLINIC_UNIQUE_C),
    "P1121" => setting(4, "P 1 1 21", MONOCLINIC_UNIQUE_C),
    "A112" => setting(5, "A 1 1 2", MONOCLINIC_UNIQUE_C),
    "P11M" => setting(6, "P 1 1 m", MONOCLINIC_UNIQUE_C),
    "P11A" => setting(7, "P 1 1 a", MONOCLINIC_UNIQUE_C),
    "P112/M" => setting(10, "P 1 1 2/m", MONOCLINIC_UNIQUE_C),
    "P1121/A" => setting(14, "P 1 1 21/a", MONOCLINIC_UNIQUE_C),
    "A112/A" => setting(15, "A 1 1 2/a", MONOCLINIC_UNIQUE_C),
    "R3:R" => setting(146, "R 3 :r", RHOMBOHEDRAL),
    "R-3:R" => setting(148, "R -3 :r", RHOMBOHEDRAL),
    "R-3M:R" => setting(166, "R -3 m :r", RHOMBOHEDRAL),
    "R3:H" => setting(146, "R 3 :h", "a,b,c"),
    "R-3:H" => setting(148, "R -3 :h", "a,b,c"),
    "R-3M:H" => setting(166, "R -3 m :h", "a,b,c"),
};

/// Uppercases a symbol and strips spaces and underscores, so `P 21/c` and `p2_1/c` both
/// become `P21/C`.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_uppercase)
        .collect()
}

/// All groups of the built-in table, ordered by number.
pub fn known_groups() -> &'static [GroupEntry] {
    GROUPS
}

pub fn group_entry(number: u16) -> Option<&'static GroupEntry> {
    GROUPS.iter().find(|entry| entry.number == number)
}

/// All named settings, in no particular order.
pub fn named_settings() -> impl Iterator<Item = &'static NamedSetting> {
    SETTINGS.values()
}

/// A fully closed group of operations in a concrete setting.
///
/// `setting` is the basis change (columns are the new basis vectors in terms of the standard
/// basis, last column the origin shift) that carries the table group into this setting. Groups
/// built from raw generators carry the identity setting.
#[derive(Debug, Clone)]
pub struct SpaceGroup {
    identifier: String,
    number: Option<u16>,
    setting: Matrix4<f64>,
    fixed_setting: bool,
    operations: Vec<SymmetryOperation>,
}

impl SpaceGroup {
    /// Resolves any group descriptor.
    ///
    /// Accepted forms are a plain number (`14`), a Hermann-Mauguin symbol (`P 21/c`), a named
    /// setting (`P 1 1 21/a`, `R 3 :r`), a number with an explicit setting (`14:c,a,b`,
    /// `166:r`) and bracketed generators (`[-x,y+1/2,-z;-x,-y,-z]`).
    pub fn resolve(token: &str) -> Result<Self, GroupError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(GroupError::Unknown(token.to_string()));
        }

        if token.starts_with('[') && !token.starts_with("[[") {
            let inner = token
                .strip_prefix('[')
                .and_then(|t| t.strip_suffix(']'))
                .ok_or_else(|| GroupError::Unknown(token.to_string()))?;
            return Self::from_generator_notation(inner);
        }

        if let Ok(number) = token.parse::<u16>() {
            return Self::from_number(number);
        }

        if let Some((head, tail)) = token.split_once(':') {
            if let Ok(number) = head.trim().parse::<u16>() {
                return Self::from_number_with_setting(number, tail.trim(), token);
            }
        }

        let normalized = normalize_symbol(token);
        if let Some(named) = SETTINGS.get(normalized.as_str()) {
            return Self::from_named_setting(named);
        }
        match SYMBOLS.get(normalized.as_str()) {
            Some(&number) => Self::from_number(number),
            None => Err(GroupError::Unknown(token.to_string())),
        }
    }

    /// Resolves a group descriptor for a model without a lattice.
    ///
    /// Hermann-Mauguin (`2/m`, `-3m`) and Schoenflies (`C2h`, `D3d`) point-group symbols are
    /// looked up first, so a bare number always names a point group and never a space-group
    /// number. Anything else goes through [`SpaceGroup::resolve`].
    pub fn resolve_point_group(token: &str) -> Result<Self, GroupError> {
        let token = token.trim();
        let normalized = normalize_symbol(token);
        let key = SCHOENFLIES
            .get(normalized.as_str())
            .copied()
            .unwrap_or(normalized.as_str());
        if let Some(entry) = POINT_GROUPS.get(key) {
            let generators = entry
                .generators
                .iter()
                .map(|g| notation::parse_xyz(g))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|source| GroupError::Notation {
                    token: token.to_string(),
                    source,
                })?;
            let operations =
                close(&generators).ok_or_else(|| GroupError::NotFinite(entry.symbol.to_string()))?;
            return Ok(Self {
                identifier: entry.symbol.to_string(),
                number: None,
                setting: Matrix4::identity(),
                fixed_setting: false,
                operations,
            });
        }
        if !token.is_empty() && token.chars().all(|c| c.is_ascii_digit()) {
            return Err(GroupError::Unknown(token.to_string()));
        }
        Self::resolve(token)
    }

    /// The group containing only the identity, without any lattice.
    pub fn trivial() -> Self {
        Self {
            identifier: "P 1".to_string(),
            number: Some(1),
            setting: Matrix4::identity(),
            fixed_setting: false,
            operations: vec![SymmetryOperation::identity()],
        }
    }

    /// Builds a table group in its standard setting.
    pub fn from_number(number: u16) -> Result<Self, GroupError> {
        let entry = group_entry(number).ok_or_else(|| GroupError::Unknown(number.to_string()))?;
        let operations = close_table_group(entry)?;
        Ok(Self {
            identifier: entry.symbol.to_string(),
            number: Some(number),
            setting: Matrix4::identity(),
            fixed_setting: false,
            operations,
        })
    }

    fn from_named_setting(named: &NamedSetting) -> Result<Self, GroupError> {
        let transform = notation::parse_basis_change(named.transform).map_err(|source| {
            GroupError::Notation {
                token: named.name.to_string(),
                source,
            }
        })?;
        Self::from_number(named.number)?.in_setting(&transform, named.name, true)
    }

    fn from_number_with_setting(number: u16, tail: &str, token: &str) -> Result<Self, GroupError> {
        let notation_error = |source| GroupError::Notation {
            token: token.to_string(),
            source,
        };
        let is_rhombohedral = group_entry(number).is_some_and(|e| e.centering == Centering::R);
        let transform = match tail.to_ascii_lowercase().as_str() {
            "r" if is_rhombohedral => {
                notation::parse_basis_change(RHOMBOHEDRAL).map_err(notation_error)?
            }
            "h" if is_rhombohedral => Matrix4::identity(),
            _ if tail.starts_with("[[") => notation::parse_matrix(tail).map_err(notation_error)?,
            _ => notation::parse_basis_change(tail).map_err(notation_error)?,
        };
        let identifier = format!("{}:{}", number, notation::format_basis_change(&transform));
        Self::from_number(number)?.in_setting(&transform, &identifier, true)
    }

    /// Builds a group by closing `;`-separated Jones-faithful generators.
    ///
    /// When the closed group coincides with a table group in its standard setting, the result
    /// carries that group's number and symbol.
    pub fn from_generator_notation(generators: &str) -> Result<Self, GroupError> {
        let matrices = generators
            .split(';')
            .map(str::trim)
            .filter(|g| !g.is_empty())
            .map(notation::parse_xyz)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| GroupError::Notation {
                token: generators.to_string(),
                source,
            })?;

        let identifier = format!(
            "[{}]",
            matrices.iter().map(notation::format_xyz).join(";")
        );
        let operations =
            close(&matrices).ok_or_else(|| GroupError::NotFinite(identifier.clone()))?;

        let keys = operation_keys(&operations);
        for entry in GROUPS {
            let table_ops = close_table_group(entry)?;
            if table_ops.len() == operations.len() && operation_keys(&table_ops) == keys {
                debug!(number = entry.number, "Generators match a table group.");
                return Ok(Self {
                    identifier: entry.symbol.to_string(),
                    number: Some(entry.number),
                    setting: Matrix4::identity(),
                    fixed_setting: false,
                    operations,
                });
            }
        }

        Ok(Self {
            identifier,
            number: None,
            setting: Matrix4::identity(),
            fixed_setting: false,
            operations,
        })
    }

    /// Re-expresses this group in the basis given by `transform`, composed on top of the
    /// current setting.
    ///
    /// Every operation `W` becomes `T^-1 * W * T`. The old unit translations are added as
    /// generators, so a transform to a larger cell yields the corresponding extra translations.
    pub fn in_setting(
        &self,
        transform: &Matrix4<f64>,
        identifier: &str,
        fixed: bool,
    ) -> Result<Self, GroupError> {
        let inverse = operation::invert_affine(transform)
            .ok_or_else(|| GroupError::Singular(identifier.to_string()))?;

        let mut generators: Vec<Matrix4<f64>> = self
            .operations
            .iter()
            .map(|op| inverse * op.matrix() * transform)
            .collect();
        for axis in 0..3 {
            let mut shift = Vector3::zeros();
            shift[axis] = 1.0;
            generators.push(inverse * operation::translation(&shift) * transform);
        }

        let operations =
            close(&generators).ok_or_else(|| GroupError::NotFinite(identifier.to_string()))?;
        trace!(
            identifier,
            order = operations.len(),
            "Transformed group into a new setting."
        );

        Ok(Self {
            identifier: identifier.to_string(),
            number: self.number,
            setting: self.setting * transform,
            fixed_setting: fixed,
            operations,
        })
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Table number, or `None` for generator-built groups that match no table entry.
    pub fn number(&self) -> Option<u16> {
        self.number
    }

    pub fn setting(&self) -> &Matrix4<f64> {
        &self.setting
    }

    /// Whether the setting was requested explicitly and must not be silently changed.
    pub fn is_fixed_setting(&self) -> bool {
        self.fixed_setting
    }

    pub fn operations(&self) -> &[SymmetryOperation] {
        &self.operations
    }

    pub fn operation(&self, index: usize) -> Option<&SymmetryOperation> {
        self.operations.get(index)
    }

    pub fn order(&self) -> usize {
        self.operations.len()
    }
}

fn close_table_group(entry: &GroupEntry) -> Result<Vec<SymmetryOperation>, GroupError> {
    let mut generators = entry
        .generators
        .iter()
        .map(|g| notation::parse_xyz(g))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|source| GroupError::Notation {
            token: entry.symbol.to_string(),
            source,
        })?;
    generators.extend(
        entry
            .centering
            .translations()
            .iter()
            .map(operation::translation),
    );
    close(&generators).ok_or_else(|| GroupError::NotFinite(entry.symbol.to_string()))
}

/// Closes a generator set under multiplication, with translations reduced into `[0, 1)`.
///
/// The identity is always operation `0`; the rest follow in breadth-first discovery order.
/// Returns `None` if the group grows beyond [`MAX_GROUP_ORDER`].
fn close(generators: &[Matrix4<f64>]) -> Option<Vec<SymmetryOperation>> {
    let generators: Vec<Matrix4<f64>> =
        generators.iter().map(operation::reduce_translation).collect();
    let identity = Matrix4::identity();

    let mut seen: HashMap<OperationKey, usize> = HashMap::new();
    let mut operations = vec![identity];
    seen.insert(OperationKey::new(&identity), 0);
    let mut queue = VecDeque::from([identity]);

    while let Some(current) = queue.pop_front() {
        for generator in &generators {
            let product = operation::reduce_translation(&(generator * current));
            let key = OperationKey::new(&product);
            if seen.contains_key(&key) {
                continue;
            }
            if operations.len() >= MAX_GROUP_ORDER {
                return None;
            }
            seen.insert(key, operations.len());
            operations.push(product);
            queue.push_back(product);
        }
    }

    Some(
        operations
            .into_iter()
            .enumerate()
            .map(|(index, matrix)| SymmetryOperation::new(index, matrix))
            .collect(),
    )
}

fn operation_keys(operations: &[SymmetryOperation]) -> Vec<OperationKey> {
    operations
        .iter()
        .map(|op| OperationKey::new(op.matrix()))
        .sorted()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::utils::geometry;
    use nalgebra::Point3;

    fn contains_op(group: &SpaceGroup, xyz: &str) -> bool {
        let key = OperationKey::new(&notation::parse_xyz(xyz).unwrap());
        group
            .operations()
            .iter()
            .any(|op| OperationKey::new(op.matrix()) == key)
    }

    #[test]
    fn table_groups_close_to_expected_orders() {
        let expected = [
            (1, 1),
            (2, 2),
            (4, 2),
            (5, 4),
            (14, 4),
            (15, 8),
            (19, 4),
            (62, 8),
            (123, 16),
            (139, 32),
            (146, 9),
            (166, 36),
            (191, 24),
            (221, 48),
            (225, 192),
            (229, 96),
        ];
        for (number, order) in expected {
            let group = SpaceGroup::from_number(number).unwrap();
            assert_eq!(group.order(), order, "group {number}");
            assert!(group.operations()[0].is_identity());
        }
    }

    #[test]
    fn every_table_group_closes() {
        for entry in known_groups() {
            let group = SpaceGroup::from_number(entry.number).unwrap();
            assert!(group.order() >= 1);
            assert_eq!(group.number(), Some(entry.number));
        }
    }

    #[test]
    fn closed_operations_are_indexed_in_order() {
        let group = SpaceGroup::from_number(62).unwrap();
        for (i, op) in group.operations().iter().enumerate() {
            assert_eq!(op.index(), i);
        }
    }

    #[test]
    fn resolve_accepts_numbers_and_symbols() {
        assert_eq!(SpaceGroup::resolve("14").unwrap().number(), Some(14));
        assert_eq!(SpaceGroup::resolve("P 21/c").unwrap().number(), Some(14));
        assert_eq!(SpaceGroup::resolve("p2_1/c").unwrap().number(), Some(14));
        assert_eq!(SpaceGroup::resolve("F m -3 m").unwrap().number(), Some(225));
        assert!(matches!(
            SpaceGroup::resolve("Q 7"),
            Err(GroupError::Unknown(_))
        ));
        assert!(matches!(SpaceGroup::resolve("  "), Err(GroupError::Unknown(_))));
        assert!(matches!(SpaceGroup::resolve("13"), Err(GroupError::Unknown(_))));
    }

    #[test]
    fn resolve_named_monoclinic_setting() {
        let group = SpaceGroup::resolve("P 1 1 21/a").unwrap();
        assert_eq!(group.number(), Some(14));
        assert_eq!(group.identifier(), "P 1 1 21/a");
        assert!(group.is_fixed_setting());
        assert_eq!(group.order(), 4);
        assert!(contains_op(&group, "-x+1/2,-y,z+1/2"));
        assert!(contains_op(&group, "x+1/2,y,-z+1/2"));
    }

    #[test]
    fn resolve_explicit_setting_matches_named_setting() {
        let explicit = SpaceGroup::resolve("14:c,a,b").unwrap();
        let named = SpaceGroup::resolve("P 1 1 21/a").unwrap();
        assert_eq!(operation_keys(explicit.operations()), operation_keys(named.operations()));
        assert_eq!(explicit.identifier(), "14:c,a,b");
        assert!(explicit.is_fixed_setting());
    }

    #[test]
    fn rhombohedral_setting_removes_centering() {
        let hexagonal = SpaceGroup::resolve("R 3 :h").unwrap();
        let rhombohedral = SpaceGroup::resolve("R 3 :r").unwrap();
        assert_eq!(hexagonal.order(), 9);
        assert_eq!(rhombohedral.order(), 3);
        assert!(contains_op(&rhombohedral, "z,x,y"));

        let by_number = SpaceGroup::resolve("166:r").unwrap();
        assert_eq!(by_number.order(), 12);
    }

    #[test]
    fn generators_identify_table_groups() {
        let group = SpaceGroup::resolve("[-x,y+1/2,-z]").unwrap();
        assert_eq!(group.number(), Some(4));
        assert_eq!(group.identifier(), "P 21");

        let unknown = SpaceGroup::resolve("[-x,-y,z; x,y,-z]").unwrap();
        assert_eq!(unknown.number(), None);
        assert_eq!(unknown.order(), 4);
        assert_eq!(unknown.identifier(), "[-x,-y,z;x,y,-z]");
    }

    #[test]
    fn supercell_setting_adds_translations() {
        let group = SpaceGroup::from_number(1)
            .unwrap()
            .in_setting(&notation::parse_basis_change("a,b,2c").unwrap(), "1:a,b,2c", true)
            .unwrap();
        assert_eq!(group.order(), 2);
        assert!(contains_op(&group, "x,y,z+1/2"));
    }

    #[test]
    fn singular_setting_is_rejected() {
        let singular = notation::parse_matrix("[[1,0,0],[0,1,0],[0,0,0]]").unwrap();
        let result = SpaceGroup::from_number(2).unwrap().in_setting(&singular, "bad", true);
        assert!(matches!(result, Err(GroupError::Singular(_))));
    }

    #[test]
    fn origin_shift_moves_inversion_centre() {
        let shifted = SpaceGroup::from_number(2)
            .unwrap()
            .in_setting(&notation::parse_basis_change("a,b,c;1/4,0,0").unwrap(), "2:shift", true)
            .unwrap();
        let inversion = &shifted.operations()[1];
        let centre = Point3::new(-0.25, 0.0, 0.0);
        let image = inversion.apply(&centre);
        assert!(geometry::fractional_distance_squared(&image, &centre, true) < 1e-20);
        assert!(geometry::fractional_distance_squared(&image, &centre, false) > 0.5);
    }

    #[test]
    fn point_group_symbols_are_not_space_group_numbers() {
        let twofold = SpaceGroup::resolve_point_group("2").unwrap();
        assert_eq!(twofold.identifier(), "2");
        assert_eq!(twofold.number(), None);
        assert_eq!(twofold.order(), 2);
        assert!(contains_op(&twofold, "-x,-y,z"));

        assert_eq!(SpaceGroup::resolve("2").unwrap().identifier(), "P -1");
    }

    #[test]
    fn point_groups_close_to_expected_orders() {
        let expected = [
            ("1", 1),
            ("m", 2),
            ("mm2", 4),
            ("4/mmm", 16),
            ("-42m", 8),
            ("3", 3),
            ("-3m", 12),
            ("-6m2", 12),
            ("6/mmm", 24),
            ("-43m", 24),
            ("m-3m", 48),
        ];
        for (symbol, order) in expected {
            let group = SpaceGroup::resolve_point_group(symbol).unwrap();
            assert_eq!(group.order(), order, "point group {symbol}");
            assert!(group.operations().iter().all(|op| op.translation().norm() == 0.0));
        }
    }

    #[test]
    fn schoenflies_symbols_resolve_to_point_groups() {
        assert_eq!(SpaceGroup::resolve_point_group("C2h").unwrap().identifier(), "2/m");
        assert_eq!(SpaceGroup::resolve_point_group("D3d").unwrap().identifier(), "-3m");
        assert_eq!(SpaceGroup::resolve_point_group("Oh").unwrap().order(), 48);
        assert_eq!(SpaceGroup::resolve_point_group("Cs").unwrap().identifier(), "m");
    }

    #[test]
    fn point_group_resolution_falls_back_to_symbols_but_not_numbers() {
        assert_eq!(SpaceGroup::resolve_point_group("P 2").unwrap().number(), Some(3));
        assert_eq!(SpaceGroup::resolve_point_group("[-x,-y,-z]").unwrap().order(), 2);
        assert!(matches!(
            SpaceGroup::resolve_point_group("143"),
            Err(GroupError::Unknown(_))
        ));
    }

    #[test]
    fn normalize_symbol_strips_decoration() {
        assert_eq!(normalize_symbol("p 2_1/c"), "P21/C");
        assert_eq!(normalize_symbol("R -3 m :r"), "R-3M:R");
    }
}
