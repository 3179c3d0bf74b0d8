use crate::core::models::cell::{CellError, UnitCell};
use crate::core::symmetry::groups::{GroupError, RHOMBOHEDRAL, SpaceGroup};
use crate::core::symmetry::notation::{self, NotationError};
use crate::core::symmetry::operation;
use crate::core::symmetry::subgroups::{self, SubgroupIndex};
use nalgebra::Matrix4;
use thiserror::Error;
use tracing::{debug, instrument, trace};

const SINGULAR_DETERMINANT: f64 = 1e-9;
const BASIS_CHANGE_CHARS: &str = "abc0123456789+-*/., ;";

#[derive(Debug, Error)]
pub enum PathwayError {
    #[error("Pathway is empty")]
    Empty,
    #[error("Unknown group '{token}': {source}")]
    UnknownGroup {
        token: String,
        #[source]
        source: GroupError,
    },
    #[error("Malformed transform '{token}': {source}")]
    Notation {
        token: String,
        #[source]
        source: NotationError,
    },
    #[error("Transform '{0}' is not invertible")]
    NonInvertible(String),
    #[error("Transform does not reach the fixed setting of '{token}'")]
    SettingMismatch { token: String },
    #[error("No subgroup relation between '{from}' and '{to}'")]
    NoRelation { from: String, to: String },
    #[error("Relationship '{0}' is not followed by a group")]
    DanglingRelationship(String),
    #[error("Unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("Cell could not be transformed: {0}")]
    Cell(#[from] CellError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    Sub(usize),
    Super(usize),
    Infer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shorthand {
    Rhombohedral,
    Hexagonal,
    InverseRhombohedral,
    InverseHexagonal,
}

impl Shorthand {
    pub fn matrix(&self) -> Result<Matrix4<f64>, PathwayError> {
        let rhombohedral =
            notation::parse_basis_change(RHOMBOHEDRAL).map_err(|source| PathwayError::Notation {
                token: RHOMBOHEDRAL.to_string(),
                source,
            })?;
        let hexagonal = operation::invert_affine(&rhombohedral)
            .ok_or_else(|| PathwayError::NonInvertible(RHOMBOHEDRAL.to_string()))?;
        Ok(match self {
            Self::Rhombohedral | Self::InverseHexagonal => rhombohedral,
            Self::Hexagonal | Self::InverseRhombohedral => hexagonal,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathwayToken {
    Group(String),
    Generators(String),
    Transform { matrix: Matrix4<f64>, text: String },
    Relationship(Relationship),
    Shorthand(Shorthand),
}

impl PathwayToken {
    pub fn classify(token: &str) -> Result<Self, PathwayError> {
        let token = token.trim();
        let lower = token.to_ascii_lowercase();

        match lower.as_str() {
            "" => return Ok(Self::Relationship(Relationship::Infer)),
            "sub" => return Ok(Self::Relationship(Relationship::Sub(1))),
            "super" => return Ok(Self::Relationship(Relationship::Super(1))),
            "r" => return Ok(Self::Shorthand(Shorthand::Rhombohedral)),
            "h" => return Ok(Self::Shorthand(Shorthand::Hexagonal)),
            "!r" => return Ok(Self::Shorthand(Shorthand::InverseRhombohedral)),
            "!h" => return Ok(Self::Shorthand(Shorthand::InverseHexagonal)),
            _ => {}
        }

        if let Some(relationship) = parse_relationship(&lower, token)? {
            return Ok(Self::Relationship(relationship));
        }

        let (inverted, body) = match token.strip_prefix('!') {
            Some(rest) => (true, rest.trim()),
            None => (false, token),
        };

        if body.starts_with("[[") || is_basis_change(body) {
            let parsed = if body.starts_with("[[") {
                notation::parse_matrix(body)
            } else {
                notation::parse_basis_change(body)
            }
            .map_err(|source| PathwayError::Notation {
                token: token.to_string(),
                source,
            })?;
            if operation::linear_part(&parsed).determinant().abs() < SINGULAR_DETERMINANT {
                return Err(PathwayError::NonInvertible(token.to_string()));
            }
            let matrix = if inverted {
                operation::invert_affine(&parsed)
                    .ok_or_else(|| PathwayError::NonInvertible(token.to_string()))?
            } else {
                parsed
            };
            return Ok(Self::Transform {
                matrix,
                text: token.to_string(),
            });
        }

        if inverted {
            return Err(PathwayError::UnexpectedToken(token.to_string()));
        }
        if body.starts_with('[') {
            Ok(Self::Generators(body.to_string()))
        } else {
            Ok(Self::Group(body.to_string()))
        }
    }
}

fn parse_relationship(lower: &str, token: &str) -> Result<Option<Relationship>, PathwayError> {
    let Some((kind, choice)) = lower.split_once(':') else {
        return Ok(None);
    };
    let constructor: fn(usize) -> Relationship = match kind.trim() {
        "sub" => Relationship::Sub,
        "super" => Relationship::Super,
        _ => return Ok(None),
    };
    match choice.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(constructor(n))),
        _ => Err(PathwayError::UnexpectedToken(token.to_string())),
    }
}

fn is_basis_change(text: &str) -> bool {
    text.contains(',') && text.chars().all(|c| BASIS_CHANGE_CHARS.contains(c))
}

pub fn split_pathway(pathway: &str) -> Vec<&str> {
    pathway.split('>').map(str::trim).collect()
}

#[derive(Debug, Clone)]
pub struct PathwayNode {
    pub identifier: String,
    pub number: Option<u16>,
    pub intrinsic: Matrix4<f64>,
    pub link: Matrix4<f64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedPathway {
    pub transform: Matrix4<f64>,
    pub nodes: Vec<PathwayNode>,
    pub cell: Option<UnitCell>,
}

impl ResolvedPathway {
    pub fn transform_notation(&self) -> String {
        notation::format_basis_change(&self.transform)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ComposerState {
    Start,
    PendingLink,
    Accepting,
}

pub struct TransformPathwayComposer<'a> {
    index: &'a dyn SubgroupIndex,
    tolerance: f64,
}

impl<'a> TransformPathwayComposer<'a> {
    pub fn new(index: &'a dyn SubgroupIndex, tolerance: f64) -> Self {
        Self { index, tolerance }
    }

    pub fn resolve_str(
        &self,
        pathway: &str,
        cell: Option<&UnitCell>,
    ) -> Result<ResolvedPathway, PathwayError> {
        self.resolve(&split_pathway(pathway), cell)
    }

    #[instrument(skip_all, name = "pathway", fields(tokens = chain.len()))]
    pub fn resolve<T: AsRef<str>>(
        &self,
        chain: &[T],
        cell: Option<&UnitCell>,
    ) -> Result<ResolvedPathway, PathwayError> {
        if chain.is_empty() || (chain.len() == 1 && chain[0].as_ref().trim().is_empty()) {
            return Err(PathwayError::Empty);
        }

        let mut state = ComposerState::Start;
        let mut nodes: Vec<PathwayNode> = Vec::new();
        let mut pending_transform: Option<Matrix4<f64>> = None;
        let mut pending_relationship: Option<(Relationship, String)> = None;

        for raw in chain {
            let raw = raw.as_ref().trim();
            let token = PathwayToken::classify(raw)?;
            trace!(?state, token = raw, "Classified pathway token.");

            match token {
                PathwayToken::Transform { matrix, .. } => {
                    if pending_relationship.is_some() {
                        return Err(PathwayError::UnexpectedToken(raw.to_string()));
                    }
                    pending_transform = Some(compose(pending_transform, &matrix));
                    state = ComposerState::PendingLink;
                }
                PathwayToken::Shorthand(shorthand) => {
                    if pending_relationship.is_some() {
                        return Err(PathwayError::UnexpectedToken(raw.to_string()));
                    }
                    pending_transform = Some(compose(pending_transform, &shorthand.matrix()?));
                    state = ComposerState::PendingLink;
                }
                PathwayToken::Relationship(relationship) => {
                    if state != ComposerState::Accepting {
                        return Err(PathwayError::UnexpectedToken(raw.to_string()));
                    }
                    pending_relationship = Some((relationship, raw.to_string()));
                    state = ComposerState::PendingLink;
                }
                PathwayToken::Group(text) | PathwayToken::Generators(text) => {
                    let group =
                        SpaceGroup::resolve(&text).map_err(|source| PathwayError::UnknownGroup {
                            token: text.clone(),
                            source,
                        })?;
                    let link = match nodes.last() {
                        None => pending_transform.take().unwrap_or_else(Matrix4::identity),
                        Some(previous) => self.link(
                            previous,
                            &group,
                            raw,
                            pending_transform.take(),
                            pending_relationship.take().map(|(r, _)| r),
                        )?,
                    };
                    debug!(
                        group = group.identifier(),
                        link = %notation::format_basis_change(&link),
                        "Resolved pathway node."
                    );
                    nodes.push(PathwayNode {
                        identifier: group.identifier().to_string(),
                        number: group.number(),
                        intrinsic: *group.setting(),
                        link,
                    });
                    state = ComposerState::Accepting;
                }
            }
        }

        if let Some((_, text)) = pending_relationship {
            return Err(PathwayError::DanglingRelationship(text));
        }

        let mut transform = nodes
            .iter()
            .fold(Matrix4::identity(), |acc, node| acc * node.link);
        if let Some(trailing) = pending_transform {
            transform *= trailing;
        }
        if operation::linear_part(&transform).determinant().abs() < SINGULAR_DETERMINANT {
            return Err(PathwayError::NonInvertible(
                notation::format_basis_change(&transform),
            ));
        }

        let cell = cell
            .map(|c| c.transformed(&operation::linear_part(&transform)))
            .transpose()?;

        debug!(
            nodes = nodes.len(),
            transform = %notation::format_basis_change(&transform),
            "Pathway resolved."
        );
        Ok(ResolvedPathway {
            transform,
            nodes,
            cell,
        })
    }

    fn link(
        &self,
        previous: &PathwayNode,
        group: &SpaceGroup,
        token: &str,
        transform: Option<Matrix4<f64>>,
        relationship: Option<Relationship>,
    ) -> Result<Matrix4<f64>, PathwayError> {
        let same_number = previous.number.is_some() && previous.number == group.number();

        if let Some(transform) = transform {
            if same_number && group.is_fixed_setting() {
                let reached = previous.intrinsic * transform;
                if !approx_eq(&reached, group.setting(), self.tolerance) {
                    return Err(PathwayError::SettingMismatch {
                        token: token.to_string(),
                    });
                }
            }
            return Ok(transform);
        }

        let previous_inverse = operation::invert_affine(&previous.intrinsic)
            .ok_or_else(|| PathwayError::NonInvertible(previous.identifier.clone()))?;

        let relationship = match relationship {
            Some(relationship) => relationship,
            None if same_number => return Ok(previous_inverse * group.setting()),
            None => Relationship::Infer,
        };

        let no_relation = || PathwayError::NoRelation {
            from: previous.identifier.clone(),
            to: group.identifier().to_string(),
        };
        let (Some(from), Some(to)) = (previous.number, group.number()) else {
            return Err(no_relation());
        };

        let relation = match relationship {
            Relationship::Sub(choice) => self.sub(from, to, choice)?,
            Relationship::Super(choice) => self.sup(from, to, choice)?,
            Relationship::Infer => match self.sub(from, to, 1)? {
                Some(matrix) => Some(matrix),
                None => self.sup(from, to, 1)?,
            },
        }
        .ok_or_else(no_relation)?;

        trace!(from, to, ?relationship, "Applied subgroup relation.");
        Ok(previous_inverse * relation * group.setting())
    }

    fn sub(
        &self,
        parent: u16,
        child: u16,
        choice: usize,
    ) -> Result<Option<Matrix4<f64>>, PathwayError> {
        self.index
            .relation(parent, child, choice)
            .map(|text| parse_index_relation(&text))
            .transpose()
    }

    fn sup(
        &self,
        child: u16,
        parent: u16,
        choice: usize,
    ) -> Result<Option<Matrix4<f64>>, PathwayError> {
        let Some(text) = self.index.relation(parent, child, choice) else {
            return Ok(None);
        };
        let matrix = parse_index_relation(&text)?;
        operation::invert_affine(&matrix)
            .map(Some)
            .ok_or(PathwayError::NonInvertible(text))
    }
}

fn parse_index_relation(text: &str) -> Result<Matrix4<f64>, PathwayError> {
    subgroups::parse_relation(text).map_err(|source| PathwayError::Notation {
        token: text.to_string(),
        source,
    })
}

fn compose(pending: Option<Matrix4<f64>>, next: &Matrix4<f64>) -> Matrix4<f64> {
    pending.unwrap_or_else(Matrix4::identity) * next
}

fn approx_eq(a: &Matrix4<f64>, b: &Matrix4<f64>, tolerance: f64) -> bool {
    (a - b).amax() <= tolerance
}
