use super::notation::{self, NotationError};
use nalgebra::Matrix4;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Source of group/subgroup relations.
///
/// `relation(parent, child, choice)` returns the basis change, in `a,b,c;shift` notation,
/// that carries the parent setting into the setting of its `choice`-th listed subgroup with
/// number `child`. `choice` is 1-based.
pub trait SubgroupIndex {
    fn relation(&self, parent: u16, child: u16, choice: usize) -> Option<String>;
}

#[derive(Debug, Error)]
pub enum SubgroupLoadError {
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("Invalid transform '{transform}' for {parent} > {child} in '{path}': {source}")]
    InvalidTransform {
        path: String,
        parent: u16,
        child: u16,
        transform: String,
        source: NotationError,
    },
}

#[derive(Debug, Deserialize)]
struct RelationRecord {
    parent: u16,
    child: u16,
    transform: String,
}

/// In-memory subgroup index, seeded with the relations between groups of the built-in table.
#[derive(Debug, Clone, Default)]
pub struct SubgroupTable {
    relations: HashMap<(u16, u16), Vec<String>>,
}

const BUILTIN_RELATIONS: &[(u16, u16, &str)] = &[
    (2, 1, "a,b,c"),
    (3, 1, "a,b,c"),
    (4, 1, "a,b,c"),
    (5, 3, "a,b,c"),
    (6, 1, "a,b,c"),
    (7, 1, "a,b,c"),
    (10, 3, "a,b,c"),
    (10, 6, "a,b,c"),
    (10, 2, "a,b,c"),
    (14, 4, "a,b,c;0,0,1/4"),
    (14, 7, "a,b,c;0,1/4,0"),
    (14, 2, "a,b,c"),
    (15, 5, "a,b,c;0,0,1/4"),
    (16, 3, "a,b,c"),
    (19, 4, "a,b,c;0,0,1/4"),
    (47, 16, "a,b,c"),
    (47, 10, "a,b,c"),
    (62, 19, "a,b,c;0,0,1/4"),
    (75, 3, "b,c,a"),
    (83, 75, "a,b,c"),
    (99, 75, "a,b,c"),
    (123, 83, "a,b,c"),
    (123, 99, "a,b,c"),
    (123, 47, "a,b,c"),
    (139, 123, "a,b,c"),
    (143, 1, "a,b,c"),
    (146, 143, "a,b,c"),
    (147, 143, "a,b,c"),
    (148, 146, "a,b,c"),
    (148, 147, "a,b,c"),
    (166, 148, "a,b,c"),
    (168, 143, "a,b,c"),
    (175, 168, "a,b,c"),
    (175, 147, "a,b,c"),
    (191, 175, "a,b,c"),
    (195, 16, "a,b,c"),
    (200, 195, "a,b,c"),
    (200, 47, "a,b,c"),
    (221, 200, "a,b,c"),
    (221, 123, "a,b,c"),
    (225, 221, "a,b,c"),
    (225, 139, "a/2-b/2,a/2+b/2,c"),
    (229, 221, "a,b,c"),
    (229, 139, "a,b,c"),
];

impl SubgroupTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table holding the built-in relations.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (parent, child, transform) in BUILTIN_RELATIONS {
            table.insert(*parent, *child, transform);
        }
        table
    }

    /// Appends a relation; repeated `(parent, child)` pairs become further choices.
    pub fn insert(&mut self, parent: u16, child: u16, transform: &str) {
        self.relations
            .entry((parent, child))
            .or_default()
            .push(transform.trim().to_string());
    }

    /// Number of listed relations between `parent` and `child`.
    pub fn choices(&self, parent: u16, child: u16) -> usize {
        self.relations.get(&(parent, child)).map_or(0, Vec::len)
    }

    pub fn len(&self) -> usize {
        self.relations.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.relations.is_empty()
    }

    /// Appends the relations of a CSV file with the header `parent,child,transform`.
    ///
    /// Every transform is validated before any record is added, so a failed load leaves the
    /// table unchanged.
    ///
    /// # Return
    ///
    /// Returns the number of relations read.
    pub fn load_csv(&mut self, path: &Path) -> Result<usize, SubgroupLoadError> {
        let path_str = path.to_string_lossy().to_string();
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| SubgroupLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?;

        let mut records = Vec::new();
        for result in reader.deserialize::<RelationRecord>() {
            let record = result.map_err(|e| SubgroupLoadError::Csv {
                path: path_str.clone(),
                source: e,
            })?;
            parse_relation(&record.transform).map_err(|e| SubgroupLoadError::InvalidTransform {
                path: path_str.clone(),
                parent: record.parent,
                child: record.child,
                transform: record.transform.clone(),
                source: e,
            })?;
            records.push(record);
        }

        let count = records.len();
        for record in records {
            self.insert(record.parent, record.child, &record.transform);
        }
        debug!(path = %path_str, count, "Loaded subgroup relations.");
        Ok(count)
    }
}

impl SubgroupIndex for SubgroupTable {
    fn relation(&self, parent: u16, child: u16, choice: usize) -> Option<String> {
        let index = choice.checked_sub(1)?;
        self.relations.get(&(parent, child))?.get(index).cloned()
    }
}

/// Parses a relation transform, either `a,b,c;shift` notation or an explicit matrix.
pub fn parse_relation(transform: &str) -> Result<Matrix4<f64>, NotationError> {
    let transform = transform.trim();
    if transform.starts_with("[[") {
        notation::parse_matrix(transform)
    } else {
        notation::parse_basis_change(transform)
    }
}
