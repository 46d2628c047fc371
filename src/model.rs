//! Uniform in-memory representation of coverage data, independent of any
//! specific report format. Adapters produce a `CoverageReport` which is then
//! handed to downstream aggregation.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

/// Visit classification for a single source line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum LineStatus {
    /// No executable code on this line.
    #[default]
    NotCoverable,
    NotCovered,
    PartiallyCovered,
    Covered,
}

/// One outcome of a conditional line.
///
/// The identifier is `"{line}_0"` for the false outcome and `"{line}_1"`
/// for the true outcome. `visits` is 1 when that outcome was taken at least
/// once, else 0; two branches with the same identifier and visit flag
/// collapse in a set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Branch {
    pub identifier: String,
    pub visits: u64,
}

/// Kind of a code element marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CodeElementKind {
    Method,
    Property,
}

/// A named, line-anchored marker for a method or property declaration, used
/// for navigation rather than coverage computation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CodeElement {
    pub name: String,
    pub kind: CodeElementKind,
    pub start_line: u32,
    pub end_line: u32,
}

/// Line, branch and method data for a single source file.
///
/// `coverage` is indexed by 1-based line number; index 0 is an unused
/// placeholder so indices line up with human line numbers. A value of `-1`
/// marks a line with no executable code. `line_status` has the same length
/// and classifies each line. Both are empty when the file has no statement
/// lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FileCoverage {
    pub path: String,
    pub coverage: Vec<i64>,
    pub line_status: Vec<LineStatus>,
    /// Branch pairs keyed by line number, present only for conditional lines.
    pub branches: BTreeMap<u32, HashSet<Branch>>,
    pub code_elements: Vec<CodeElement>,
}

/// One logical unit of coverage. This format maps one physical file to one
/// class, named from the file's `name` attribute.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Class {
    pub name: String,
    pub file: FileCoverage,
}

/// A named module group of classes. Class order is the sorted file order of
/// the source report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assembly {
    pub name: String,
    pub classes: Vec<Class>,
}

/// The complete result of parsing a single coverage report: assemblies
/// sorted by name, with unique names, built once and never mutated after.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageReport {
    /// Identifying label of the adapter that produced this report.
    pub parser: String,
    pub supports_branch_coverage: bool,
    pub assemblies: Vec<Assembly>,
}
