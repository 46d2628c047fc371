//! Parser for Clover XML coverage reports.
//!
//! Report structure (OpenClover, Atlassian Clover, and the plugins that emit
//! the format):
//!
//! ```text
//! <coverage generated="..." clover="4.x">
//!   <project name="...">
//!     <package name="Company.Product">
//!       <file name="Calc.cs" path="/src/Calc.cs">
//!         <line num="1" type="stmt" count="5"/>
//!         <line num="3" type="method" signature="Add()"/>
//!         <line num="5" type="cond" falsecount="0" truecount="4"/>
//!       </file>
//!     </package>
//!   </project>
//! </coverage>
//! ```
//!
//! `<package>` elements are the module grouping; reports without packages
//! group files directly under `<project>`, so the parser falls back to that
//! tag when no package exists. All grouping elements sharing one `name`
//! contribute to a single assembly. Each `<file>` becomes one class holding
//! a dense 1-based coverage array, a parallel visit-status array, a branch
//! pair per conditional line and ordered method markers. Files of one
//! assembly are processed on a worker pool; assemblies are processed one
//! after another.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use rayon::prelude::*;
use tracing::debug;

use crate::error::{CovtreeError, Result};
use crate::filter::Filter;
use crate::model::{
    Assembly, Branch, Class, CodeElement, CodeElementKind, CoverageReport, FileCoverage,
    LineStatus,
};
use crate::parsers::Parser;
use crate::xml::{Document, Element};

/// Adapter label recorded on every report this parser produces.
const PARSER_NAME: &str = "Clover";

/// Clover XML format parser.
///
/// Inclusion of assemblies and files is decided by the two caller-supplied
/// predicates; everything else is fixed by the format.
pub struct CloverParser<'a> {
    assembly_filter: &'a dyn Filter,
    file_filter: &'a dyn Filter,
}

impl<'a> CloverParser<'a> {
    pub fn new(assembly_filter: &'a dyn Filter, file_filter: &'a dyn Filter) -> Self {
        Self {
            assembly_filter,
            file_filter,
        }
    }

    /// Parse an already-loaded report document into the coverage tree.
    ///
    /// Fails on the first malformed record; no partial report is returned.
    pub fn parse_document(&self, document: &Document) -> Result<CoverageReport> {
        let mut modules = document.descendants("package");
        if modules.is_empty() {
            debug!("no <package> grouping found, falling back to <project>");
            modules = document.descendants("project");
        }

        let mut names = BTreeSet::new();
        for module in &modules {
            names.insert(module.require_attribute("name")?);
        }

        let mut assemblies = names
            .into_iter()
            .filter(|name| self.assembly_filter.is_included(name))
            .map(|name| self.process_assembly(&modules, name))
            .collect::<Result<Vec<_>>>()?;
        assemblies.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(CoverageReport {
            parser: PARSER_NAME.to_string(),
            supports_branch_coverage: true,
            assemblies,
        })
    }

    /// Build one assembly from the module elements carrying its name.
    fn process_assembly(&self, modules: &[&Element], assembly_name: &str) -> Result<Assembly> {
        let mut files: Vec<(&str, &Element)> = Vec::new();
        for module in modules
            .iter()
            .filter(|module| module.attribute("name") == Some(assembly_name))
        {
            for file in module.children_named("file") {
                let file_name = file.require_attribute("name")?;
                if self.file_filter.is_included(file_name) {
                    files.push((file_name, file));
                }
            }
        }
        files.sort_by(|a, b| a.0.cmp(b.0));

        // Fan the per-file work out; the collect keeps the sorted input
        // order and surfaces the first task failure.
        let classes = files
            .par_iter()
            .map(|(_, file)| process_file(file))
            .collect::<Result<Vec<_>>>()?;

        debug!(
            assembly = assembly_name,
            classes = classes.len(),
            "processed assembly"
        );
        Ok(Assembly {
            name: assembly_name.to_string(),
            classes,
        })
    }
}

impl Parser for CloverParser<'_> {
    fn name(&self) -> &'static str {
        PARSER_NAME
    }

    fn parse(&self, input: &[u8]) -> Result<CoverageReport> {
        let document = Document::parse(input)?;
        self.parse_document(&document)
    }
}

/// Turn one `<file>` element into a class wrapping its coverage data.
fn process_file(file: &Element) -> Result<Class> {
    let lines: Vec<&Element> = file.children_named("line").collect();

    let branches = extract_branches(&lines)?;

    let mut statements = Vec::new();
    for line in &lines {
        if line.attribute("type") == Some("stmt") {
            statements.push((line.require_int::<u32>("num")?, line.require_int::<i64>("count")?));
        }
    }
    statements.sort_by_key(|&(num, _)| num);

    let (coverage, line_status) = classify_lines(&statements, &branches);
    let code_elements = extract_methods(&lines)?;

    Ok(Class {
        name: file.require_attribute("name")?.to_string(),
        file: FileCoverage {
            path: file.require_attribute("path")?.to_string(),
            coverage,
            line_status,
            branches,
            code_elements,
        },
    })
}

/// Pair up the branch outcomes of every `type="cond"` record.
///
/// Each conditional line yields exactly two branches: `"{num}_0"` for the
/// false outcome and `"{num}_1"` for the true outcome, flagged visited when
/// the respective count is positive. A line recorded as conditional twice is
/// malformed input.
fn extract_branches(lines: &[&Element]) -> Result<BTreeMap<u32, HashSet<Branch>>> {
    let mut branches = BTreeMap::new();

    for line in lines {
        if line.attribute("type") != Some("cond") {
            continue;
        }
        let num = line.require_int::<u32>("num")?;
        let falsecount = line.require_int::<i64>("falsecount")?;
        let truecount = line.require_int::<i64>("truecount")?;

        let pair = HashSet::from([
            Branch {
                identifier: format!("{num}_0"),
                visits: u64::from(falsecount > 0),
            },
            Branch {
                identifier: format!("{num}_1"),
                visits: u64::from(truecount > 0),
            },
        ]);

        if branches.insert(num, pair).is_some() {
            return Err(CovtreeError::DuplicateConditional { line: num });
        }
    }

    Ok(branches)
}

/// Build the dense coverage and status arrays from the sorted statement
/// records.
///
/// Both arrays are sized `max statement line + 1` so indices match 1-based
/// line numbers; slot 0 stays at its initial value. Lines never recorded as
/// statements keep `-1` / `NotCoverable`. A statement line is partially
/// covered when it was visited but one of its branch outcomes was not.
fn classify_lines(
    statements: &[(u32, i64)],
    branches: &BTreeMap<u32, HashSet<Branch>>,
) -> (Vec<i64>, Vec<LineStatus>) {
    let max_line = match statements.last() {
        Some(&(line, _)) => line,
        None => return (Vec::new(), Vec::new()),
    };

    let len = max_line as usize + 1;
    let mut coverage = vec![-1i64; len];
    let mut status = vec![LineStatus::NotCoverable; len];

    for &(line, visits) in statements {
        coverage[line as usize] = visits;
        status[line as usize] = if visits == 0 {
            LineStatus::NotCovered
        } else if branches
            .get(&line)
            .map(|pair| pair.iter().any(|branch| branch.visits == 0))
            .unwrap_or(false)
        {
            LineStatus::PartiallyCovered
        } else {
            LineStatus::Covered
        };
    }

    (coverage, status)
}

/// Collect `type="method"` records as code elements, in document order.
fn extract_methods(lines: &[&Element]) -> Result<Vec<CodeElement>> {
    let mut elements = Vec::new();
    for line in lines {
        if line.attribute("type") != Some("method") {
            continue;
        }
        let num = line.require_int::<u32>("num")?;
        elements.push(CodeElement {
            name: line.require_attribute("signature")?.to_string(),
            kind: CodeElementKind::Method,
            start_line: num,
            end_line: num,
        });
    }
    Ok(elements)
}
