//! Text and JSON rendering of analysis reports
//!
//! Available expressions:
//!
//! ```text
//! c = a + b
//! IN
//! [EMPTY]
//! OUT
//! a + b
//! GEN
//! a + b
//! KILL
//! [EMPTY]
//! ```
//!
//! Dependences:
//!
//! ```text
//! Number of FlowDependence : 1
//! a[0] = t
//! t = a[0], a[1]
//!
//! ```

use super::array_access::ArrayAccessRecord;
use super::available_expressions::{AssignmentFacts, AvailableExpressionReport};
use super::config::UnknownIndexPolicy;
use super::dependence::{DependenceKind, DependencePair, DependenceReport};
use super::expr_set::ExpressionSet;
use super::gen_kill::AssignedValue;
use crate::ir::IrFunction;
use diagnostics::Diagnostics;
use serde::Serialize;
use std::fmt::Write;

const EMPTY: &str = "[EMPTY]";

/// `<target> = <rhs>` for one assignment.
pub fn assignment_header(function: &IrFunction, facts: &AssignmentFacts) -> String {
    let rhs = match facts.value() {
        AssignedValue::Expression(expr) => expr.display(function).to_string(),
        AssignedValue::Operand(operand) => operand.display(function).to_string(),
    };
    format!("{} = {}", function.value_name(facts.target()), rhs)
}

fn write_set(out: &mut String, function: &IrFunction, label: &str, set: &ExpressionSet) {
    writeln!(out, "{}", label).unwrap();
    if set.is_empty() {
        writeln!(out, "{}", EMPTY).unwrap();
    }
    for expr in set {
        writeln!(out, "{}", expr.display(function)).unwrap();
    }
}

pub fn render_available_expressions(function: &IrFunction, report: &AvailableExpressionReport) -> String {
    let mut out = String::new();
    for facts in &report.assignments {
        writeln!(out, "{}", assignment_header(function, facts)).unwrap();
        write_set(&mut out, function, "IN", &facts.in_set);
        write_set(&mut out, function, "OUT", &facts.out_set);
        write_set(&mut out, function, "GEN", &facts.gen_set);
        write_set(&mut out, function, "KILL", &facts.kill_set);
    }
    out
}

fn write_pairs(out: &mut String, report: &DependenceReport, label: &str, pairs: &[DependencePair]) {
    writeln!(out, "Number of {} : {}", label, pairs.len()).unwrap();
    for pair in pairs {
        let (earlier, later) = report.records_of(pair);
        writeln!(out, "{}", earlier).unwrap();
        writeln!(out, "{}", later).unwrap();
        writeln!(out).unwrap();
    }
}

pub fn render_dependences(report: &DependenceReport) -> String {
    let mut out = String::new();
    for kind in [DependenceKind::Flow, DependenceKind::Anti, DependenceKind::Output] {
        write_pairs(&mut out, report, &kind.to_string(), report.dependences.pairs(kind));
    }
    // only conservative runs can leave a pair undecided
    if !report.undetermined().is_empty() || report.policy == UnknownIndexPolicy::Conservative {
        write_pairs(&mut out, report, "UndeterminedDependence", report.undetermined());
    }
    out
}

#[derive(Serialize)]
struct AssignmentJson {
    at: String,
    assignment: String,
    #[serde(rename = "in")]
    in_set: Vec<String>,
    out: Vec<String>,
    gen: Vec<String>,
    kill: Vec<String>,
    visits: u32,
}

#[derive(Serialize)]
struct AvailableExpressionsJson<'a> {
    function: &'a str,
    assignments: Vec<AssignmentJson>,
    diagnostics: &'a Diagnostics,
}

fn set_strings(function: &IrFunction, set: &ExpressionSet) -> Vec<String> {
    set.iter().map(|e| e.display(function).to_string()).collect()
}

pub fn available_expressions_json(
    function: &IrFunction,
    report: &AvailableExpressionReport,
) -> Result<String, serde_json::Error> {
    let view = AvailableExpressionsJson {
        function: &report.function,
        assignments: report
            .assignments
            .iter()
            .map(|facts| AssignmentJson {
                at: facts.at().to_string(),
                assignment: assignment_header(function, facts),
                in_set: set_strings(function, &facts.in_set),
                out: set_strings(function, &facts.out_set),
                gen: set_strings(function, &facts.gen_set),
                kill: set_strings(function, &facts.kill_set),
                visits: facts.visits,
            })
            .collect(),
        diagnostics: &report.diagnostics,
    };
    serde_json::to_string_pretty(&view)
}

#[derive(Serialize)]
struct RecordJson<'a> {
    at: String,
    #[serde(flatten)]
    record: &'a ArrayAccessRecord,
}

#[derive(Serialize)]
struct DependencesJson<'a> {
    function: &'a str,
    header: String,
    records: Vec<RecordJson<'a>>,
    flow: &'a [DependencePair],
    anti: &'a [DependencePair],
    output: &'a [DependencePair],
    undetermined: &'a [DependencePair],
    diagnostics: &'a Diagnostics,
}

pub fn dependences_json(reports: &[DependenceReport]) -> Result<String, serde_json::Error> {
    let views: Vec<DependencesJson<'_>> = reports
        .iter()
        .map(|report| DependencesJson {
            function: &report.function,
            header: report.header.to_string(),
            records: report
                .records
                .iter()
                .map(|record| RecordJson {
                    at: record.at.to_string(),
                    record,
                })
                .collect(),
            flow: report.flow(),
            anti: report.anti(),
            output: report.output(),
            undetermined: report.undetermined(),
            diagnostics: &report.diagnostics,
        })
        .collect();
    serde_json::to_string_pretty(&views)
}
