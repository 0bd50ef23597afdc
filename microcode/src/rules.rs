use log::{debug, warn};

use crate::{
    condition::Condition,
    ds::{Arrow, Control},
    error::ConfigError,
};

/// What a rule drives.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// Enabled state of a control.
    Enable(usize),
    /// Visibility of a diagram arrow.
    Show(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DerivationRule {
    pub target: Target,
    pub condition: Condition,
    /// Condition as written, for logs.
    pub text: String,
    /// Declaration line, 0 when built in code.
    pub line: usize,
}

/// Evaluates rules in declaration order. Order is observable: a rule that
/// disables a control moves its selection, and later rules see the move.
#[derive(Debug)]
pub struct RuleEngine {
    rules: Vec<DerivationRule>,
}

impl RuleEngine {
    /// Validates the rule set against the controls and arrows it will run
    /// over. Enable rules must not depend on each other in a cycle.
    pub fn new(
        rules: Vec<DerivationRule>,
        controls: &[Control],
        arrows: &[Arrow],
    ) -> Result<Self, ConfigError> {
        for rule in &rules {
            let target_known = match rule.target {
                Target::Enable(control) => control < controls.len(),
                Target::Show(arrow) => arrow < arrows.len(),
            };
            let reads_known = rule
                .condition
                .references()
                .iter()
                .all(|&control| control < controls.len());
            if !target_known || !reads_known {
                return Err(ConfigError::UnknownReference(rule.text.clone()));
            }
        }

        let engine = RuleEngine { rules };
        if let Some(cycle) = engine.find_cycle(controls.len()) {
            return Err(ConfigError::Cycle(
                cycle
                    .into_iter()
                    .map(|control| controls[control].name().to_string())
                    .collect(),
            ));
        }
        engine.warn_stale_reads(controls);
        Ok(engine)
    }

    pub fn rules(&self) -> &[DerivationRule] {
        &self.rules
    }

    /// One full pass. Disabled controls are normalized through
    /// `Control::set_enabled`, never just flagged.
    pub fn evaluate(&self, controls: &mut [Control], arrows: &mut [Arrow]) {
        for rule in &self.rules {
            let holds = rule.condition.holds(controls);
            match rule.target {
                Target::Enable(control) => {
                    let control = &mut controls[control];
                    control.set_enabled(holds);
                    debug!("{} enabled={} ({})", control.name(), holds, rule.text);
                }
                Target::Show(arrow) => {
                    let arrow = &mut arrows[arrow];
                    arrow.visible = holds;
                    debug!("{} visible={} ({})", arrow.name, holds, rule.text);
                }
            }
        }
    }

    /// Control-level dependency graph: an edge from every control a rule
    /// reads to the control it enables.
    fn dependency_edges(&self, control_count: usize) -> Vec<Vec<usize>> {
        let mut edges = vec![Vec::new(); control_count];
        for rule in &self.rules {
            if let Target::Enable(target) = rule.target {
                for read in rule.condition.references() {
                    if !edges[read].contains(&target) {
                        edges[read].push(target);
                    }
                }
            }
        }
        edges
    }

    /// Depth-first topological check; returns the first cycle found as a
    /// closed path of control indices.
    fn find_cycle(&self, control_count: usize) -> Option<Vec<usize>> {
        let edges = self.dependency_edges(control_count);
        let mut marks = vec![Mark::Unvisited; control_count];
        let mut path = Vec::new();
        for start in 0..control_count {
            if marks[start] == Mark::Unvisited {
                if let Some(cycle) = visit(start, &edges, &mut marks, &mut path) {
                    return Some(cycle);
                }
            }
        }
        None
    }

    fn warn_stale_reads(&self, controls: &[Control]) {
        for (position, rule) in self.rules.iter().enumerate() {
            for read in rule.condition.references() {
                let later = self.rules[position + 1..]
                    .iter()
                    .find(|other| other.target == Target::Enable(read));
                if let Some(later) = later {
                    warn!(
                        "Rule '{}' (line {}) reads '{}' before its enable rule on line {} runs",
                        rule.text,
                        rule.line,
                        controls[read].name(),
                        later.line
                    );
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    OnPath,
    Done,
}

fn visit(
    node: usize,
    edges: &[Vec<usize>],
    marks: &mut [Mark],
    path: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    marks[node] = Mark::OnPath;
    path.push(node);
    for &next in &edges[node] {
        match marks[next] {
            Mark::OnPath => {
                let start = path.iter().position(|&on_path| on_path == next)?;
                let mut cycle = path[start..].to_vec();
                cycle.push(next);
                return Some(cycle);
            }
            Mark::Unvisited => {
                if let Some(cycle) = visit(next, edges, marks, path) {
                    return Some(cycle);
                }
            }
            Mark::Done => {}
        }
    }
    path.pop();
    marks[node] = Mark::Done;
    None
}
