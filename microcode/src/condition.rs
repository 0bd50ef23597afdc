use pest::{
    iterators::{Pair, Pairs},
    Parser,
};
use pest_derive::Parser;

use crate::ds::Control;

#[derive(Parser)]
#[grammar = "../condition.pest"]
struct ConditionParser;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

impl Comparison {
    fn apply(self, left: usize, right: usize) -> bool {
        match self {
            Comparison::Less => left < right,
            Comparison::LessOrEqual => left <= right,
            Comparison::Greater => left > right,
            Comparison::GreaterOrEqual => left >= right,
        }
    }
}

/// Boolean predicate over control selections. Controls are referred to by
/// their position in the session's control list.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// The control's selected option label equals `label`.
    Is { control: usize, label: String },
    IsNot { control: usize, label: String },
    /// Compares the selected option index against a constant.
    Compare {
        control: usize,
        op: Comparison,
        value: usize,
    },
    Enabled(usize),
    Not(Box<Condition>),
    All(Vec<Condition>),
    Any(Vec<Condition>),
}

impl Condition {
    pub fn holds(&self, controls: &[Control]) -> bool {
        match self {
            Condition::Is { control, label } => controls[*control].selected_name() == label,
            Condition::IsNot { control, label } => controls[*control].selected_name() != label,
            Condition::Compare { control, op, value } => {
                op.apply(controls[*control].selected(), *value)
            }
            Condition::Enabled(control) => controls[*control].enabled(),
            Condition::Not(inner) => !inner.holds(controls),
            Condition::All(terms) => terms.iter().all(|term| term.holds(controls)),
            Condition::Any(terms) => terms.iter().any(|term| term.holds(controls)),
        }
    }

    /// Every control this condition reads, sorted and deduplicated.
    pub fn references(&self) -> Vec<usize> {
        let mut found = Vec::new();
        self.collect_references(&mut found);
        found.sort_unstable();
        found.dedup();
        found
    }

    fn collect_references(&self, found: &mut Vec<usize>) {
        match self {
            Condition::Is { control, .. }
            | Condition::IsNot { control, .. }
            | Condition::Compare { control, .. }
            | Condition::Enabled(control) => found.push(*control),
            Condition::Not(inner) => inner.collect_references(found),
            Condition::All(terms) | Condition::Any(terms) => {
                for term in terms {
                    term.collect_references(found);
                }
            }
        }
    }
}

/// Parses condition text, resolving control names and option labels against
/// `controls`. The error is a bare message; the caller adds the line number.
pub(crate) fn parse_condition(text: &str, controls: &[Control]) -> Result<Condition, String> {
    let mut pairs = ConditionParser::parse(Rule::condition, text.trim()).map_err(|e| {
        format!(
            "Invalid condition '{}': {}",
            text.trim(),
            e.variant.message()
        )
    })?;
    let condition = next_pair(&mut pairs, "condition")?;
    let or_expr = next_pair(&mut condition.into_inner(), "expression")?;
    build(or_expr, controls)
}

fn next_pair<'i>(pairs: &mut Pairs<'i, Rule>, what: &str) -> Result<Pair<'i, Rule>, String> {
    pairs
        .next()
        .ok_or_else(|| format!("Malformed condition: missing {}", what))
}

fn build(pair: Pair<'_, Rule>, controls: &[Control]) -> Result<Condition, String> {
    match pair.as_rule() {
        Rule::or_expr => combine(pair, controls, Condition::Any),
        Rule::and_expr => combine(pair, controls, Condition::All),
        Rule::negation => {
            let inner = next_pair(&mut pair.into_inner(), "negated term")?;
            Ok(Condition::Not(Box::new(build(inner, controls)?)))
        }
        Rule::enabled_test => {
            let name = next_pair(&mut pair.into_inner(), "control name")?;
            Ok(Condition::Enabled(resolve(name.as_str(), controls)?))
        }
        Rule::index_test => {
            let mut inner = pair.into_inner();
            let control = resolve(next_pair(&mut inner, "control name")?.as_str(), controls)?;
            let op = match next_pair(&mut inner, "comparison")?.as_str() {
                "<" => Comparison::Less,
                "<=" => Comparison::LessOrEqual,
                ">" => Comparison::Greater,
                _ => Comparison::GreaterOrEqual,
            };
            let index = next_pair(&mut inner, "index")?.as_str();
            let value = index
                .parse::<usize>()
                .map_err(|_| format!("Invalid index '{}' in condition", index))?;
            Ok(Condition::Compare { control, op, value })
        }
        Rule::label_test => {
            let mut inner = pair.into_inner();
            let name = next_pair(&mut inner, "control name")?.as_str();
            let control = resolve(name, controls)?;
            let negated = next_pair(&mut inner, "operator")?.as_str() == "!=";
            let label = next_pair(&mut inner, "option label")?.as_str().to_string();
            if controls[control].index_of(&label).is_none() {
                return Err(format!(
                    "Control '{}' has no option '{}'",
                    name, label
                ));
            }
            Ok(if negated {
                Condition::IsNot { control, label }
            } else {
                Condition::Is { control, label }
            })
        }
        rule => Err(format!("Unexpected {:?} in condition", rule)),
    }
}

fn combine(
    pair: Pair<'_, Rule>,
    controls: &[Control],
    join: fn(Vec<Condition>) -> Condition,
) -> Result<Condition, String> {
    let mut terms = pair
        .into_inner()
        .map(|term| build(term, controls))
        .collect::<Result<Vec<_>, _>>()?;
    if terms.len() == 1 {
        Ok(terms.remove(0))
    } else {
        Ok(join(terms))
    }
}

fn resolve(name: &str, controls: &[Control]) -> Result<usize, String> {
    controls
        .iter()
        .position(|control| control.name() == name)
        .ok_or_else(|| format!("Condition references undefined control '{}'", name))
}
