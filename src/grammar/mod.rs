//! Grammar model: weighted context-free rules compiled into an arena.
//!
//! A grammar is built once, validated, and is immutable afterwards. Every
//! node carries the cost of its cheapest expansion; generation consumes the
//! size budget as it expands, and once the budget is gone every choice takes
//! its cheapest alternative and every repeat its minimum count.

pub mod python;

use std::collections::HashMap;

use crate::diagnostics::{Abandoned, GrammarError};
use crate::generator::combinators::draw_count;
use crate::generator::{Budget, DrawSource, Generator};

/// Grammar node as written by grammar authors.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Terminal(String),
    /// Weighted alternatives; every weight must be positive.
    Choice(Vec<(u32, Node)>),
    Sequence(Vec<Node>),
    Repeat { child: Box<Node>, min: usize, max: usize },
    /// Reference to a named rule; the only way to express recursion.
    Rule(String),
}

impl Node {
    pub fn t(text: impl Into<String>) -> Self {
        Node::Terminal(text.into())
    }

    pub fn rule(name: impl Into<String>) -> Self {
        Node::Rule(name.into())
    }

    pub fn seq(children: impl IntoIterator<Item = Node>) -> Self {
        Node::Sequence(children.into_iter().collect())
    }

    pub fn choice(alternatives: impl IntoIterator<Item = (u32, Node)>) -> Self {
        Node::Choice(alternatives.into_iter().collect())
    }

    /// Equally weighted alternatives.
    pub fn any(alternatives: impl IntoIterator<Item = Node>) -> Self {
        Node::Choice(alternatives.into_iter().map(|n| (1, n)).collect())
    }

    /// Equally weighted terminals.
    pub fn literals<'a>(texts: impl IntoIterator<Item = &'a str>) -> Self {
        Node::any(texts.into_iter().map(Node::t))
    }

    pub fn repeat(child: Node, min: usize, max: usize) -> Self {
        Node::Repeat { child: Box::new(child), min, max }
    }

    pub fn optional(child: Node) -> Self {
        Node::repeat(child, 0, 1)
    }
}

type NodeId = usize;
type RuleId = usize;

#[derive(Debug, Clone)]
enum Compiled {
    Terminal(String),
    /// Alternatives sorted by cost, cheapest first; ties keep declaration
    /// order. Draw value 0 therefore always selects the simplest alternative.
    Choice(Vec<(u32, NodeId)>),
    Sequence(Vec<NodeId>),
    Repeat { child: NodeId, min: usize, max: usize },
    Rule(RuleId),
}

#[derive(Debug, Default)]
pub struct GrammarBuilder {
    rules: Vec<(String, Node)>,
    start: Option<String>,
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(mut self, name: impl Into<String>, node: Node) -> Self {
        self.rules.push((name.into(), node));
        self
    }

    /// Defaults to the first rule.
    pub fn start(mut self, name: impl Into<String>) -> Self {
        self.start = Some(name.into());
        self
    }

    pub fn build(self) -> Result<Grammar, GrammarError> {
        if self.rules.is_empty() {
            return Err(GrammarError::Empty);
        }
        let mut rule_index = HashMap::new();
        for (i, (name, _)) in self.rules.iter().enumerate() {
            if rule_index.insert(name.clone(), i).is_some() {
                return Err(GrammarError::DuplicateRule(name.clone()));
            }
        }

        let mut compiler = Compiler { nodes: Vec::new(), rule_index: &rule_index };
        let mut rule_roots = Vec::with_capacity(self.rules.len());
        for (name, node) in &self.rules {
            rule_roots.push(compiler.compile(name, node)?);
        }
        let mut nodes = compiler.nodes;

        let costs = compute_costs(&nodes, &rule_roots);
        let unproductive: Vec<String> = self
            .rules
            .iter()
            .zip(&rule_roots)
            .filter(|(_, root)| costs[**root].is_none())
            .map(|((name, _), _)| name.clone())
            .collect();
        if !unproductive.is_empty() {
            return Err(GrammarError::Unproductive { rules: unproductive });
        }
        // Every node under a productive rule is reachable through some finite
        // path, but alternatives of a choice may still be infinite.
        let costs: Vec<usize> = costs.into_iter().map(|c| c.unwrap_or(usize::MAX)).collect();
        for node in &mut nodes {
            if let Compiled::Choice(alts) = node {
                alts.sort_by_key(|(_, id)| costs[*id]);
            }
        }

        let rule_names: Vec<String> = self.rules.into_iter().map(|(name, _)| name).collect();
        let start = match self.start {
            Some(name) => *rule_index.get(&name).ok_or(GrammarError::UnknownStart(name))?,
            None => 0,
        };
        Ok(Grammar { nodes, costs, rule_roots, rule_names, rule_index, start })
    }
}

struct Compiler<'a> {
    nodes: Vec<Compiled>,
    rule_index: &'a HashMap<String, RuleId>,
}

impl Compiler<'_> {
    /// Children are pushed before their parent, so ids are in post-order.
    fn compile(&mut self, rule: &str, node: &Node) -> Result<NodeId, GrammarError> {
        let compiled = match node {
            Node::Terminal(text) => Compiled::Terminal(text.clone()),
            Node::Choice(alts) => {
                if alts.is_empty() {
                    return Err(GrammarError::EmptyChoice { rule: rule.to_string() });
                }
                let mut ids = Vec::with_capacity(alts.len());
                for (i, (weight, alt)) in alts.iter().enumerate() {
                    if *weight == 0 {
                        let rule = rule.to_string();
                        return Err(GrammarError::ZeroWeight { rule, alternative: i });
                    }
                    ids.push((*weight, self.compile(rule, alt)?));
                }
                Compiled::Choice(ids)
            }
            Node::Sequence(children) => {
                let ids = children
                    .iter()
                    .map(|c| self.compile(rule, c))
                    .collect::<Result<Vec<_>, _>>()?;
                Compiled::Sequence(ids)
            }
            Node::Repeat { child, min, max } => {
                if min > max {
                    return Err(GrammarError::InvalidRepeat {
                        rule: rule.to_string(),
                        min: *min,
                        max: *max,
                    });
                }
                Compiled::Repeat { child: self.compile(rule, child)?, min: *min, max: *max }
            }
            Node::Rule(name) => {
                let id = self.rule_index.get(name).ok_or_else(|| GrammarError::UndefinedRule {
                    rule: rule.to_string(),
                    missing: name.clone(),
                })?;
                Compiled::Rule(*id)
            }
        };
        self.nodes.push(compiled);
        Ok(self.nodes.len() - 1)
    }
}

/// Cheapest-expansion cost of every node, by fixpoint over rule costs.
/// `None` means no finite expansion exists.
///
/// Terminal, Sequence, Repeat and rule references each cost one unit on top
/// of their children, so any cycle is strictly more expensive than the path
/// that leaves it and the cheapest expansion never loops.
fn compute_costs(nodes: &[Compiled], rule_roots: &[NodeId]) -> Vec<Option<usize>> {
    let mut costs: Vec<Option<usize>> = vec![None; nodes.len()];
    loop {
        let mut changed = false;
        for id in 0..nodes.len() {
            let cost = match &nodes[id] {
                Compiled::Terminal(_) => Some(1),
                Compiled::Choice(alts) => alts.iter().filter_map(|(_, a)| costs[*a]).min(),
                Compiled::Sequence(children) => children
                    .iter()
                    .try_fold(1usize, |acc, c| costs[*c].map(|k| acc.saturating_add(k))),
                Compiled::Repeat { child, min, .. } => {
                    if *min == 0 {
                        Some(1)
                    } else {
                        costs[*child].map(|k| k.saturating_mul(*min).saturating_add(1))
                    }
                }
                Compiled::Rule(r) => costs[rule_roots[*r]].map(|k| k.saturating_add(1)),
            };
            if cost != costs[id] {
                costs[id] = cost;
                changed = true;
            }
        }
        if !changed {
            return costs;
        }
    }
}

/// A validated, immutable grammar. Generating from it yields text.
#[derive(Debug, Clone)]
pub struct Grammar {
    nodes: Vec<Compiled>,
    costs: Vec<usize>,
    rule_roots: Vec<NodeId>,
    rule_names: Vec<String>,
    rule_index: HashMap<String, RuleId>,
    start: RuleId,
}

impl Grammar {
    pub fn builder() -> GrammarBuilder {
        GrammarBuilder::new()
    }

    pub fn start_rule(&self) -> &str {
        &self.rule_names[self.start]
    }

    pub fn rule_names(&self) -> impl Iterator<Item = &str> {
        self.rule_names.iter().map(String::as_str)
    }

    /// The same grammar generating from another rule.
    pub fn with_start(&self, name: &str) -> Result<Grammar, GrammarError> {
        let start = *self
            .rule_index
            .get(name)
            .ok_or_else(|| GrammarError::UnknownStart(name.to_string()))?;
        Ok(Grammar { start, ..self.clone() })
    }

    /// Cost of the cheapest expansion of a rule.
    pub fn min_cost(&self, name: &str) -> Option<usize> {
        self.rule_index.get(name).map(|r| self.costs[self.rule_roots[*r]])
    }

    /// The smallest producible text: what generation yields from an empty
    /// budget or an all-zero trace.
    pub fn cheapest(&self) -> String {
        let mut out = String::new();
        self.cheapest_into(self.rule_roots[self.start], &mut out);
        out
    }

    fn cheapest_into(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id] {
            Compiled::Terminal(text) => out.push_str(text),
            Compiled::Choice(alts) => self.cheapest_into(alts[0].1, out),
            Compiled::Sequence(children) => {
                for c in children {
                    self.cheapest_into(*c, out);
                }
            }
            Compiled::Repeat { child, min, .. } => {
                for _ in 0..*min {
                    self.cheapest_into(*child, out);
                }
            }
            Compiled::Rule(r) => self.cheapest_into(self.rule_roots[*r], out),
        }
    }

    /// Expand `id` into `out`, drawing decisions from `src`.
    fn expand(
        &self,
        id: NodeId,
        src: &mut DrawSource,
        budget: &mut Budget,
        out: &mut String,
    ) -> Result<(), Abandoned> {
        match &self.nodes[id] {
            Compiled::Terminal(text) => {
                budget.consume(1);
                out.push_str(text);
            }
            Compiled::Choice(alts) => {
                let affordable =
                    alts.iter().take_while(|(_, a)| budget.can_afford(self.costs[*a])).count();
                let pick = if affordable <= 1 || budget.is_exhausted() {
                    0
                } else {
                    let weights: Vec<u32> = alts[..affordable].iter().map(|(w, _)| *w).collect();
                    src.draw_weighted(&weights)?
                };
                self.expand(alts[pick].1, src, budget, out)?;
            }
            Compiled::Sequence(children) => {
                budget.consume(1);
                for c in children {
                    self.expand(*c, src, budget, out)?;
                }
            }
            Compiled::Repeat { child, min, max } => {
                budget.consume(1);
                let count = draw_count(src, budget, *min, *max, self.costs[*child])?;
                for _ in 0..count {
                    self.expand(*child, src, budget, out)?;
                }
            }
            Compiled::Rule(r) => {
                budget.consume(1);
                self.expand(self.rule_roots[*r], src, budget, out)?;
            }
        }
        Ok(())
    }
}

impl Generator for Grammar {
    type Value = String;

    fn draw(&self, src: &mut DrawSource, budget: &mut Budget) -> Result<String, Abandoned> {
        let mut out = String::new();
        self.expand(self.rule_roots[self.start], src, budget, &mut out)?;
        Ok(out)
    }
}
