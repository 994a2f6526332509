//! Backend-agnostic linear model
//!
//! Components, links and buses describe their part of a window with the
//! types of this module. A [`LinearProblem`] is the only thing handed to a
//! solver backend, and a [`Solution`] the only thing read back.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of a variable inside its [`LinearProblem`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VariableId(usize);

impl VariableId {
    pub fn index(self) -> usize {
        self.0
    }

    fn shifted(self, offset: usize) -> Self {
        Self(self.0 + offset)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDef {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
}

/// Affine expression `Σ coef·var + constant`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearExpr {
    terms: BTreeMap<VariableId, f64>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn term(mut self, var: VariableId, coefficient: f64) -> Self {
        self.add_term(var, coefficient);
        self
    }

    pub fn constant_term(mut self, value: f64) -> Self {
        self.constant += value;
        self
    }

    /// Coefficients of a repeated variable are summed
    pub fn add_term(&mut self, var: VariableId, coefficient: f64) {
        *self.terms.entry(var).or_insert(0.0) += coefficient;
    }

    pub fn add_constant(&mut self, value: f64) {
        self.constant += value;
    }

    pub fn terms(&self) -> impl Iterator<Item = (VariableId, f64)> + '_ {
        self.terms
            .iter()
            .filter(|(_, c)| **c != 0.0)
            .map(|(v, c)| (*v, *c))
    }

    pub fn constant(&self) -> f64 {
        self.constant
    }

    pub fn is_constant(&self) -> bool {
        self.terms().next().is_none()
    }

    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms()
            .map(|(v, c)| c * values[v.index()])
            .sum::<f64>()
            + self.constant
    }

    fn shift(&mut self, offset: usize) {
        self.terms = std::mem::take(&mut self.terms)
            .into_iter()
            .map(|(v, c)| (v.shifted(offset), c))
            .collect();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
pub enum Relation {
    #[strum(serialize = "<=")]
    LessOrEqual,
    #[strum(serialize = ">=")]
    GreaterOrEqual,
    #[strum(serialize = "=")]
    Equal,
}

/// `expr relation rhs`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    pub name: String,
    pub expr: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
}

impl Constraint {
    pub fn new(name: impl Into<String>, expr: LinearExpr, relation: Relation, rhs: f64) -> Self {
        Self {
            name: name.into(),
            expr,
            relation,
            rhs,
        }
    }

    pub fn equal(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(name, expr, Relation::Equal, rhs)
    }

    pub fn at_most(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(name, expr, Relation::LessOrEqual, rhs)
    }

    pub fn at_least(name: impl Into<String>, expr: LinearExpr, rhs: f64) -> Self {
        Self::new(name, expr, Relation::GreaterOrEqual, rhs)
    }

    /// Right-hand side once the expression constant is moved across
    pub fn effective_rhs(&self) -> f64 {
        self.rhs - self.expr.constant()
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        let lhs = self.expr.evaluate(values);
        match self.relation {
            Relation::LessOrEqual => lhs <= self.rhs + tolerance,
            Relation::GreaterOrEqual => lhs >= self.rhs - tolerance,
            Relation::Equal => (lhs - self.rhs).abs() <= tolerance,
        }
    }
}

/// Minimisation problem assembled for one window (or one component fragment)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinearProblem {
    variables: Vec<VariableDef>,
    constraints: Vec<Constraint>,
    objective: LinearExpr,
}

impl LinearProblem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_variable(&mut self, name: impl Into<String>, lower: f64, upper: f64) -> VariableId {
        self.push_variable(name.into(), lower, upper, false)
    }

    pub fn add_integer_variable(
        &mut self,
        name: impl Into<String>,
        lower: f64,
        upper: f64,
    ) -> VariableId {
        self.push_variable(name.into(), lower, upper, true)
    }

    /// One continuous variable per step, named `{prefix}_{t}`
    pub fn add_variables(&mut self, prefix: &str, len: usize, lower: f64, upper: f64) -> Vec<VariableId> {
        (0..len)
            .map(|t| self.add_variable(format!("{}_{}", prefix, t), lower, upper))
            .collect()
    }

    fn push_variable(&mut self, name: String, lower: f64, upper: f64, integer: bool) -> VariableId {
        let id = VariableId(self.variables.len());
        self.variables.push(VariableDef {
            name,
            lower,
            upper,
            integer,
        });
        id
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    pub fn add_objective_term(&mut self, var: VariableId, coefficient: f64) {
        self.objective.add_term(var, coefficient);
    }

    pub fn add_objective_constant(&mut self, value: f64) {
        self.objective.add_constant(value);
    }

    pub fn variables(&self) -> &[VariableDef] {
        &self.variables
    }

    pub fn variable(&self, id: VariableId) -> &VariableDef {
        &self.variables[id.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn has_integer_variables(&self) -> bool {
        self.variables.iter().any(|v| v.integer)
    }

    /// Move every variable, constraint and objective term of `other` into
    /// `self`. Returns the offset to add to the variable indices of `other`.
    pub fn append(&mut self, other: LinearProblem) -> usize {
        let offset = self.variables.len();
        let LinearProblem {
            variables,
            constraints,
            mut objective,
        } = other;

        self.variables.extend(variables);
        self.constraints.extend(constraints.into_iter().map(|mut c| {
            c.expr.shift(offset);
            c
        }));
        objective.shift(offset);
        for (var, coefficient) in objective.terms() {
            self.objective.add_term(var, coefficient);
        }
        self.objective.add_constant(objective.constant());
        offset
    }

    /// Largest constraint violation and bound violation of `values`
    pub fn max_violation(&self, values: &[f64]) -> f64 {
        let bounds = self
            .variables
            .iter()
            .zip(values)
            .map(|(def, &v)| (def.lower - v).max(v - def.upper).max(0.0));
        let rows = self.constraints.iter().map(|c| {
            let lhs = c.expr.evaluate(values);
            match c.relation {
                Relation::LessOrEqual => (lhs - c.rhs).max(0.0),
                Relation::GreaterOrEqual => (c.rhs - lhs).max(0.0),
                Relation::Equal => (lhs - c.rhs).abs(),
            }
        });
        bounds.chain(rows).fold(0.0, f64::max)
    }
}

/// Shift the ids of a fragment after [`LinearProblem::append`]
pub fn offset_ids(ids: &[VariableId], offset: usize) -> Vec<VariableId> {
    ids.iter().map(|id| id.shifted(offset)).collect()
}

/// Values found by a backend, indexed like the problem variables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    values: Vec<f64>,
    objective: f64,
}

impl Solution {
    pub fn new(values: Vec<f64>, objective: f64) -> Self {
        Self { values, objective }
    }

    pub fn value(&self, id: VariableId) -> f64 {
        self.values[id.index()]
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn objective(&self) -> f64 {
        self.objective
    }

    pub fn series(&self, ids: &[VariableId]) -> Vec<f64> {
        ids.iter().map(|id| self.value(*id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expression_merges_repeated_terms() {
        let mut problem = LinearProblem::new();
        let x = problem.add_variable("x", 0.0, 10.0);
        let expr = LinearExpr::new().term(x, 2.0).term(x, 3.0).constant_term(1.0);
        assert_eq!(expr.terms().collect::<Vec<_>>(), vec![(x, 5.0)]);
        assert_eq!(expr.evaluate(&[2.0]), 11.0);
    }

    #[test]
    fn test_append_shifts_fragment_ids() {
        let mut window = LinearProblem::new();
        let a = window.add_variable("a", 0.0, 1.0);
        window.add_objective_term(a, 1.0);

        let mut fragment = LinearProblem::new();
        let b = fragment.add_variable("b", 0.0, 2.0);
        fragment.add_constraint(Constraint::at_most("cap", LinearExpr::new().term(b, 1.0), 1.5));
        fragment.add_objective_term(b, 3.0);

        let offset = window.append(fragment);
        assert_eq!(offset, 1);
        let b = offset_ids(&[b], offset)[0];
        assert_eq!(window.variable(b).name, "b");
        assert_eq!(window.constraints()[0].expr.terms().next(), Some((b, 1.0)));
        assert_eq!(window.objective().terms().count(), 2);
    }

    #[test]
    fn test_constraint_satisfaction() {
        let mut problem = LinearProblem::new();
        let x = problem.add_variable("x", 0.0, 10.0);
        let c = Constraint::equal("fix", LinearExpr::new().term(x, 1.0).constant_term(2.0), 5.0);
        assert_eq!(c.effective_rhs(), 3.0);
        assert!(c.is_satisfied(&[3.0], 1e-9));
        assert!(!c.is_satisfied(&[3.1], 1e-9));

        problem.add_constraint(c);
        assert!((problem.max_violation(&[3.5]) - 0.5).abs() < 1e-12);
        assert!((problem.max_violation(&[11.0]) - 8.0).abs() < 1e-12);
    }
}
