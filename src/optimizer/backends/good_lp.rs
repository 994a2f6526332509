//! `good_lp` backend
//!
//! Uses the `good_lp` default solver (CBC with the crate's default features),
//! which handles integer variables natively. Only compiled with the `good-lp`
//! feature.

use ::good_lp::{
    constraint, default_solver, variable, Expression, ProblemVariables, ResolutionError,
    Solution as _, SolverModel, Variable,
};

use crate::optimizer::{LinearExpr, LinearProblem, Relation, Solution, SolverError, SolverInterface};

/// Backend delegating to `good_lp::default_solver`
#[derive(Debug, Clone, Default)]
pub struct GoodLpSolver;

impl GoodLpSolver {
    fn expression(expr: &LinearExpr, handles: &[Variable]) -> Expression {
        expr.terms()
            .map(|(var, coefficient)| coefficient * handles[var.index()])
            .sum::<Expression>()
    }
}

impl SolverInterface for GoodLpSolver {
    fn name(&self) -> &'static str {
        "good_lp"
    }

    fn solve(&self, problem: &LinearProblem) -> Result<Solution, SolverError> {
        let mut vars = ProblemVariables::new();

        let handles: Vec<Variable> = problem
            .variables()
            .iter()
            .map(|def| {
                let mut definition = variable().name(def.name.clone());
                if def.lower.is_finite() {
                    definition = definition.min(def.lower);
                }
                if def.upper.is_finite() {
                    definition = definition.max(def.upper);
                }
                if def.integer {
                    definition = definition.integer();
                }
                vars.add(definition)
            })
            .collect();

        let objective = Self::expression(problem.objective(), &handles);
        let mut model = vars.minimise(objective).using(default_solver);

        for c in problem.constraints() {
            let lhs = Self::expression(&c.expr, &handles);
            let rhs = c.effective_rhs();
            model = match c.relation {
                Relation::LessOrEqual => model.with(constraint!(lhs <= rhs)),
                Relation::GreaterOrEqual => model.with(constraint!(lhs >= rhs)),
                Relation::Equal => model.with(constraint!(lhs == rhs)),
            };
        }

        let solution = model.solve().map_err(|e| match e {
            ResolutionError::Infeasible => SolverError::Infeasible,
            ResolutionError::Unbounded => SolverError::Unbounded,
            other => SolverError::Backend(other.to_string()),
        })?;

        let values: Vec<f64> = handles.iter().map(|h| solution.value(*h)).collect();
        let objective = problem.objective().evaluate(&values);
        Ok(Solution::new(values, objective))
    }
}
