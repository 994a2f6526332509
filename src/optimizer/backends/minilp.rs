//! Pure Rust backend built on `minilp`
//!
//! `minilp` only solves continuous problems. Integer variables are handled by
//! a depth-first branch and bound over the variable bounds, each node being
//! one LP relaxation.

use ::minilp::{ComparisonOp, OptimizationDirection};

use crate::optimizer::{LinearProblem, Relation, Solution, SolverError, SolverInterface};

const OBJECTIVE_TOLERANCE: f64 = 1e-9;

/// Default backend: dual simplex from `minilp` plus branch and bound
#[derive(Debug, Clone)]
pub struct MiniLpSolver {
    /// Maximum number of relaxations solved for one problem
    max_nodes: usize,
    /// Distance to the nearest integer under which a value counts as integral
    integrality_tolerance: f64,
}

impl Default for MiniLpSolver {
    fn default() -> Self {
        Self {
            max_nodes: 10_000,
            integrality_tolerance: 1e-6,
        }
    }
}

impl MiniLpSolver {
    pub fn new(max_nodes: usize, integrality_tolerance: f64) -> Self {
        Self {
            max_nodes: max_nodes.max(1),
            integrality_tolerance,
        }
    }

    fn solve_relaxation(
        &self,
        problem: &LinearProblem,
        bounds: &[(f64, f64)],
    ) -> Result<Solution, SolverError> {
        let mut lp = ::minilp::Problem::new(OptimizationDirection::Minimize);

        let mut costs = vec![0.0; problem.num_variables()];
        for (var, coefficient) in problem.objective().terms() {
            costs[var.index()] = coefficient;
        }
        let vars: Vec<::minilp::Variable> = bounds
            .iter()
            .zip(&costs)
            .map(|(&(lower, upper), &cost)| lp.add_var(cost, (lower, upper)))
            .collect();

        for constraint in problem.constraints() {
            let rhs = constraint.effective_rhs();
            if constraint.expr.is_constant() {
                // 0 <relation> rhs
                let holds = match constraint.relation {
                    Relation::LessOrEqual => 0.0 <= rhs + OBJECTIVE_TOLERANCE,
                    Relation::GreaterOrEqual => 0.0 >= rhs - OBJECTIVE_TOLERANCE,
                    Relation::Equal => rhs.abs() <= OBJECTIVE_TOLERANCE,
                };
                if !holds {
                    return Err(SolverError::Infeasible);
                }
                continue;
            }

            let mut expr = ::minilp::LinearExpr::empty();
            for (var, coefficient) in constraint.expr.terms() {
                expr.add(vars[var.index()], coefficient);
            }
            let op = match constraint.relation {
                Relation::LessOrEqual => ComparisonOp::Le,
                Relation::GreaterOrEqual => ComparisonOp::Ge,
                Relation::Equal => ComparisonOp::Eq,
            };
            lp.add_constraint(expr, op, rhs);
        }

        match lp.solve() {
            Ok(solution) => {
                let values = vars.iter().map(|v| solution[*v]).collect();
                Ok(Solution::new(
                    values,
                    solution.objective() + problem.objective().constant(),
                ))
            }
            Err(::minilp::Error::Infeasible) => Err(SolverError::Infeasible),
            Err(::minilp::Error::Unbounded) => Err(SolverError::Unbounded),
        }
    }

    /// Integer variable whose relaxed value is the furthest from an integer
    fn most_fractional(&self, problem: &LinearProblem, solution: &Solution) -> Option<(usize, f64)> {
        problem
            .variables()
            .iter()
            .zip(solution.values())
            .enumerate()
            .filter(|(_, (def, _))| def.integer)
            .map(|(idx, (_, &value))| (idx, value, (value - value.round()).abs()))
            .filter(|(_, _, distance)| *distance > self.integrality_tolerance)
            .max_by(|a, b| a.2.total_cmp(&b.2))
            .map(|(idx, value, _)| (idx, value))
    }

    fn branch_and_bound(&self, problem: &LinearProblem) -> Result<Solution, SolverError> {
        let root: Vec<(f64, f64)> = problem
            .variables()
            .iter()
            .map(|def| {
                if def.integer {
                    (def.lower.ceil(), def.upper.floor())
                } else {
                    (def.lower, def.upper)
                }
            })
            .collect();

        let mut stack = vec![root];
        let mut incumbent: Option<Solution> = None;
        let mut nodes = 0usize;
        let mut truncated = false;

        while let Some(bounds) = stack.pop() {
            if nodes >= self.max_nodes {
                tracing::warn!(
                    nodes,
                    open_nodes = stack.len() + 1,
                    has_incumbent = incumbent.is_some(),
                    "branch and bound node limit reached"
                );
                truncated = true;
                break;
            }
            nodes += 1;

            if bounds.iter().any(|(lower, upper)| lower > upper) {
                continue;
            }

            let relaxed = match self.solve_relaxation(problem, &bounds) {
                Ok(solution) => solution,
                Err(SolverError::Infeasible) => continue,
                Err(e) => return Err(e),
            };

            if let Some(best) = &incumbent {
                if relaxed.objective() >= best.objective() - OBJECTIVE_TOLERANCE {
                    continue;
                }
            }

            match self.most_fractional(problem, &relaxed) {
                None => incumbent = Some(round_integers(problem, relaxed)),
                Some((idx, value)) => {
                    let mut down = bounds.clone();
                    down[idx].1 = value.floor();
                    let mut up = bounds;
                    up[idx].0 = value.ceil();

                    // The branch nearest to the relaxed value is explored first
                    if value - value.floor() < 0.5 {
                        stack.push(up);
                        stack.push(down);
                    } else {
                        stack.push(down);
                        stack.push(up);
                    }
                }
            }
        }

        tracing::debug!(nodes, "branch and bound finished");

        match incumbent {
            Some(solution) => Ok(solution),
            None if truncated => Err(SolverError::Backend(format!(
                "no integral solution found within {} nodes",
                self.max_nodes
            ))),
            None => Err(SolverError::Infeasible),
        }
    }
}

fn round_integers(problem: &LinearProblem, solution: Solution) -> Solution {
    let objective = solution.objective();
    let values = problem
        .variables()
        .iter()
        .zip(solution.values())
        .map(|(def, &value)| if def.integer { value.round() } else { value })
        .collect();
    Solution::new(values, objective)
}

impl SolverInterface for MiniLpSolver {
    fn name(&self) -> &'static str {
        "minilp"
    }

    fn solve(&self, problem: &LinearProblem) -> Result<Solution, SolverError> {
        if problem.has_integer_variables() {
            self.branch_and_bound(problem)
        } else {
            let bounds: Vec<(f64, f64)> = problem
                .variables()
                .iter()
                .map(|def| (def.lower, def.upper))
                .collect();
            if bounds.iter().any(|(lower, upper)| lower > upper) {
                return Err(SolverError::Infeasible);
            }
            self.solve_relaxation(problem, &bounds)
        }
    }
}
