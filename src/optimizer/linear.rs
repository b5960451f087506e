// SFC-Tree: Joint placement and multicast routing of service function chains
// Copyright (C) 2023 The SFC-Tree Authors
//
// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along
// with this program; if not, write to the Free Software Foundation, Inc.,
// 51 Franklin Street, Fifth Floor, Boston, MA 02110-1301 USA.

//! A linear model that is built once and can be turned into a CBC problem with different
//! objectives. This is needed for lexicographic optimization, where every priority level is solved
//! on the same set of variables and rows, extended by rows that lock the optimum of all higher
//! priority levels.

use good_lp::{
    constraint,
    solvers::coin_cbc::{coin_cbc as create_solver, CoinCbcProblem},
    variable, Expression, IntoAffineExpression, ProblemVariables, SolverModel, Variable,
    VariableDefinition,
};

/// A single row of the model, normalized such that the right-hand side is zero.
#[derive(Clone)]
enum Row {
    /// `expr <= 0`
    Leq(Expression),
    /// `expr == 0`
    Eq(Expression),
}

/// Variables and rows of a mixed-integer linear model.
pub(crate) struct LinearModel {
    /// Definitions of all variables, in the order they were created
    definitions: Vec<VariableDefinition>,
    /// Used to create the variable handles
    vars: ProblemVariables,
    /// All rows
    rows: Vec<Row>,
}

impl std::fmt::Debug for LinearModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "LinearModel({}x{})", self.num_rows(), self.num_cols())
    }
}

impl LinearModel {
    /// Create an empty model
    pub fn new() -> Self {
        Self {
            definitions: Vec::new(),
            vars: ProblemVariables::new(),
            rows: Vec::new(),
        }
    }

    /// Add a new variable
    pub fn add(&mut self, def: VariableDefinition) -> Variable {
        self.definitions.push(def.clone());
        self.vars.add(def)
    }

    /// Add a new binary variable
    pub fn binary(&mut self) -> Variable {
        self.add(variable().binary())
    }

    /// Add a new non-negative continuous variable
    pub fn non_negative(&mut self) -> Variable {
        self.add(variable().min(0))
    }

    /// Add a new integer variable with the given bounds
    pub fn integer(&mut self, min: f64, max: f64) -> Variable {
        self.add(variable().integer().min(min).max(max))
    }

    /// Add the row `a <= b`
    pub fn leq(&mut self, a: impl IntoAffineExpression, b: impl IntoAffineExpression) {
        self.rows
            .push(Row::Leq(a.into_expression() - b.into_expression()));
    }

    /// Add the row `a >= b`
    pub fn geq(&mut self, a: impl IntoAffineExpression, b: impl IntoAffineExpression) {
        self.rows
            .push(Row::Leq(b.into_expression() - a.into_expression()));
    }

    /// Add the row `a == b`
    pub fn eq(&mut self, a: impl IntoAffineExpression, b: impl IntoAffineExpression) {
        self.rows
            .push(Row::Eq(a.into_expression() - b.into_expression()));
    }

    /// Number of variables
    pub fn num_cols(&self) -> usize {
        self.definitions.len()
    }

    /// Number of rows
    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Create the CBC problem minimizing `objective`. Each entry `(expr, bound)` of `locks` adds
    /// the row `expr <= bound`.
    pub fn problem(&self, objective: &Expression, locks: &[(Expression, f64)]) -> CoinCbcProblem {
        let mut vars = ProblemVariables::new();
        for def in self.definitions.iter() {
            vars.add(def.clone());
        }

        let mut problem = create_solver(vars.minimise(objective.clone()));
        for row in self.rows.iter() {
            problem.add_constraint(match row {
                Row::Leq(e) => constraint!(e.clone() <= 0),
                Row::Eq(e) => constraint!(e.clone() == 0),
            });
        }
        for (e, bound) in locks {
            problem.add_constraint(constraint!(e.clone() <= *bound));
        }
        problem
    }
}
