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

//! OR tools and utilities to create MILP systems.

use good_lp::{Expression, IntoAffineExpression, Variable};

use super::linear::LinearModel;

/// Connect an aggregate binary variable with its disaggregated parts. For each part `a_i`, this
/// creates the following constraints:
///
/// ```text
/// a_i <= x
/// x <= a_1 + a_2 + ... + a_n
/// ```
///
/// As a result, `x` is set if and only if any of the parts is set. Both directions are necessary:
/// without the first, a part could be used without its aggregate being accounted for, and without
/// the second, the aggregate could be set without being used by any part. If there are no parts,
/// the aggregate is forced to zero.
pub(crate) fn c_aggregate(
    model: &mut LinearModel,
    x: impl IntoAffineExpression + Clone,
    parts: Vec<Expression>,
) {
    let x = || x.clone().into_expression();
    let mut sum = Expression::from(0);
    for a_i in parts {
        model.leq(a_i.clone(), x());
        sum += a_i;
    }
    model.leq(x(), sum);
}

/// Make `x` an upper bound of all `values`:
///
/// ```text
/// x >= a_i
/// ```
///
/// If `x` is minimized, it takes the value of the maximum.
pub(crate) fn c_upper_bound(
    model: &mut LinearModel,
    x: Variable,
    values: impl IntoIterator<Item = Expression>,
) {
    for a_i in values {
        model.geq(x, a_i);
    }
}

/// Make `x` a lower bound of all `values`:
///
/// ```text
/// x <= a_i
/// ```
///
/// If `x` is maximized (or `-x` minimized), it takes the value of the minimum.
pub(crate) fn c_lower_bound(
    model: &mut LinearModel,
    x: Variable,
    values: impl IntoIterator<Item = Expression>,
) {
    for a_i in values {
        model.leq(x, a_i);
    }
}

/// Require that exactly one of the expressions is set:
///
/// ```text
/// a_1 + a_2 + ... + a_n == 1
/// ```
pub(crate) fn c_exactly_one(model: &mut LinearModel, values: impl IntoIterator<Item = Expression>) {
    let sum: Expression = values.into_iter().sum();
    model.eq(sum, 1);
}

/// Sum `coef * var` over all pairs.
pub(crate) fn weighted_sum<'a>(terms: impl IntoIterator<Item = (f64, &'a Variable)>) -> Expression {
    terms
        .into_iter()
        .fold(Expression::from(0), |acc, (c, v)| acc + c * *v)
}
