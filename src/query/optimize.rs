//! Optimizer
//!
//! Single bottom-up rewrite pass. Empty operands are folded away, set
//! operators reduced to one sorted operand are replaced by that operand, and
//! iterable flags are computed. The pass never fails; errors surface when the
//! rewritten tree is evaluated.

use super::context::CompileContext;
use super::expr::{Expr, SetExpr, SetOp};

impl Expr {
    pub(crate) fn optimize(self, cc: &mut CompileContext) -> Expr {
        match self {
            Expr::Access(access) => Expr::Access(access.optimize(cc)),
            Expr::Set(set) => set.optimize(cc),
            leaf => leaf,
        }
    }
}

impl SetExpr {
    fn optimize(self, cc: &mut CompileContext) -> Expr {
        let op = self.op;
        let operands: Vec<Expr> = self
            .operands
            .into_iter()
            .map(|operand| operand.optimize(cc))
            .collect();

        let mut kept = Vec::with_capacity(operands.len());
        for (i, operand) in operands.into_iter().enumerate() {
            if !operand.is_empty() {
                kept.push(operand);
                continue;
            }
            match op {
                SetOp::Intersect => {
                    cc.info(format!("simplifying {} with empty operand to ()", op));
                    return Expr::Empty;
                }
                SetOp::Except if i == 0 => {
                    cc.info(format!("simplifying {} of () to ()", op));
                    return Expr::Empty;
                }
                _ => cc.info(format!("removing () from {}", op)),
            }
        }

        match kept.len() {
            0 => Expr::Empty,
            1 if kept[0].iterable() => {
                cc.info(format!("simplifying single-operand {}", op));
                kept.pop().unwrap_or(Expr::Empty)
            }
            _ => Expr::Set(SetExpr {
                op,
                operands: kept,
                iterable: true,
            }),
        }
    }
}
