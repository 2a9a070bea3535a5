//! Visitor pattern over expression trees
//!
//! Implementors override the per-kind methods they care about; the default
//! [`Visitor::visit_expression`] dispatches through [`walk_expression`].

use crate::{
    BinaryOpExpr, ChildAccess, Expression, FunctionCall, IndexerExpr, UnaryOpExpr, VariableRef,
};
use octofhir_fhirpath_types::Value;

/// Read-only visitor producing one result per node
pub trait Visitor: Sized {
    type Result;

    fn visit_expression(&mut self, expr: &Expression) -> Self::Result {
        walk_expression(self, expr)
    }

    fn visit_constant(&mut self, value: &Value) -> Self::Result;

    fn visit_variable(&mut self, var: &VariableRef) -> Self::Result;

    fn visit_child(&mut self, access: &ChildAccess) -> Self::Result;

    fn visit_indexer(&mut self, indexer: &IndexerExpr) -> Self::Result;

    fn visit_unary(&mut self, unary: &UnaryOpExpr) -> Self::Result;

    fn visit_binary(&mut self, binary: &BinaryOpExpr) -> Self::Result;

    fn visit_function(&mut self, call: &FunctionCall) -> Self::Result;

    fn visit_empty(&mut self) -> Self::Result;
}

/// Dispatch `expr` to the matching visitor method
pub fn walk_expression<V: Visitor>(visitor: &mut V, expr: &Expression) -> V::Result {
    match expr {
        Expression::Constant(value) => visitor.visit_constant(value),
        Expression::Variable(var) => visitor.visit_variable(var),
        Expression::Child(access) => visitor.visit_child(access),
        Expression::Indexer(indexer) => visitor.visit_indexer(indexer),
        Expression::Unary(unary) => visitor.visit_unary(unary),
        Expression::Binary(binary) => visitor.visit_binary(binary),
        Expression::Function(call) => visitor.visit_function(call),
        Expression::Empty => visitor.visit_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryOp;

    /// Counts nodes
    struct NodeCounter;

    impl Visitor for NodeCounter {
        type Result = usize;

        fn visit_constant(&mut self, _: &Value) -> usize {
            1
        }

        fn visit_variable(&mut self, _: &VariableRef) -> usize {
            1
        }

        fn visit_child(&mut self, access: &ChildAccess) -> usize {
            1 + access.focus.as_ref().map_or(0, |f| self.visit_expression(f))
        }

        fn visit_indexer(&mut self, indexer: &IndexerExpr) -> usize {
            1 + self.visit_expression(&indexer.focus) + self.visit_expression(&indexer.index)
        }

        fn visit_unary(&mut self, unary: &UnaryOpExpr) -> usize {
            1 + self.visit_expression(&unary.operand)
        }

        fn visit_binary(&mut self, binary: &BinaryOpExpr) -> usize {
            1 + self.visit_expression(&binary.left) + self.visit_expression(&binary.right)
        }

        fn visit_function(&mut self, call: &FunctionCall) -> usize {
            let focus = call.focus.as_ref().map_or(0, |f| self.visit_expression(f));
            1 + focus
                + call
                    .arguments
                    .iter()
                    .map(|a| self.visit_expression(a))
                    .sum::<usize>()
        }

        fn visit_empty(&mut self) -> usize {
            1
        }
    }

    #[test]
    fn test_walk_counts_every_node() {
        let expr = Expression::path("a.b").method(
            "where",
            vec![Expression::binary(
                Expression::this(),
                BinaryOp::Greater,
                Expression::constant(2),
            )],
        );
        // a, .b, where, >, $this, 2
        assert_eq!(NodeCounter.visit_expression(&expr), 6);
    }
}
