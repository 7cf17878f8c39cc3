//! Query Module - Expression Compilation and Evaluation
//!
//! Query trees over index accesses and set operators:
//! - `Expr` - expression tree bound weakly to a database snapshot
//! - `compile` - one-pass optimizer (empty folding, single-operand collapse)
//! - `evaluate` - lazy (`NodeIter`) or eager (`NodeSeq`) evaluation
//!
//! Both evaluation modes yield the same nodes in document order without
//! duplicates, and abort with `Interrupted` once the query context is
//! cancelled.

pub mod access;
pub mod context;
pub mod expr;
pub mod iter;
mod optimize;
pub mod parallel;
mod set;

pub use access::IndexAccess;
pub use context::{CompileContext, Interrupt, QueryContext};
pub use expr::{Expr, NodeList, SetExpr, SetOp};
pub use iter::{NodeIter, NodeSeq};
pub use parallel::evaluate_parallel;

use crate::error::QueryResult;

/// Evaluation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    /// Pull nodes on demand
    #[default]
    Lazy,
    /// Materialize the whole result
    Eager,
}

/// Result of `evaluate`
pub enum Evaluation {
    Lazy(NodeIter),
    Eager(NodeSeq),
}

impl Evaluation {
    /// Materialize the result, draining a lazy iterator
    pub fn into_seq(self) -> QueryResult<NodeSeq> {
        match self {
            Evaluation::Lazy(iter) => iter.into_seq(),
            Evaluation::Eager(seq) => Ok(seq),
        }
    }
}

/// Optimize an expression tree
pub fn compile(expr: Expr, cc: &mut CompileContext) -> Expr {
    let expr = expr.optimize(cc);
    log::debug!("compiled query: {}", expr);
    expr
}

/// Evaluate a compiled expression
pub fn evaluate(expr: &Expr, mode: Mode, qc: &QueryContext) -> QueryResult<Evaluation> {
    log::trace!("evaluating {:?}: {}", mode, expr);
    match mode {
        Mode::Lazy => expr.iter(qc).map(Evaluation::Lazy),
        Mode::Eager => expr.value(qc).map(Evaluation::Eager),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::{Data, NodeTable, Pre, TableBuilder};
    use crate::error::ErrorKind;
    use crate::index::{IndexCursor, IndexToken, IndexType, StringRange, ValueIndex, VecCursor};
    use crate::options::Options;

    /// `<list>` with five items; text pres 4 "b", 7 "a", 10 "d", 12 "b", 14 "c",
    /// attribute pres 3 "x", 6 "y", 9 "x"
    pub(crate) fn table() -> NodeTable {
        let mut builder = TableBuilder::new("items.xml");
        builder.open_elem(b"list");
        let items = [
            (Some("x"), "b"),
            (Some("y"), "a"),
            (Some("x"), "d"),
            (None, "b"),
            (None, "c"),
        ];
        for (id, text) in items {
            builder.open_elem(b"item");
            if let Some(id) = id {
                builder.attribute(b"id", id.as_bytes()).unwrap();
            }
            builder.text(text.as_bytes());
            builder.close_elem().unwrap();
        }
        builder.close_elem().unwrap();
        builder.finish().unwrap()
    }

    pub(crate) fn fixture() -> Arc<Data> {
        fixture_with(Options::default())
    }

    pub(crate) fn fixture_with(options: Options) -> Arc<Data> {
        Arc::new(Data::new("db", table(), &options))
    }

    /// Index returning the same entries for every lookup
    pub(crate) struct BrokenIndex(pub(crate) Vec<Pre>);

    impl ValueIndex for BrokenIndex {
        fn enabled(&self, _kind: IndexType) -> bool {
            true
        }

        fn max_len(&self) -> usize {
            Options::default().maxlen
        }

        fn lookup(&self, _token: &IndexToken) -> Box<dyn IndexCursor + Send> {
            Box::new(VecCursor::new(self.0.clone()))
        }

        fn range(&self, _range: &StringRange) -> Box<dyn IndexCursor + Send> {
            Box::new(VecCursor::new(self.0.clone()))
        }
    }

    /// Index whose cursors cancel the query after yielding `after` entries
    pub(crate) struct CancellingIndex {
        interrupt: Interrupt,
        pres: Vec<Pre>,
        after: usize,
    }

    impl CancellingIndex {
        pub(crate) fn new(interrupt: Interrupt, pres: Vec<Pre>, after: usize) -> Self {
            CancellingIndex {
                interrupt,
                pres,
                after,
            }
        }

        fn cursor(&self) -> Box<dyn IndexCursor + Send> {
            Box::new(CancellingCursor {
                interrupt: self.interrupt.clone(),
                inner: VecCursor::new(self.pres.clone()),
                left: self.after,
            })
        }
    }

    impl ValueIndex for CancellingIndex {
        fn enabled(&self, _kind: IndexType) -> bool {
            true
        }

        fn max_len(&self) -> usize {
            Options::default().maxlen
        }

        fn lookup(&self, _token: &IndexToken) -> Box<dyn IndexCursor + Send> {
            self.cursor()
        }

        fn range(&self, _range: &StringRange) -> Box<dyn IndexCursor + Send> {
            self.cursor()
        }

        fn ordered_ranges(&self) -> bool {
            true
        }
    }

    struct CancellingCursor {
        interrupt: Interrupt,
        inner: VecCursor,
        left: usize,
    }

    impl IndexCursor for CancellingCursor {
        fn more(&mut self) -> bool {
            if !self.inner.more() {
                return false;
            }
            self.left = self.left.saturating_sub(1);
            if self.left == 0 {
                self.interrupt.cancel();
            }
            true
        }

        fn pre(&self) -> Pre {
            self.inner.pre()
        }
    }

    fn both(expr: &Expr, qc: &QueryContext) -> (Vec<Pre>, Vec<Pre>) {
        let lazy = evaluate(expr, Mode::Lazy, qc).unwrap().into_seq().unwrap();
        let eager = evaluate(expr, Mode::Eager, qc).unwrap().into_seq().unwrap();
        (lazy.pres(), eager.pres())
    }

    #[test]
    fn test_range_inclusivity() {
        let data = fixture();
        let qc = QueryContext::new();
        let mut cc = CompileContext::new();
        let range = |min_inclusive, max_inclusive| {
            StringRange::with_bounds(
                IndexType::Text,
                Some(&b"b"[..]),
                min_inclusive,
                Some(&b"d"[..]),
                max_inclusive,
            )
        };
        // wrapped in a union so the result is sorted
        let eval = |cc: &mut CompileContext, range| {
            let expr = compile(Expr::union(vec![Expr::range(&data, range), Expr::Empty]), cc);
            expr.value(&qc).unwrap().pres()
        };
        assert_eq!(eval(&mut cc, range(true, true)), vec![4, 10, 12, 14]);
        assert_eq!(eval(&mut cc, range(false, true)), vec![10, 14]);
        assert_eq!(eval(&mut cc, range(true, false)), vec![4, 12, 14]);
        assert_eq!(eval(&mut cc, range(false, false)), vec![14]);
    }

    #[test]
    fn test_lazy_and_eager_agree() {
        let data = fixture();
        let qc = QueryContext::new();
        let mut cc = CompileContext::new();
        let exprs = vec![
            Expr::text(&data, b"b"),
            Expr::range(&data, StringRange::new(IndexType::Attribute, b"x", b"y")),
            Expr::union(vec![
                Expr::range(&data, StringRange::new(IndexType::Text, b"c", b"d")),
                Expr::text(&data, b"a"),
                Expr::attribute(&data, b"y"),
            ]),
            Expr::intersect(vec![
                Expr::range(&data, StringRange::new(IndexType::Text, b"a", b"c")),
                Expr::text(&data, b"b"),
            ]),
            Expr::except(vec![
                Expr::nodes(&data, [14, 2, 4, 12]).unwrap(),
                Expr::text(&data, b"b"),
            ]),
        ];
        for expr in exprs {
            let compiled = compile(expr.clone(), &mut cc);
            let (lazy, eager) = both(&compiled, &qc);
            assert_eq!(lazy, eager, "{}", compiled);
            let (lazy, eager) = both(&expr, &qc);
            assert_eq!(lazy, eager, "{}", expr);
        }
    }

    #[test]
    fn test_index_and_scan_sets_agree() {
        let indexed = fixture();
        let scanned = fixture_with(Options {
            textindex: false,
            attrindex: false,
            ..Options::default()
        });
        let qc = QueryContext::new();
        let mut cc = CompileContext::new();
        let build = |data: &Arc<Data>| {
            Expr::union(vec![
                Expr::range(data, StringRange::new(IndexType::Text, b"b", b"c")),
                Expr::attribute(data, b"x"),
            ])
        };
        let a = compile(build(&indexed), &mut cc).value(&qc).unwrap().pres();
        let b = compile(build(&scanned), &mut cc).value(&qc).unwrap().pres();
        assert_eq!(a, b);
        assert_eq!(a, vec![3, 4, 9, 12, 14]);
    }

    #[test]
    fn test_store_unavailable_after_swap() {
        let mut current = fixture();
        let mut cc = CompileContext::new();
        let expr = compile(Expr::text(&current, b"b"), &mut cc);
        let qc = QueryContext::new();
        assert_eq!(expr.value(&qc).unwrap().len(), 2);

        current = fixture();
        assert_eq!(current.name(), "db");
        let err = evaluate(&expr, Mode::Lazy, &qc).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
        let err = evaluate(&expr, Mode::Eager, &qc).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::StoreUnavailable);
    }

    #[test]
    fn test_cancelled_before_evaluation() {
        let data = fixture();
        let qc = QueryContext::new();
        qc.interrupt().cancel();
        let expr = Expr::text(&data, b"b");
        assert_eq!(
            expr.value(&qc).unwrap_err().kind(),
            ErrorKind::Interrupted
        );
    }

    #[test]
    fn test_cancel_during_access() {
        let qc = QueryContext::new();
        let index = CancellingIndex::new(qc.interrupt().clone(), vec![4, 12], 1);
        let data = Arc::new(Data::with_index("db", table(), Box::new(index)));
        let expr = Expr::text(&data, b"b");

        let err = evaluate(&expr, Mode::Eager, &qc).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Interrupted);

        qc.interrupt().reset();
        let Evaluation::Lazy(mut iter) = evaluate(&expr, Mode::Lazy, &qc).unwrap() else {
            unreachable!()
        };
        assert_eq!(iter.next_node().unwrap_err().kind(), ErrorKind::Interrupted);
        assert!(iter.next_node().unwrap().is_none());
    }

    #[test]
    fn test_cancel_scan_without_hits() {
        let data = fixture_with(Options {
            textindex: false,
            ..Options::default()
        });
        let expr = Expr::text(&data, b"missing");
        let qc = QueryContext::new();
        assert!(expr.value(&qc).unwrap().is_empty());

        let Evaluation::Lazy(mut iter) = evaluate(&expr, Mode::Lazy, &qc).unwrap() else {
            unreachable!()
        };
        qc.interrupt().cancel();
        assert_eq!(iter.next_node().unwrap_err().kind(), ErrorKind::Interrupted);

        qc.interrupt().reset();
        let iter = expr.iter(&qc).unwrap();
        qc.interrupt().cancel();
        assert_eq!(iter.into_seq().unwrap_err().kind(), ErrorKind::Interrupted);
    }
}
