//! Parallel Query Evaluation
//!
//! Uses Rayon to evaluate independent queries against the same snapshot.
//! Each query is still evaluated single-threaded; all of them observe the
//! same interrupt handle.

use rayon::prelude::*;

use super::context::QueryContext;
use super::expr::Expr;
use super::iter::NodeSeq;
use crate::error::QueryResult;

/// Evaluate multiple compiled expressions in parallel
pub fn evaluate_parallel(exprs: &[Expr], qc: &QueryContext) -> Vec<QueryResult<NodeSeq>> {
    exprs.par_iter().map(|expr| expr.value(qc)).collect()
}

/// Evaluate expressions whose construction may have failed; failures keep their slot
pub fn evaluate_all(
    exprs: Vec<QueryResult<Expr>>,
    qc: &QueryContext,
) -> Vec<QueryResult<NodeSeq>> {
    exprs
        .into_par_iter()
        .map(|expr| expr.and_then(|expr| expr.value(qc)))
        .collect()
}

/// Evaluate keyed expressions in parallel; fails with the first error
pub fn evaluate_keyed<'q>(
    queries: &'q [(String, Expr)],
    qc: &QueryContext,
) -> QueryResult<Vec<(&'q str, NodeSeq)>> {
    queries
        .par_iter()
        .map(|(key, expr)| expr.value(qc).map(|nodes| (key.as_str(), nodes)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::query::tests::fixture;

    #[test]
    fn test_parallel_eval() {
        let data = fixture();
        let exprs = [
            Expr::text(&data, b"a"),
            Expr::text(&data, b"b"),
            Expr::attribute(&data, b"x"),
        ];
        let results = evaluate_parallel(&exprs, &QueryContext::new());
        let pres: Vec<Vec<u32>> = results.into_iter().map(|r| r.unwrap().pres()).collect();
        assert_eq!(pres, vec![vec![7], vec![4, 12], vec![3, 9]]);
    }

    #[test]
    fn test_failures_keep_slots() {
        let data = fixture();
        let exprs = vec![
            Expr::nodes(&data, [99]),
            Ok(Expr::text(&data, b"c")),
            Expr::nodes(&data, [1, 2]),
        ];
        let results = evaluate_all(exprs, &QueryContext::new());
        assert_eq!(results[0].as_ref().unwrap_err().kind(), ErrorKind::InvalidNode);
        assert_eq!(results[1].as_ref().unwrap().pres(), vec![14]);
        assert_eq!(results[2].as_ref().unwrap().pres(), vec![1, 2]);
    }

    #[test]
    fn test_keyed_cancelled() {
        let data = fixture();
        let queries = [
            ("a".to_string(), Expr::text(&data, b"a")),
            ("b".to_string(), Expr::text(&data, b"b")),
        ];
        let qc = QueryContext::new();
        let results = evaluate_keyed(&queries, &qc).unwrap();
        assert_eq!(results[0].0, "a");
        assert_eq!(results[1].1.pres(), vec![4, 12]);

        qc.interrupt().cancel();
        let err = evaluate_keyed(&queries, &qc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Interrupted);
    }
}
