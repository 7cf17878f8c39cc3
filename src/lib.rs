//! RustyXDB - Index-backed query evaluation over XML node tables
//!
//! Components:
//! - `data`: node table, snapshots and the update lock
//! - `index`: text and attribute value indexes, cursors and scan fallback
//! - `query`: expression trees, optimizer, set operators, lazy/eager evaluation
//! - `database`: named database with snapshot swapping on `add`
//!
//! The crate is usable as a plain Rust library and as an Elixir NIF
//! (`RustyXdb.Native`).

use rustler::{Atom, Encoder, Env, NifResult, ResourceArc, Term};

pub mod data;
pub mod database;
pub mod error;
pub mod index;
pub mod options;
pub mod query;
mod resource;
mod term;

pub use data::{Data, DataRef, DbNode, NodeKind, NodeStore, NodeTable, Pre, TableBuilder};
pub use database::Database;
pub use error::{ErrorKind, QueryError, QueryResult, UpdateError, UpdateResult};
pub use options::Options;
pub use query::{compile, evaluate, CompileContext, Evaluation, Expr, Interrupt, Mode, QueryContext};

use resource::{DatabaseRef, DatabaseResource};
use term::{
    bytes_to_binary, nodes_to_term, node_to_term, option_error_to_term, query_error_to_term,
    update_error_to_term, FragmentTerm, QueryTerm,
};

// ============================================================================
// Allocator Configuration
// ============================================================================

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

// ============================================================================
// Database Lifecycle
// ============================================================================

/// Create an empty database (returns {:ok, db} or {:error, reason})
#[rustler::nif]
fn db_new<'a>(env: Env<'a>, name: String, options: Vec<(String, String)>) -> NifResult<Term<'a>> {
    let options = match Options::from_pairs(options.iter().map(|(k, v)| (k.as_str(), v.as_str()))) {
        Ok(options) => options,
        Err(e) => return Ok(option_error_to_term(env, &e)),
    };
    match Database::create(&name, options) {
        Ok(db) => {
            let arc = ResourceArc::new(DatabaseResource::new(db));
            Ok((term::ok(), arc).encode(env))
        }
        Err(e) => Ok(update_error_to_term(env, &e)),
    }
}

/// Add a document fragment under a path (returns {:ok, info} or {:error, reason})
#[rustler::nif(schedule = "DirtyCpu")]
fn db_add<'a>(
    env: Env<'a>,
    db_ref: DatabaseRef,
    path: String,
    fragment: FragmentTerm,
) -> NifResult<Term<'a>> {
    let mut builder = TableBuilder::with_options(&path, db_ref.db.options());
    if let Err(e) = fragment.build(&mut builder) {
        return Ok(update_error_to_term(env, &e.into()));
    }
    let result = builder
        .finish()
        .map_err(UpdateError::from)
        .and_then(|table| db_ref.db.add(&path, &table));
    match result {
        Ok(info) => Ok((term::ok(), info).encode(env)),
        Err(e) => Ok(update_error_to_term(env, &e)),
    }
}

/// Database summary: {name, nodes, documents, [{option, value}]}
#[rustler::nif]
fn db_info<'a>(env: Env<'a>, db_ref: DatabaseRef) -> NifResult<Term<'a>> {
    let db = &db_ref.db;
    let data = db.data();
    let options: Vec<(&str, String)> = Options::names()
        .into_iter()
        .filter_map(|name| db.options().get(name).map(|value| (name, value)))
        .collect();
    let documents = data.table().documents().count();
    Ok((db.name(), data.store().size(), documents, options).encode(env))
}

/// Node at a pre value of the current snapshot, or nil
#[rustler::nif]
fn db_node<'a>(env: Env<'a>, db_ref: DatabaseRef, pre: Pre) -> NifResult<Term<'a>> {
    let data = db_ref.db.data();
    Ok(node_to_term(env, &data, pre))
}

/// Cancel all queries running against the database
#[rustler::nif]
fn db_cancel(db_ref: DatabaseRef) -> Atom {
    db_ref.cancel();
    term::ok()
}

/// Supported option names, sorted
#[rustler::nif]
fn option_names() -> Vec<&'static str> {
    Options::names()
}

// ============================================================================
// Query Evaluation
// ============================================================================

/// Compile and evaluate a query tree (returns {:ok, nodes} or {:error, reason})
#[rustler::nif(schedule = "DirtyCpu")]
fn db_query<'a>(env: Env<'a>, db_ref: DatabaseRef, query: QueryTerm, mode: Atom) -> NifResult<Term<'a>> {
    let mode = if mode == term::lazy() {
        Mode::Lazy
    } else if mode == term::eager() {
        Mode::Eager
    } else {
        return Err(rustler::Error::BadArg);
    };
    let data = db_ref.db.data();
    let qc = db_ref.query_context();
    let result = query.bind(&data).and_then(|expr| {
        let expr = compile(expr, &mut CompileContext::new());
        evaluate(&expr, mode, &qc)?.into_seq()
    });
    match result {
        Ok(nodes) => Ok((term::ok(), nodes_to_term(env, &data, &nodes.pres())).encode(env)),
        Err(e) => Ok(query_error_to_term(env, &e)),
    }
}

/// Evaluate multiple query trees in parallel against the same snapshot
#[rustler::nif(schedule = "DirtyCpu")]
fn db_query_parallel<'a>(
    env: Env<'a>,
    db_ref: DatabaseRef,
    queries: Vec<QueryTerm>,
) -> NifResult<Term<'a>> {
    let data = db_ref.db.data();
    let qc = db_ref.query_context();
    let mut cc = CompileContext::new();
    let exprs: Vec<_> = queries
        .into_iter()
        .map(|query| query.bind(&data).map(|expr| compile(expr, &mut cc)))
        .collect();

    let results = query::parallel::evaluate_all(exprs, &qc);
    let mut list = Term::list_new_empty(env);
    for result in results.into_iter().rev() {
        let item = match result {
            Ok(nodes) => (term::ok(), nodes_to_term(env, &data, &nodes.pres())).encode(env),
            Err(e) => query_error_to_term(env, &e),
        };
        list = list.list_prepend(item);
    }
    Ok(list)
}

/// Evaluate named query trees in parallel (returns {:ok, [{key, nodes}]} or {:error, reason})
#[rustler::nif(schedule = "DirtyCpu")]
fn db_query_keyed<'a>(
    env: Env<'a>,
    db_ref: DatabaseRef,
    queries: Vec<(String, QueryTerm)>,
) -> NifResult<Term<'a>> {
    let data = db_ref.db.data();
    let qc = db_ref.query_context();
    let mut cc = CompileContext::new();
    let queries = match queries
        .into_iter()
        .map(|(key, query)| query.bind(&data).map(|expr| (key, compile(expr, &mut cc))))
        .collect::<QueryResult<Vec<_>>>()
    {
        Ok(queries) => queries,
        Err(e) => return Ok(query_error_to_term(env, &e)),
    };

    match query::parallel::evaluate_keyed(&queries, &qc) {
        Ok(results) => {
            let mut list = Term::list_new_empty(env);
            for (key, nodes) in results.into_iter().rev() {
                let item = (key, nodes_to_term(env, &data, &nodes.pres())).encode(env);
                list = list.list_prepend(item);
            }
            Ok((term::ok(), list).encode(env))
        }
        Err(e) => Ok(query_error_to_term(env, &e)),
    }
}

/// Compile a query tree and describe the result: {:ok, {expr, plan, [info]}}
#[rustler::nif]
fn db_explain<'a>(env: Env<'a>, db_ref: DatabaseRef, query: QueryTerm) -> NifResult<Term<'a>> {
    let data = db_ref.db.data();
    match query.bind(&data) {
        Ok(expr) => {
            let mut cc = CompileContext::new();
            let expr = compile(expr, &mut cc);
            let infos: Vec<Term<'a>> = cc
                .infos()
                .iter()
                .map(|info| bytes_to_binary(env, info.as_bytes()))
                .collect();
            let description = (
                bytes_to_binary(env, expr.to_string().as_bytes()),
                bytes_to_binary(env, expr.plan().as_bytes()),
                infos,
            );
            Ok((term::ok(), description).encode(env))
        }
        Err(e) => Ok(query_error_to_term(env, &e)),
    }
}

// ============================================================================
// NIF Initialization
// ============================================================================

rustler::init!("Elixir.RustyXdb.Native");
