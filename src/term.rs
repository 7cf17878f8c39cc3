//! Elixir Term Conversion Utilities
//!
//! Decodes query trees and document fragments from Elixir terms and encodes
//! nodes and errors back.

use std::sync::Arc;

use rustler::types::tuple::get_tuple;
use rustler::{Atom, Binary, Decoder, Encoder, Env, Error, NewBinary, NifResult, Term};

use crate::data::{Data, NodeKind, NodeStore, Pre, TableBuilder};
use crate::error::{BuildError, ErrorKind, OptionError, QueryError, QueryResult, UpdateError};
use crate::index::{IndexType, StringRange};
use crate::query::{Expr, SetOp};

// Pre-defined atoms for efficiency - created once at compile time
rustler::atoms! {
    ok,
    error,
    nil,
    lazy,
    eager,
    empty,
    text,
    attribute,
    text_range,
    attribute_range,
    nodes,
    union,
    intersect,
    except,
    comment,
    pi,
    document,
    element,
    processing_instruction,
    invalid_token,
    store_unavailable,
    interrupted,
    index_inconsistent,
    invalid_node,
    name_invalid,
    busy,
    build,
    unknown_option,
    invalid_value,
}

/// Query tree decoded from a term, not yet bound to a snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTerm {
    Empty,
    Text(Vec<u8>),
    Attribute(Vec<u8>),
    Range(StringRange),
    Nodes(Vec<Pre>),
    Set(SetOp, Vec<QueryTerm>),
}

impl QueryTerm {
    /// Build the expression against a snapshot
    pub fn bind(self, data: &Arc<Data>) -> QueryResult<Expr> {
        match self {
            QueryTerm::Empty => Ok(Expr::Empty),
            QueryTerm::Text(value) => Ok(Expr::text(data, &value)),
            QueryTerm::Attribute(value) => Ok(Expr::attribute(data, &value)),
            QueryTerm::Range(range) => Ok(Expr::range(data, range)),
            QueryTerm::Nodes(pres) => Expr::nodes(data, pres),
            QueryTerm::Set(op, operands) => {
                let operands = operands
                    .into_iter()
                    .map(|operand| operand.bind(data))
                    .collect::<QueryResult<Vec<_>>>()?;
                Ok(Expr::set(op, operands))
            }
        }
    }
}

impl<'a> Decoder<'a> for QueryTerm {
    fn decode(term: Term<'a>) -> NifResult<Self> {
        if term.is_atom() {
            return if term.decode::<Atom>()? == empty() {
                Ok(QueryTerm::Empty)
            } else {
                Err(Error::BadArg)
            };
        }
        let items = get_tuple(term)?;
        let (tag, args) = items.split_first().ok_or(Error::BadArg)?;
        let tag: Atom = tag.decode()?;
        match args {
            [value] if tag == text() => Ok(QueryTerm::Text(bytes(*value)?)),
            [value] if tag == attribute() => Ok(QueryTerm::Attribute(bytes(*value)?)),
            [min, max, min_inclusive, max_inclusive] if tag == text_range() => Ok(QueryTerm::Range(
                decode_range(IndexType::Text, *min, *max, *min_inclusive, *max_inclusive)?,
            )),
            [min, max, min_inclusive, max_inclusive] if tag == attribute_range() => {
                Ok(QueryTerm::Range(decode_range(
                    IndexType::Attribute,
                    *min,
                    *max,
                    *min_inclusive,
                    *max_inclusive,
                )?))
            }
            [pres] if tag == nodes() => Ok(QueryTerm::Nodes(pres.decode()?)),
            [operands] => {
                let op = if tag == union() {
                    SetOp::Union
                } else if tag == intersect() {
                    SetOp::Intersect
                } else if tag == except() {
                    SetOp::Except
                } else {
                    return Err(Error::BadArg);
                };
                Ok(QueryTerm::Set(op, operands.decode()?))
            }
            _ => Err(Error::BadArg),
        }
    }
}

/// Range bound: a binary, or `nil` for unbounded
fn bound(term: Term) -> NifResult<Option<Vec<u8>>> {
    if is_tag(term, nil()) {
        Ok(None)
    } else {
        bytes(term).map(Some)
    }
}

fn decode_range(
    kind: IndexType,
    min: Term,
    max: Term,
    min_inclusive: Term,
    max_inclusive: Term,
) -> NifResult<StringRange> {
    let min = bound(min)?;
    let max = bound(max)?;
    Ok(StringRange::with_bounds(
        kind,
        min.as_deref(),
        min_inclusive.decode()?,
        max.as_deref(),
        max_inclusive.decode()?,
    ))
}

fn is_tag(term: Term, tag: Atom) -> bool {
    term.decode::<Atom>().is_ok_and(|atom| atom == tag)
}

fn bytes(term: Term) -> NifResult<Vec<u8>> {
    Ok(term.decode::<Binary>()?.as_slice().to_vec())
}

/// Document fragment decoded from a term
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentTerm {
    Element {
        name: Vec<u8>,
        attributes: Vec<(Vec<u8>, Vec<u8>)>,
        children: Vec<FragmentTerm>,
    },
    Text(Vec<u8>),
    Comment(Vec<u8>),
    ProcessingInstruction(Vec<u8>, Vec<u8>),
}

impl FragmentTerm {
    /// Append this fragment to a builder
    pub fn build(&self, builder: &mut TableBuilder) -> Result<(), BuildError> {
        match self {
            FragmentTerm::Element {
                name,
                attributes,
                children,
            } => {
                builder.open_elem(name);
                for (name, value) in attributes {
                    builder.attribute(name, value)?;
                }
                for child in children {
                    child.build(builder)?;
                }
                builder.close_elem()
            }
            FragmentTerm::Text(value) => {
                builder.text(value);
                Ok(())
            }
            FragmentTerm::Comment(value) => {
                builder.comment(value);
                Ok(())
            }
            FragmentTerm::ProcessingInstruction(target, data) => {
                builder.processing_instruction(target, data);
                Ok(())
            }
        }
    }
}

impl<'a> Decoder<'a> for FragmentTerm {
    fn decode(term: Term<'a>) -> NifResult<Self> {
        if term.is_binary() {
            return Ok(FragmentTerm::Text(bytes(term)?));
        }
        let items = get_tuple(term)?;
        match items.as_slice() {
            [tag, value] if is_tag(*tag, comment()) => {
                Ok(FragmentTerm::Comment(bytes(*value)?))
            }
            [tag, target, data] if is_tag(*tag, pi()) => Ok(
                FragmentTerm::ProcessingInstruction(bytes(*target)?, bytes(*data)?),
            ),
            [name, attributes, children] => {
                let attributes: Vec<(Binary, Binary)> = attributes.decode()?;
                Ok(FragmentTerm::Element {
                    name: bytes(*name)?,
                    attributes: attributes
                        .into_iter()
                        .map(|(name, value)| (name.as_slice().to_vec(), value.as_slice().to_vec()))
                        .collect(),
                    children: children.decode()?,
                })
            }
            _ => Err(Error::BadArg),
        }
    }
}

/// Convert a node to `{kind, pre, name, value}`
pub fn node_to_term<'a>(env: Env<'a>, data: &Data, pre: Pre) -> Term<'a> {
    let store = data.store();
    if pre as usize >= store.size() {
        return nil().encode(env);
    }
    let kind = store.kind(pre);
    let kind_atom = match kind {
        NodeKind::Document => document(),
        NodeKind::Element => element(),
        NodeKind::Text => text(),
        NodeKind::Attribute => attribute(),
        NodeKind::Comment => comment(),
        NodeKind::ProcessingInstruction => processing_instruction(),
    };
    let name = match store.name(pre) {
        Some(name) => bytes_to_binary(env, name),
        None => nil().encode(env),
    };
    let value = match kind {
        NodeKind::Element => nil().encode(env),
        NodeKind::Attribute => bytes_to_binary(env, store.text(pre, false)),
        _ => bytes_to_binary(env, store.text(pre, true)),
    };
    (kind_atom, pre, name, value).encode(env)
}

/// Convert a list of pre values to a list of node terms
pub fn nodes_to_term<'a>(env: Env<'a>, data: &Data, pres: &[Pre]) -> Term<'a> {
    let mut list = Term::list_new_empty(env);
    for &pre in pres.iter().rev() {
        list = list.list_prepend(node_to_term(env, data, pre));
    }
    list
}

/// `{:error, {kind, message}}` for a query error
pub fn query_error_to_term<'a>(env: Env<'a>, err: &QueryError) -> Term<'a> {
    let kind = match err.kind() {
        ErrorKind::InvalidToken => invalid_token(),
        ErrorKind::StoreUnavailable => store_unavailable(),
        ErrorKind::Interrupted => interrupted(),
        ErrorKind::IndexInconsistent => index_inconsistent(),
        ErrorKind::InvalidNode => invalid_node(),
    };
    error_to_term(env, kind, &err.to_string())
}

/// `{:error, {kind, message}}` for an update error
pub fn update_error_to_term<'a>(env: Env<'a>, err: &UpdateError) -> Term<'a> {
    let kind = match err {
        UpdateError::NameInvalid(_) => name_invalid(),
        UpdateError::Busy(_) => busy(),
        UpdateError::Build(_) => build(),
    };
    error_to_term(env, kind, &err.to_string())
}

/// `{:error, {kind, message}}` for an option error
pub fn option_error_to_term<'a>(env: Env<'a>, err: &OptionError) -> Term<'a> {
    let kind = match err {
        OptionError::Unknown(_) => unknown_option(),
        OptionError::InvalidValue { .. } => invalid_value(),
    };
    error_to_term(env, kind, &err.to_string())
}

fn error_to_term<'a>(env: Env<'a>, kind: Atom, message: &str) -> Term<'a> {
    (error(), (kind, bytes_to_binary(env, message.as_bytes()))).encode(env)
}

/// Convert bytes to a binary term (more efficient than .encode())
#[inline]
pub fn bytes_to_binary<'a>(env: Env<'a>, bytes: &[u8]) -> Term<'a> {
    let mut binary = NewBinary::new(env, bytes.len());
    binary.as_mut_slice().copy_from_slice(bytes);
    binary.into()
}
