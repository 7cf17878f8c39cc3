//! Set Operator Merge
//!
//! k-way merge over the operand streams of a union, intersection or
//! difference. Operands that are not iterable are materialized, sorted and
//! deduplicated on the first pull; all others are consumed one node ahead.

use super::context::QueryContext;
use super::expr::{SetExpr, SetOp};
use super::iter::{SeqIter, Source};
use crate::data::DbNode;
use crate::error::QueryResult;

/// One operand stream and its current head
struct Slot {
    source: Source,
    front: Option<DbNode>,
    sorted: bool,
}

impl Slot {
    #[inline]
    fn pull(&mut self, qc: &QueryContext, op: SetOp, operand: usize) -> QueryResult<()> {
        self.front = self
            .source
            .next(qc)
            .map_err(|err| err.in_operand(op, operand))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    /// Operands not yet read
    Filling,
    /// Every slot holds its head node
    Emitting,
    Exhausted,
}

pub(crate) struct SetIter {
    op: SetOp,
    slots: Vec<Slot>,
    state: MergeState,
}

impl SetIter {
    pub(crate) fn new(set: &SetExpr, qc: &QueryContext) -> QueryResult<Self> {
        let mut slots = Vec::with_capacity(set.operands.len());
        for (i, operand) in set.operands.iter().enumerate() {
            let source = operand
                .source(qc)
                .map_err(|err| err.in_operand(set.op, i))?;
            slots.push(Slot {
                source,
                front: None,
                sorted: operand.iterable(),
            });
        }
        Ok(SetIter {
            op: set.op,
            slots,
            state: MergeState::Filling,
        })
    }

    pub(crate) fn advance(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        loop {
            match self.state {
                MergeState::Filling => {
                    self.start(qc)?;
                    self.state = MergeState::Emitting;
                }
                MergeState::Emitting => {
                    let next = match self.op {
                        SetOp::Union => self.union(qc)?,
                        SetOp::Intersect => self.intersect(qc)?,
                        SetOp::Except => self.except(qc)?,
                    };
                    if next.is_none() {
                        self.state = MergeState::Exhausted;
                    }
                    return Ok(next);
                }
                MergeState::Exhausted => return Ok(None),
            }
        }
    }

    fn start(&mut self, qc: &QueryContext) -> QueryResult<()> {
        let op = self.op;
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if !slot.sorted {
                let mut nodes = slot
                    .source
                    .collect(qc)
                    .map_err(|err| err.in_operand(op, i))?;
                nodes.sort_unstable();
                nodes.dedup();
                slot.source = Source::Seq(SeqIter::new(nodes));
                slot.sorted = true;
            }
            slot.pull(qc, op, i)?;
        }
        Ok(())
    }

    /// Smallest head; every slot holding it moves on
    fn union(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        let op = self.op;
        let Some(min) = self.slots.iter().filter_map(|slot| slot.front).min() else {
            return Ok(None);
        };
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.front == Some(min) {
                slot.pull(qc, op, i)?;
            }
        }
        Ok(Some(min))
    }

    /// Node present at the head of every slot
    fn intersect(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        let op = self.op;
        loop {
            let mut max = None;
            for slot in &self.slots {
                match slot.front {
                    None => return Ok(None),
                    Some(node) => max = max.max(Some(node)),
                }
            }
            let Some(max) = max else {
                return Ok(None);
            };

            let mut equal = true;
            for (i, slot) in self.slots.iter_mut().enumerate() {
                if slot.front != Some(max) {
                    equal = false;
                    slot.pull(qc, op, i)?;
                }
            }
            if equal {
                for (i, slot) in self.slots.iter_mut().enumerate() {
                    slot.pull(qc, op, i)?;
                }
                return Ok(Some(max));
            }
        }
    }

    /// Head of the first slot unless another slot holds it
    fn except(&mut self, qc: &QueryContext) -> QueryResult<Option<DbNode>> {
        let op = self.op;
        loop {
            let Some((first, rest)) = self.slots.split_first_mut() else {
                return Ok(None);
            };
            let Some(node) = first.front else {
                return Ok(None);
            };
            let mut excluded = false;
            for (i, slot) in rest.iter_mut().enumerate() {
                while matches!(slot.front, Some(other) if other < node) {
                    slot.pull(qc, op, i + 1)?;
                }
                excluded |= slot.front == Some(node);
            }
            first.pull(qc, op, 0)?;
            if !excluded {
                return Ok(Some(node));
            }
        }
    }
}
