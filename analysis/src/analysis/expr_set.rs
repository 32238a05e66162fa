//! Set algebra over [`Expression`]s
//!
//! Sets stay tiny (bounded by the distinct subexpressions of one function),
//! so they are plain vectors scanned linearly. Insertion order carries no
//! meaning; equality is set equality.

use super::expression::Expression;
use crate::ir::IrId;
use tracing::trace;

#[derive(Debug, Clone, Default)]
pub struct ExpressionSet {
    items: Vec<Expression>,
}

impl ExpressionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, expr: &Expression) -> bool {
        self.items.iter().any(|e| e == expr)
    }

    /// Insert unless an equal element is present. Returns whether it was added.
    pub fn insert(&mut self, expr: Expression) -> bool {
        if self.contains(&expr) {
            return false;
        }
        self.items.push(expr);
        true
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Expression> {
        self.items.iter()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// `self := self ∪ other`
    pub fn union_with(&mut self, other: &ExpressionSet) {
        for expr in other.iter() {
            self.insert(*expr);
        }
        trace!("union -> {} elements", self.len());
    }

    /// `self := self ∩ other`
    pub fn intersect_with(&mut self, other: &ExpressionSet) {
        self.items.retain(|e| other.contains(e));
        trace!("intersect -> {} elements", self.len());
    }

    /// `self := self − other`
    pub fn difference_with(&mut self, other: &ExpressionSet) {
        self.items.retain(|e| !other.contains(e));
    }

    /// Elements with `location` as either operand.
    pub fn referencing(&self, location: IrId) -> ExpressionSet {
        self.items
            .iter()
            .filter(|e| e.references(location))
            .copied()
            .collect()
    }
}

impl PartialEq for ExpressionSet {
    /// Same cardinality and every element of `self` found in `other`.
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.items.iter().all(|e| other.contains(e))
    }
}

impl Eq for ExpressionSet {}

impl FromIterator<Expression> for ExpressionSet {
    fn from_iter<I: IntoIterator<Item = Expression>>(iter: I) -> Self {
        let mut set = ExpressionSet::new();
        for expr in iter {
            set.insert(expr);
        }
        set
    }
}

impl<'a> IntoIterator for &'a ExpressionSet {
    type Item = &'a Expression;
    type IntoIter = std::slice::Iter<'a, Expression>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
