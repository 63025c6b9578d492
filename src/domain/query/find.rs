//! Options handed to the persistence layer for one fetch.

use super::predicate::{OrderSpec, Predicate};

/// Fully resolved fetch: filters, ordering and window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindOptions {
    pub predicates: Vec<Predicate>,
    pub orderings: Vec<OrderSpec>,
    pub skip: Option<u64>,
    pub take: Option<u64>,
}

impl FindOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn order_by(mut self, order: OrderSpec) -> Self {
        self.orderings.push(order);
        self
    }

    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }
}
