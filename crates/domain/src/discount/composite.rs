use crate::order::{Money, Order};

use super::DiscountRule;

/// A named group of rules whose contribution is the sum of its members.
///
/// Implements [`DiscountRule`] itself, so groups nest.
#[derive(Debug, Default)]
pub struct DiscountComposite {
    name: String,
    rules: Vec<Box<dyn DiscountRule>>,
}

impl DiscountComposite {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rules: Vec::new(),
        }
    }

    /// Adds a rule to the group.
    pub fn add(&mut self, rule: impl DiscountRule + 'static) {
        self.rules.push(Box::new(rule));
    }

    /// Builder form of [`add`](Self::add).
    pub fn with(mut self, rule: impl DiscountRule + 'static) -> Self {
        self.add(rule);
        self
    }

    /// Names of the member rules, in insertion order.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl DiscountRule for DiscountComposite {
    fn name(&self) -> &str {
        &self.name
    }

    fn calculate(&self, order: &Order) -> Money {
        self.rules.iter().map(|rule| rule.calculate(order)).sum()
    }
}
