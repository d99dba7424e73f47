use crate::{
    attributes::{AttributeValue, Attributes},
    config::{MutationConfig, PopulateEntry},
};

/// The attribute changes applied to each worker before it is removed.
#[derive(Debug, Clone, Default)]
pub struct MutationPlan {
    clear: Vec<String>,
    delete: Vec<String>,
    populate: Vec<PopulateEntry>,
}

impl MutationPlan {
    pub fn new(config: &MutationConfig) -> Self {
        Self {
            clear: config.clear.clone(),
            delete: config.delete.clone(),
            populate: config.populate.clone(),
        }
    }

    /// True when the plan changes nothing; the update pass is skipped.
    pub fn is_noop(&self) -> bool {
        self.clear.is_empty() && self.delete.is_empty() && self.populate.is_empty()
    }

    /// Compute the new attributes: clear, then delete, then populate.
    pub fn apply(&self, current: &Attributes) -> Attributes {
        let mut next = current.clone();

        for key in &self.clear {
            if next.get(key).is_some_and(AttributeValue::is_truthy) {
                next.insert(key.as_str(), AttributeValue::from(""));
            }
        }

        for key in &self.delete {
            next.remove(key);
        }

        for entry in &self.populate {
            next.insert(entry.key.as_str(), AttributeValue::from(entry.value.as_str()));
        }

        next
    }
}
