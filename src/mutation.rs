//! The seam through which the evolutionary loop invokes per-genotype operators.
use crate::error::Result;
use crate::training::TrainingData;

/// Position of the current generation within the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Generation {
    pub current: u64,
    pub max: u64,
}

impl Generation {
    pub fn new(current: u64, max: u64) -> Generation {
        Generation { current, max }
    }

    /// Generations left until the end of the run.
    pub fn remaining(&self) -> u64 {
        self.max.saturating_sub(self.current)
    }
}

/// What the evolutionary loop provides to an operator besides the genotype.
#[derive(Clone, Copy, Default)]
pub struct EvaluationContext<'a> {
    pub training_data: Option<&'a (dyn TrainingData + Sync)>,
    pub generation: Generation,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(generation: Generation) -> Self {
        EvaluationContext { training_data: None, generation }
    }

    pub fn with_training_data(mut self, data: &'a (dyn TrainingData + Sync)) -> Self {
        self.training_data = Some(data);
        self
    }
}

/// Changes a genotype in place.
pub trait MutationOperator<G> {
    fn mutate(&self, context: &EvaluationContext<'_>, genotype: &mut G) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::TrainingSet;
    use ndarray::array;

    #[test]
    fn remaining_generations_never_underflow() {
        assert_eq!(Generation::new(8, 10).remaining(), 2);
        assert_eq!(Generation::new(12, 10).remaining(), 0);
    }

    #[test]
    fn context_should_carry_training_data() {
        let set = TrainingSet::new(array![[1.]], array![[0.]]).unwrap();
        let context = EvaluationContext::new(Generation::new(1, 5));
        assert!(context.training_data.is_none());
        let context = context.with_training_data(&set);
        assert_eq!(context.training_data.map(|d| d.len()), Some(1));
    }
}
