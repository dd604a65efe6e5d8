//! Labelled data a network can be trained on.
use ndarray::{Array2, ArrayView2};

use crate::error::{Error, Result};

/// Ordered input rows and, row for row, the targets the network should produce for them.
pub trait TrainingData {
    fn inputs(&self) -> ArrayView2<'_, f64>;

    fn targets(&self) -> ArrayView2<'_, f64>;

    /// Number of samples
    fn len(&self) -> usize {
        self.inputs().nrows()
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An in-memory training set.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    inputs: Array2<f64>,
    targets: Array2<f64>,
}

impl TrainingSet {
    /// Pair `inputs` with `targets`. Both need the same number of rows.
    pub fn new(inputs: Array2<f64>, targets: Array2<f64>) -> Result<TrainingSet> {
        if inputs.nrows() != targets.nrows() {
            return Err(Error::ShapeMismatch {
                what: "target rows",
                expected: inputs.nrows(),
                found: targets.nrows(),
            });
        }
        Ok(TrainingSet { inputs, targets })
    }

    /// Build a training set from `(input, target)` rows. Every row needs the arity of the first.
    pub fn from_rows<I, T>(rows: &[(I, T)]) -> Result<TrainingSet>
    where
        I: AsRef<[f64]>,
        T: AsRef<[f64]>,
    {
        let n_in = rows.first().map_or(0, |(i, _)| i.as_ref().len());
        let n_out = rows.first().map_or(0, |(_, t)| t.as_ref().len());
        let mut inputs = Vec::with_capacity(rows.len() * n_in);
        let mut targets = Vec::with_capacity(rows.len() * n_out);
        for (input, target) in rows {
            let (input, target) = (input.as_ref(), target.as_ref());
            if input.len() != n_in {
                return Err(Error::ShapeMismatch { what: "input columns", expected: n_in, found: input.len() });
            }
            if target.len() != n_out {
                return Err(Error::ShapeMismatch { what: "target columns", expected: n_out, found: target.len() });
            }
            inputs.extend_from_slice(input);
            targets.extend_from_slice(target);
        }
        let inputs = Array2::from_shape_vec((rows.len(), n_in), inputs)
            .map_err(|_| Error::ShapeMismatch { what: "input columns", expected: n_in, found: 0 })?;
        let targets = Array2::from_shape_vec((rows.len(), n_out), targets)
            .map_err(|_| Error::ShapeMismatch { what: "target columns", expected: n_out, found: 0 })?;
        TrainingSet::new(inputs, targets)
    }
}

impl TrainingData for TrainingSet {
    fn inputs(&self) -> ArrayView2<'_, f64> {
        self.inputs.view()
    }

    fn targets(&self) -> ArrayView2<'_, f64> {
        self.targets.view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rows_should_stay_paired() {
        let set = TrainingSet::from_rows(&[([0., 1.], [1.]), ([1., 0.], [0.])]).unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(set.inputs(), array![[0., 1.], [1., 0.]]);
        assert_eq!(set.targets(), array![[1.], [0.]]);
    }

    #[test]
    fn row_counts_must_agree() {
        let err = TrainingSet::new(array![[0.], [1.]], array![[1.]]).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let rows: Vec<(Vec<f64>, Vec<f64>)> = vec![(vec![0., 1.], vec![1.]), (vec![1.], vec![0.])];
        let err = TrainingSet::from_rows(&rows).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { what: "input columns", expected: 2, found: 1 }));
    }

    #[test]
    fn empty_sets_are_allowed() {
        let rows: [([f64; 1], [f64; 1]); 0] = [];
        let set = TrainingSet::from_rows(&rows).unwrap();
        assert!(set.is_empty());
    }
}
