//! Batched backpropagation as a mutation operator.
//!
//! The operator transcribes a genotype, runs every training sample forward and backward through
//! the network and, once the whole batch is through, adds the summed weight deltas to the
//! network and to the genotype. Only connection weights ever change.
use std::fmt;
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, trace, warn};
use ndarray_stats::DeviationExt;

use crate::backward::{saturate, BackwardPass, DeltaAccumulator};
use crate::config::BackpropConfig;
use crate::error::{Error, Result};
use crate::genome::ConnectionLookup;
use crate::mutation::{EvaluationContext, MutationOperator};
use crate::network::NeuralNetwork;
use crate::registry::FunctionRegistry;
use crate::training::TrainingData;
use crate::transcriber::{NetworkTranscriber, Transcriber};

/// Why an invocation left the genotype alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NoTrainingData,
    EmptyBatch,
    EmptyNetwork,
    /// Learning is restricted to the final run and the generation lies before it.
    OutsideFinalRun { remaining: u64, window: u64 },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoTrainingData => write!(f, "no training data"),
            SkipReason::EmptyBatch => write!(f, "empty batch"),
            SkipReason::EmptyNetwork => write!(f, "empty network"),
            SkipReason::OutsideFinalRun { remaining, window } => {
                write!(f, "{} generations left, learning only within the last {}", remaining, window)
            }
        }
    }
}

/// Summary of a completed batch.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LearningReport {
    pub samples: usize,
    /// Connections whose weight was changed
    pub updated_connections: usize,
    /// Recurrent connections the error signal was not propagated through
    pub truncated_connections: usize,
    /// Mean squared error of the batch before learning, if the network has outputs.
    pub loss: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Skipped(SkipReason),
    Trained(LearningReport),
}

impl Outcome {
    pub fn is_trained(&self) -> bool {
        matches!(self, Outcome::Trained(_))
    }

    pub fn report(&self) -> Option<&LearningReport> {
        match self {
            Outcome::Trained(report) => Some(report),
            Outcome::Skipped(_) => None,
        }
    }
}

/// Refines the weights of a genotype by gradient descent on the training data of the context.
#[derive(Debug, Clone)]
pub struct BackpropagationOperator<T = NetworkTranscriber> {
    config: BackpropConfig,
    transcriber: T,
}

impl BackpropagationOperator<NetworkTranscriber> {
    pub fn with_registry(config: BackpropConfig, registry: Arc<FunctionRegistry>) -> Result<Self> {
        Self::new(config, NetworkTranscriber::new(registry))
    }
}

impl<T: Transcriber> BackpropagationOperator<T> {
    /// Fails with an invalid configuration error if the configuration does not validate.
    pub fn new(config: BackpropConfig, transcriber: T) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, transcriber })
    }

    pub fn config(&self) -> &BackpropConfig {
        &self.config
    }

    pub fn transcriber(&self) -> &T {
        &self.transcriber
    }

    /// The training data to learn from, unless the context rules learning out.
    fn admit<'c>(
        &self,
        context: &EvaluationContext<'c>,
    ) -> std::result::Result<&'c (dyn TrainingData + Sync), SkipReason> {
        let data = context.training_data.ok_or(SkipReason::NoTrainingData)?;
        let remaining = context.generation.remaining();
        if self.config.final_run_only && remaining > self.config.final_run_window {
            return Err(SkipReason::OutsideFinalRun { remaining, window: self.config.final_run_window });
        }
        if data.is_empty() {
            return Err(SkipReason::EmptyBatch);
        }
        Ok(data)
    }

    /// Learn from the context's training data and write the result into `genotype`.
    ///
    /// A failed transcription is an invalid configuration. On any error the genotype is left
    /// untouched.
    pub fn learn(&self, context: &EvaluationContext<'_>, genotype: &mut T::Genotype) -> Result<Outcome> {
        let data = match self.admit(context) {
            Ok(data) => data,
            Err(reason) => {
                debug!("skipping backpropagation: {}", reason);
                return Ok(Outcome::Skipped(reason));
            }
        };

        let mut network = self.transcriber.transcribe(genotype).map_err(Error::transcription)?;
        if network.is_empty() {
            debug!("skipping backpropagation: {}", SkipReason::EmptyNetwork);
            return Ok(Outcome::Skipped(SkipReason::EmptyNetwork));
        }

        let (deltas, mut report) = self.train(&mut network, data)?;
        report.updated_connections = commit(&deltas, &mut network, genotype)?;
        debug!(
            "backpropagation over {} samples updated {} connections, loss before {:?}",
            report.samples, report.updated_connections, report.loss
        );
        Ok(Outcome::Trained(report))
    }

    /// Run the whole batch through `network` and return the summed deltas. No weight changes.
    ///
    /// The returned report has no updated connections yet; see [`commit`].
    pub fn train<N, D>(&self, network: &mut N, data: &D) -> Result<(DeltaAccumulator, LearningReport)>
    where
        N: NeuralNetwork + ?Sized,
        D: TrainingData + ?Sized,
    {
        let (inputs, targets) = (data.inputs(), data.targets());
        if inputs.ncols() != network.input_neurons().len() {
            return Err(Error::ShapeMismatch {
                what: "input columns",
                expected: network.input_neurons().len(),
                found: inputs.ncols(),
            });
        }
        if targets.ncols() != network.output_neurons().len() {
            return Err(Error::ShapeMismatch {
                what: "target columns",
                expected: network.output_neurons().len(),
                found: targets.ncols(),
            });
        }
        if inputs.nrows() != targets.nrows() {
            return Err(Error::ShapeMismatch { what: "target rows", expected: inputs.nrows(), found: targets.nrows() });
        }

        let pass = BackwardPass::build(&*network);
        let truncated = pass.recurrent_connections().len();
        if truncated > 0 {
            warn!("error signal truncated at {} recurrent connections", truncated);
        }

        let mut deltas = DeltaAccumulator::new();
        let mut loss = Some(0.);
        for (sample, (input, target)) in inputs.rows().into_iter().zip_eq(targets.rows()).enumerate() {
            let output = network.activate(input)?;
            let error = output.mean_sq_err(&target).ok();
            trace!("sample {}: squared error {:?}", sample, error);
            loss = loss.zip(error).map(|(sum, e)| sum + e);
            pass.run(network, target, self.config.learning_rate, &mut deltas)?;
        }

        let samples = inputs.nrows();
        let report = LearningReport {
            samples,
            updated_connections: 0,
            truncated_connections: truncated,
            loss: loss.filter(|_| samples > 0).map(|sum| sum / samples as f64),
        };
        Ok((deltas, report))
    }
}

/// Add every non-zero delta to the network and to the genotype.
///
/// All deltas are validated first: they must be finite and name a connection that exists in
/// both. If any fails, nothing is written. Updated weights saturate at `±f64::MAX`. Returns the number of updated connections.
pub fn commit<N, G>(deltas: &DeltaAccumulator, network: &mut N, genotype: &mut G) -> Result<usize>
where
    N: NeuralNetwork + ?Sized,
    G: ConnectionLookup + ?Sized,
{
    let updates: Vec<_> = deltas.non_zero().collect();
    for &(connection, delta) in &updates {
        if !delta.is_finite() {
            return Err(Error::NonFiniteGradient(connection));
        }
        if genotype.connection_weight(connection).is_none() {
            return Err(Error::MissingConnectionGene(connection));
        }
        if network.weight(connection).is_none() {
            return Err(Error::MissingConnection(connection));
        }
    }
    for &(connection, delta) in &updates {
        network.add_to_weight(connection, delta);
        if let Some(weight) = genotype.connection_weight_mut(connection) {
            *weight = saturate(*weight + delta);
        }
    }
    Ok(updates.len())
}

impl<T: Transcriber> MutationOperator<T::Genotype> for BackpropagationOperator<T> {
    fn mutate(&self, context: &EvaluationContext<'_>, genotype: &mut T::Genotype) -> Result<()> {
        self.learn(context, genotype).map(|_| ())
    }
}
