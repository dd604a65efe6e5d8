//! Local learning for networks evolved with `NeuroEvolution` of Augmenting Topologies [NEAT]
//! (http://nn.cs.utexas.edu/downloads/papers/stanley.ec02.pdf)
//!
//! Evolved networks are neither layered nor guaranteed to be acyclic. The
//! [`BackpropagationOperator`] finds a propagation order by traversing the transcribed network,
//! sums the weight deltas of a whole batch and writes them back to the genotype, so that learned
//! weights are inherited.
//!
//! ```
//! use std::sync::Arc;
//!
//! use ndarray::array;
//! use neat_backprop::{
//!     BackpropConfig, BackpropagationOperator, ConnectionGene, ConnectionId, EvaluationContext,
//!     FunctionRegistry, Generation, Genome, NeuronId, NodeGene, TrainingSet,
//! };
//!
//! let mut genome = Genome::new();
//! genome.add_node(NodeGene::input(0)).unwrap();
//! genome.add_node(NodeGene::output(1, "sigmoid")).unwrap();
//! genome.connect(NeuronId(0), NeuronId(1), ConnectionGene::new(0, 0.5)).unwrap();
//!
//! let data = TrainingSet::new(array![[1.]], array![[1.]]).unwrap();
//! let context = EvaluationContext::new(Generation::new(0, 100)).with_training_data(&data);
//! let config = BackpropConfig::default().with_learning_rate(0.1);
//! let operator = BackpropagationOperator::with_registry(config, Arc::new(FunctionRegistry::new())).unwrap();
//!
//! assert!(operator.learn(&context, &mut genome).unwrap().is_trained());
//! assert!(genome.connection(ConnectionId(0)).unwrap().weight > 0.5);
//! ```
pub use self::activation::ActivationFunction;
pub use self::backprop::{commit, BackpropagationOperator, LearningReport, Outcome, SkipReason};
pub use self::backward::{BackwardPass, DeltaAccumulator};
pub use self::config::BackpropConfig;
pub use self::error::{Error, GraphError, Result, UnknownFunction};
pub use self::gene::{ConnectionGene, ConnectionId, NeuronId, NeuronKind, NodeGene};
pub use self::genome::{ConnectionLookup, Genome};
pub use self::mutation::{EvaluationContext, Generation, MutationOperator};
pub use self::network::{Link, NeuralNetwork, Network, NeuronState};
pub use self::registry::FunctionRegistry;
pub use self::training::{TrainingData, TrainingSet};
pub use self::transcriber::{NetworkTranscriber, Transcriber};

pub mod activation;
pub mod backprop;
pub mod backward;
pub mod config;
pub mod error;
pub mod gene;
pub mod genome;
pub mod mutation;
pub mod network;
pub mod registry;
pub mod training;
pub mod transcriber;
