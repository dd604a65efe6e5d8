//! Error types shared by the whole crate.
use thiserror::Error;

use crate::gene::{ConnectionId, NeuronId};

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// A function name that is not part of the registry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("could not find \"{0}\" activation function")]
pub struct UnknownFunction(pub String);

/// Structural problems while building a genome or transcribing it into a network.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error(transparent)]
    UnknownFunction(#[from] UnknownFunction),

    #[error("neuron {0} is defined twice")]
    DuplicateNeuron(NeuronId),

    #[error("connection {0} is defined twice")]
    DuplicateConnection(ConnectionId),

    #[error("neuron {0} does not exist")]
    UnknownNeuron(NeuronId),

    #[error("connection {connection} targets input neuron {neuron}")]
    InputTarget { connection: ConnectionId, neuron: NeuronId },
}

/// Errors raised by the learning operator and its collaborators.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    UnknownFunction(#[from] UnknownFunction),

    #[error(transparent)]
    Graph(#[from] GraphError),

    /// The operator is misconfigured or the genotype could not be transcribed.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration {
        reason: String,
        #[source]
        source: Option<GraphError>,
    },

    #[error("{what}: expected {expected} values, found {found}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("connection {0} has no gene in the genotype")]
    MissingConnectionGene(ConnectionId),

    #[error("connection {0} does not exist in the network")]
    MissingConnection(ConnectionId),

    /// A weight delta is NaN or infinite, which only NaN in the training data produces.
    #[error("non-finite gradient on connection {0}")]
    NonFiniteGradient(ConnectionId),

    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("could not parse configuration: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub(crate) fn invalid_configuration(reason: impl Into<String>) -> Self {
        Error::InvalidConfiguration { reason: reason.into(), source: None }
    }

    pub(crate) fn transcription(source: GraphError) -> Self {
        Error::InvalidConfiguration {
            reason: format!("could not transcribe genotype: {source}"),
            source: Some(source),
        }
    }

    /// True for configuration problems, including failed transcriptions.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Error::InvalidConfiguration { .. })
    }
}
