use std::fmt;

/// Innovation number of a neuron. Stable across re-transcriptions of the same genotype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronId(pub u64);

/// Innovation number of a connection. Correlates phenotype connections with their genes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u64);

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "c{}", self.0)
    }
}

/// Where a neuron sits in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NeuronKind {
    Input,
    Hidden,
    Output,
}

/// A neuron gene.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeGene {
    pub id: NeuronId,
    pub kind: NeuronKind,
    /// Registry name of the activation function.
    pub function: String,
    pub bias: f64,
}

impl NodeGene {
    pub fn input(id: u64) -> NodeGene {
        NodeGene { id: NeuronId(id), kind: NeuronKind::Input, function: "linear".to_owned(), bias: 0. }
    }

    pub fn hidden(id: u64, function: &str) -> NodeGene {
        NodeGene { id: NeuronId(id), kind: NeuronKind::Hidden, function: function.to_owned(), bias: 0. }
    }

    pub fn output(id: u64, function: &str) -> NodeGene {
        NodeGene { id: NeuronId(id), kind: NeuronKind::Output, function: function.to_owned(), bias: 0. }
    }

    pub fn with_bias(mut self, bias: f64) -> NodeGene {
        self.bias = bias;
        self
    }
}

/// A connection gene. Source and target live on the genome's graph edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionGene {
    /// The innovation number of that gene
    pub id: ConnectionId,
    /// The connection strength
    pub weight: f64,
    /// Whether the connection is expressed in the phenotype
    pub enabled: bool,
}

impl ConnectionGene {
    /// Create a new, enabled gene.
    pub fn new(id: u64, weight: f64) -> ConnectionGene {
        ConnectionGene { id: ConnectionId(id), weight, enabled: true }
    }

    /// Set gene enabled
    pub fn enable(&mut self) {
        self.enabled = true;
    }
    /// Set gene disabled
    pub fn disable(&mut self) {
        self.enabled = false;
    }
    /// Toggle the enable state
    pub fn toggle_enabled(&mut self) { self.enabled = !self.enabled; }
}
