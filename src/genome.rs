use std::collections::{BTreeMap, HashMap};

use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use rand::Rng;

use crate::error::GraphError;
use crate::gene::{ConnectionGene, ConnectionId, NeuronId, NeuronKind, NodeGene};

/// Access to the authoritative connection weights of a genotype.
///
/// Learned deltas are written through this trait so that they are inherited by offspring and
/// not only applied to a throwaway phenotype.
pub trait ConnectionLookup {
    fn connection_weight(&self, id: ConnectionId) -> Option<f64>;

    fn connection_weight_mut(&mut self, id: ConnectionId) -> Option<&mut f64>;
}

/// The genome is represented as a graph of neuron genes and connection genes.
///
/// Input and output neurons keep the order in which they were added; that order defines the
/// layout of the network's input and output vectors.
#[derive(Debug, Clone, Default)]
pub struct Genome {
    graph: DiGraph<NodeGene, ConnectionGene>,
    nodes: HashMap<NeuronId, NodeIndex>,
    /// The connections of the graph in ascending innovation order
    connections: BTreeMap<ConnectionId, EdgeIndex>,
    inputs: Vec<NodeIndex>,
    outputs: Vec<NodeIndex>,
}

impl Genome {
    pub fn new() -> Genome {
        Genome::default()
    }

    /// Initialize a genome as a fully connected input/output graph with random weights in
    /// `[-1, 1)`.
    ///
    /// Neuron ids `0..inputs` are the inputs, `inputs..inputs + outputs` the outputs. Connection
    /// ids count up from 0, iterating outputs within inputs.
    pub fn fully_connected<R: Rng + ?Sized>(inputs: usize, outputs: usize, function: &str, rng: &mut R) -> Genome {
        let mut genome = Genome::new();
        for i in 0..inputs as u64 {
            genome.insert_node(NodeGene::input(i));
        }
        for o in inputs as u64..(inputs + outputs) as u64 {
            genome.insert_node(NodeGene::output(o, function));
        }
        let mut c = 0;
        for i in 0..inputs {
            for o in 0..outputs {
                let (source, target) = (genome.inputs[i], genome.outputs[o]);
                genome.insert_connection(source, target, ConnectionGene::new(c, rng.gen_range(-1.0..1.0)));
                c += 1;
            }
        }
        genome
    }

    /// Add a neuron gene. Fails if the innovation id is already taken.
    pub fn add_node(&mut self, gene: NodeGene) -> Result<(), GraphError> {
        if self.nodes.contains_key(&gene.id) {
            return Err(GraphError::DuplicateNeuron(gene.id));
        }
        self.insert_node(gene);
        Ok(())
    }

    /// Connect two existing neurons.
    ///  - The connection's innovation id must be new to this genome.
    ///  - Input neurons cannot be targets.
    pub fn connect(&mut self, source: NeuronId, target: NeuronId, gene: ConnectionGene) -> Result<(), GraphError> {
        if self.connections.contains_key(&gene.id) {
            return Err(GraphError::DuplicateConnection(gene.id));
        }
        let source = *self.nodes.get(&source).ok_or(GraphError::UnknownNeuron(source))?;
        let target_index = *self.nodes.get(&target).ok_or(GraphError::UnknownNeuron(target))?;
        if self.graph[target_index].kind == NeuronKind::Input {
            return Err(GraphError::InputTarget { connection: gene.id, neuron: target });
        }
        self.insert_connection(source, target_index, gene);
        Ok(())
    }

    fn insert_node(&mut self, gene: NodeGene) {
        let (id, kind) = (gene.id, gene.kind);
        let index = self.graph.add_node(gene);
        self.nodes.insert(id, index);
        match kind {
            NeuronKind::Input => self.inputs.push(index),
            NeuronKind::Output => self.outputs.push(index),
            NeuronKind::Hidden => {}
        }
    }

    fn insert_connection(&mut self, source: NodeIndex, target: NodeIndex, gene: ConnectionGene) {
        let id = gene.id;
        let edge = self.graph.add_edge(source, target, gene);
        self.connections.insert(id, edge);
    }

    /// Input neuron genes in input-vector order
    pub fn inputs(&self) -> impl Iterator<Item = &NodeGene> + '_ {
        self.inputs.iter().map(move |&i| &self.graph[i])
    }

    /// Output neuron genes in output-vector order
    pub fn outputs(&self) -> impl Iterator<Item = &NodeGene> + '_ {
        self.outputs.iter().map(move |&i| &self.graph[i])
    }

    /// All neuron genes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = &NodeGene> + '_ {
        self.graph.node_weights()
    }

    pub fn node(&self, id: NeuronId) -> Option<&NodeGene> {
        self.nodes.get(&id).map(|&i| &self.graph[i])
    }

    /// All connections as `(source, target, gene)` in ascending innovation order.
    pub fn connections(&self) -> impl Iterator<Item = (NeuronId, NeuronId, &ConnectionGene)> + '_ {
        self.connections.values().filter_map(move |&e| {
            let (source, target) = self.graph.edge_endpoints(e)?;
            Some((self.graph[source].id, self.graph[target].id, &self.graph[e]))
        })
    }

    pub fn connection(&self, id: ConnectionId) -> Option<&ConnectionGene> {
        self.connections.get(&id).map(|&e| &self.graph[e])
    }

    pub fn connection_mut(&mut self, id: ConnectionId) -> Option<&mut ConnectionGene> {
        let edge = *self.connections.get(&id)?;
        self.graph.edge_weight_mut(edge)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Total weights of all genes
    pub fn total_weights(&self) -> f64 {
        self.graph.edge_weights().map(|gene| gene.weight).sum()
    }
}

impl ConnectionLookup for Genome {
    fn connection_weight(&self, id: ConnectionId) -> Option<f64> {
        self.connection(id).map(|gene| gene.weight)
    }

    fn connection_weight_mut(&mut self, id: ConnectionId) -> Option<&mut f64> {
        self.connection_mut(id).map(|gene| &mut gene.weight)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn genomes_initialized_has_correct_neurons() {
        let mut rng = StdRng::seed_from_u64(7);
        let genome = Genome::fully_connected(2, 3, "sigmoid", &mut rng);
        assert_eq!(genome.node_count(), 5);
        assert_eq!(genome.connection_count(), 6);

        let ends: Vec<(u64, u64)> = genome.connections().map(|(s, t, _)| (s.0, t.0)).collect();
        assert_eq!(ends, vec![(0, 2), (0, 3), (0, 4), (1, 2), (1, 3), (1, 4)]);

        assert!(genome.outputs().all(|n| n.function == "sigmoid"));
        assert!(genome.connections().all(|(_, _, c)| (-1.0..1.0).contains(&c.weight)));
    }

    #[test]
    fn already_existing_gene_should_be_rejected() {
        let mut genome = Genome::new();
        genome.add_node(NodeGene::input(0)).unwrap();
        genome.add_node(NodeGene::output(1, "tanh")).unwrap();
        assert_eq!(genome.add_node(NodeGene::hidden(1, "tanh")), Err(GraphError::DuplicateNeuron(NeuronId(1))));

        genome.connect(NeuronId(0), NeuronId(1), ConnectionGene::new(0, 1.)).unwrap();
        assert_eq!(
            genome.connect(NeuronId(0), NeuronId(1), ConnectionGene::new(0, 2.)),
            Err(GraphError::DuplicateConnection(ConnectionId(0)))
        );
        assert_eq!(genome.connection_count(), 1);
    }

    #[test]
    fn connections_need_existing_non_input_targets() {
        let mut genome = Genome::new();
        genome.add_node(NodeGene::input(0)).unwrap();
        genome.add_node(NodeGene::output(1, "tanh")).unwrap();
        assert_eq!(
            genome.connect(NeuronId(0), NeuronId(9), ConnectionGene::new(0, 1.)),
            Err(GraphError::UnknownNeuron(NeuronId(9)))
        );
        assert_eq!(
            genome.connect(NeuronId(1), NeuronId(0), ConnectionGene::new(1, 1.)),
            Err(GraphError::InputTarget { connection: ConnectionId(1), neuron: NeuronId(0) })
        );
    }

    #[test]
    fn weights_should_be_writable_through_the_lookup() {
        let mut genome = Genome::new();
        genome.add_node(NodeGene::input(0)).unwrap();
        genome.add_node(NodeGene::output(1, "linear")).unwrap();
        genome.connect(NeuronId(0), NeuronId(1), ConnectionGene::new(4, 0.5)).unwrap();

        *genome.connection_weight_mut(ConnectionId(4)).unwrap() += 0.25;
        assert_eq!(genome.connection_weight(ConnectionId(4)), Some(0.75));
        assert_eq!(genome.connection_weight(ConnectionId(5)), None);
        assert!((genome.total_weights() - 0.75).abs() < f64::EPSILON);
    }
}
