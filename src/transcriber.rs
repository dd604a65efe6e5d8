use std::sync::Arc;

use log::trace;

use crate::error::GraphError;
use crate::gene::NeuronKind;
use crate::genome::{ConnectionLookup, Genome};
use crate::network::{NeuralNetwork, Network};
use crate::registry::FunctionRegistry;

/// Turns a genotype into an evaluable network.
pub trait Transcriber {
    type Genotype: ConnectionLookup;
    type Network: NeuralNetwork;

    fn transcribe(&self, genotype: &Self::Genotype) -> Result<Self::Network, GraphError>;
}

/// Transcribes a [`Genome`] into a [`Network`], resolving function names through a registry.
///
/// Disabled connection genes are not expressed.
#[derive(Debug, Clone)]
pub struct NetworkTranscriber {
    registry: Arc<FunctionRegistry>,
}

impl NetworkTranscriber {
    pub fn new(registry: Arc<FunctionRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }
}

impl Transcriber for NetworkTranscriber {
    type Genotype = Genome;
    type Network = Network;

    fn transcribe(&self, genome: &Genome) -> Result<Network, GraphError> {
        let mut network = Network::new();
        // inputs and outputs first so the network keeps the genome's vector layout
        let hidden = genome.nodes().filter(|n| n.kind == NeuronKind::Hidden);
        let nodes = genome.inputs().chain(genome.outputs()).chain(hidden);
        for node in nodes {
            let function = self.registry.lookup(&node.function)?;
            network.add_neuron(node.id, node.kind, function, node.bias)?;
        }
        let mut expressed = 0;
        for (source, target, gene) in genome.connections() {
            if gene.enabled {
                network.connect(gene.id, source, target, gene.weight)?;
                expressed += 1;
            }
        }
        trace!(
            "transcribed {} neurons and {} of {} connections",
            network.neuron_count(),
            expressed,
            genome.connection_count()
        );
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UnknownFunction;
    use crate::gene::{ConnectionGene, ConnectionId, NeuronId, NodeGene};
    use ndarray::array;

    fn genome() -> Genome {
        let mut genome = Genome::new();
        genome.add_node(NodeGene::output(10, "linear")).unwrap();
        genome.add_node(NodeGene::hidden(5, "relu").with_bias(0.5)).unwrap();
        genome.add_node(NodeGene::input(0)).unwrap();
        genome.add_node(NodeGene::input(1)).unwrap();
        genome.connect(NeuronId(0), NeuronId(5), ConnectionGene::new(0, 1.)).unwrap();
        genome.connect(NeuronId(1), NeuronId(5), ConnectionGene::new(1, 1.)).unwrap();
        genome.connect(NeuronId(5), NeuronId(10), ConnectionGene::new(2, 2.)).unwrap();
        genome
    }

    #[test]
    fn transcription_should_keep_layout_and_weights() {
        let transcriber = NetworkTranscriber::new(Arc::new(FunctionRegistry::new()));
        let mut network = transcriber.transcribe(&genome()).unwrap();

        assert_eq!(network.input_neurons(), &[NeuronId(0), NeuronId(1)]);
        assert_eq!(network.output_neurons(), &[NeuronId(10)]);
        assert_eq!(network.neuron_count(), 4);
        assert_eq!(network.weight(ConnectionId(2)), Some(2.));
        // relu(1 + 2 + 0.5) * 2
        assert_eq!(network.activate(array![1., 2.].view()).unwrap()[0], 7.);
    }

    #[test]
    fn disabled_genes_are_not_expressed() {
        let mut genome = genome();
        genome.connection_mut(ConnectionId(1)).unwrap().disable();
        let network = NetworkTranscriber::new(Arc::new(FunctionRegistry::new())).transcribe(&genome).unwrap();
        assert_eq!(network.connection_count(), 2);
        assert_eq!(network.weight(ConnectionId(1)), None);
    }

    #[test]
    fn unknown_function_names_fail_transcription() {
        let mut genome = genome();
        genome.add_node(NodeGene::hidden(6, "softsign")).unwrap();
        let err = NetworkTranscriber::new(Arc::new(FunctionRegistry::new())).transcribe(&genome).unwrap_err();
        assert_eq!(err, GraphError::UnknownFunction(UnknownFunction("softsign".to_owned())));
    }
}
