//! The evaluable phenotype and the view of it the learning operator works against.
use std::collections::HashMap;

use ndarray::{Array1, ArrayView1};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent, EdgeRef};
use petgraph::Direction;

use crate::activation::ActivationFunction;
use crate::backward::saturate;
use crate::error::{Error, GraphError, Result};
use crate::gene::{ConnectionId, NeuronId, NeuronKind};

/// An incoming connection as seen from its target neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Link {
    pub id: ConnectionId,
    pub source: NeuronId,
    pub weight: f64,
}

/// What the last forward pass left on a neuron.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NeuronState {
    pub kind: NeuronKind,
    pub function: ActivationFunction,
    pub net_input: f64,
    pub value: f64,
}

/// Traversal and evaluation of a transcribed network.
///
/// The graph is exposed as incoming-edge lists only. Implementations must leave `net_input` and
/// `value` populated on every neuron they visit during [`activate`](Self::activate).
pub trait NeuralNetwork {
    /// Input neurons in input-vector order
    fn input_neurons(&self) -> &[NeuronId];

    /// Output neurons in output-vector order
    fn output_neurons(&self) -> &[NeuronId];

    /// Every neuron of the network
    fn neurons(&self) -> Vec<NeuronId>;

    /// Incoming connections of `neuron`, empty for unknown neurons.
    fn incoming(&self, neuron: NeuronId) -> Vec<Link>;

    fn state(&self, neuron: NeuronId) -> Option<NeuronState>;

    /// Run one forward pass and return the values of the output neurons.
    fn activate(&mut self, input: ArrayView1<'_, f64>) -> Result<Array1<f64>>;

    fn weight(&self, connection: ConnectionId) -> Option<f64>;

    /// Add `delta` to the weight of `connection`, saturating at `±f64::MAX`. Returns false if
    /// there is no such connection.
    fn add_to_weight(&mut self, connection: ConnectionId, delta: f64) -> bool;

    fn error_signal(&self, neuron: NeuronId) -> f64;

    fn set_error_signal(&mut self, neuron: NeuronId, signal: f64);

    fn reset_error_signals(&mut self);

    fn neuron_count(&self) -> usize {
        self.neurons().len()
    }

    fn is_empty(&self) -> bool {
        self.neuron_count() == 0
    }
}

#[derive(Debug, Clone)]
struct Neuron {
    id: NeuronId,
    kind: NeuronKind,
    function: ActivationFunction,
    bias: f64,
    net_input: f64,
    value: f64,
    error_signal: f64,
}

#[derive(Debug, Clone, Copy)]
struct Synapse {
    id: ConnectionId,
    weight: f64,
}

/// A network of neurons connected by weighted synapses, possibly recurrent.
///
/// Neurons are evaluated in a topological order of the graph without its back edges. A recurrent
/// connection therefore reads the value its source had at the end of the previous activation.
#[derive(Debug, Clone, Default)]
pub struct Network {
    graph: DiGraph<Neuron, Synapse>,
    neurons: HashMap<NeuronId, NodeIndex>,
    synapses: HashMap<ConnectionId, EdgeIndex>,
    inputs: Vec<NeuronId>,
    outputs: Vec<NeuronId>,
    /// Evaluation order, invalidated whenever the topology changes.
    order: Option<Vec<NodeIndex>>,
}

impl Network {
    pub fn new() -> Network {
        Network::default()
    }

    pub fn add_neuron(
        &mut self,
        id: NeuronId,
        kind: NeuronKind,
        function: ActivationFunction,
        bias: f64,
    ) -> std::result::Result<(), GraphError> {
        if self.neurons.contains_key(&id) {
            return Err(GraphError::DuplicateNeuron(id));
        }
        let index = self.graph.add_node(Neuron {
            id,
            kind,
            function,
            bias,
            net_input: 0.,
            value: 0.,
            error_signal: 0.,
        });
        self.neurons.insert(id, index);
        match kind {
            NeuronKind::Input => self.inputs.push(id),
            NeuronKind::Output => self.outputs.push(id),
            NeuronKind::Hidden => {}
        }
        self.order = None;
        Ok(())
    }

    pub fn connect(
        &mut self,
        id: ConnectionId,
        source: NeuronId,
        target: NeuronId,
        weight: f64,
    ) -> std::result::Result<(), GraphError> {
        if self.synapses.contains_key(&id) {
            return Err(GraphError::DuplicateConnection(id));
        }
        let s = *self.neurons.get(&source).ok_or(GraphError::UnknownNeuron(source))?;
        let t = *self.neurons.get(&target).ok_or(GraphError::UnknownNeuron(target))?;
        if self.graph[t].kind == NeuronKind::Input {
            return Err(GraphError::InputTarget { connection: id, neuron: target });
        }
        let edge = self.graph.add_edge(s, t, Synapse { id, weight });
        self.synapses.insert(id, edge);
        self.order = None;
        Ok(())
    }

    pub fn connection_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Forget the state of all neurons, including the values recurrent connections read.
    pub fn reset(&mut self) {
        for neuron in self.graph.node_weights_mut() {
            neuron.net_input = 0.;
            neuron.value = 0.;
            neuron.error_signal = 0.;
        }
    }

    /// Reverse post-order of a depth first search starting at the inputs. Back edges, i.e.
    /// recurrent connections, are ignored, so every feed-forward connection points forward.
    fn evaluation_order(&self) -> Vec<NodeIndex> {
        let mut starts: Vec<NodeIndex> = self.inputs.iter().map(|id| self.neurons[id]).collect();
        let mut rest: Vec<(NeuronId, NodeIndex)> = self.graph.node_indices().map(|i| (self.graph[i].id, i)).collect();
        rest.sort_unstable_by_key(|&(id, _)| id);
        starts.extend(rest.into_iter().map(|(_, i)| i));

        let mut finished = Vec::with_capacity(self.graph.node_count());
        depth_first_search(&self.graph, starts, |event| {
            if let DfsEvent::Finish(node, _) = event {
                finished.push(node);
            }
        });
        finished.reverse();
        finished.retain(|&i| self.graph[i].kind != NeuronKind::Input);
        finished
    }

    fn evaluate(&mut self, index: NodeIndex) {
        let mut signals: Vec<(ConnectionId, f64)> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| (edge.weight().id, edge.weight().weight * self.graph[edge.source()].value))
            .collect();
        // non-integrating functions depend on operand order
        signals.sort_unstable_by_key(|&(id, _)| id);
        let signals: Vec<f64> = signals.into_iter().map(|(_, signal)| signal).collect();

        let neuron = &mut self.graph[index];
        neuron.net_input = neuron.bias + signals.iter().sum::<f64>();
        neuron.value = if neuron.function.is_integrating() {
            neuron.function.apply(neuron.net_input)
        } else {
            neuron.function.apply_vector(&signals, neuron.bias)
        };
    }
}

impl NeuralNetwork for Network {
    fn input_neurons(&self) -> &[NeuronId] {
        &self.inputs
    }

    fn output_neurons(&self) -> &[NeuronId] {
        &self.outputs
    }

    fn neurons(&self) -> Vec<NeuronId> {
        self.graph.node_weights().map(|n| n.id).collect()
    }

    fn incoming(&self, neuron: NeuronId) -> Vec<Link> {
        let Some(&index) = self.neurons.get(&neuron) else {
            return Vec::new();
        };
        let mut links: Vec<Link> = self
            .graph
            .edges_directed(index, Direction::Incoming)
            .map(|edge| Link {
                id: edge.weight().id,
                source: self.graph[edge.source()].id,
                weight: edge.weight().weight,
            })
            .collect();
        links.sort_unstable_by_key(|link| link.id);
        links
    }

    fn state(&self, neuron: NeuronId) -> Option<NeuronState> {
        self.neurons.get(&neuron).map(|&i| {
            let n = &self.graph[i];
            NeuronState { kind: n.kind, function: n.function, net_input: n.net_input, value: n.value }
        })
    }

    fn activate(&mut self, input: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        if input.len() != self.inputs.len() {
            return Err(Error::ShapeMismatch { what: "network input", expected: self.inputs.len(), found: input.len() });
        }
        for (id, &x) in self.inputs.iter().zip(input.iter()) {
            let neuron = &mut self.graph[self.neurons[id]];
            neuron.net_input = x;
            neuron.value = x;
        }

        let order = match self.order.take() {
            Some(order) => order,
            None => self.evaluation_order(),
        };
        for &index in &order {
            self.evaluate(index);
        }
        self.order = Some(order);

        Ok(self.outputs.iter().map(|id| self.graph[self.neurons[id]].value).collect())
    }

    fn weight(&self, connection: ConnectionId) -> Option<f64> {
        self.synapses.get(&connection).map(|&e| self.graph[e].weight)
    }

    fn add_to_weight(&mut self, connection: ConnectionId, delta: f64) -> bool {
        match self.synapses.get(&connection) {
            Some(&edge) => {
                self.graph[edge].weight = saturate(self.graph[edge].weight + delta);
                true
            }
            None => false,
        }
    }

    fn error_signal(&self, neuron: NeuronId) -> f64 {
        self.neurons.get(&neuron).map_or(0., |&i| self.graph[i].error_signal)
    }

    fn set_error_signal(&mut self, neuron: NeuronId, signal: f64) {
        if let Some(&i) = self.neurons.get(&neuron) {
            self.graph[i].error_signal = signal;
        }
    }

    fn reset_error_signals(&mut self) {
        for neuron in self.graph.node_weights_mut() {
            neuron.error_signal = 0.;
        }
    }

    fn neuron_count(&self) -> usize {
        self.graph.node_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;
    use ActivationFunction::*;

    fn n(id: u64) -> NeuronId {
        NeuronId(id)
    }

    fn c(id: u64) -> ConnectionId {
        ConnectionId(id)
    }

    #[test]
    fn should_propagate_signal_without_hidden_layers() {
        let mut net = Network::new();
        net.add_neuron(n(0), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(1), NeuronKind::Output, Sigmoid, 0.).unwrap();
        net.connect(c(0), n(0), n(1), 0.5).unwrap();

        let out = net.activate(array![1.0].view()).unwrap();
        assert_abs_diff_eq!(out[0], Sigmoid.apply(0.5), epsilon = 1e-12);
        let state = net.state(n(1)).unwrap();
        assert_eq!(state.kind, NeuronKind::Output);
        assert_eq!(net.state(n(0)).map(|s| s.kind), Some(NeuronKind::Input));
        assert_abs_diff_eq!(state.net_input, 0.5);
        assert_abs_diff_eq!(state.value, out[0]);
    }

    #[test]
    fn should_propagate_signal_over_hidden_layers_in_any_insertion_order() {
        // hidden neuron added after the output it feeds
        let mut net = Network::new();
        net.add_neuron(n(0), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(1), NeuronKind::Output, Linear, 0.).unwrap();
        net.add_neuron(n(2), NeuronKind::Hidden, Linear, 1.).unwrap();
        net.connect(c(0), n(2), n(1), 3.).unwrap();
        net.connect(c(1), n(0), n(2), 2.).unwrap();

        let out = net.activate(array![0.5].view()).unwrap();
        // (0.5 * 2 + 1) * 3
        assert_abs_diff_eq!(out[0], 6.);
    }

    #[test]
    fn recurrent_connections_read_the_previous_value() {
        let mut net = Network::new();
        net.add_neuron(n(0), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(1), NeuronKind::Output, Linear, 0.).unwrap();
        net.connect(c(0), n(0), n(1), 1.).unwrap();
        net.connect(c(1), n(1), n(1), 0.5).unwrap();

        assert_abs_diff_eq!(net.activate(array![1.0].view()).unwrap()[0], 1.);
        assert_abs_diff_eq!(net.activate(array![1.0].view()).unwrap()[0], 1.5);
        net.reset();
        assert_abs_diff_eq!(net.activate(array![1.0].view()).unwrap()[0], 1.);
    }

    #[test]
    fn non_integrating_neurons_receive_signals_in_innovation_order() {
        let mut net = Network::new();
        net.add_neuron(n(0), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(1), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(2), NeuronKind::Output, Divide, 0.).unwrap();
        net.connect(c(7), n(1), n(2), 1.).unwrap();
        net.connect(c(3), n(0), n(2), 1.).unwrap();

        assert_abs_diff_eq!(net.activate(array![6., 3.].view()).unwrap()[0], 2.);
        assert_eq!(net.activate(array![6., 0.].view()).unwrap()[0], f32::MAX as f64);
    }

    #[test]
    fn wrong_input_arity_is_rejected() {
        let mut net = Network::new();
        net.add_neuron(n(0), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(1), NeuronKind::Output, Linear, 0.).unwrap();
        let err = net.activate(array![1., 2.].view()).unwrap_err();
        assert!(matches!(err, Error::ShapeMismatch { expected: 1, found: 2, .. }));
    }

    #[test]
    fn weights_and_error_signals_are_addressable() {
        let mut net = Network::new();
        net.add_neuron(n(0), NeuronKind::Input, Linear, 0.).unwrap();
        net.add_neuron(n(1), NeuronKind::Output, Tanh, 0.).unwrap();
        net.connect(c(0), n(0), n(1), 0.25).unwrap();
        assert_eq!(
            net.connect(c(0), n(0), n(1), 0.25),
            Err(GraphError::DuplicateConnection(c(0)))
        );

        assert!(net.add_to_weight(c(0), 0.5));
        assert!(!net.add_to_weight(c(1), 0.5));
        assert_eq!(net.weight(c(0)), Some(0.75));

        net.set_error_signal(n(1), -0.3);
        assert_eq!(net.error_signal(n(1)), -0.3);
        net.reset_error_signals();
        assert_eq!(net.error_signal(n(1)), 0.);

        assert_eq!(net.incoming(n(1)), vec![Link { id: c(0), source: n(0), weight: 0.75 }]);
        assert!(net.incoming(n(9)).is_empty());
    }
}
