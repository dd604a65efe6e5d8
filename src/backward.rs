//! Error propagation over an arbitrary network graph.
//!
//! The pass is split in two. [`BackwardPass::build`] walks the network once from its outputs
//! and fixes the order in which error signals are computed, together with the downstream and
//! upstream connections of every neuron. [`BackwardPass::run`] then replays that order for each
//! training sample and accumulates weight deltas, without touching any weight.
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use ndarray::ArrayView1;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{depth_first_search, DfsEvent, EdgeRef};
use petgraph::Direction;

use crate::error::{Error, Result};
use crate::gene::{ConnectionId, NeuronId, NeuronKind};
use crate::network::{Link, NeuralNetwork};

/// Clamp to the finite range of `f64`. NaN stays NaN.
pub(crate) fn saturate(x: f64) -> f64 {
    x.clamp(-f64::MAX, f64::MAX)
}

/// Weight deltas summed over a whole batch, keyed by connection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaAccumulator {
    deltas: BTreeMap<ConnectionId, f64>,
}

impl DeltaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, connection: ConnectionId, delta: f64) {
        let sum = self.deltas.entry(connection).or_insert(0.);
        *sum = saturate(*sum + delta);
    }

    /// The accumulated delta of `connection`, zero if it was never touched.
    pub fn get(&self, connection: ConnectionId) -> f64 {
        self.deltas.get(&connection).copied().unwrap_or(0.)
    }

    /// All touched connections in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (ConnectionId, f64)> + '_ {
        self.deltas.iter().map(|(&id, &delta)| (id, delta))
    }

    /// Touched connections whose delta did not cancel out.
    pub fn non_zero(&self) -> impl Iterator<Item = (ConnectionId, f64)> + '_ {
        self.iter().filter(|&(_, delta)| delta != 0.)
    }

    pub fn len(&self) -> usize {
        self.deltas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deltas.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Step {
    neuron: NeuronId,
    /// Column of the target row for output neurons
    target: Option<usize>,
    /// Feed-forward connections leaving the neuron: `(connection, target)`
    downstream: Vec<(ConnectionId, NeuronId)>,
    /// Connections entering the neuron: `(connection, source)`
    upstream: Vec<(ConnectionId, NeuronId)>,
}

/// The order and adjacency the error signals are propagated along.
///
/// Only neurons from which an output can be reached take part. Connections that close a cycle
/// when searching depth first from the outputs are recurrent: they still get a delta at their
/// target, but their target's error signal is not passed back through them.
///
/// The index holds the topology only. Weights are read from the network on every
/// [`run`](Self::run), so a pass stays valid across weight updates but not across topology
/// changes.
#[derive(Debug, Clone)]
pub struct BackwardPass {
    steps: Vec<Step>,
    outputs: usize,
    recurrent: BTreeSet<ConnectionId>,
}

impl BackwardPass {
    /// Index `network` for error propagation.
    pub fn build<N: NeuralNetwork + ?Sized>(network: &N) -> BackwardPass {
        let is_input = |id: NeuronId| network.state(id).map_or(false, |s| s.kind == NeuronKind::Input);

        // reversed network: every edge points from a connection's target to its source
        let mut graph: DiGraph<NeuronId, Link> = DiGraph::new();
        let mut indices: HashMap<NeuronId, NodeIndex> = HashMap::new();
        let mut queue: VecDeque<NeuronId> = VecDeque::new();
        let mut starts = Vec::with_capacity(network.output_neurons().len());
        for &output in network.output_neurons() {
            let index = *indices.entry(output).or_insert_with(|| graph.add_node(output));
            starts.push(index);
            queue.push_back(output);
        }
        while let Some(neuron) = queue.pop_front() {
            if is_input(neuron) {
                continue;
            }
            let target = indices[&neuron];
            for link in network.incoming(neuron) {
                let source = *indices.entry(link.source).or_insert_with(|| {
                    queue.push_back(link.source);
                    graph.add_node(link.source)
                });
                graph.add_edge(target, source, link);
            }
        }

        let mut recurrent = BTreeSet::new();
        let mut finished = Vec::with_capacity(graph.node_count());
        depth_first_search(&graph, starts, |event| match event {
            DfsEvent::BackEdge(u, v) => recurrent.extend(graph.edges_connecting(u, v).map(|e| e.weight().id)),
            DfsEvent::Finish(n, _) => finished.push(n),
            _ => {}
        });
        // reverse post-order: every neuron comes after all neurons it feeds forward into
        finished.reverse();

        let columns: HashMap<NeuronId, usize> =
            network.output_neurons().iter().enumerate().map(|(column, &id)| (id, column)).collect();
        let steps = finished
            .into_iter()
            .filter(|&i| !is_input(graph[i]))
            .map(|i| {
                let mut downstream: Vec<(ConnectionId, NeuronId)> = graph
                    .edges_directed(i, Direction::Incoming)
                    .filter(|e| !recurrent.contains(&e.weight().id))
                    .map(|e| (e.weight().id, graph[e.source()]))
                    .collect();
                downstream.sort_unstable_by_key(|&(id, _)| id);
                let mut upstream: Vec<(ConnectionId, NeuronId)> =
                    graph.edges(i).map(|e| (e.weight().id, e.weight().source)).collect();
                upstream.sort_unstable_by_key(|&(id, _)| id);
                Step { neuron: graph[i], target: columns.get(&graph[i]).copied(), downstream, upstream }
            })
            .collect();

        BackwardPass { steps, outputs: columns.len(), recurrent }
    }

    /// Neurons in the order their error signals are computed, outputs first.
    pub fn order(&self) -> impl Iterator<Item = NeuronId> + '_ {
        self.steps.iter().map(|step| step.neuron)
    }

    /// Connections whose error signal is truncated.
    pub fn recurrent_connections(&self) -> &BTreeSet<ConnectionId> {
        &self.recurrent
    }

    /// Propagate the error of the last forward pass against `target` and add the resulting
    /// weight deltas to `deltas`.
    ///
    /// Error signals are reset first and left on the network afterwards. Neurons without a
    /// derivative keep a zero error signal and their incoming connections get no delta.
    ///
    /// Error signals and deltas saturate at `±f64::MAX`, so bounded activations far out in
    /// their range never overflow. Only a NaN, which needs NaN in the data, is an error.
    pub fn run<N: NeuralNetwork + ?Sized>(
        &self,
        network: &mut N,
        target: ArrayView1<'_, f64>,
        learning_rate: f64,
        deltas: &mut DeltaAccumulator,
    ) -> Result<()> {
        if target.len() != self.outputs {
            return Err(Error::ShapeMismatch { what: "network target", expected: self.outputs, found: target.len() });
        }
        network.reset_error_signals();
        for step in &self.steps {
            let Some(state) = network.state(step.neuron) else {
                continue;
            };
            let Some(slope) = state.function.derivative(state.net_input) else {
                continue;
            };
            let error = match step.target {
                Some(column) => saturate(state.value - target[column]),
                None => step.downstream.iter().fold(0., |sum, &(connection, downstream)| {
                    let weight = network.weight(connection).unwrap_or(0.);
                    saturate(sum + saturate(weight * network.error_signal(downstream)))
                }),
            };
            let signal = saturate(slope * error);
            network.set_error_signal(step.neuron, signal);

            let step_size = saturate(-learning_rate * signal);
            for &(connection, source) in &step.upstream {
                let value = network.state(source).map_or(0., |s| s.value);
                let delta = saturate(step_size * value);
                if delta.is_nan() {
                    return Err(Error::NonFiniteGradient(connection));
                }
                deltas.add(connection, delta);
            }
        }
        Ok(())
    }
}
