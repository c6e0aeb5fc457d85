//! A generic dependency-respecting graph walker: emits each node only once
//! every one of its out-edges (its dependencies) has finished, with an
//! explicit cancellation signal (spec §4.6, §5).

use std::{collections::HashMap, hash::Hash};

use futures::{future::join_all, stream::FuturesUnordered, StreamExt};
use petgraph::{
    visit::{IntoNeighborsDirected, IntoNodeIdentifiers},
    Direction,
};
use tokio::{
    sync::{broadcast, mpsc, oneshot, watch},
    task::JoinHandle,
};
use tracing::trace;

pub struct Walker<N, S> {
    marker: std::marker::PhantomData<S>,
    cancel: watch::Sender<bool>,
    node_events: Option<mpsc::Receiver<(N, oneshot::Sender<()>)>>,
    join_handles: FuturesUnordered<JoinHandle<()>>,
}

pub struct Start;
pub struct Walking;

pub type WalkMessage<N> = (N, oneshot::Sender<()>);

// Every petgraph node id is Copy + Eq + Hash already (`GraphBase`
// guarantees it); Send + 'static just lets the per-node futures spawn.
impl<N: Eq + Hash + Copy + Send + 'static> Walker<N, Start> {
    /// Creates a walker for a DAG that emits nodes only once all of their
    /// dependencies have been processed. The graph must not be modified
    /// after a walker is created from it — emitted nodes, and the edges
    /// used to gate them, are captured at construction time.
    pub fn new<G: IntoNodeIdentifiers<NodeId = N> + IntoNeighborsDirected>(graph: G) -> Self {
        let (cancel, cancel_rx) = watch::channel(false);
        let mut txs = HashMap::new();
        let mut rxs = HashMap::new();
        for node in graph.node_identifiers() {
            // Each node finishes at most once, so capacity 1 suffices.
            let (tx, rx) = broadcast::channel::<()>(1);
            txs.insert(node, tx);
            rxs.insert(node, rx);
        }
        // At most txs.len() nodes will ever be emitted, so this never blocks.
        let (node_tx, node_rx) = mpsc::channel(std::cmp::max(txs.len(), 1));
        let join_handles = FuturesUnordered::new();
        for node in graph.node_identifiers() {
            let tx = txs.remove(&node).expect("should have sender for all nodes");
            let mut cancel_rx = cancel_rx.clone();
            let node_tx = node_tx.clone();
            let mut deps_rx = graph
                .neighbors_directed(node, Direction::Outgoing)
                .map(|dep| {
                    rxs.get(&dep)
                        .expect("graph should have all nodes")
                        .resubscribe()
                })
                .collect::<Vec<_>>();

            join_handles.push(tokio::spawn(async move {
                let deps_fut = join_all(deps_rx.iter_mut().map(|rx| rx.recv()));

                tokio::select! {
                    // If the cancel and the dependencies are ready at once,
                    // prefer cancelling over emitting another node.
                    biased;
                    _ = cancel_rx.changed() => {}
                    results = deps_fut => {
                        for res in results {
                            match res {
                                Ok(()) => (),
                                // A dependency finished without broadcasting —
                                // can happen racing a cancel; treat as cancel.
                                Err(broadcast::error::RecvError::Closed) => return,
                                Err(broadcast::error::RecvError::Lagged(n)) => {
                                    debug_assert!(false, "a dependency finished {n} more times than expected");
                                    trace!("a dependency finished {n} more times than expected");
                                }
                            }
                        }

                        let (callback_tx, callback_rx) = oneshot::channel::<()>();
                        if node_tx.send((node, callback_tx)).await.is_err() {
                            trace!("node receiver dropped before the walk finished");
                            return;
                        }
                        if callback_rx.await.is_err() {
                            trace!("callback sender dropped without signalling completion");
                        }
                        // A send error here just means this node has no
                        // dependents left listening.
                        tx.send(()).ok();
                    }
                }
            }));
        }

        debug_assert!(txs.is_empty());

        Self {
            cancel,
            node_events: Some(node_rx),
            join_handles,
            marker: std::marker::PhantomData,
        }
    }

    /// Starts the walk, returning a channel that emits a node once all of
    /// its dependencies have finished. The caller signals completion of a
    /// node by sending on the paired oneshot channel.
    pub fn walk(self) -> (Walker<N, Walking>, mpsc::Receiver<WalkMessage<N>>) {
        let Self {
            cancel,
            mut node_events,
            join_handles,
            ..
        } = self;
        let node_events = node_events
            .take()
            .expect("a Start-state walker always holds its receiver until walk() is called");
        (
            Walker {
                marker: std::marker::PhantomData,
                cancel,
                node_events: None,
                join_handles,
            },
            node_events,
        )
    }
}

impl<N> Walker<N, Walking> {
    /// Stops admitting new nodes. Nodes already queued for emission are
    /// still sent; in-flight visits are not interrupted by the walker.
    pub fn cancel(&mut self) -> Result<(), watch::error::SendError<bool>> {
        self.cancel.send(true)
    }

    /// Waits for every per-node task to finish, typically called after
    /// draining the node-event channel (and, if cancelling, after
    /// [`Self::cancel`]).
    pub async fn wait(self) -> Result<(), tokio::task::JoinError> {
        let Self { mut join_handles, .. } = self;
        while let Some(result) = join_handles.next().await {
            result?;
        }
        Ok(())
    }
}
