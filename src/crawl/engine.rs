// src/crawl/engine.rs
// =============================================================================
// CrawlEngine: recursive, concurrency-bounded descent of the region tree.
//
// How it works:
// 1. crawl() fetches the root listing and starts one task per top-level region
// 2. expand() fetches a region's listing and classifies every child:
//    - a region below the terminal level -> expand() it in its own task
//    - a polling unit at the terminal level -> fetch_leaf() in its own task
// 3. fetch_leaf() downloads the unit's result record, stamps its id from the
//    unit code, and sends it to the sink if the tally is confirmed
// 4. expand() only returns once every task it started has finished, so a
//    region is "done" when every polling unit below it is done
//
// Each expand() call owns a BoundedGroup. The group caps how many children of
// THAT region are processed at once; siblings elsewhere in the tree run in
// parallel with their own groups.
//
// Failure policy:
// - a failed fetch drops that node (and everything under it), nothing else
// - there are no retries
// - the output channel is the only thing tasks share
// =============================================================================

use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::group::BoundedGroup;
use super::layout::UrlLayout;
use crate::fetch::{FetchError, NodeSource};
use crate::model::{Descriptor, ResultRecord, Step};

pub const DEFAULT_TERMINAL_LEVEL: u32 = 5;
pub const DEFAULT_BRANCH_LIMIT: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrawlSettings {
    /// Level at which listing entries are polling units
    pub terminal_level: u32,
    /// Children processed at once under a single region
    pub branch_limit: usize,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            terminal_level: DEFAULT_TERMINAL_LEVEL,
            branch_limit: DEFAULT_BRANCH_LIMIT,
        }
    }
}

// Why a leaf record was not sent to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// `status_suara` is false: the tally is not final yet
    NotConfirmed,
    /// The unit code is not an integer, so there is no id to store it under
    InvalidIdentifier,
}

// The end state of one polling unit
#[derive(Debug)]
pub enum LeafOutcome {
    /// Sent to the sink under this id
    Forwarded(i64),
    Rejected(RejectReason),
    Failed(FetchError),
    /// The sink stopped receiving before the record could be sent
    SinkClosed(i64),
}

pub struct CrawlEngine<S> {
    source: S,
    layout: UrlLayout,
    settings: CrawlSettings,
}

impl<S: NodeSource + 'static> CrawlEngine<S> {
    pub fn new(source: S, layout: UrlLayout, settings: CrawlSettings) -> Arc<Self> {
        assert!(settings.branch_limit > 0, "branch limit must be at least 1");
        Arc::new(Self {
            source,
            layout,
            settings,
        })
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    // Crawls the whole tree under `root_code`
    //
    // Only a failure to fetch the root listing is returned as an error; every
    // failure below it is logged and skipped.
    //
    // Returns: the number of top-level regions that were traversed
    pub async fn crawl(
        self: &Arc<Self>,
        root_code: &str,
        output: mpsc::Sender<ResultRecord>,
    ) -> Result<usize, FetchError> {
        // Without the root listing there is nothing to crawl, so this error
        // goes back to the caller
        let url = self.layout.root_listing(root_code);
        let regions = self.source.fetch(&url).await?;
        info!(url = %url, regions = regions.len(), "Fetched root listing");

        // One unbounded task per top-level region
        let root_dir = self.layout.root_dir().to_string();
        let handles: Vec<_> = regions
            .into_iter()
            .map(|region| {
                let engine = Arc::clone(self);
                let output = output.clone();
                let dir = root_dir.clone();
                tokio::spawn(async move { engine.visit(region, None, dir, output).await })
            })
            .collect();

        // Wait for every region; a panicked task only loses its own subtree
        let total = handles.len();
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Top-level region task panicked");
            }
        }

        Ok(total)
    }

    // Classifies one listing entry and processes it accordingly
    //
    // `parent_level` is None for top-level regions. A child that is not deeper
    // than its parent is skipped; that keeps the recursion finite even if the
    // source ever sends a malformed listing.
    fn visit(
        self: Arc<Self>,
        child: Descriptor,
        parent_level: Option<u32>,
        dir: String,
        output: mpsc::Sender<ResultRecord>,
    ) -> BoxFuture<'static, ()> {
        async move {
            if let Some(parent_level) = parent_level {
                if child.level <= parent_level {
                    warn!(
                        code = %child.code,
                        level = child.level,
                        parent_level,
                        "Skipping listing entry that does not descend"
                    );
                    return;
                }
            }

            // Regions recurse, polling units end the descent
            match Step::classify(child, self.settings.terminal_level) {
                Step::Descend(region) => self.expand(region, dir, output).await,
                Step::Leaf(unit) => {
                    self.fetch_leaf(unit, dir, output).await;
                }
            }
        }
        .boxed()
    }

    // Fetches a region's listing and processes all of its children
    //
    // Parameters:
    //   region: the node to expand
    //   dir: directory the region itself is listed in
    //   output: channel to the result sink
    pub fn expand(
        self: Arc<Self>,
        region: Descriptor,
        dir: String,
        output: mpsc::Sender<ResultRecord>,
    ) -> BoxFuture<'static, ()> {
        async move {
            let url = self.layout.listing(&dir, &region.code);
            info!(url = %url, name = %region.name, level = region.level, "Processing");

            let children = match self.source.fetch(&url).await {
                Ok(children) => children,
                Err(e) => {
                    warn!(url = %url, kind = e.kind(), error = %e, "Dropping branch");
                    return;
                }
            };

            // Children of this region are listed one directory deeper
            let child_dir = self.layout.child_dir(&dir, &region.code);
            // Fresh group per region: the limit applies to this region's children only
            let group = BoundedGroup::new(self.settings.branch_limit);

            for child in children {
                // spawn() waits for a free slot before starting the child
                let task = Arc::clone(&self).visit(
                    child,
                    Some(region.level),
                    child_dir.clone(),
                    output.clone(),
                );
                group.spawn(task).await;
            }

            // The region is done only when every child task is done
            group.wait_all().await;
            debug!(url = %url, "Region complete");
        }
        .boxed()
    }

    // Fetches, stamps, filters and forwards one polling unit's result record
    //
    // Parameters:
    //   unit: the polling unit descriptor
    //   units_dir: directory the unit is listed in
    //   output: channel to the result sink (send may wait when it is full)
    pub async fn fetch_leaf(
        &self,
        unit: Descriptor,
        units_dir: String,
        output: mpsc::Sender<ResultRecord>,
    ) -> LeafOutcome {
        let url = self.layout.result(&units_dir, &unit.code);
        info!(url = %url, "Fetching result");

        // A fetch or decode error drops this unit only
        let outcome = match self.source.fetch_leaf(&url).await {
            Err(e) => LeafOutcome::Failed(e),
            Ok(record) => forward(record, &unit, &output).await,
        };

        // One log line per unit, at a level matching how unusual the outcome is
        match &outcome {
            LeafOutcome::Forwarded(id) => debug!(id, "Result forwarded"),
            LeafOutcome::Rejected(RejectReason::NotConfirmed) => {
                debug!(code = %unit.code, "Result not confirmed yet, skipping")
            }
            LeafOutcome::Rejected(RejectReason::InvalidIdentifier) => {
                warn!(code = %unit.code, "Unit code is not an integer id, rejecting result")
            }
            LeafOutcome::Failed(e) => {
                warn!(url = %url, kind = e.kind(), error = %e, "Error processing unit")
            }
            LeafOutcome::SinkClosed(id) => warn!(id, "Result sink closed, result lost"),
        }
        outcome
    }
}

// Stamps the id on a fetched record and sends it on if it is accepted
async fn forward(
    mut record: ResultRecord,
    unit: &Descriptor,
    output: &mpsc::Sender<ResultRecord>,
) -> LeafOutcome {
    // The unit code is the idempotency key; the payload id is never used
    let id = match unit.numeric_code() {
        Some(id) => id,
        None => return LeafOutcome::Rejected(RejectReason::InvalidIdentifier),
    };
    record.id = id;

    // Unconfirmed tallies may still change, so they are not stored
    if !record.is_accepted() {
        return LeafOutcome::Rejected(RejectReason::NotConfirmed);
    }

    debug!(id, votes = record.tally_total(), "Result accepted");
    // send() only fails once the sink has dropped its receiver
    match output.send(record).await {
        Ok(()) => LeafOutcome::Forwarded(id),
        Err(_) => LeafOutcome::SinkClosed(id),
    }
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why BoxFuture for expand() and visit()?
//    - An async fn cannot call itself directly: its future type would contain
//      itself and have infinite size
//    - Boxing gives the recursive future a fixed size, and 'static + Send
//      lets it go to tokio::spawn
//
// 2. How deep can memory grow?
//    - Each live expand() holds one listing and one group
//    - At most `branch_limit` children per region are alive at a time, so
//      memory follows depth x branch_limit x top-level regions, not tree size
//
// 3. Where does back-pressure come from?
//    - output.send() waits once the channel buffer is full, which in turn
//      keeps that task's slot taken, which pauses its siblings
// -----------------------------------------------------------------------------
