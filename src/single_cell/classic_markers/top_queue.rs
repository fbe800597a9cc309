//! Bounded best-K candidate sets and the pairwise store built from them.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::utils::errors::Result;
use crate::utils::general::checked_product;

///////////
// Types //
///////////

/// Markers per ordered label pair; `markers[g1][g2]` holds the genes that
/// are higher in `g1` than in `g2`, best first.
pub type Markers<T> = Vec<Vec<Vec<T>>>;

/// One bounded candidate set per ordered label pair, indexed `[g1][g2]`.
pub type PairwiseTopQueues = Vec<Vec<TopQueue>>;

////////////////
// Candidates //
////////////////

/// A scored row
///
/// ### Fields
///
/// * `score` - The (aggregated) difference between medians.
/// * `row` - Row index in the reference matrix.
#[derive(Clone, Copy, Debug)]
pub struct Candidate {
    pub score: f64,
    pub row: usize,
}

impl Candidate {
    /// Ordering by badness: `Greater` means `self` is the worse candidate.
    /// Lower scores are worse; for equal scores the later row is worse.
    fn badness_cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.row.cmp(&other.row))
    }

    fn ties_with(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == Ordering::Equal
    }
}

// BinaryHeap is a max-heap, so the top is the worst retained candidate.
impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.badness_cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.badness_cmp(other)
    }
}

/// Turns a retained candidate into an output element
///
/// Lets the selectors share one code path for the `(row, score)` and the
/// index-only outputs.
pub trait MarkerOutput: Send + Sized {
    fn from_candidate(candidate: Candidate) -> Self;
}

impl MarkerOutput for usize {
    fn from_candidate(candidate: Candidate) -> Self {
        candidate.row
    }
}

impl MarkerOutput for (usize, f64) {
    fn from_candidate(candidate: Candidate) -> Self {
        (candidate.row, candidate.score)
    }
}

///////////////
// Top queue //
///////////////

/// Options for a `TopQueue`
///
/// ### Fields
///
/// * `check_nan` - Silently drop NaN scores.
/// * `keep_ties` - Retain every candidate tied with the worst retained one,
///   even beyond capacity.
/// * `bound` - If set, only scores strictly greater than this are accepted.
#[derive(Clone, Copy, Debug, Default)]
pub struct TopQueueOptions {
    pub check_nan: bool,
    pub keep_ties: bool,
    pub bound: Option<f64>,
}

/// Bounded set of the best-scoring candidates
///
/// Larger scores win, ties go to the smaller row index. The retained set
/// does not depend on the insertion order, which makes merging per-worker
/// queues deterministic.
///
/// ### Fields
///
/// * `capacity` - Maximum number of retained candidates (ties aside).
/// * `options` - The `TopQueueOptions`.
/// * `heap` - The retained candidates, worst on top.
/// * `ties` - With `keep_ties`, candidates outside the heap whose score equals
///   that of the worst heap member. Always empty otherwise.
#[derive(Clone, Debug)]
pub struct TopQueue {
    capacity: usize,
    options: TopQueueOptions,
    heap: BinaryHeap<Candidate>,
    ties: Vec<Candidate>,
}

impl TopQueue {
    /// Generate a new, empty queue
    ///
    /// ### Params
    ///
    /// * `capacity` - The number of candidates to retain.
    /// * `options` - The `TopQueueOptions`.
    pub fn new(capacity: usize, options: TopQueueOptions) -> Self {
        Self {
            capacity,
            options,
            heap: BinaryHeap::new(),
            ties: Vec::new(),
        }
    }

    /// Number of retained candidates, ties included
    pub fn len(&self) -> usize {
        self.heap.len() + self.ties.len()
    }

    /// Whether nothing is retained
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty() && self.ties.is_empty()
    }

    /// Offer a candidate
    ///
    /// ### Params
    ///
    /// * `score` - The candidate's score.
    /// * `row` - The candidate's row index.
    pub fn push(&mut self, score: f64, row: usize) {
        if self.capacity == 0 {
            return;
        }
        if score.is_nan() {
            if self.options.check_nan {
                return;
            }
        } else if let Some(bound) = self.options.bound {
            if score <= bound {
                return;
            }
        }

        let candidate = Candidate { score, row };
        if self.heap.len() < self.capacity {
            self.heap.push(candidate);
            return;
        }

        let Some(&worst) = self.heap.peek() else {
            return;
        };

        if !self.options.keep_ties {
            if candidate < worst {
                self.heap.pop();
                self.heap.push(candidate);
            }
            return;
        }

        if candidate.ties_with(&worst) {
            if candidate < worst {
                self.heap.pop();
                self.heap.push(candidate);
                self.ties.push(worst);
            } else {
                self.ties.push(candidate);
            }
        } else if candidate < worst {
            self.heap.pop();
            self.heap.push(candidate);
            match self.heap.peek() {
                Some(new_worst) if new_worst.ties_with(&worst) => self.ties.push(worst),
                _ => self.ties.clear(),
            }
        }
    }

    /// Remove and return all retained candidates, worst first
    pub fn drain(&mut self) -> Vec<Candidate> {
        let mut out = std::mem::take(&mut self.ties);
        out.sort_unstable_by(|a, b| b.cmp(a));
        out.reserve(self.heap.len());
        while let Some(candidate) = self.heap.pop() {
            out.push(candidate);
        }
        out
    }

    /// Move all candidates of `other` into this queue
    ///
    /// ### Params
    ///
    /// * `other` - The queue to empty into this one.
    pub fn absorb(&mut self, other: &mut TopQueue) {
        for candidate in other.drain() {
            self.push(candidate.score, candidate.row);
        }
    }
}

/////////////////////
// Pairwise queues //
/////////////////////

/// Allocate one queue per ordered pair of labels
///
/// The lower bound is fixed at zero as only positive differences make for
/// useful markers.
///
/// ### Params
///
/// * `num_keep` - Capacity of each queue.
/// * `ngroups` - Number of labels.
/// * `keep_ties` - Whether to retain ties at the `num_keep`-th position.
/// * `check_nan` - Whether the queues should drop NaN scores.
///
/// ### Returns
///
/// The `ngroups x ngroups` queues.
pub fn allocate_pairwise_queues(
    num_keep: usize,
    ngroups: usize,
    keep_ties: bool,
    check_nan: bool,
) -> Result<PairwiseTopQueues> {
    checked_product("pairwise label comparisons", ngroups, ngroups)?;

    let options = TopQueueOptions {
        check_nan,
        keep_ties,
        bound: Some(0.0),
    };

    Ok((0..ngroups)
        .map(|_| {
            (0..ngroups)
                .map(|_| TopQueue::new(num_keep, options))
                .collect::<Vec<TopQueue>>()
        })
        .collect())
}

/// Empty marker lists for every pair of labels
///
/// ### Params
///
/// * `ngroups` - Number of labels.
pub fn report_empty_markers<T>(ngroups: usize) -> Markers<T> {
    (0..ngroups)
        .map(|_| (0..ngroups).map(|_| Vec::new()).collect::<Vec<Vec<T>>>())
        .collect()
}

/// Merge the per-worker queues and extract the markers
///
/// All non-primary workers are folded into the first one, after which each
/// off-diagonal queue is drained and reversed so that the strongest
/// difference comes first.
///
/// ### Params
///
/// * `pqueues` - One `PairwiseTopQueues` per worker.
/// * `ngroups` - Number of labels.
///
/// ### Returns
///
/// The `Markers` in the requested output type.
pub fn report_best_top_queues<T>(pqueues: Vec<PairwiseTopQueues>, ngroups: usize) -> Markers<T>
where
    T: MarkerOutput,
{
    let mut workers = pqueues.into_iter();
    let Some(mut consolidated) = workers.next() else {
        return report_empty_markers(ngroups);
    };

    for mut worker in workers {
        for (out_row, in_row) in consolidated.iter_mut().zip(worker.iter_mut()) {
            for (out_queue, in_queue) in out_row.iter_mut().zip(in_row.iter_mut()) {
                out_queue.absorb(in_queue);
            }
        }
    }

    consolidated
        .iter_mut()
        .enumerate()
        .map(|(g1, row)| {
            row.iter_mut()
                .enumerate()
                .map(|(g2, queue)| {
                    if g1 == g2 {
                        return Vec::new();
                    }
                    queue
                        .drain()
                        .into_iter()
                        .rev()
                        .map(T::from_candidate)
                        .collect::<Vec<T>>()
                })
                .collect::<Vec<Vec<T>>>()
        })
        .collect()
}
