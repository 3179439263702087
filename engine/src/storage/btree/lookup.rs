//! Resumable key lookup.
//!
//! A lookup walks superblock -> root -> internal nodes -> leaf. Every page on
//! that path comes from the block cache, and any of them may be missing, so
//! the walk is a state machine that stops at each miss and is resumed by the
//! driver when the page arrives:
//!
//! ```text
//! AcquiringSuperblock -> AcquiringRoot -> AcquiringNode (loops while descending) -> Complete
//!                                                                                  \-> Failed
//! ```
//!
//! # Invariants
//!
//! - At most one page is pinned at a time. A parent is released before its
//!   child is requested.
//! - A step that returns `Incomplete` leaves behind the id it was waiting
//!   for; the retry acquires that same id instead of re-deriving it.
//! - The stage only moves forward, and once `Complete` the result is fixed and
//!   no cache operation is issued.
//! - The first error is final. A failed lookup returns that error from every
//!   later step without touching the cache.

use std::fmt;

use crate::event::EventKind;
use crate::storage::btree::node::{MAX_KEY_SIZE, Node, NodeError};
use crate::storage::cache::{BlockCache, CacheError, PinnedPage};
use crate::storage::page::PageId;
use crate::storage::superblock::{Superblock, SuperblockError};

/// Deepest tree a lookup will descend before declaring the tree corrupt.
pub const MAX_DEPTH: u32 = 64;

/// What a step tells the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Progress was made; run the next step.
    Continue,
    /// Waiting on a page fetch; stop until a wake-up event.
    Incomplete,
    /// Terminal; the result can be consumed.
    Complete,
}

/// Position of a lookup, ordered by progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LookupStage {
    AcquiringSuperblock,
    AcquiringRoot,
    AcquiringNode,
    Complete,
    Failed,
}

impl fmt::Display for LookupStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AcquiringSuperblock => write!(f, "acquiring superblock"),
            Self::AcquiringRoot => write!(f, "acquiring root"),
            Self::AcquiringNode => write!(f, "acquiring node"),
            Self::Complete => write!(f, "complete"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a finished lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The key exists; carries its value.
    Found(Vec<u8>),
    /// The tree is empty or the key is absent.
    NotFound,
    /// The lookup was aborted before it finished.
    Cancelled,
}

impl LookupResult {
    /// The value, if the key was found.
    #[must_use]
    pub fn value(&self) -> Option<&[u8]> {
        match self {
            Self::Found(value) => Some(value),
            Self::NotFound | Self::Cancelled => None,
        }
    }
}

enum State<'c, C: BlockCache + ?Sized> {
    AcquiringSuperblock,
    AcquiringRoot {
        root_id: PageId,
    },
    /// `node` is `None` while the acquire of `node_id` is pending.
    AcquiringNode {
        node_id: PageId,
        node: Option<PinnedPage<'c, C>>,
    },
    Complete(LookupResult),
    Failed(LookupError),
}

impl<C: BlockCache + ?Sized> State<'_, C> {
    const fn stage(&self) -> LookupStage {
        match self {
            Self::AcquiringSuperblock => LookupStage::AcquiringSuperblock,
            Self::AcquiringRoot { .. } => LookupStage::AcquiringRoot,
            Self::AcquiringNode { .. } => LookupStage::AcquiringNode,
            Self::Complete(_) => LookupStage::Complete,
            Self::Failed(_) => LookupStage::Failed,
        }
    }
}

/// Result of one acquire attempt made by a step.
enum Fetched<'c, C: BlockCache + ?Sized> {
    Page(PinnedPage<'c, C>),
    Pending,
    /// The page arrived after `abort`; it has been released and the lookup
    /// is complete.
    Cancelled,
}

/// What the node step decided while the page was still pinned.
enum Descent {
    Child(PageId),
    Leaf(Option<Vec<u8>>),
}

/// One in-flight key lookup against a block cache.
pub struct LookupFsm<'c, C: BlockCache + ?Sized> {
    cache: &'c C,
    key: Vec<u8>,
    state: State<'c, C>,
    /// Page requested by the last acquire that came back pending.
    outstanding: Option<PageId>,
    cancel_pending: bool,
    /// Node pages visited so far.
    depth: u32,
}

impl<'c, C: BlockCache + ?Sized> LookupFsm<'c, C> {
    /// Start a lookup of `key`. No cache operation happens until the first
    /// `advance`.
    pub fn init_lookup(cache: &'c C, key: impl Into<Vec<u8>>) -> Result<Self, LookupError> {
        let key = key.into();
        if key.len() > MAX_KEY_SIZE {
            return Err(LookupError::KeyTooLarge(key.len()));
        }

        Ok(Self {
            cache,
            key,
            state: State::AcquiringSuperblock,
            outstanding: None,
            cancel_pending: false,
            depth: 0,
        })
    }

    #[must_use]
    pub fn key(&self) -> &[u8] {
        &self.key
    }

    #[must_use]
    pub const fn stage(&self) -> LookupStage {
        self.state.stage()
    }

    #[must_use]
    pub const fn is_complete(&self) -> bool {
        matches!(self.state, State::Complete(_))
    }

    /// The page being held or fetched, once the root id is known.
    #[must_use]
    pub const fn current_node_id(&self) -> Option<PageId> {
        match &self.state {
            State::AcquiringRoot { root_id } => Some(*root_id),
            State::AcquiringNode { node_id, .. } => Some(*node_id),
            State::AcquiringSuperblock | State::Complete(_) | State::Failed(_) => None,
        }
    }

    /// Whether a page is pinned by this lookup right now.
    #[must_use]
    pub const fn holds_page(&self) -> bool {
        matches!(self.state, State::AcquiringNode { node: Some(_), .. })
    }

    /// Page id of the acquire this lookup is waiting on, if any.
    #[must_use]
    pub const fn outstanding(&self) -> Option<PageId> {
        self.outstanding
    }

    #[must_use]
    pub const fn is_cancel_pending(&self) -> bool {
        self.cancel_pending
    }

    /// The result, once complete.
    #[must_use]
    pub const fn result(&self) -> Option<&LookupResult> {
        match &self.state {
            State::Complete(result) => Some(result),
            _ => None,
        }
    }

    /// The error that ended the lookup, if it failed.
    #[must_use]
    pub const fn error(&self) -> Option<&LookupError> {
        match &self.state {
            State::Failed(error) => Some(error),
            _ => None,
        }
    }

    /// Consume the lookup and take its result, if complete.
    #[must_use]
    pub fn into_result(self) -> Option<LookupResult> {
        match self.state {
            State::Complete(result) => Some(result),
            _ => None,
        }
    }

    /// Read the root id out of the superblock.
    pub fn step_acquiring_superblock(&mut self) -> Result<Step, LookupError> {
        self.latched(Self::read_superblock)
    }

    /// Pin the root, or finish if the tree is empty.
    pub fn step_acquiring_root(&mut self) -> Result<Step, LookupError> {
        self.latched(Self::pin_root)
    }

    /// Descend one level, or answer from the leaf.
    pub fn step_acquiring_node(&mut self) -> Result<Step, LookupError> {
        self.latched(Self::descend)
    }

    /// Run as many steps as possible. See [`advance`](crate::storage::btree::advance).
    pub fn advance(&mut self, event: Option<&crate::event::Event>) -> Result<Step, LookupError> {
        crate::storage::btree::driver::advance(self, event)
    }

    /// Cancel the lookup.
    ///
    /// A pinned page is released and the lookup completes as `Cancelled`. If
    /// an acquire is outstanding, the lookup completes on the next resumed
    /// step, releasing the page it obtains instead of using it. A complete or
    /// failed lookup is left untouched.
    pub fn abort(&mut self) -> Result<(), LookupError> {
        if matches!(self.state, State::Complete(_) | State::Failed(_)) {
            return Ok(());
        }

        if let State::AcquiringNode { node, .. } = &mut self.state {
            if let Some(pinned) = node.take() {
                let released = pinned.release();
                self.finish(LookupResult::Cancelled);
                return released.map_err(LookupError::from);
            }
        }

        if let Some(page_id) = self.outstanding {
            tracing::debug!(page_id, "abort deferred until fetch completes");
            self.cancel_pending = true;
            return Ok(());
        }

        self.finish(LookupResult::Cancelled);
        Ok(())
    }

    /// End the lookup with `error`. Any page still pinned is released. A
    /// complete lookup keeps its result.
    pub(crate) fn fail(&mut self, error: LookupError) -> LookupError {
        if self.is_complete() {
            return error;
        }
        tracing::debug!(error = %error, stage = %self.stage(), "lookup failed");
        self.outstanding = None;
        self.cancel_pending = false;
        self.state = State::Failed(error.clone());
        error
    }

    /// Run `step` unless the lookup already failed, and make its error final.
    fn latched(
        &mut self,
        step: fn(&mut Self) -> Result<Step, LookupError>,
    ) -> Result<Step, LookupError> {
        if let State::Failed(error) = &self.state {
            return Err(error.clone());
        }
        step(self).map_err(|error| self.fail(error))
    }

    fn read_superblock(&mut self) -> Result<Step, LookupError> {
        self.expect_stage(LookupStage::AcquiringSuperblock)?;

        let pinned = match self.acquire(self.cache.superblock_id())? {
            Fetched::Page(pinned) => pinned,
            Fetched::Pending => return Ok(Step::Incomplete),
            Fetched::Cancelled => return Ok(Step::Complete),
        };

        let superblock = Superblock::from_page(pinned.page());
        pinned.release()?;
        let root_id = superblock?.root_page;

        tracing::trace!(root_id, "superblock read");
        self.state = State::AcquiringRoot { root_id };
        Ok(Step::Continue)
    }

    fn pin_root(&mut self) -> Result<Step, LookupError> {
        let State::AcquiringRoot { root_id } = self.state else {
            return Err(self.violation(LookupStage::AcquiringRoot));
        };

        if self.cache.is_block_id_null(root_id) {
            return Ok(self.finish(LookupResult::NotFound));
        }

        self.pin_node(root_id)
    }

    fn descend(&mut self) -> Result<Step, LookupError> {
        let (node_id, held) = match &mut self.state {
            State::AcquiringNode { node_id, node } => (*node_id, node.take()),
            _ => return Err(self.violation(LookupStage::AcquiringNode)),
        };

        let Some(pinned) = held else {
            // Resumed after a miss: retry the same page.
            return self.pin_node(node_id);
        };

        let descent = match Node::from_page(pinned.page()) {
            Ok(Node::Internal(internal)) => Ok(Descent::Child(internal.lookup(&self.key))),
            Ok(Node::Leaf(leaf)) => Ok(Descent::Leaf(leaf.lookup(&self.key).map(<[u8]>::to_vec))),
            Err(error) => Err(LookupError::Node {
                page_id: node_id,
                error,
            }),
        };
        pinned.release()?;

        match descent? {
            Descent::Child(child_id) => {
                if self.cache.is_block_id_null(child_id) {
                    return Err(LookupError::NullChild { page_id: node_id });
                }
                tracing::trace!(parent = node_id, child = child_id, "descending");
                self.state = State::AcquiringNode {
                    node_id: child_id,
                    node: None,
                };
                self.pin_node(child_id)
            }
            Descent::Leaf(Some(value)) => Ok(self.finish(LookupResult::Found(value))),
            Descent::Leaf(None) => Ok(self.finish(LookupResult::NotFound)),
        }
    }

    fn pin_node(&mut self, node_id: PageId) -> Result<Step, LookupError> {
        match self.acquire(node_id)? {
            Fetched::Page(pinned) => {
                self.depth += 1;
                if self.depth > MAX_DEPTH {
                    pinned.release()?;
                    return Err(LookupError::TooDeep { depth: self.depth });
                }
                self.state = State::AcquiringNode {
                    node_id,
                    node: Some(pinned),
                };
                Ok(Step::Continue)
            }
            Fetched::Pending => Ok(Step::Incomplete),
            Fetched::Cancelled => Ok(Step::Complete),
        }
    }

    fn acquire(&mut self, page_id: PageId) -> Result<Fetched<'c, C>, LookupError> {
        let cache = self.cache;
        let Some(pinned) = PinnedPage::acquire(cache, page_id)? else {
            self.outstanding = Some(page_id);
            return Ok(Fetched::Pending);
        };
        self.outstanding = None;

        if self.cancel_pending {
            pinned.release()?;
            self.finish(LookupResult::Cancelled);
            return Ok(Fetched::Cancelled);
        }
        Ok(Fetched::Page(pinned))
    }

    fn finish(&mut self, result: LookupResult) -> Step {
        debug_assert!(!self.holds_page(), "lookup completed while holding a page");
        tracing::debug!(
            found = matches!(result, LookupResult::Found(_)),
            cancelled = matches!(result, LookupResult::Cancelled),
            depth = self.depth,
            "lookup complete"
        );
        self.outstanding = None;
        self.cancel_pending = false;
        self.state = State::Complete(result);
        Step::Complete
    }

    fn expect_stage(&self, expected: LookupStage) -> Result<(), LookupError> {
        if self.stage() == expected {
            Ok(())
        } else {
            Err(self.violation(expected))
        }
    }

    const fn violation(&self, expected: LookupStage) -> LookupError {
        LookupError::StateViolation {
            expected,
            actual: self.stage(),
        }
    }
}

impl<C: BlockCache + ?Sized> fmt::Debug for LookupFsm<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupFsm")
            .field("key_len", &self.key.len())
            .field("stage", &self.stage())
            .field("current_node_id", &self.current_node_id())
            .field("holds_page", &self.holds_page())
            .field("outstanding", &self.outstanding)
            .field("cancel_pending", &self.cancel_pending)
            .field("error", &self.error())
            .finish_non_exhaustive()
    }
}

/// Fatal lookup failures. None of these is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The driver was woken by an event a lookup never waits on.
    InvalidEvent(EventKind),
    /// A step ran in the wrong stage.
    StateViolation {
        expected: LookupStage,
        actual: LookupStage,
    },
    /// The key is longer than any stored key can be.
    KeyTooLarge(usize),
    /// The cache failed to provide or take back a page.
    Cache(CacheError),
    /// The superblock is unreadable.
    Superblock(SuperblockError),
    /// A node page is unreadable.
    Node { page_id: PageId, error: NodeError },
    /// An internal node points at the null page.
    NullChild { page_id: PageId },
    /// The descent exceeded `MAX_DEPTH` levels.
    TooDeep { depth: u32 },
}

impl fmt::Display for LookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEvent(kind) => write!(f, "lookup woken by unexpected {kind} event"),
            Self::StateViolation { expected, actual } => {
                write!(f, "lookup step for {expected} ran while {actual}")
            }
            Self::KeyTooLarge(len) => {
                write!(f, "key too large: {len} bytes (max {MAX_KEY_SIZE})")
            }
            Self::Cache(e) => write!(f, "cache error: {e}"),
            Self::Superblock(e) => write!(f, "superblock error: {e}"),
            Self::Node { page_id, error } => write!(f, "node {page_id}: {error}"),
            Self::NullChild { page_id } => {
                write!(f, "internal node {page_id} points at the null page")
            }
            Self::TooDeep { depth } => {
                write!(f, "descent reached depth {depth} (max {MAX_DEPTH})")
            }
        }
    }
}

impl std::error::Error for LookupError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Cache(e) => Some(e),
            Self::Superblock(e) => Some(e),
            Self::Node { error, .. } => Some(error),
            _ => None,
        }
    }
}

impl From<CacheError> for LookupError {
    fn from(e: CacheError) -> Self {
        Self::Cache(e)
    }
}

impl From<SuperblockError> for LookupError {
    fn from(e: SuperblockError) -> Self {
        Self::Superblock(e)
    }
}
