//! Region - a mutable rectangle with cancelable changes
//!
//! Every symbol is anchored to a [`Region`]. Mutations go through a two
//! phase protocol:
//!
//! 1. The proposed corners are normalized and compared to the current ones.
//!    An identical proposal is a no-op ([`Rejected::Unchanged`]).
//! 2. A [`ChangeRequest`] is published on [`Region::change_requested`]. Any
//!    subscriber may [`ChangeRequest::cancel`] it ([`Rejected::Canceled`]).
//! 3. Otherwise the new corners are committed and a [`RegionChange`] is
//!    published on [`Region::changed`]. This second event cannot be vetoed.
//!
//! Flipping a corner past its opposite is a legitimate move or resize, not
//! an error: the result is normalized and classified by whether the size
//! actually changed.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::{ReentrantMutex, RwLock};

use crate::channel::Channel;
use crate::error::Error;
use crate::types::{Coord, Rect};

// =============================================================================
// TYPES
// =============================================================================

bitflags::bitflags! {
    /// What a geometry change does to a region.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ChangeKind: u8 {
        const MOVE = 1 << 0;
        const RESIZE = 1 << 1;
    }
}

impl ChangeKind {
    /// Classify the change from `before` to `after`.
    pub fn classify(before: &Rect, after: &Rect) -> Self {
        let mut kind = ChangeKind::empty();
        if before.top_left() != after.top_left() {
            kind |= ChangeKind::MOVE;
        }
        if before.width() != after.width() || before.height() != after.height() {
            kind |= ChangeKind::RESIZE;
        }
        kind
    }
}

/// Why a mutation left the region untouched. Not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejected {
    /// The proposal equals the current geometry.
    Unchanged,
    /// A `change_requested` subscriber vetoed the change.
    Canceled,
}

/// Published before a change is committed.
#[derive(Debug)]
pub struct ChangeRequest {
    pub before: Rect,
    pub proposed: Rect,
    pub kind: ChangeKind,
    canceled: AtomicBool,
}

impl ChangeRequest {
    fn new(before: Rect, proposed: Rect, kind: ChangeKind) -> Self {
        Self {
            before,
            proposed,
            kind,
            canceled: AtomicBool::new(false),
        }
    }

    /// Veto the change.
    pub fn cancel(&self) {
        self.canceled.store(true, Ordering::Release);
    }

    pub fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }
}

/// Published after a change is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionChange {
    pub before: Rect,
    pub after: Rect,
    pub kind: ChangeKind,
}

/// Identity of a region, unique for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RegionId(u64);

static NEXT_REGION_ID: AtomicU64 = AtomicU64::new(1);

// =============================================================================
// REGION
// =============================================================================

/// A normalized rectangle with identity and change notification.
pub struct Region {
    id: RegionId,
    rect: RwLock<Rect>,
    /// Serializes whole request/commit cycles. Re-entrant so a `changed`
    /// subscriber may adjust the region again.
    mutation: ReentrantMutex<()>,
    change_requested: Channel<ChangeRequest>,
    changed: Channel<RegionChange>,
}

impl Region {
    /// Create a region spanning two opposite corners, in any order.
    pub fn new(a: Coord, b: Coord) -> Self {
        Self::from_rect(Rect::from_corners(a, b))
    }

    pub fn from_rect(rect: Rect) -> Self {
        Self {
            id: RegionId(NEXT_REGION_ID.fetch_add(1, Ordering::Relaxed)),
            rect: RwLock::new(rect),
            mutation: ReentrantMutex::new(()),
            change_requested: Channel::new(),
            changed: Channel::new(),
        }
    }

    pub fn id(&self) -> RegionId {
        self.id
    }

    /// Interceptors that may veto a proposed change.
    pub fn change_requested(&self) -> &Channel<ChangeRequest> {
        &self.change_requested
    }

    /// Notifications of committed changes.
    pub fn changed(&self) -> &Channel<RegionChange> {
        &self.changed
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Snapshot of the current geometry.
    pub fn rect(&self) -> Rect {
        *self.rect.read()
    }

    pub fn top_left(&self) -> Coord {
        self.rect().top_left()
    }

    pub fn bottom_right(&self) -> Coord {
        self.rect().bottom_right()
    }

    /// Signed mathematical width, `right - left`.
    pub fn math_width(&self) -> i32 {
        self.rect().width()
    }

    /// Signed mathematical height, `bottom - top`.
    pub fn math_height(&self) -> i32 {
        self.rect().height()
    }

    /// Number of columns covered.
    pub fn actual_width(&self) -> i32 {
        self.rect().horizontal_span()
    }

    /// Number of rows covered.
    pub fn actual_height(&self) -> i32 {
        self.rect().vertical_span()
    }

    /// Strict overlap: regions that only touch along an edge do not overlap.
    pub fn overlaps(&self, other: &Rect) -> bool {
        self.rect().overlaps(other)
    }

    /// Inclusive point test.
    pub fn overlaps_coord(&self, at: Coord) -> bool {
        self.rect().contains_coord(at)
    }

    /// True when `other` lies within this region, bounds inclusive.
    pub fn contains(&self, other: &Rect) -> bool {
        self.rect().contains(other)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Propose new geometry.
    pub fn try_change(&self, proposed: Rect) -> Result<ChangeKind, Rejected> {
        let _cycle = self.mutation.lock();

        let before = self.rect();
        if proposed == before {
            return Err(Rejected::Unchanged);
        }

        let kind = ChangeKind::classify(&before, &proposed);
        let request = ChangeRequest::new(before, proposed, kind);
        match self.change_requested.publish_ref(&request) {
            Ok(()) | Err(Error::InvalidState(_)) => {}
            Err(err) => {
                log::warn!(
                    "Region {:?}: change interceptor failed, treating as veto: {}",
                    self.id,
                    err
                );
                return Err(Rejected::Canceled);
            }
        }
        if request.is_canceled() {
            log::trace!("Region {:?}: change {} -> {} canceled", self.id, before, proposed);
            return Err(Rejected::Canceled);
        }

        *self.rect.write() = proposed;

        let change = RegionChange {
            before,
            after: proposed,
            kind,
        };
        match self.changed.publish(change) {
            Ok(()) | Err(Error::InvalidState(_)) => {}
            Err(err) => log::warn!("Region {:?}: change subscriber failed: {}", self.id, err),
        }
        Ok(kind)
    }

    pub fn set_top_left(&self, top_left: Coord) -> bool {
        self.propose(|r| Rect::from_corners(top_left, r.bottom_right()))
    }

    pub fn set_bottom_right(&self, bottom_right: Coord) -> bool {
        self.propose(|r| Rect::from_corners(r.top_left(), bottom_right))
    }

    /// Set `right - left`, keeping the left edge. A negative width flips the
    /// region to the other side of the left edge.
    pub fn set_math_width(&self, width: i16) -> bool {
        self.propose(|r| {
            let right = r.left().saturating_add(width);
            Rect::from_corners(r.top_left(), Coord::new(right, r.bottom()))
        })
    }

    /// Set `bottom - top`, keeping the top edge. A negative height flips the
    /// region above the top edge.
    pub fn set_math_height(&self, height: i16) -> bool {
        self.propose(|r| {
            let bottom = r.top().saturating_add(height);
            Rect::from_corners(r.top_left(), Coord::new(r.right(), bottom))
        })
    }

    /// Replace both corners at once, in any order.
    pub fn try_set_corners(&self, a: Coord, b: Coord) -> bool {
        self.propose(|_| Rect::from_corners(a, b))
    }

    /// Shift by `delta`, keeping the size.
    pub fn translate(&self, delta: Coord) -> bool {
        self.propose(|r| r.translate(delta))
    }

    /// Move the top-left corner to `top_left`, keeping the size.
    pub fn move_to(&self, top_left: Coord) -> bool {
        self.propose(|r| r.translate(top_left - r.top_left()))
    }

    fn propose(&self, next: impl FnOnce(Rect) -> Rect) -> bool {
        let _cycle = self.mutation.lock();
        self.try_change(next(self.rect())).is_ok()
    }

    /// Close both notification channels.
    pub fn dispose(&self) -> crate::error::Result<()> {
        let errors: Vec<Error> = [self.change_requested.dispose(), self.changed.dispose()]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        Error::collect(errors)
    }
}

impl std::fmt::Debug for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Region")
            .field("id", &self.id)
            .field("rect", &self.rect())
            .finish()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use test_log::test;

    fn counted(region: &Region) -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let requested = Arc::new(AtomicUsize::new(0));
        let committed = Arc::new(AtomicUsize::new(0));
        let r = Arc::clone(&requested);
        region.change_requested().subscribe_fn(move |_| {
            r.fetch_add(1, Ordering::SeqCst);
        });
        let c = Arc::clone(&committed);
        region.changed().subscribe_fn(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });
        (requested, committed)
    }

    #[test]
    fn test_construction_normalizes_corners() {
        let region = Region::new(Coord::new(10, 10), Coord::new(5, 5));
        assert_eq!(region.top_left(), Coord::new(5, 5));
        assert_eq!(region.bottom_right(), Coord::new(10, 10));
        assert_eq!(region.math_width(), 5);
        assert_eq!(region.actual_width(), 6);
        assert_eq!(region.math_height(), 5);
        assert_eq!(region.actual_height(), 6);
    }

    #[test]
    fn test_normalization_is_order_independent() {
        let points = [(-3, 7), (4, -2), (0, 0), (9, 9), (-5, -5)];
        for &(ax, ay) in &points {
            for &(bx, by) in &points {
                let a = Coord::new(ax, ay);
                let b = Coord::new(bx, by);
                let forward = Region::new(a, b);
                let backward = Region::new(b, a);
                assert_eq!(forward.top_left(), backward.top_left());
                assert_eq!(forward.bottom_right(), backward.bottom_right());
            }
        }
    }

    #[test]
    fn test_setting_current_value_is_a_noop() {
        let region = Region::new(Coord::new(1, 2), Coord::new(8, 9));
        let (requested, committed) = counted(&region);
        let before = region.rect();

        assert!(!region.set_top_left(Coord::new(1, 2)));
        assert!(!region.set_bottom_right(Coord::new(8, 9)));
        assert!(!region.try_set_corners(Coord::new(8, 9), Coord::new(1, 2)));
        assert!(!region.translate(Coord::ZERO));
        assert!(!region.move_to(Coord::new(1, 2)));
        assert!(!region.set_math_width(7));
        assert_eq!(region.try_change(before), Err(Rejected::Unchanged));

        assert_eq!(region.rect(), before);
        assert_eq!(requested.load(Ordering::SeqCst), 0);
        assert_eq!(committed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_leaves_region_untouched() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        let committed = Arc::new(AtomicUsize::new(0));
        region.change_requested().subscribe_fn(|_| {});
        region.change_requested().subscribe_fn(|request| request.cancel());
        let c = Arc::clone(&committed);
        region.changed().subscribe_fn(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!region.translate(Coord::new(1, 1)));
        assert_eq!(
            region.try_change(Rect::new(0, 0, 9, 9)),
            Err(Rejected::Canceled)
        );
        assert_eq!(region.rect(), Rect::new(0, 0, 4, 4));
        assert_eq!(committed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_request_then_commit_carry_states() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let commits = Arc::new(Mutex::new(Vec::new()));

        let r = Arc::clone(&requests);
        region.change_requested().subscribe_fn(move |request| {
            r.lock().push((request.before, request.proposed, request.kind));
        });
        let c = Arc::clone(&commits);
        region.changed().subscribe_fn(move |change| c.lock().push(*change));

        assert!(region.set_bottom_right(Coord::new(6, 4)));

        let expected_before = Rect::new(0, 0, 4, 4);
        let expected_after = Rect::new(0, 0, 6, 4);
        assert_eq!(
            *requests.lock(),
            vec![(expected_before, expected_after, ChangeKind::RESIZE)]
        );
        assert_eq!(
            *commits.lock(),
            vec![RegionChange {
                before: expected_before,
                after: expected_after,
                kind: ChangeKind::RESIZE,
            }]
        );
    }

    #[test]
    fn test_classification() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        assert_eq!(region.try_change(Rect::new(1, 1, 5, 5)), Ok(ChangeKind::MOVE));
        assert_eq!(region.try_change(Rect::new(1, 1, 7, 5)), Ok(ChangeKind::RESIZE));
        assert_eq!(
            region.try_change(Rect::new(0, 0, 3, 3)),
            Ok(ChangeKind::MOVE | ChangeKind::RESIZE)
        );
    }

    #[test]
    fn test_negative_width_flip_is_a_pure_move() {
        let region = Region::new(Coord::new(5, 5), Coord::new(10, 10));
        let kinds = Arc::new(Mutex::new(Vec::new()));
        let k = Arc::clone(&kinds);
        region.changed().subscribe_fn(move |change| k.lock().push(change.kind));

        assert!(region.set_math_width(-5));
        assert_eq!(region.rect(), Rect::new(0, 5, 5, 10));
        assert_eq!(region.math_width(), 5);

        assert!(region.set_math_width(-2));
        assert_eq!(region.rect(), Rect::new(-2, 5, 0, 10));

        assert_eq!(
            *kinds.lock(),
            vec![ChangeKind::MOVE, ChangeKind::MOVE | ChangeKind::RESIZE]
        );
    }

    #[test]
    fn test_flipping_top_left_past_bottom_right() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        assert!(region.set_top_left(Coord::new(6, 2)));
        assert_eq!(region.top_left(), Coord::new(4, 2));
        assert_eq!(region.bottom_right(), Coord::new(6, 4));
    }

    #[test]
    fn test_math_height() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        assert!(region.set_math_height(9));
        assert_eq!(region.actual_height(), 10);
        assert!(region.set_math_height(-1));
        assert_eq!(region.rect(), Rect::new(0, -1, 4, 0));
    }

    #[test]
    fn test_move_to_and_translate_keep_size() {
        let region = Region::new(Coord::new(2, 2), Coord::new(5, 6));
        assert!(region.move_to(Coord::new(10, 0)));
        assert_eq!(region.rect(), Rect::new(10, 0, 13, 4));
        assert!(region.translate(Coord::new(-1, 1)));
        assert_eq!(region.rect(), Rect::new(9, 1, 12, 5));
    }

    #[test]
    fn test_inclusive_hit_test() {
        let region = Region::new(Coord::new(0, 0), Coord::new(5, 5));
        assert!(region.overlaps_coord(Coord::new(0, 0)));
        assert!(region.overlaps_coord(Coord::new(5, 5)));
        assert!(!region.overlaps_coord(Coord::new(6, 0)));
        assert!(!region.overlaps_coord(Coord::new(-1, 0)));
    }

    #[test]
    fn test_region_predicates() {
        let region = Region::new(Coord::new(0, 0), Coord::new(5, 5));
        assert!(region.contains(&Rect::new(0, 0, 5, 5)));
        assert!(!region.contains(&Rect::new(0, 0, 6, 5)));
        assert!(region.overlaps(&Rect::new(4, 4, 8, 8)));
        assert!(!region.overlaps(&Rect::new(5, 0, 8, 5)));
    }

    #[test]
    fn test_failing_interceptor_vetoes() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        region.change_requested().subscribe(FailingInterceptor);
        assert_eq!(
            region.try_change(Rect::new(1, 1, 5, 5)),
            Err(Rejected::Canceled)
        );
        assert_eq!(region.rect(), Rect::new(0, 0, 4, 4));
    }

    #[test]
    fn test_disposed_region_still_mutates() {
        let region = Region::new(Coord::new(0, 0), Coord::new(4, 4));
        region.dispose().unwrap();
        assert!(region.translate(Coord::new(1, 0)));
        assert_eq!(region.rect().left(), 1);
    }

    #[test]
    fn test_changed_subscriber_can_adjust_region_again() {
        let region = Arc::new(Region::new(Coord::new(0, 0), Coord::new(4, 4)));
        let weak = Arc::downgrade(&region);
        region.changed().subscribe_fn(move |change| {
            // Snap anything dragged left of the origin back to zero.
            if change.after.left() < 0 {
                if let Some(region) = weak.upgrade() {
                    region.move_to(Coord::new(0, change.after.top()));
                }
            }
        });

        assert!(region.translate(Coord::new(-3, 0)));
        assert_eq!(region.rect(), Rect::new(0, 0, 4, 4));
    }

    struct FailingInterceptor;

    impl crate::channel::Observer<ChangeRequest> for FailingInterceptor {
        fn on_next(&self, _value: &ChangeRequest) -> std::result::Result<(), crate::error::Fault> {
            Err(crate::error::fault("interceptor exploded"))
        }
    }
}
