// SPDX-License-Identifier: GPL-3.0-or-later
// src/domain/gesture.rs
//
// Touch gesture recognition: one-finger swipes and two-finger pinches.

use std::collections::BTreeMap;

/// Pseudo finger id used for left-button mouse drags.
pub const MOUSE_FINGER: u64 = u64::MAX;

/// Direction the finger travelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwipeDirection {
    /// Finger moved to the left: next page.
    Left,
    /// Finger moved to the right: previous page.
    Right,
}

/// Recognized gesture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Swipe(SwipeDirection),
    Pinch {
        /// Scale since the previous pinch step, rounded to one decimal.
        scale: f64,
        /// Movement of the pinch center since the previous step.
        center_delta: (f64, f64),
    },
}

#[derive(Debug, Clone, Copy)]
struct Finger {
    start: (f32, f32),
    current: (f32, f32),
}

#[derive(Debug, Clone, Copy)]
struct PinchBase {
    distance: f64,
    center: (f64, f64),
}

/// Tracks the fingers of one touch sequence.
///
/// A sequence starts with the first finger down and ends when the last one
/// is lifted. Once a pinch happened, the sequence no longer produces swipes.
#[derive(Debug, Clone)]
pub struct GestureTracker {
    fingers: BTreeMap<u64, Finger>,
    base: Option<PinchBase>,
    pinched: bool,
    threshold: f32,
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl GestureTracker {
    /// `threshold` is the horizontal travel, as a fraction of the width,
    /// that makes a swipe.
    pub fn new(threshold: f32) -> Self {
        Self {
            fingers: BTreeMap::new(),
            base: None,
            pinched: false,
            threshold,
        }
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    pub fn is_tracking(&self, id: u64) -> bool {
        self.fingers.contains_key(&id)
    }

    pub fn press(&mut self, id: u64, position: (f32, f32)) {
        if self.fingers.is_empty() {
            self.pinched = false;
        }
        self.fingers.insert(
            id,
            Finger {
                start: position,
                current: position,
            },
        );
        self.base = self.pinch_base();
    }

    /// Record a finger movement; two fingers down make a pinch.
    pub fn moved(&mut self, id: u64, position: (f32, f32)) -> Option<Gesture> {
        self.fingers.get_mut(&id)?.current = position;

        let now = self.pinch_base()?;
        let base = self.base.get_or_insert(now);
        if base.distance <= f64::EPSILON {
            *base = now;
            return None;
        }

        let scale = (now.distance / base.distance * 10.0).round() / 10.0;
        let center_delta = (now.center.0 - base.center.0, now.center.1 - base.center.1);
        if scale == 1.0 && center_delta.0.abs() < 1.0 && center_delta.1.abs() < 1.0 {
            return None;
        }

        // Small scale changes accumulate until they survive the rounding.
        if scale != 1.0 {
            base.distance = now.distance;
        }
        base.center = now.center;
        self.pinched = true;
        Some(Gesture::Pinch {
            scale,
            center_delta,
        })
    }

    /// Finish a finger; the last finger of a sequence may complete a swipe.
    pub fn lift(&mut self, id: u64, position: (f32, f32), width: f32) -> Option<Gesture> {
        let mut finger = self.fingers.remove(&id)?;
        finger.current = position;
        self.base = self.pinch_base();

        if !self.fingers.is_empty() || self.pinched || width <= 0.0 {
            return None;
        }

        let travel = (finger.start.0 - finger.current.0) / width;
        if travel > self.threshold {
            Some(Gesture::Swipe(SwipeDirection::Left))
        } else if travel < -self.threshold {
            Some(Gesture::Swipe(SwipeDirection::Right))
        } else {
            None
        }
    }

    /// Drop a finger without producing a gesture.
    pub fn cancel(&mut self, id: u64) {
        self.fingers.remove(&id);
        self.base = self.pinch_base();
    }

    fn pinch_base(&self) -> Option<PinchBase> {
        let mut fingers = self.fingers.values();
        let (a, b) = (fingers.next()?.current, fingers.next()?.current);
        if fingers.next().is_some() {
            return None;
        }
        let (dx, dy) = (f64::from(a.0 - b.0), f64::from(a.1 - b.1));
        Some(PinchBase {
            distance: dx.hypot(dy),
            center: (
                f64::from(a.0 + b.0) / 2.0,
                f64::from(a.1 + b.1) / 2.0,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn swipe(from: f32, to: f32) -> Option<Gesture> {
        let mut tracker = GestureTracker::new(0.1);
        tracker.press(1, (from, 50.0));
        tracker.moved(1, (to, 50.0));
        tracker.lift(1, (to, 50.0), 1000.0)
    }

    #[test]
    fn leftward_swipe_is_next() {
        assert_eq!(swipe(800.0, 500.0), Some(Gesture::Swipe(SwipeDirection::Left)));
    }

    #[test]
    fn rightward_swipe_is_prev() {
        assert_eq!(swipe(200.0, 500.0), Some(Gesture::Swipe(SwipeDirection::Right)));
    }

    #[test]
    fn short_moves_are_ignored() {
        assert_eq!(swipe(500.0, 450.0), None);
        assert_eq!(swipe(500.0, 600.0), None);
    }

    #[test]
    fn unknown_fingers_are_ignored() {
        let mut tracker = GestureTracker::default();
        assert_eq!(tracker.moved(7, (1.0, 1.0)), None);
        assert_eq!(tracker.lift(7, (1.0, 1.0), 100.0), None);
    }

    #[test]
    fn spreading_two_fingers_zooms_in() {
        let mut tracker = GestureTracker::default();
        tracker.press(1, (100.0, 100.0));
        tracker.press(2, (200.0, 100.0));

        let gesture = tracker.moved(2, (250.0, 100.0));
        match gesture {
            Some(Gesture::Pinch {
                scale,
                center_delta,
            }) => {
                assert!((scale - 1.5).abs() < 1e-9);
                assert!((center_delta.0 - 25.0).abs() < 1e-9);
                assert_eq!(center_delta.1, 0.0);
            }
            other => panic!("expected pinch, got {other:?}"),
        }
    }

    #[test]
    fn small_pinch_steps_accumulate() {
        let mut tracker = GestureTracker::default();
        tracker.press(1, (0.0, 0.0));
        tracker.press(2, (100.0, 0.0));

        // Each step alone rounds to 1.0 and keeps the center, so nothing happens.
        assert_eq!(tracker.moved(1, (-1.0, 0.0)), None);
        assert_eq!(tracker.moved(2, (101.0, 0.0)), None);

        // Together they add up to 1.1x.
        let gesture = tracker.moved(2, (109.0, 0.0));
        assert!(matches!(gesture, Some(Gesture::Pinch { scale, .. }) if (scale - 1.1).abs() < 1e-9));
    }

    #[test]
    fn pinch_suppresses_swipe() {
        let mut tracker = GestureTracker::default();
        tracker.press(1, (100.0, 100.0));
        tracker.press(2, (200.0, 100.0));
        tracker.moved(2, (400.0, 100.0));

        assert_eq!(tracker.lift(2, (400.0, 100.0), 500.0), None);
        assert_eq!(tracker.lift(1, (0.0, 100.0), 500.0), None);

        // A fresh sequence swipes again.
        tracker.press(3, (400.0, 0.0));
        assert_eq!(
            tracker.lift(3, (100.0, 0.0), 500.0),
            Some(Gesture::Swipe(SwipeDirection::Left))
        );
    }
}
