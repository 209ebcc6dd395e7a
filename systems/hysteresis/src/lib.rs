#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Dead-band classifiers that keep per-cycle decisions from flickering.
//!
//! [`HysteresisClassifier`] maps a field position to the nearest formation
//! cell while favouring the previously classified cell. [`DynamicBorder`] is
//! the scalar counterpart: a Schmitt trigger around a fixed threshold.

use team_tasking_core::{Formation, Pose2, Vec2};

/// Dead-band width applied around cell boundaries, in field units.
pub const HYSTERESIS_BAND: f32 = 200.0;

/// Nearest-cell lookup biased toward the previous answer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HysteresisClassifier {
    band: f32,
}

impl Default for HysteresisClassifier {
    fn default() -> Self {
        Self::new(HYSTERESIS_BAND)
    }
}

impl HysteresisClassifier {
    /// Creates a classifier using the provided dead-band width.
    #[must_use]
    pub const fn new(band: f32) -> Self {
        Self { band }
    }

    /// Dead-band width of the classifier.
    #[must_use]
    pub const fn band(&self) -> f32 {
        self.band
    }

    /// Index of the cell whose occupation pose is nearest to `position`.
    ///
    /// When `last` names a cell, that cell's distance is reduced by the band
    /// and every other cell's distance is increased by it, so a position has
    /// to cross a boundary by more than the band before the answer changes.
    /// Without a prior the plain nearest cell is returned. Among equal
    /// effective distances the lowest index wins. An empty formation yields
    /// `None`.
    #[must_use]
    pub fn classify(
        &self,
        formation: &Formation,
        position: Vec2,
        last: Option<usize>,
    ) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;

        for (index, cell) in formation.cells().iter().enumerate() {
            let distance = position.distance(cell.occupation().translation());
            let effective = match last {
                Some(previous) if previous == index => distance - self.band,
                Some(_) => distance + self.band,
                None => distance,
            };

            match best {
                Some((_, current)) if effective >= current => {}
                _ => best = Some((index, effective)),
            }
        }

        best.map(|(index, _)| index)
    }

    /// Pointer pose of the cell `position` falls into, without a prior.
    #[must_use]
    pub fn pointer_for(&self, formation: &Formation, position: Vec2) -> Option<Pose2> {
        self.classify(formation, position, None)
            .and_then(|index| formation.cell(index))
            .map(|cell| cell.pointer())
    }
}

/// Scalar Schmitt trigger around `position` with half-width `radius`.
///
/// The first comparison is made against `position` itself. Afterwards the
/// effective threshold moves by `radius` away from the side the last
/// comparison landed on, so a value has to travel the full width of the band
/// before the outcome flips.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DynamicBorder {
    position: f32,
    radius: f32,
    sign: i8,
}

impl DynamicBorder {
    /// Creates a border that has not yet been crossed from either side.
    #[must_use]
    pub const fn new(position: f32, radius: f32) -> Self {
        Self {
            position,
            radius,
            sign: 0,
        }
    }

    /// Nominal threshold of the border.
    #[must_use]
    pub const fn position(&self) -> f32 {
        self.position
    }

    /// Threshold the next comparison is made against.
    #[must_use]
    pub fn threshold(&self) -> f32 {
        self.position + self.radius * f32::from(self.sign)
    }

    /// Reports whether `value` lies above the border and latches the result.
    pub fn is_above(&mut self, value: f32) -> bool {
        if value > self.threshold() {
            self.sign = -1;
            true
        } else {
            self.sign = 1;
            false
        }
    }

    /// Reports whether `value` lies below the border and latches the result.
    pub fn is_below(&mut self, value: f32) -> bool {
        if value < self.threshold() {
            self.sign = 1;
            true
        } else {
            self.sign = -1;
            false
        }
    }
}
