//! A/B loop state machine.
//!
//! `unset -> A-set -> (B-set, active) -> unset`. The machine only tracks
//! points and the active flag; installing and removing the position listener
//! is the caller's job, driven by the returned [`LoopTransition`].

use crate::error::LoopError;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AbLoop {
    point_a: Option<f64>,
    point_b: Option<f64>,
    active: bool,
}

/// What the caller has to do with the position listener after an action.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopTransition {
    /// Install (or replace) the position listener.
    Activated,
    /// Remove the position listener.
    Deactivated,
    Unchanged,
}

impl AbLoop {
    pub fn point_a(&self) -> Option<f64> {
        self.point_a
    }

    pub fn point_b(&self) -> Option<f64> {
        self.point_b
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_point_a(&mut self, position: f64) -> LoopTransition {
        self.point_a = Some(position);
        self.reevaluate()
    }

    pub fn set_point_b(&mut self, position: f64) -> LoopTransition {
        self.point_b = Some(position);
        self.reevaluate()
    }

    fn valid_points(&self) -> Result<(f64, f64), LoopError> {
        match (self.point_a, self.point_b) {
            (Some(a), Some(b)) if a < b => Ok((a, b)),
            (Some(_), Some(_)) => Err(LoopError::InvalidOrder),
            _ => Err(LoopError::MissingPoints),
        }
    }

    fn reevaluate(&mut self) -> LoopTransition {
        let valid = self.valid_points().is_ok();
        match (valid, self.active) {
            (true, _) => {
                self.active = true;
                LoopTransition::Activated
            }
            (false, true) => {
                self.active = false;
                LoopTransition::Deactivated
            }
            (false, false) => LoopTransition::Unchanged,
        }
    }

    pub fn clear(&mut self) -> LoopTransition {
        let was_active = self.active;
        *self = Self::default();
        if was_active {
            LoopTransition::Deactivated
        } else {
            LoopTransition::Unchanged
        }
    }

    /// Flip `active` keeping the points. Activation needs both points with A < B.
    pub fn toggle(&mut self) -> Result<LoopTransition, LoopError> {
        if self.active {
            self.active = false;
            return Ok(LoopTransition::Deactivated);
        }
        self.valid_points()?;
        self.active = true;
        Ok(LoopTransition::Activated)
    }

    /// Position tick. Returns the seek target once B is reached or passed.
    pub fn on_time_update(&self, position: f64) -> Option<f64> {
        match (self.active, self.point_a, self.point_b) {
            (true, Some(a), Some(b)) if position >= b => Some(a),
            _ => None,
        }
    }
}
