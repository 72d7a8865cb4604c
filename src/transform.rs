//! Nested transforms layered above the backend's own matrix.

use crate::error::{RenderError, Result};
use crate::geometry::Affine;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TransformStack {
    baseline: Affine,
    current: Affine,
    stored: Vec<Affine>,
}

impl TransformStack {
    /// Starts a stack whose effective and baseline transform is `baseline`.
    pub fn new(baseline: Affine) -> Self {
        Self {
            baseline,
            current: baseline,
            stored: Vec::new(),
        }
    }

    pub fn current(&self) -> Affine {
        self.current
    }

    pub fn baseline(&self) -> Affine {
        self.baseline
    }

    pub fn depth(&self) -> usize {
        self.stored.len()
    }

    pub fn store(&mut self) {
        self.stored.push(self.current);
    }

    /// Pops the last stored transform and makes it current.
    pub fn restore(&mut self) -> Result<Affine> {
        let m = self.stored.pop().ok_or(RenderError::TransformStackEmpty)?;
        self.current = m;
        Ok(m)
    }

    /// Drops the last stored transform, keeping the current one.
    pub fn remove(&mut self) -> Result<()> {
        self.stored
            .pop()
            .map(|_| ())
            .ok_or(RenderError::TransformStackEmpty)
    }

    /// Back to the baseline; the stored entries are left alone.
    pub fn reset(&mut self) -> Affine {
        self.current = self.baseline;
        self.current
    }

    pub fn translate(&mut self, dx: f64, dy: f64) -> Affine {
        self.current = self.current.pre_multiply(Affine::translation(dx, dy));
        self.current
    }

    pub fn scale(&mut self, s: f64) -> Affine {
        self.current = self.current.pre_multiply(Affine::scaling(s, s));
        self.current
    }
}
