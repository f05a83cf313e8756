//! Lazy validation flags.
//!
//! Every mutator clears the narrowest flag it can justify; every read path
//! calls the matching `validate_*` which is a no-op while the flag is set.
//! Clearing a flag also clears everything computed from it:
//!
//! ```text
//! SKELETON ─► ANIMATED_SKELETON ─► ANIMATION ─► ANIMATED_NORMALS
//! NORMALS (rest coordinates only)
//! ```

use bitflags::bitflags;

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct Validity: u32 {
        /// Rest-pose absolute joint matrices.
        const SKELETON          = 1 << 0;
        /// Posed (final) joint matrices for the current frame.
        const ANIMATED_SKELETON = 1 << 1;
        /// Resampled vertex and point coordinates.
        const ANIMATION         = 1 << 2;
        /// Rest-pose vertex normals.
        const NORMALS           = 1 << 3;
        /// Normals of the resampled coordinates.
        const ANIMATED_NORMALS  = 1 << 4;
    }
}

impl Validity {
    /// The flag itself plus every flag derived from it.
    #[must_use]
    pub fn with_dependents(self) -> Self {
        let mut out = self;
        if out.contains(Self::SKELETON) {
            out |= Self::ANIMATED_SKELETON;
        }
        if out.contains(Self::ANIMATED_SKELETON) {
            out |= Self::ANIMATION;
        }
        if out.contains(Self::ANIMATION) {
            out |= Self::ANIMATED_NORMALS;
        }
        out
    }

    /// Flags that must already be valid before `self` may be marked valid.
    #[must_use]
    pub fn prerequisites(self) -> Self {
        let mut out = Self::empty();
        if self.contains(Self::ANIMATED_SKELETON) {
            out |= Self::SKELETON;
        }
        if self.contains(Self::ANIMATION) {
            out |= Self::ANIMATED_SKELETON;
        }
        if self.contains(Self::ANIMATED_NORMALS) {
            out |= Self::ANIMATION;
        }
        out
    }
}

/// The set of currently valid caches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ValidationState {
    valid: Validity,
}

impl ValidationState {
    /// Starts with every cache invalid.
    #[must_use]
    pub fn new() -> Self {
        Self {
            valid: Validity::empty(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self, flag: Validity) -> bool {
        self.valid.contains(flag)
    }

    /// Clears `flag` and everything derived from it.
    pub fn invalidate(&mut self, flag: Validity) {
        self.valid.remove(flag.with_dependents());
    }

    /// Marks `flag` valid.
    ///
    /// Validating out of dependency order is a programming error.
    pub fn mark_valid(&mut self, flag: Validity) {
        let missing = flag.prerequisites() - self.valid;
        debug_assert!(
            missing.is_empty(),
            "validating {flag:?} before {missing:?}"
        );
        if !missing.is_empty() {
            log::error!("Validation order violated: {flag:?} marked valid before {missing:?}");
        }
        self.valid |= flag;
    }

    #[inline]
    #[must_use]
    pub fn flags(&self) -> Validity {
        self.valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalidating_skeleton_cascades() {
        let mut state = ValidationState::new();
        state.mark_valid(Validity::SKELETON);
        state.mark_valid(Validity::ANIMATED_SKELETON);
        state.mark_valid(Validity::ANIMATION);
        state.mark_valid(Validity::NORMALS);

        state.invalidate(Validity::SKELETON);
        assert!(!state.is_valid(Validity::ANIMATED_SKELETON));
        assert!(!state.is_valid(Validity::ANIMATION));
        assert!(state.is_valid(Validity::NORMALS));
    }

    #[test]
    fn invalidating_animation_keeps_skeleton() {
        let mut state = ValidationState::new();
        state.mark_valid(Validity::SKELETON);
        state.mark_valid(Validity::ANIMATED_SKELETON);
        state.mark_valid(Validity::ANIMATION);

        state.invalidate(Validity::ANIMATION);
        assert!(state.is_valid(Validity::SKELETON));
        assert!(state.is_valid(Validity::ANIMATED_SKELETON));
        assert!(!state.is_valid(Validity::ANIMATION));
    }

    #[test]
    fn prerequisites_follow_pipeline() {
        assert_eq!(Validity::SKELETON.prerequisites(), Validity::empty());
        assert_eq!(
            Validity::ANIMATION.prerequisites(),
            Validity::ANIMATED_SKELETON
        );
    }
}
