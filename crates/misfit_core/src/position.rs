/// Which container a [`Position`] indexes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PositionKind {
    Vertex,
    Joint,
    Point,
    Projection,
}

/// A tagged handle used uniformly by movement, rotation, scaling and
/// influence APIs.
///
/// A `Position` is only an index: it stays valid across appends and
/// in-place edits, but must be re-resolved after any delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    pub kind: PositionKind,
    pub index: usize,
}

impl Position {
    #[inline]
    #[must_use]
    pub const fn new(kind: PositionKind, index: usize) -> Self {
        Self { kind, index }
    }

    #[inline]
    #[must_use]
    pub const fn vertex(index: usize) -> Self {
        Self::new(PositionKind::Vertex, index)
    }

    #[inline]
    #[must_use]
    pub const fn joint(index: usize) -> Self {
        Self::new(PositionKind::Joint, index)
    }

    #[inline]
    #[must_use]
    pub const fn point(index: usize) -> Self {
        Self::new(PositionKind::Point, index)
    }

    #[inline]
    #[must_use]
    pub const fn projection(index: usize) -> Self {
        Self::new(PositionKind::Projection, index)
    }

    /// Whether this kind of position can carry bone influences.
    #[inline]
    #[must_use]
    pub fn accepts_influences(&self) -> bool {
        matches!(self.kind, PositionKind::Vertex | PositionKind::Point)
    }
}
