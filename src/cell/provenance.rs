use std::fmt::Debug;

/// Per-slot payload carried by a [`Cell`](super::Cell).
///
/// The payload labels the face of every adjacency slot with the identifier of
/// the particle whose bisecting plane created it. [`Plain`] stores a
/// zero-sized tag, so cells that do not need provenance pay nothing for it.
pub trait Provenance: Debug + Clone + Default {
    /// The tag stored next to each adjacency slot.
    type Tag: Copy + Debug + Default + PartialEq + Send + Sync;

    /// Builds the tag for faces created by the particle `id`.
    fn tag(id: i32) -> Self::Tag;

    /// Recovers the particle identifier stored in a tag, if any.
    fn id(tag: Self::Tag) -> Option<i32>;
}

/// No provenance tracking.
#[derive(Debug, Clone, Copy, Default)]
pub struct Plain;

impl Provenance for Plain {
    type Tag = ();

    fn tag(_id: i32) -> Self::Tag {}

    fn id((): Self::Tag) -> Option<i32> {
        None
    }
}

/// Tracks the generating particle of every face.
#[derive(Debug, Clone, Copy, Default)]
pub struct Neighbors;

impl Provenance for Neighbors {
    type Tag = i32;

    fn tag(id: i32) -> Self::Tag {
        id
    }

    fn id(tag: Self::Tag) -> Option<i32> {
        Some(tag)
    }
}
