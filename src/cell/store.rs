use std::ops::Range;

use tracing::debug;

use crate::error::CellError;
use crate::math::Point3;

use super::provenance::Provenance;
use super::Cell;

slotmap::new_key_type! {
    /// Stable handle of a vertex inside a [`Cell`].
    pub struct VertexId;
}

/// A neighbor entry: the adjacent vertex and the tag of the face in front of it.
pub(crate) type Link<T> = (VertexId, T);

/// Location of a vertex and of its adjacency record.
#[derive(Debug, Clone, Copy)]
pub struct VertexData {
    /// Position relative to the cell's generating point.
    pub point: Point3,
    order: usize,
    slot: usize,
}

impl VertexData {
    /// Number of edges meeting at this vertex.
    #[must_use]
    pub fn order(&self) -> usize {
        self.order
    }
}

/// Packed adjacency records of every vertex with the same order.
///
/// Record `s` occupies entries `s * order .. (s + 1) * order` of the three
/// parallel arrays. Freed records are filled with the last record so the pool
/// stays dense; the moved record's owner is reported back to the caller.
#[derive(Debug, Clone)]
pub(crate) struct OrderPool<T> {
    order: usize,
    edges: Vec<VertexId>,
    back: Vec<usize>,
    tags: Vec<T>,
    owners: Vec<VertexId>,
    capacity: usize,
}

impl<T: Copy> OrderPool<T> {
    pub(crate) fn new(order: usize, capacity: usize) -> Self {
        Self {
            order,
            edges: Vec::with_capacity(order * capacity),
            back: Vec::with_capacity(order * capacity),
            tags: Vec::with_capacity(order * capacity),
            owners: Vec::with_capacity(capacity),
            capacity,
        }
    }

    fn len(&self) -> usize {
        self.owners.len()
    }

    fn span(&self, slot: usize) -> Range<usize> {
        slot * self.order..(slot + 1) * self.order
    }

    fn reserve(&mut self, capacity: usize) {
        let extra = capacity.saturating_sub(self.len());
        self.edges.reserve(extra * self.order);
        self.back.reserve(extra * self.order);
        self.tags.reserve(extra * self.order);
        self.owners.reserve(extra);
        self.capacity = capacity;
    }

    fn push(&mut self, owner: VertexId, links: &[Link<T>]) -> usize {
        debug_assert_eq!(links.len(), self.order);
        let slot = self.len();
        self.owners.push(owner);
        for &(vertex, tag) in links {
            self.edges.push(vertex);
            self.back.push(0);
            self.tags.push(tag);
        }
        slot
    }

    fn overwrite(&mut self, slot: usize, links: &[Link<T>]) {
        let start = slot * self.order;
        for (i, &(vertex, tag)) in links.iter().enumerate() {
            self.edges[start + i] = vertex;
            self.tags[start + i] = tag;
        }
    }

    /// Removes a record, returning the owner of the record moved into its slot.
    fn swap_remove(&mut self, slot: usize) -> Option<VertexId> {
        let last = self.len() - 1;
        let moved = if slot == last {
            None
        } else {
            let from = self.span(last);
            let to = slot * self.order;
            self.edges.copy_within(from.clone(), to);
            self.back.copy_within(from.clone(), to);
            self.tags.copy_within(from, to);
            self.owners[slot] = self.owners[last];
            Some(self.owners[slot])
        };
        let end = last * self.order;
        self.edges.truncate(end);
        self.back.truncate(end);
        self.tags.truncate(end);
        self.owners.truncate(last);
        moved
    }
}

impl<P: Provenance> Cell<P> {
    /// Clears every vertex and rebuilds empty pools at their initial sizes.
    pub(crate) fn reset(&mut self) {
        let initial_order = self.config.initial_order.max(3);
        self.vertices.clear();
        self.vertex_capacity = self.config.initial_vertices.max(1);
        self.pools = (0..=initial_order)
            .map(|order| {
                let records = if order == 3 {
                    self.config.initial_order3_records
                } else {
                    self.config.initial_pool_records
                };
                OrderPool::new(order, records.max(1))
            })
            .collect();
        self.seed = None;
    }

    pub(crate) fn order(&self, v: VertexId) -> usize {
        self.vertices[v].order
    }

    pub(crate) fn point(&self, v: VertexId) -> Point3 {
        self.vertices[v].point
    }

    pub(crate) fn edges(&self, v: VertexId) -> &[VertexId] {
        let data = &self.vertices[v];
        let pool = &self.pools[data.order];
        &pool.edges[pool.span(data.slot)]
    }

    pub(crate) fn back_refs(&self, v: VertexId) -> &[usize] {
        let data = &self.vertices[v];
        let pool = &self.pools[data.order];
        &pool.back[pool.span(data.slot)]
    }

    pub(crate) fn slot_tags(&self, v: VertexId) -> &[P::Tag] {
        let data = &self.vertices[v];
        let pool = &self.pools[data.order];
        &pool.tags[pool.span(data.slot)]
    }

    pub(crate) fn edge(&self, v: VertexId, j: usize) -> VertexId {
        self.edges(v)[j]
    }

    pub(crate) fn back_ref(&self, v: VertexId, j: usize) -> usize {
        self.back_refs(v)[j]
    }

    pub(crate) fn links(&self, v: VertexId) -> Vec<Link<P::Tag>> {
        self.edges(v)
            .iter()
            .copied()
            .zip(self.slot_tags(v).iter().copied())
            .collect()
    }

    pub(crate) fn set_back_ref(&mut self, v: VertexId, j: usize, k: usize) {
        let data = self.vertices[v];
        self.pools[data.order].back[data.slot * data.order + j] = k;
    }

    pub(crate) fn set_tag(&mut self, v: VertexId, j: usize, tag: P::Tag) {
        let data = self.vertices[v];
        self.pools[data.order].tags[data.slot * data.order + j] = tag;
    }

    /// Inserts a vertex with the given neighbor list. Back-references are left
    /// unset until [`relink`](Self::relink) is called.
    pub(crate) fn add_vertex(
        &mut self,
        point: Point3,
        links: &[Link<P::Tag>],
    ) -> Result<VertexId, CellError> {
        if links.is_empty() {
            return Err(CellError::InvalidTopology(
                "vertex without neighbors".into(),
            ));
        }
        if self.vertices.len() >= self.vertex_capacity {
            self.grow_vertices()?;
        }
        let v = self.vertices.insert(VertexData {
            point,
            order: links.len(),
            slot: 0,
        });
        match self.allocate_record(v, links) {
            Ok(slot) => {
                self.vertices[v].slot = slot;
                Ok(v)
            }
            Err(err) => {
                self.vertices.remove(v);
                Err(err)
            }
        }
    }

    /// Replaces the neighbor list of `v`, moving its record to another pool
    /// when the order changes.
    pub(crate) fn set_links(
        &mut self,
        v: VertexId,
        links: &[Link<P::Tag>],
    ) -> Result<(), CellError> {
        if links.is_empty() {
            return Err(CellError::InvalidTopology(
                "vertex without neighbors".into(),
            ));
        }
        let data = self.vertices[v];
        if links.len() == data.order {
            self.pools[data.order].overwrite(data.slot, links);
            return Ok(());
        }
        let slot = self.allocate_record(v, links)?;
        self.release_record(data.order, data.slot);
        let entry = &mut self.vertices[v];
        entry.order = links.len();
        entry.slot = slot;
        Ok(())
    }

    pub(crate) fn remove_vertex(&mut self, v: VertexId) {
        if let Some(data) = self.vertices.remove(v) {
            self.release_record(data.order, data.slot);
        }
        if self.seed == Some(v) {
            self.seed = None;
        }
    }

    /// Recomputes the back-references of every slot of the given vertices, and
    /// the matching slots on the other end of each edge.
    pub(crate) fn relink(&mut self, vertices: &[VertexId]) -> Result<(), CellError> {
        for &u in vertices {
            if !self.vertices.contains_key(u) {
                continue;
            }
            for j in 0..self.order(u) {
                let w = self.edge(u, j);
                if !self.vertices.contains_key(w) {
                    return Err(CellError::InvalidTopology(
                        "edge points to a removed vertex".into(),
                    ));
                }
                let Some(k) = self.edges(w).iter().position(|&x| x == u) else {
                    return Err(CellError::InvalidTopology(
                        "edge is not listed by its other end".into(),
                    ));
                };
                self.set_back_ref(u, j, k);
                self.set_back_ref(w, k, j);
            }
        }
        Ok(())
    }

    fn allocate_record(
        &mut self,
        owner: VertexId,
        links: &[Link<P::Tag>],
    ) -> Result<usize, CellError> {
        let order = links.len();
        if order >= self.pools.len() {
            self.grow_order_pools(order)?;
        }
        let limit = self.config.max_vertices;
        let pool = &mut self.pools[order];
        if pool.len() >= pool.capacity {
            let grown = (pool.capacity * 2).min(limit);
            if grown <= pool.len() {
                return Err(CellError::VertexLimit { limit });
            }
            debug!(order, from = pool.capacity, to = grown, "growing vertex-order pool");
            pool.reserve(grown);
        }
        Ok(pool.push(owner, links))
    }

    fn release_record(&mut self, order: usize, slot: usize) {
        if let Some(moved) = self.pools[order].swap_remove(slot) {
            self.vertices[moved].slot = slot;
        }
    }

    /// Extends the pool table so that vertices of `order` can be stored.
    pub(crate) fn grow_order_pools(&mut self, order: usize) -> Result<(), CellError> {
        let limit = self.config.max_order;
        if order > limit {
            return Err(CellError::OrderLimit { order, limit });
        }
        let mut size = self.pools.len().max(1);
        while size <= order {
            size *= 2;
        }
        let size = size.min(limit + 1);
        debug!(from = self.pools.len(), to = size, "growing vertex-order table");
        let records = self.config.initial_pool_records.max(1);
        for o in self.pools.len()..size {
            self.pools.push(OrderPool::new(o, records));
        }
        Ok(())
    }

    /// Doubles the vertex capacity, up to the configured limit.
    pub(crate) fn grow_vertices(&mut self) -> Result<(), CellError> {
        let limit = self.config.max_vertices;
        let grown = (self.vertex_capacity * 2).min(limit);
        if grown <= self.vertices.len() {
            return Err(CellError::VertexLimit { limit });
        }
        debug!(from = self.vertex_capacity, to = grown, "growing vertex storage");
        self.vertices.reserve(grown - self.vertices.len());
        self.vertex_capacity = grown;
        Ok(())
    }
}
