// Uniform-grid collision indexes for placed labels and marker obstacles.

use std::collections::HashMap;

use super::types::{ObstacleShape, Rect, meaningful_overlap};

const MIN_CELL: f64 = 44.0;
const MAX_CELL: f64 = 128.0;
const FALLBACK_CELL: f64 = 64.0;

/// Cell size from the running average of collision box dimensions.
pub fn cell_size_for(dims: impl IntoIterator<Item = (f64, f64)>) -> f64 {
    let mut mean = 0.0;
    let mut count = 0usize;
    for (w, h) in dims {
        let size = (w + h) / 2.0;
        if !size.is_finite() {
            continue;
        }
        count += 1;
        mean += (size - mean) / count as f64;
    }
    if count == 0 {
        return FALLBACK_CELL;
    }
    mean.clamp(MIN_CELL, MAX_CELL)
}

/// Arena of rectangles bucketed into a uniform grid.
///
/// Queries tag each visited entry with a per-query stamp, so duplicates
/// across cells are skipped without clearing any state between queries.
///
/// With an extent set, rects are bucketed only where they cross it. Every
/// query rect must then lie inside the extent.
#[derive(Debug)]
pub struct SpatialIndex {
    cell: f64,
    extent: Option<Rect>,
    /// Maps grid cell (ix, iy) to handles of rects touching it.
    cells: HashMap<(i32, i32), Vec<usize>>,
    rects: Vec<Rect>,
    seen: Vec<u32>,
    stamp: u32,
    hits: Vec<usize>,
}

impl SpatialIndex {
    pub fn new(cell: f64) -> Self {
        let cell = if cell.is_finite() { cell.max(1.0) } else { FALLBACK_CELL };
        Self {
            cell,
            extent: None,
            cells: HashMap::new(),
            rects: Vec::new(),
            seen: Vec::new(),
            stamp: 0,
            hits: Vec::new(),
        }
    }

    /// Limit bucketing to `extent`.
    pub fn clipped_to(mut self, extent: Rect) -> Self {
        self.extent = Some(extent);
        self
    }

    fn cell_span(&self, rect: &Rect) -> Option<(i32, i32, i32, i32)> {
        if !(rect.x.is_finite() && rect.y.is_finite())
            || rect.right().is_nan()
            || rect.bottom().is_nan()
        {
            return None;
        }
        let (mut x0, mut y0, mut x1, mut y1) = (rect.x, rect.y, rect.right(), rect.bottom());
        if let Some(extent) = self.extent {
            x0 = x0.max(extent.x);
            y0 = y0.max(extent.y);
            x1 = x1.min(extent.right());
            y1 = y1.min(extent.bottom());
        }
        if !(x0.is_finite() && y0.is_finite() && x1.is_finite() && y1.is_finite())
            || x0 > x1
            || y0 > y1
        {
            return None;
        }
        Some((
            (x0 / self.cell).floor() as i32,
            (y0 / self.cell).floor() as i32,
            (x1 / self.cell).floor() as i32,
            (y1 / self.cell).floor() as i32,
        ))
    }

    /// Add a rect; the returned handle is its insertion index.
    pub fn insert(&mut self, rect: Rect) -> usize {
        let handle = self.rects.len();
        self.rects.push(rect);
        self.seen.push(0);
        if let Some((x0, y0, x1, y1)) = self.cell_span(&rect) {
            for ix in x0..=x1 {
                for iy in y0..=y1 {
                    self.cells.entry((ix, iy)).or_default().push(handle);
                }
            }
        }
        handle
    }

    fn next_stamp(&mut self) -> u32 {
        // Stamp 0 means "never visited".
        self.stamp = self.stamp.wrapping_add(1).max(1);
        if self.stamp == u32::MAX {
            self.seen.fill(0);
            self.stamp = 1;
        }
        self.stamp
    }

    /// Handles of stored rects that meaningfully overlap `rect`, in
    /// insertion order.
    pub fn query_overlapping(&mut self, rect: &Rect) -> std::vec::Drain<'_, usize> {
        self.hits.clear();
        if let Some((x0, y0, x1, y1)) = self.cell_span(rect) {
            let stamp = self.next_stamp();
            for ix in x0..=x1 {
                for iy in y0..=y1 {
                    let Some(bucket) = self.cells.get(&(ix, iy)) else {
                        continue;
                    };
                    for &handle in bucket {
                        if self.seen[handle] == stamp {
                            continue;
                        }
                        self.seen[handle] = stamp;
                        if meaningful_overlap(rect, &self.rects[handle]) {
                            self.hits.push(handle);
                        }
                    }
                }
            }
            self.hits.sort_unstable();
        }
        self.hits.drain(..)
    }
}

#[derive(Debug)]
pub(crate) struct MarkerObstacleEntry {
    pub owner: String,
    pub shape: ObstacleShape,
    pub active: bool,
}

impl MarkerObstacleEntry {
    fn collides(&self, rect: &Rect) -> bool {
        match &self.shape {
            ObstacleShape::Zones(zones) => zones.iter().any(|zone| meaningful_overlap(rect, zone)),
            ObstacleShape::Rows { rows, .. } => rows.iter().any(|row| {
                row.top < rect.bottom()
                    && row.bottom > rect.y
                    && row.spans.iter().any(|&(x0, x1)| {
                        let band = Rect::new(x0, row.top, x1 - x0, row.bottom - row.top);
                        meaningful_overlap(rect, &band)
                    })
            }),
        }
    }
}

/// Marker obstacles keyed by owning candidate id.
#[derive(Debug)]
pub(crate) struct MarkerObstacleIndex {
    grid: SpatialIndex,
    entries: Vec<MarkerObstacleEntry>,
    by_owner: HashMap<String, Vec<usize>>,
}

impl MarkerObstacleIndex {
    pub fn new(cell: f64, extent: Rect) -> Self {
        Self {
            grid: SpatialIndex::new(cell).clipped_to(extent),
            entries: Vec::new(),
            by_owner: HashMap::new(),
        }
    }

    pub fn insert(&mut self, owner: &str, shape: ObstacleShape) {
        let Some(bounds) = shape.bounds() else {
            return;
        };
        let handle = self.grid.insert(bounds);
        debug_assert_eq!(handle, self.entries.len());
        self.entries.push(MarkerObstacleEntry {
            owner: owner.to_string(),
            shape,
            active: true,
        });
        self.by_owner.entry(owner.to_string()).or_default().push(handle);
    }

    pub fn deactivate_owner(&mut self, owner: &str) {
        if let Some(handles) = self.by_owner.get(owner) {
            for &handle in handles {
                self.entries[handle].active = false;
            }
        }
    }

    /// True when `rect` hits an active obstacle not owned by `owner`.
    pub fn collides(&mut self, rect: &Rect, owner: &str) -> bool {
        let entries = &self.entries;
        self.grid.query_overlapping(rect).any(|handle| {
            let entry = &entries[handle];
            entry.active && entry.owner != owner && entry.collides(rect)
        })
    }
}
