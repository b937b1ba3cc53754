use crate::agent::AgentId;
use crate::error::ConsistencyError;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

/// Cell coordinate. Signed so that offsets can be applied before wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    pub x: i64,
    pub y: i64,
}

impl Position {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: i64, dy: i64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

const MOORE_STEPS: [(i64, i64); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

const VON_NEUMANN_STEPS: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];

/// Toroidal multi-occupancy grid.
///
/// Owns the cell -> occupants index and the reverse id -> position lookup.
/// Occupants keep insertion order so that scans are reproducible.
#[derive(Debug, Clone)]
pub struct Grid {
    pub width: usize,
    pub height: usize,
    moore: bool,
    cells: Vec<Vec<AgentId>>,
    positions: HashMap<AgentId, Position>,
}

impl Grid {
    /// Create an empty grid. `moore` selects 8-neighbour steps over 4.
    pub fn new(width: usize, height: usize, moore: bool) -> Self {
        Grid {
            width,
            height,
            moore,
            cells: vec![Vec::new(); width * height],
            positions: HashMap::new(),
        }
    }

    pub fn in_bounds(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as usize) < self.width && (pos.y as usize) < self.height
    }

    /// Normalise a coordinate onto the torus
    pub fn wrap(&self, pos: Position) -> Position {
        Position::new(
            pos.x.rem_euclid(self.width as i64),
            pos.y.rem_euclid(self.height as i64),
        )
    }

    fn index(&self, pos: Position) -> usize {
        pos.y as usize * self.width + pos.x as usize
    }

    /// Insert `id` at an in-bounds position
    pub fn place(&mut self, id: AgentId, pos: Position) -> Result<(), ConsistencyError> {
        if !self.in_bounds(pos) {
            return Err(ConsistencyError::OutOfBounds(pos));
        }
        if self.positions.contains_key(&id) {
            return Err(ConsistencyError::DuplicateId(id));
        }
        let idx = self.index(pos);
        self.cells[idx].push(id);
        self.positions.insert(id, pos);
        Ok(())
    }

    /// Remove `id` from the cell at `pos`, which must be where it was recorded
    pub fn remove(&mut self, pos: Position, id: AgentId) -> Result<(), ConsistencyError> {
        if !self.in_bounds(pos) {
            return Err(ConsistencyError::OutOfBounds(pos));
        }
        if self.positions.get(&id) != Some(&pos) {
            return Err(ConsistencyError::NotFound(id));
        }
        let idx = self.index(pos);
        let cell = &mut self.cells[idx];
        let slot = cell
            .iter()
            .position(|&other| other == id)
            .ok_or(ConsistencyError::NotFound(id))?;
        cell.remove(slot);
        self.positions.remove(&id);
        Ok(())
    }

    /// Remove `id` from wherever it currently is, returning that position
    pub fn remove_agent(&mut self, id: AgentId) -> Result<Position, ConsistencyError> {
        let pos = self.position_of(id).ok_or(ConsistencyError::NotFound(id))?;
        self.remove(pos, id)?;
        Ok(pos)
    }

    /// Move `id` to `pos` (wrapped onto the torus) and return the new position
    pub fn move_to(&mut self, id: AgentId, pos: Position) -> Result<Position, ConsistencyError> {
        let target = self.wrap(pos);
        let current = self.position_of(id).ok_or(ConsistencyError::NotFound(id))?;
        if current == target {
            return Ok(target);
        }
        self.remove(current, id)?;
        self.place(id, target)?;
        Ok(target)
    }

    pub fn position_of(&self, id: AgentId) -> Option<Position> {
        self.positions.get(&id).copied()
    }

    pub fn contains(&self, id: AgentId) -> bool {
        self.positions.contains_key(&id)
    }

    /// Number of agents placed on the grid
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Agents at a cell, in insertion order
    pub fn occupants(&self, pos: Position) -> &[AgentId] {
        let pos = self.wrap(pos);
        &self.cells[self.index(pos)]
    }

    fn axis_distance(a: i64, b: i64, span: usize) -> usize {
        let d = (a - b).rem_euclid(span as i64) as usize;
        d.min(span - d)
    }

    /// Chebyshev distance on the torus
    pub fn distance(&self, a: Position, b: Position) -> usize {
        Self::axis_distance(a.x, b.x, self.width).max(Self::axis_distance(a.y, b.y, self.height))
    }

    /// Offsets covering `radius` along one axis, each wrapped cell once
    fn axis_span(center: i64, radius: usize, span: usize) -> Vec<i64> {
        if 2 * radius + 1 >= span {
            (0..span as i64).collect()
        } else {
            let r = radius as i64;
            (-r..=r)
                .map(|d| (center + d).rem_euclid(span as i64))
                .collect()
        }
    }

    /// Every agent within Chebyshev `radius` of `pos`.
    ///
    /// Rows are scanned top to bottom, columns left to right relative to the
    /// window (or from column 0 when the window covers the whole axis), and
    /// each cell contributes its occupants in insertion order.
    pub fn neighbors(&self, pos: Position, radius: usize, include_center: bool) -> Vec<AgentId> {
        let center = self.wrap(pos);
        let rows = Self::axis_span(center.y, radius, self.height);
        let cols = Self::axis_span(center.x, radius, self.width);

        let mut found = Vec::new();
        for &y in &rows {
            for &x in &cols {
                let cell = Position::new(x, y);
                if !include_center && cell == center {
                    continue;
                }
                found.extend_from_slice(&self.cells[self.index(cell)]);
            }
        }
        found
    }

    fn steps(&self) -> &'static [(i64, i64)] {
        if self.moore {
            &MOORE_STEPS
        } else {
            &VON_NEUMANN_STEPS
        }
    }

    /// One adjacent cell chosen uniformly
    pub fn random_adjacent<R: Rng + ?Sized>(&self, pos: Position, rng: &mut R) -> Position {
        let (dx, dy) = self.steps().choose(rng).copied().unwrap_or((0, 0));
        self.wrap(pos.offset(dx, dy))
    }

    /// All placed agents and their positions
    pub fn placements(&self) -> impl Iterator<Item = (AgentId, Position)> + '_ {
        self.positions.iter().map(|(&id, &pos)| (id, pos))
    }

    /// Check that both indexes agree: each placed id sits in exactly one
    /// cell, and that cell is its recorded position.
    pub fn verify(&self) -> Result<(), ConsistencyError> {
        let mut seen = HashSet::with_capacity(self.positions.len());
        for (idx, cell) in self.cells.iter().enumerate() {
            let here = Position::new((idx % self.width) as i64, (idx / self.width) as i64);
            for &id in cell {
                if self.positions.get(&id) != Some(&here) {
                    return Err(ConsistencyError::NotFound(id));
                }
                if !seen.insert(id) {
                    return Err(ConsistencyError::DuplicateId(id));
                }
            }
        }
        match self.positions.keys().find(|id| !seen.contains(*id)) {
            Some(&id) => Err(ConsistencyError::NotFound(id)),
            None => Ok(()),
        }
    }
}
