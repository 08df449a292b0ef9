//! Spatial mesh for node-based hit grouping.
//!
//! The detector volume is divided into a regular grid. Every occupied
//! cell becomes a node carrying the summed energy of its hits, and nodes
//! touching along faces, edges or corners (26-neighbourhood) end up in
//! the same group.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::must_use_candidate
)]

use std::collections::HashMap;

use restrack_core::{Error, Hits, Position, Result};

/// Integer cell coordinates of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Node {
    /// Cell index along X.
    pub x: i32,
    /// Cell index along Y.
    pub y: i32,
    /// Cell index along Z.
    pub z: i32,
}

impl Node {
    /// Creates a node.
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Cells around this one; offsets leaving the `i32` range are skipped.
    fn neighbours(self) -> impl Iterator<Item = Node> {
        (-1..=1).flat_map(move |dx| {
            (-1..=1).flat_map(move |dy| {
                (-1..=1).filter_map(move |dz| {
                    if dx == 0 && dy == 0 && dz == 0 {
                        return None;
                    }
                    Some(Node::new(
                        self.x.checked_add(dx)?,
                        self.y.checked_add(dy)?,
                        self.z.checked_add(dz)?,
                    ))
                })
            })
        })
    }
}

/// Largest number of cells along one axis. Cell indices and their
/// neighbours must fit in an `i32`.
pub const MAX_CELLS: usize = (i32::MAX - 1) as usize;

/// Union-Find over node indices.
struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }

    fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = x;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    fn union(&mut self, x: usize, y: usize) {
        let px = self.find(x);
        let py = self.find(y);

        if px == py {
            return;
        }

        match self.rank[px].cmp(&self.rank[py]) {
            std::cmp::Ordering::Less => self.parent[px] = py,
            std::cmp::Ordering::Greater => self.parent[py] = px,
            std::cmp::Ordering::Equal => {
                self.parent[py] = px;
                self.rank[px] += 1;
            }
        }
    }
}

/// Regular 3D grid of occupied cells with connected-group labels.
///
/// Nodes and groups only live for one clustering call; the mesh is
/// rebuilt from scratch by [`SpatialMesh::set_nodes_from_hits`].
#[derive(Debug, Clone)]
pub struct SpatialMesh {
    origin: Position,
    size: Position,
    cells: [usize; 3],
    nodes: Vec<Node>,
    energy: Vec<f64>,
    group: Vec<usize>,
    lookup: HashMap<Node, usize>,
    groups: usize,
}

impl SpatialMesh {
    /// Creates a mesh covering `origin .. origin + size` with the given
    /// number of cells along X, Y and Z.
    ///
    /// # Errors
    /// Returns a configuration error for non-positive sizes, an axis
    /// without cells or more cells than [`MAX_CELLS`] along an axis.
    pub fn new(size: Position, origin: Position, nx: usize, ny: usize, nz: usize) -> Result<Self> {
        validate_geometry(size, origin, [nx, ny, nz])?;
        Ok(Self {
            origin,
            size,
            cells: [nx, ny, nz],
            nodes: Vec::new(),
            energy: Vec::new(),
            group: Vec::new(),
            lookup: HashMap::new(),
            groups: 0,
        })
    }

    /// Cubic mesh of side `net_size` split in cells of `cell_resolution`.
    ///
    /// # Errors
    /// Returns a configuration error if the resolution does not give at
    /// least one cell per axis.
    pub fn from_resolution(net_size: f64, cell_resolution: f64, origin: Position) -> Result<Self> {
        if !(cell_resolution > 0.0 && cell_resolution.is_finite()) {
            return Err(Error::ConfigError(format!(
                "cell resolution must be positive, got {cell_resolution}"
            )));
        }
        let cells = (net_size / cell_resolution).floor();
        if !(cells >= 1.0 && cells.is_finite()) {
            return Err(Error::ConfigError(format!(
                "net size {net_size} gives no cells at resolution {cell_resolution}"
            )));
        }
        let n = cells as usize;
        Self::new(Position::new(net_size, net_size, net_size), origin, n, n, n)
    }

    /// Lower corner of the mesh.
    pub fn origin(&self) -> Position {
        self.origin
    }

    /// Extent of the mesh along each axis.
    pub fn size(&self) -> Position {
        self.size
    }

    /// Number of cells along X, Y and Z.
    pub fn cells(&self) -> [usize; 3] {
        self.cells
    }

    /// Moves the mesh. Existing nodes are dropped.
    ///
    /// # Errors
    /// Returns a configuration error for a non-finite origin.
    pub fn set_origin(&mut self, origin: Position) -> Result<()> {
        validate_geometry(self.size, origin, self.cells)?;
        self.origin = origin;
        self.remove_nodes();
        Ok(())
    }

    /// Resizes the mesh. Existing nodes are dropped.
    ///
    /// # Errors
    /// Returns a configuration error for non-positive sizes.
    pub fn set_size(&mut self, size: Position) -> Result<()> {
        validate_geometry(size, self.origin, self.cells)?;
        self.size = size;
        self.remove_nodes();
        Ok(())
    }

    /// Changes the number of cells per axis. Existing nodes are dropped.
    ///
    /// # Errors
    /// Returns a configuration error if an axis has no cells or too many.
    pub fn set_cells(&mut self, nx: usize, ny: usize, nz: usize) -> Result<()> {
        validate_geometry(self.size, self.origin, [nx, ny, nz])?;
        self.cells = [nx, ny, nz];
        self.remove_nodes();
        Ok(())
    }

    /// Cell index of `x` along X.
    pub fn node_x(&self, x: f64) -> i32 {
        Self::cell_index(x, self.origin.x, self.size.x, self.cells[0], 'X')
    }

    /// Cell index of `y` along Y.
    pub fn node_y(&self, y: f64) -> i32 {
        Self::cell_index(y, self.origin.y, self.size.y, self.cells[1], 'Y')
    }

    /// Cell index of `z` along Z.
    pub fn node_z(&self, z: f64) -> i32 {
        Self::cell_index(z, self.origin.z, self.size.z, self.cells[2], 'Z')
    }

    /// Node of the cell containing the given coordinates.
    pub fn node_at(&self, x: f64, y: f64, z: f64) -> Node {
        Node::new(self.node_x(x), self.node_y(y), self.node_z(z))
    }

    /// A missing coordinate maps to cell 0; anything outside the mesh is
    /// clamped to the border cell.
    fn cell_index(value: f64, origin: f64, size: f64, cells: usize, axis: char) -> i32 {
        if value.is_nan() {
            return 0;
        }
        // Geometry validation bounds `cells` by MAX_CELLS.
        let last = i32::try_from(cells - 1).unwrap_or(i32::MAX - 1);
        let scaled = ((value - origin) / size * cells as f64).floor();
        if scaled < 0.0 {
            log::warn!("{axis} = {value} is below the mesh, using cell 0");
            0
        } else if scaled > f64::from(last) {
            log::warn!("{axis} = {value} is beyond the mesh, using cell {last}");
            last
        } else {
            scaled as i32
        }
    }

    /// Adds the energy of a hit to its cell, creating the node if needed,
    /// and returns the node index.
    ///
    /// A new node joins the group of its first existing neighbour, or
    /// opens a new group.
    pub fn add_node(&mut self, x: f64, y: f64, z: f64, energy: f64) -> usize {
        let node = self.node_at(x, y, z);
        if let Some(&index) = self.lookup.get(&node) {
            self.energy[index] += energy;
            return index;
        }

        let group = self.find_neighbour_group(node).unwrap_or_else(|| {
            self.groups += 1;
            self.groups - 1
        });
        let index = self.nodes.len();
        self.lookup.insert(node, index);
        self.nodes.push(node);
        self.energy.push(energy);
        self.group.push(group);
        index
    }

    /// Rebuilds the nodes from `hits` and regroups them, returning the
    /// node index of every hit.
    ///
    /// Every hit is accounted for, whatever its energy.
    pub fn set_nodes_from_hits(&mut self, hits: &Hits) -> Vec<usize> {
        self.remove_nodes();
        let nodes = hits
            .iter()
            .map(|hit| self.add_node(hit.x(), hit.y(), hit.z(), hit.energy))
            .collect();
        self.regrouping();
        nodes
    }

    /// Merges groups that touch until every group is a connected
    /// component, then renumbers them `0..k` in order of first node.
    pub fn regrouping(&mut self) {
        let mut uf = UnionFind::new(self.nodes.len());
        for (index, node) in self.nodes.iter().enumerate() {
            for neighbour in node.neighbours() {
                if let Some(&other) = self.lookup.get(&neighbour) {
                    uf.union(index, other);
                }
            }
        }

        let mut labels: HashMap<usize, usize> = HashMap::new();
        for index in 0..self.nodes.len() {
            let root = uf.find(index);
            let next = labels.len();
            self.group[index] = *labels.entry(root).or_insert(next);
        }
        self.groups = labels.len();
    }

    /// Drops all nodes and groups.
    pub fn remove_nodes(&mut self) {
        self.nodes.clear();
        self.energy.clear();
        self.group.clear();
        self.lookup.clear();
        self.groups = 0;
    }

    /// Group of the cell containing the coordinates, if it holds a node.
    pub fn group_id(&self, x: f64, y: f64, z: f64) -> Option<usize> {
        self.node_index(self.node_at(x, y, z))
            .map(|index| self.group[index])
    }

    /// Index of `node` in insertion order.
    pub fn node_index(&self, node: Node) -> Option<usize> {
        self.lookup.get(&node).copied()
    }

    /// Node stored at `index`.
    pub fn node(&self, index: usize) -> Option<Node> {
        self.nodes.get(index).copied()
    }

    /// Group of the node stored at `index`.
    pub fn node_group(&self, index: usize) -> Option<usize> {
        self.group.get(index).copied()
    }

    /// Energy accumulated in the node stored at `index`.
    pub fn node_energy(&self, index: usize) -> Option<f64> {
        self.energy.get(index).copied()
    }

    /// Number of occupied cells.
    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of groups after the last regrouping.
    pub fn number_of_groups(&self) -> usize {
        self.groups
    }

    /// Group of the first existing neighbour of `node`.
    pub fn find_neighbour_group(&self, node: Node) -> Option<usize> {
        node.neighbours()
            .find_map(|neighbour| self.lookup.get(&neighbour))
            .map(|&index| self.group[index])
    }

    /// Index of a neighbour of node `index` that sits in another group.
    ///
    /// Always `None` right after [`SpatialMesh::regrouping`].
    pub fn find_foreign_neighbour(&self, index: usize) -> Option<usize> {
        let node = self.node(index)?;
        let group = self.group[index];
        node.neighbours()
            .filter_map(|neighbour| self.lookup.get(&neighbour).copied())
            .find(|&other| self.group[other] != group)
    }

    /// Centre of the cell of `node`.
    pub fn node_position(&self, node: Node) -> Position {
        let centre = |index: i32, origin: f64, size: f64, cells: usize| {
            origin + (f64::from(index) + 0.5) * size / cells as f64
        };
        Position::new(
            centre(node.x, self.origin.x, self.size.x, self.cells[0]),
            centre(node.y, self.origin.y, self.size.y, self.cells[1]),
            centre(node.z, self.origin.z, self.size.z, self.cells[2]),
        )
    }

    /// Total energy of the nodes in group `group`.
    pub fn group_energy(&self, group: usize) -> f64 {
        self.group
            .iter()
            .zip(&self.energy)
            .filter(|&(&g, _)| g == group)
            .map(|(_, &e)| e)
            .sum()
    }

    /// Energy-weighted mean cell centre of a group.
    ///
    /// `None` for an unknown or zero-energy group.
    pub fn group_position(&self, group: usize) -> Option<Position> {
        let mut total = 0.0;
        let mut sum = Position::default();
        for (index, &node) in self.nodes.iter().enumerate() {
            if self.group[index] == group {
                total += self.energy[index];
                sum = sum + self.node_position(node) * self.energy[index];
            }
        }
        (total > 0.0).then(|| sum * (1.0 / total))
    }
}

fn validate_geometry(size: Position, origin: Position, cells: [usize; 3]) -> Result<()> {
    for (axis, extent) in [('X', size.x), ('Y', size.y), ('Z', size.z)] {
        if !(extent > 0.0 && extent.is_finite()) {
            return Err(Error::ConfigError(format!(
                "mesh size along {axis} must be positive, got {extent}"
            )));
        }
    }
    if ![origin.x, origin.y, origin.z].iter().all(|v| v.is_finite()) {
        return Err(Error::ConfigError(format!(
            "mesh origin must be finite, got {origin:?}"
        )));
    }
    if cells.contains(&0) {
        return Err(Error::ConfigError(format!(
            "mesh needs at least one cell per axis, got {cells:?}"
        )));
    }
    if cells.iter().any(|&n| n > MAX_CELLS) {
        return Err(Error::ConfigError(format!(
            "mesh allows at most {MAX_CELLS} cells per axis, got {cells:?}"
        )));
    }
    Ok(())
}
