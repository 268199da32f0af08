use super::{dot_product, Vec3};

pub const CONTENTS_EMPTY: i32 = -1;
pub const CONTENTS_SOLID: i32 = -2;

#[derive(Debug, Clone)]
pub struct Plane {
    pub normal: Vec3, // Unit normal
    pub dist: f32,    // Distance from the origin along the normal
}

impl Plane {
    pub fn new(normal: Vec3, dist: f32) -> Plane {
        Plane { normal, dist }
    }

    // Signed distance of a point, positive on the front side
    pub fn distance(&self, point: &Vec3) -> f32 {
        dot_product(point, &self.normal) - self.dist
    }
}

// Leaves only carry their contents, which are always negative
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    pub contents: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeChild {
    Node(usize), // Index into World::nodes
    Leaf(Leaf),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub plane: usize,             // Index into World::planes
    pub children: [NodeChild; 2], // Front, back
    pub minmaxs: [i16; 6],        // Bounding box
    pub first_surface: usize,     // First surface on this node
    pub num_surfaces: usize,      // Surface count
}

impl Node {
    pub fn new(plane: usize, front: NodeChild, back: NodeChild) -> Node {
        Node {
            plane,
            children: [front, back],
            minmaxs: [0; 6],
            first_surface: 0,
            num_surfaces: 0,
        }
    }

    pub fn with_surfaces(mut self, first_surface: usize, num_surfaces: usize) -> Node {
        self.first_surface = first_surface;
        self.num_surfaces = num_surfaces;
        self
    }
}
