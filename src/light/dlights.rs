use crate::world::{dot_product, NodeChild, Vec3, World};

pub const MAX_DLIGHTS: usize = 32;

// A short lived point light, e.g. a muzzle flash or a rocket
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicLight {
    pub origin: Vec3,  // World position
    pub radius: f32,   // Reach in world units, 0 = off
    pub minlight: f32, // Radius left over where the light stops contributing
    pub die: f32,      // Time after which the light is gone
}

impl DynamicLight {
    pub fn new(origin: Vec3, radius: f32, die: f32) -> DynamicLight {
        DynamicLight {
            origin,
            radius,
            minlight: 0.0,
            die,
        }
    }

    pub fn is_alive(&self, time: f32) -> bool {
        self.die >= time && self.radius != 0.0
    }
}

// Which dynamic lights touch which surface this frame. Bit i of a surface's
// mask stands for light i of the frame's light list. Masks left over from an
// older frame read as empty.
#[derive(Debug, Default, Clone)]
pub struct DlightMarks {
    frame: u32,       // Current frame number
    frames: Vec<u32>, // Frame each surface was last marked in
    bits: Vec<u32>,   // Light mask per surface
}

impl DlightMarks {
    pub fn new(surfaces: usize) -> DlightMarks {
        DlightMarks {
            frame: 1,
            frames: vec![0; surfaces],
            bits: vec![0; surfaces],
        }
    }

    // Forget every mark made so far
    pub fn begin_frame(&mut self) {
        self.frame = self.frame.wrapping_add(1).max(1);
    }

    pub fn mark(&mut self, surface: usize, bit: u32) {
        if surface >= self.bits.len() {
            self.frames.resize(surface + 1, 0);
            self.bits.resize(surface + 1, 0);
        }

        if self.frames[surface] != self.frame {
            self.frames[surface] = self.frame;
            self.bits[surface] = 0;
        }
        self.bits[surface] |= bit;
    }

    // Replace a surface's mask with one computed elsewhere
    pub fn set(&mut self, surface: usize, bits: u32) {
        self.mark(surface, 0);
        self.bits[surface] = bits;
    }

    // Marked during this frame, even with an empty mask
    pub fn is_marked(&self, surface: usize) -> bool {
        self.frames.get(surface) == Some(&self.frame)
    }

    pub fn bits(&self, surface: usize) -> u32 {
        if self.is_marked(surface) {
            self.bits[surface]
        } else {
            0
        }
    }
}

// Set bit on every surface of every node whose split plane the light sphere
// straddles. Nodes entirely on one side only pass the light down that side.
pub fn mark_lights(world: &World, light: &DynamicLight, bit: u32, node: NodeChild, marks: &mut DlightMarks) {
    mark_node(world, light, bit, node, marks, 0);
}

fn mark_node(
    world: &World,
    light: &DynamicLight,
    bit: u32,
    node: NodeChild,
    marks: &mut DlightMarks,
    depth: usize,
) {
    let index = match node {
        NodeChild::Leaf(_) => return,
        NodeChild::Node(index) => index,
    };

    // A well formed tree is never deeper than its node count
    if depth > world.nodes.len() {
        return;
    }

    let Some(node) = world.nodes.get(index) else {
        return;
    };
    let plane = &world.planes[node.plane];
    let dist = dot_product(&light.origin, &plane.normal) - plane.dist;

    if dist > light.radius {
        mark_node(world, light, bit, node.children[0], marks, depth + 1);
        return;
    }

    if dist < -light.radius {
        mark_node(world, light, bit, node.children[1], marks, depth + 1);
        return;
    }

    for (surface, _) in world.node_surfaces(node) {
        marks.mark(surface, bit);
    }

    mark_node(world, light, bit, node.children[0], marks, depth + 1);
    mark_node(world, light, bit, node.children[1], marks, depth + 1);
}

// Start a new frame of marks and mark every live light
pub fn push_dlights(world: &World, lights: &[DynamicLight], time: f32, marks: &mut DlightMarks) {
    marks.begin_frame();

    for (i, light) in lights.iter().take(MAX_DLIGHTS).enumerate() {
        if !light.is_alive(time) {
            continue;
        }
        mark_lights(world, light, 1 << i, world.root(), marks);
    }
}
