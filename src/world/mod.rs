mod nodes;
mod surfaces;

pub use nodes::{Leaf, Node, NodeChild, Plane, CONTENTS_EMPTY, CONTENTS_SOLID};
pub use surfaces::{
    Surface, TexInfo, MAXLIGHTMAPS, STYLE_NONE, SURF_DRAWSKY, SURF_DRAWTILED, SURF_DRAWTURB,
    SURF_PLANEBACK,
};

pub type Vec3 = [f32; 3];

pub fn dot_product(a: &Vec3, b: &Vec3) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

// Normalize in place, returning the original length. Zero vectors are left alone.
pub fn normalize(v: &mut Vec3) -> f32 {
    let length = dot_product(v, v).sqrt();

    if length != 0.0 {
        let inverse = 1.0 / length;
        v[0] *= inverse;
        v[1] *= inverse;
        v[2] *= inverse;
    }

    length
}

// The world model as produced by the level loader. The renderer only reads it.
#[derive(Debug, Default)]
pub struct World {
    pub planes: Vec<Plane>,          // Split planes and surface planes
    pub nodes: Vec<Node>,            // BSP tree, root at nodes[0]
    pub surfaces: Vec<Surface>,      // Drawable surfaces
    pub texinfos: Vec<TexInfo>,      // Texture projections
    pub lightdata: Option<Vec<u8>>,  // Lightmap samples, None if the level is unlit
}

impl World {
    pub fn new(
        planes: Vec<Plane>,
        nodes: Vec<Node>,
        surfaces: Vec<Surface>,
        texinfos: Vec<TexInfo>,
        lightdata: Option<Vec<u8>>,
    ) -> World {
        World {
            planes,
            nodes,
            surfaces,
            texinfos,
            lightdata,
        }
    }

    // The tree starts at the first node, or is a single empty leaf if there are no nodes
    pub fn root(&self) -> NodeChild {
        if self.nodes.is_empty() {
            NodeChild::Leaf(Leaf {
                contents: CONTENTS_EMPTY,
            })
        } else {
            NodeChild::Node(0)
        }
    }

    pub fn has_lightdata(&self) -> bool {
        self.lightdata.is_some()
    }

    // All the lightmap samples of a surface, one block per active style
    pub fn samples(&self, surface: &Surface) -> Option<&[u8]> {
        let lightdata = self.lightdata.as_ref()?;
        let offset = surface.samples?;
        let len = surface.lightmap_size() * surface.style_count();

        lightdata.get(offset..offset + len)
    }

    // The surfaces listed under a node
    pub fn node_surfaces(&self, node: &Node) -> impl Iterator<Item = (usize, &Surface)> {
        let end = (node.first_surface + node.num_surfaces).min(self.surfaces.len());
        let start = node.first_surface.min(end);

        (start..end).map(move |i| (i, &self.surfaces[i]))
    }
}
