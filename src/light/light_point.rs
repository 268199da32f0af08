use super::styles::LightStyles;
use crate::world::{NodeChild, Vec3, World, MAXLIGHTMAPS, STYLE_NONE};

// How far below the point the trace looks for a floor
const TRACE_LENGTH: f32 = 2048.0;

// Light level at a point, used to shade models standing on the floor below it.
// Never darker than the ambient light. Levels without lightmaps are fully lit.
pub fn light_point(world: &World, styles: &LightStyles, point: &Vec3, ambient_light: i32) -> i32 {
    if !world.has_lightdata() {
        return 255;
    }

    let end = [point[0], point[1], point[2] - TRACE_LENGTH];
    let trace = Trace { world, styles };

    trace
        .recurse(world.root(), point, &end, 0)
        .unwrap_or(0)
        .max(ambient_light)
}

struct Trace<'a> {
    world: &'a World,
    styles: &'a LightStyles,
}

impl Trace<'_> {
    // The light of the first lit surface the segment start..end runs into,
    // None if it only passes through empty space
    fn recurse(&self, node: NodeChild, start: &Vec3, end: &Vec3, depth: usize) -> Option<i32> {
        let index = match node {
            NodeChild::Leaf(_) => return None,
            NodeChild::Node(index) => index,
        };

        if depth > self.world.nodes.len() {
            return None;
        }

        let node = self.world.nodes.get(index)?;
        let plane = &self.world.planes[node.plane];
        let front = plane.distance(start);
        let back = plane.distance(end);
        let side = (front < 0.0) as usize;

        if ((back < 0.0) as usize) == side {
            return self.recurse(node.children[side], start, end, depth + 1);
        }

        let frac = front / (front - back);
        let mid = [
            start[0] + (end[0] - start[0]) * frac,
            start[1] + (end[1] - start[1]) * frac,
            start[2] + (end[2] - start[2]) * frac,
        ];

        // Near side first
        if let Some(light) = self.recurse(node.children[side], start, &mid, depth + 1) {
            return Some(light);
        }

        // Did the segment hit a surface on this node?
        for (_, surface) in self.world.node_surfaces(node) {
            if surface.is_tiled() {
                continue;
            }

            let texinfo = &self.world.texinfos[surface.texinfo];
            let s = texinfo.project(&mid, 0) as i32;
            let t = texinfo.project(&mid, 1) as i32;

            if s < surface.texturemins[0] || t < surface.texturemins[1] {
                continue;
            }

            let ds = s - surface.texturemins[0];
            let dt = t - surface.texturemins[1];
            if ds > surface.extents[0] || dt > surface.extents[1] {
                continue;
            }

            let Some(samples) = self.world.samples(surface) else {
                return Some(0);
            };

            let size = surface.lightmap_size();
            let offset = (dt >> 4) as usize * surface.light_width() + (ds >> 4) as usize;

            let mut light = 0;
            for (layer, &style) in surface.styles.iter().enumerate().take(MAXLIGHTMAPS) {
                if style == STYLE_NONE {
                    break;
                }
                let sample = samples.get(layer * size + offset).copied().unwrap_or(0);
                light += sample as i32 * self.styles.value(style);
            }

            return Some(light >> 8);
        }

        // Far side
        self.recurse(node.children[1 - side], &mid, end, depth + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::TextureId;
    use crate::world::{Leaf, Node, Plane, Surface, TexInfo, CONTENTS_EMPTY, CONTENTS_SOLID, SURF_DRAWTILED};

    // A floor at z = 0 covering x, y in 0..=64, solid below
    fn floor_world(sample: u8) -> World {
        let planes = vec![Plane::new([0.0, 0.0, 1.0], 0.0)];
        let nodes = vec![Node::new(
            0,
            NodeChild::Leaf(Leaf {
                contents: CONTENTS_EMPTY,
            }),
            NodeChild::Leaf(Leaf {
                contents: CONTENTS_SOLID,
            }),
        )
        .with_surfaces(0, 1)];
        let texinfo = TexInfo::new([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], TextureId(0));
        let mut surface = Surface::new(0, 0, [0, 0], [64, 64]);
        surface.samples = Some(0);
        let mut lightdata = vec![sample; 25];
        // Cell (1, 2)
        lightdata[2 * 5 + 1] = sample / 2;
        World::new(planes, nodes, vec![surface], vec![texinfo], Some(lightdata))
    }

    fn styles() -> LightStyles {
        let mut styles = LightStyles::new(&["m".to_string()]).expect("styles");
        styles.animate(0.0);
        styles
    }

    #[test]
    fn samples_the_floor_below() {
        let world = floor_world(200);
        // 200 * 264 >> 8
        assert_eq!(light_point(&world, &styles(), &[8.0, 8.0, 40.0], 0), 206);
        assert_eq!(light_point(&world, &styles(), &[20.0, 40.0, 40.0], 0), 103);
    }

    #[test]
    fn misses_fall_back_to_ambient() {
        let world = floor_world(200);
        assert_eq!(light_point(&world, &styles(), &[500.0, 8.0, 40.0], 30), 30);
        // Already below the floor
        assert_eq!(light_point(&world, &styles(), &[8.0, 8.0, -5.0], 12), 12);
    }

    #[test]
    fn never_darker_than_ambient() {
        let world = floor_world(10);
        assert_eq!(light_point(&world, &styles(), &[8.0, 8.0, 40.0], 50), 50);
    }

    #[test]
    fn surface_without_samples_is_black() {
        let mut world = floor_world(200);
        world.surfaces[0].samples = None;
        assert_eq!(light_point(&world, &styles(), &[8.0, 8.0, 40.0], 0), 0);
    }

    #[test]
    fn tiled_surfaces_are_ignored() {
        let mut world = floor_world(200);
        world.surfaces[0].flags |= SURF_DRAWTILED;
        assert_eq!(light_point(&world, &styles(), &[8.0, 8.0, 40.0], 7), 7);
    }

    #[test]
    fn unlit_level_is_fully_bright() {
        let mut world = floor_world(200);
        world.lightdata = None;
        assert_eq!(light_point(&world, &styles(), &[8.0, 8.0, 40.0], 0), 255);
    }
}
