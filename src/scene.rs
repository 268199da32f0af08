use rand::rngs::ThreadRng;
use rand::Rng;

use surfcache_renderer::graphics::{MipTexture, Palette, Rgb, TextureId, Textures};
use surfcache_renderer::light::DynamicLight;
use surfcache_renderer::world::{
    Leaf, Node, NodeChild, Plane, Surface, TexInfo, World, CONTENTS_EMPTY, CONTENTS_SOLID,
    STYLE_NONE, SURF_DRAWSKY, SURF_DRAWTURB,
};
use surfcache_renderer::Result;

const EMPTY: NodeChild = NodeChild::Leaf(Leaf {
    contents: CONTENTS_EMPTY,
});

const SOLID: NodeChild = NodeChild::Leaf(Leaf {
    contents: CONTENTS_SOLID,
});

// Style animations the room's surfaces use: steady, flicker, slow pulse
pub const LIGHT_STYLES: [&str; 3] = [
    "m",
    "mmnmmommommnonmmonqnmmo",
    "abcdefghijklmnopqrstuvwxyzyxwvutsrqponmlkjihgfedcba",
];

// A small room standing in for a loaded level: a floor, a few walls with
// flickering and animated textures, a pool of water and an open sky
pub struct Scene {
    pub world: World,
    pub textures: Textures,
    pub palette: Palette,
    pub sky: TextureId,
}

impl Scene {
    pub fn new() -> Result<Scene> {
        let mut rng = rand::thread_rng();
        let palette = palette();

        let mut textures = Textures::new();
        let floor = textures.add(noise("floor", 64, 64, 16, 48, &mut rng)?);
        let brick = textures.add(bricks("brick", 64, 32)?);
        let lava = [
            textures.add(noise("+0lava", 32, 32, 160, 176, &mut rng)?),
            textures.add(noise("+1lava", 32, 32, 168, 184, &mut rng)?),
            textures.add(noise("+2lava", 32, 32, 176, 192, &mut rng)?),
        ];
        textures.link_animation(&lava);
        let water = textures.add(noise("*water", 64, 64, 96, 112, &mut rng)?);
        let sky = textures.add(sky_texture(&mut rng)?);

        let planes = vec![
            Plane::new([0.0, 0.0, 1.0], 0.0),   // Floor
            Plane::new([1.0, 0.0, 0.0], 0.0),   // West wall
            Plane::new([-1.0, 0.0, 0.0], -256.0), // East wall
            Plane::new([0.0, 0.0, -1.0], -128.0), // Sky
        ];

        let texinfos = vec![
            TexInfo::new([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], floor),
            TexInfo::new([[0.0, 1.0, 0.0, 0.0], [0.0, 0.0, -1.0, 128.0]], brick),
            TexInfo::new([[0.0, 1.0, 0.0, 0.0], [0.0, 0.0, -1.0, 128.0]], lava[0]),
            TexInfo::new([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], water),
            TexInfo::new([[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]], sky),
        ];

        let mut lightdata = Vec::new();
        let mut surfaces = Vec::new();

        // Floor, split in a lit half and a flickering half
        let mut left = Surface::new(0, 0, [0, 0], [128, 256]);
        left.samples = Some(lightmap(&mut lightdata, &left, &mut rng));
        surfaces.push(left);

        let mut right = Surface::new(0, 0, [128, 0], [128, 256]);
        right.styles = [0, 1, STYLE_NONE, STYLE_NONE];
        right.samples = Some(lightmap(&mut lightdata, &right, &mut rng));
        surfaces.push(right);

        // Walls
        let mut west = Surface::new(1, 1, [0, 0], [256, 128]);
        west.samples = Some(lightmap(&mut lightdata, &west, &mut rng));
        surfaces.push(west);

        let mut east = Surface::new(2, 2, [0, 0], [256, 128]);
        east.styles = [2, STYLE_NONE, STYLE_NONE, STYLE_NONE];
        east.samples = Some(lightmap(&mut lightdata, &east, &mut rng));
        surfaces.push(east);

        // Water and sky have no lightmaps
        let mut pool = Surface::new(0, 3, [0, 0], [64, 64]);
        pool.flags |= SURF_DRAWTURB;
        surfaces.push(pool);

        let mut ceiling = Surface::new(3, 4, [0, 0], [256, 256]);
        ceiling.flags |= SURF_DRAWSKY;
        surfaces.push(ceiling);

        let nodes = vec![
            Node::new(0, NodeChild::Node(1), SOLID).with_surfaces(0, 2),
            Node::new(1, NodeChild::Node(2), SOLID).with_surfaces(2, 1),
            Node::new(2, NodeChild::Node(3), SOLID).with_surfaces(3, 1),
            Node::new(3, EMPTY, SOLID).with_surfaces(4, 2),
        ];

        let world = World::new(planes, nodes, surfaces, texinfos, Some(lightdata));

        Ok(Scene {
            world,
            textures,
            palette,
            sky,
        })
    }
}

// A light circling the room, and a short flash every few seconds
pub fn dlights(time: f32) -> Vec<DynamicLight> {
    let angle = time * 0.8;
    let mut lights = vec![DynamicLight::new(
        [128.0 + angle.cos() * 96.0, 128.0 + angle.sin() * 96.0, 40.0],
        200.0,
        time + 0.1,
    )];

    if (time as i32) % 4 == 0 {
        lights.push(DynamicLight {
            origin: [32.0, 200.0, 64.0],
            radius: 300.0,
            minlight: 32.0,
            die: time + 0.1,
        });
    }

    lights
}

// Eight hue ramps of 32 shades each
fn palette() -> Palette {
    let hues = [
        Rgb::new(255, 255, 255),
        Rgb::new(160, 120, 80),
        Rgb::new(200, 60, 40),
        Rgb::new(80, 160, 60),
        Rgb::new(60, 110, 220),
        Rgb::new(230, 200, 80),
        Rgb::new(255, 120, 20),
        Rgb::new(140, 170, 255),
    ];

    let mut data = Vec::with_capacity(768);
    for hue in hues {
        for shade in 0..32u32 {
            let scale = |c: u8| ((c as u32 * (shade + 1)) / 32) as u8;
            data.extend([scale(hue.r), scale(hue.g), scale(hue.b)]);
        }
    }

    // Index 0 is always black
    data[..3].fill(0);

    Palette::new(&data).unwrap_or_else(|_| Palette::grayscale())
}

fn noise(name: &str, width: usize, height: usize, low: u8, high: u8, rng: &mut ThreadRng) -> Result<MipTexture> {
    let pixels = (0..width * height).map(|_| rng.gen_range(low..high)).collect();
    MipTexture::from_pixels(name, width, height, pixels)
}

fn bricks(name: &str, width: usize, height: usize) -> Result<MipTexture> {
    let mut pixels = vec![0u8; width * height];

    for y in 0..height {
        let offset = if (y / 8) % 2 == 0 { 0 } else { 8 };
        for x in 0..width {
            let mortar = y % 8 == 0 || (x + offset) % 16 == 0;
            pixels[y * width + x] = if mortar { 24 } else { 80 + ((x + y) % 6) as u8 };
        }
    }

    MipTexture::from_pixels(name, width, height, pixels)
}

// Blue distant layer on the right, clouds with holes on the left
fn sky_texture(rng: &mut ThreadRng) -> Result<MipTexture> {
    let mut pixels = vec![0u8; 256 * 128];

    for y in 0..128 {
        for x in 0..256 {
            pixels[y * 256 + x] = if x >= 128 {
                128 + (y / 8) as u8
            } else if rng.gen_bool(0.4) {
                240 + rng.gen_range(0..16)
            } else {
                0
            };
        }
    }

    MipTexture::from_pixels("sky1", 256, 128, pixels)
}

// Append random lightmaps for every style of a surface, returning their offset
fn lightmap(lightdata: &mut Vec<u8>, surface: &Surface, rng: &mut ThreadRng) -> usize {
    let offset = lightdata.len();
    let size = surface.lightmap_size() * surface.style_count();
    lightdata.extend((0..size).map(|_| rng.gen_range(64..224u8)));
    offset
}
