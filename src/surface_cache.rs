use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::error::{RenderError, Result};
use crate::graphics::{TextureId, MIPLEVELS};
use crate::world::MAXLIGHTMAPS;

pub const GUARD_SIZE: usize = 4;

// Bytes at the start of every block that belong to the block header
pub const BLOCK_HEADER_SIZE: usize = 48;

pub const MAX_CACHE_WIDTH: usize = 256;
pub const MAX_CACHE_TEXELS: usize = 0x10000;

// Leftovers smaller than this stay attached to the block they were carved from
const MIN_FRAGMENT: usize = 256;

const SURFCACHE_SIZE_AT_320X200: usize = 600 * 1024;

// Cache size in bytes for a resolution. An explicit size in KiB wins.
pub fn surface_cache_for_res(width: usize, height: usize, override_kb: Option<usize>) -> usize {
    if let Some(kb) = override_kb {
        return kb * 1024;
    }

    let pixels = width * height;
    let mut size = SURFCACHE_SIZE_AT_320X200;
    if pixels > 64000 {
        size += (pixels - 64000) * 3;
    }

    size
}

// Byte offset of a block within the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(usize);

impl BlockId {
    pub fn offset(self) -> usize {
        self.0
    }
}

// The cache spot of a surface at one mip level, the owner of a block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheOwner {
    pub surface: usize,
    pub mip: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheBlock {
    pub next: Option<BlockId>,             // Following block, None at the end of the arena
    pub owner: Option<CacheOwner>,         // None if the block is free
    pub size: usize,                       // Bytes including the header
    pub width: usize,                      // Texels per row of the cached surface
    pub height: usize,                     // Rows that fit in the block
    pub mip_scale: f32,                    // 1 / 2^mip
    pub dlight: bool,                      // Built with dynamic lights
    pub texture: Option<TextureId>,        // Texture frame the block was built from
    pub light_adjust: [i32; MAXLIGHTMAPS], // Style scales the block was built with
}

impl CacheBlock {
    fn free(size: usize, next: Option<BlockId>) -> CacheBlock {
        CacheBlock {
            next,
            owner: None,
            size,
            width: 0,
            height: 0,
            mip_scale: 1.0,
            dlight: false,
            texture: None,
            light_adjust: [0; MAXLIGHTMAPS],
        }
    }
}

// A ring heap of surface composites. Blocks are carved out of one arena in
// address order; the rover walks forward, evicting whatever it runs over, and
// wraps to the start when the room ahead of it is too small.
pub struct SurfaceCache {
    arena: Vec<u8>,                             // size bytes followed by the guard
    size: usize,                                // Usable bytes
    pixel_bytes: usize,                         // Bytes per cached texel
    blocks: BTreeMap<BlockId, CacheBlock>,      // Block headers by offset
    rover: Option<BlockId>,                     // Next allocation candidate
    initial_rover: Option<BlockId>,             // Rover at the start of the frame
    rover_wrapped: bool,                        // Wrapped since the frame started
    thrashing: bool,                            // Wrapped past the start position this frame
    spots: Vec<[Option<BlockId>; MIPLEVELS]>,   // Cached block of every surface and mip
}

impl SurfaceCache {
    // Take size bytes including the guard
    pub fn new(size: usize, pixel_bytes: usize) -> Result<SurfaceCache> {
        if size < GUARD_SIZE + BLOCK_HEADER_SIZE + MIN_FRAGMENT {
            return Err(RenderError::CacheTooSmall {
                requested: GUARD_SIZE + BLOCK_HEADER_SIZE + MIN_FRAGMENT,
                capacity: size,
            });
        }

        info!("{}k surface cache", size / 1024);

        let usable = size - GUARD_SIZE;
        let mut cache = SurfaceCache {
            arena: vec![0; size],
            size: usable,
            pixel_bytes: pixel_bytes.max(1),
            blocks: BTreeMap::new(),
            rover: None,
            initial_rover: None,
            rover_wrapped: false,
            thrashing: false,
            spots: Vec::new(),
        };

        cache.reset();
        cache.clear_guard();

        Ok(cache)
    }

    // Drop every cached surface
    pub fn flush(&mut self) {
        for block in self.blocks.values_mut() {
            block.owner = None;
        }
        for spot in self.spots.iter_mut() {
            *spot = [None; MIPLEVELS];
        }

        self.reset();
        debug!("surface cache flushed");
    }

    fn reset(&mut self) {
        self.blocks.clear();
        self.blocks
            .insert(BlockId(0), CacheBlock::free(self.size, None));
        self.rover = Some(BlockId(0));
        self.initial_rover = self.rover;
        self.rover_wrapped = false;
    }

    // Start a new thrash window at the current rover position
    pub fn begin_frame(&mut self) {
        self.rover_wrapped = false;
        self.initial_rover = self.rover;
        self.thrashing = false;
    }

    pub fn is_thrashing(&self) -> bool {
        self.thrashing
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn pixel_bytes(&self) -> usize {
        self.pixel_bytes
    }

    pub fn rover(&self) -> Option<BlockId> {
        self.rover
    }

    // Bytes needed for a block of texels
    pub fn block_size(&self, texels: usize) -> usize {
        (BLOCK_HEADER_SIZE + texels * self.pixel_bytes + 3) & !3
    }

    pub fn allocate(&mut self, width: usize, texels: usize) -> Result<BlockId> {
        if width == 0 || width > MAX_CACHE_WIDTH {
            return Err(RenderError::BadCacheWidth(width));
        }

        if texels == 0 || texels > MAX_CACHE_TEXELS {
            return Err(RenderError::BadCacheSize(texels));
        }

        let size = self.block_size(texels);
        if size > self.size {
            return Err(RenderError::CacheTooSmall {
                requested: size,
                capacity: self.size,
            });
        }

        // If there are not size bytes after the rover, start over at the base
        let mut wrapped_this_time = false;
        let id = match self.rover {
            Some(rover) if rover.0 <= self.size - size => rover,
            _ => {
                wrapped_this_time = true;
                BlockId(0)
            }
        };

        // Collect and free blocks until the rover block is large enough
        self.evict(id)?;
        while self.block_mut(id)?.size < size {
            let next = self
                .block_mut(id)?
                .next
                .ok_or(RenderError::CacheExhausted { requested: size })?;
            self.evict(next)?;

            let absorbed = self
                .blocks
                .remove(&next)
                .ok_or(RenderError::MissingBlock(next.0))?;
            let block = self.block_mut(id)?;
            block.size += absorbed.size;
            block.next = absorbed.next;
        }

        // Create a fragment out of any leftovers
        let pixel_bytes = self.pixel_bytes;
        let block = self.block_mut(id)?;
        let total = block.size;
        let next = block.next;

        let next = if total - size > MIN_FRAGMENT {
            let fragment = BlockId(id.0 + size);
            block.next = Some(fragment);
            block.size = size;
            self.blocks
                .insert(fragment, CacheBlock::free(total - size, next));
            Some(fragment)
        } else {
            next
        };
        self.rover = next;

        let block = self.block_mut(id)?;
        *block = CacheBlock::free(block.size, block.next);
        block.width = width;
        block.height = (block.size - BLOCK_HEADER_SIZE) / (width * pixel_bytes);

        if self.rover_wrapped {
            if wrapped_this_time || self.position(self.rover) >= self.position(self.initial_rover) {
                if !self.thrashing {
                    warn!("surface cache is thrashing");
                }
                self.thrashing = true;
            }
        } else if wrapped_this_time {
            self.rover_wrapped = true;
        }

        self.check_guard()?;

        Ok(id)
    }

    // Byte position of a rover, the end of the arena standing in for None
    fn position(&self, rover: Option<BlockId>) -> usize {
        rover.map_or(self.size, |id| id.0)
    }

    // Tell the owner of a block it lost its cached surface
    fn evict(&mut self, id: BlockId) -> Result<()> {
        let owner = self.block_mut(id)?.owner.take();

        if let Some(owner) = owner {
            if let Some(spot) = self.spots.get_mut(owner.surface) {
                if spot[owner.mip] == Some(id) {
                    spot[owner.mip] = None;
                }
            }
        }

        Ok(())
    }

    fn block_mut(&mut self, id: BlockId) -> Result<&mut CacheBlock> {
        self.blocks
            .get_mut(&id)
            .ok_or(RenderError::MissingBlock(id.0))
    }

    // Hand a freshly allocated block to a surface spot
    pub fn claim(&mut self, id: BlockId, owner: CacheOwner) -> Result<()> {
        self.block_mut(id)?.owner = Some(owner);

        if self.spots.len() <= owner.surface {
            self.spots.resize(owner.surface + 1, [None; MIPLEVELS]);
        }

        if let Some(previous) = self.spots[owner.surface][owner.mip] {
            if previous != id {
                if let Some(block) = self.blocks.get_mut(&previous) {
                    block.owner = None;
                }
            }
        }

        self.spots[owner.surface][owner.mip] = Some(id);
        Ok(())
    }

    // The block currently cached for a surface spot
    pub fn spot(&self, owner: CacheOwner) -> Option<BlockId> {
        self.spots
            .get(owner.surface)
            .and_then(|spot| spot.get(owner.mip).copied().flatten())
    }

    pub fn block(&self, id: BlockId) -> Option<&CacheBlock> {
        self.blocks.get(&id)
    }

    pub fn block_info_mut(&mut self, id: BlockId) -> Option<&mut CacheBlock> {
        self.blocks.get_mut(&id)
    }

    // Pixel storage of a block, everything after its header
    pub fn data(&self, id: BlockId) -> &[u8] {
        let size = self.blocks.get(&id).map_or(BLOCK_HEADER_SIZE, |b| b.size);
        &self.arena[id.0 + BLOCK_HEADER_SIZE..id.0 + size]
    }

    pub fn data_mut(&mut self, id: BlockId) -> &mut [u8] {
        let size = self.blocks.get(&id).map_or(BLOCK_HEADER_SIZE, |b| b.size);
        &mut self.arena[id.0 + BLOCK_HEADER_SIZE..id.0 + size]
    }

    // Walk the ring from the base
    pub fn blocks(&self) -> impl Iterator<Item = (BlockId, &CacheBlock)> {
        let mut next = Some(BlockId(0));

        std::iter::from_fn(move || {
            let id = next?;
            let block = self.blocks.get(&id)?;
            next = block.next;
            Some((id, block))
        })
    }

    fn clear_guard(&mut self) {
        for (i, byte) in self.arena[self.size..].iter_mut().enumerate() {
            *byte = i as u8;
        }
    }

    pub fn check_guard(&self) -> Result<()> {
        let intact = self.arena[self.size..]
            .iter()
            .enumerate()
            .all(|(i, &byte)| byte == i as u8);

        if intact {
            Ok(())
        } else {
            Err(RenderError::GuardCorrupted)
        }
    }

    // Log every block
    pub fn dump(&self) {
        for (id, block) in self.blocks() {
            if Some(id) == self.rover {
                info!("ROVER:");
            }
            info!(
                "{:>8} : {} bytes     {} width  owner {:?}",
                id.0, block.size, block.width, block.owner
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner(surface: usize) -> CacheOwner {
        CacheOwner { surface, mip: 0 }
    }

    #[test]
    fn sizes_round_up_with_header() {
        let cache = SurfaceCache::new(4096, 1).expect("cache");
        assert_eq!(cache.block_size(1), 52);
        assert_eq!(cache.block_size(256), 304);
        assert_eq!(cache.size(), 4092);
    }

    #[test]
    fn cache_size_grows_with_resolution() {
        assert_eq!(surface_cache_for_res(320, 200, None), 600 * 1024);
        assert_eq!(surface_cache_for_res(640, 480, None), 600 * 1024 + (307200 - 64000) * 3);
        assert_eq!(surface_cache_for_res(640, 480, Some(256)), 256 * 1024);
    }

    #[test]
    fn small_leftover_stays_with_block() {
        let mut cache = SurfaceCache::new(1024, 1).expect("cache");
        // 1020 usable, a 800 byte block leaves 220 which is not worth a fragment
        let id = cache.allocate(16, 752).expect("fits");
        let block = cache.block(id).expect("block");
        assert_eq!(block.size, 1020);
        assert_eq!(block.next, None);
        assert_eq!(cache.rover(), None);
    }

    #[test]
    fn eviction_clears_owner_spot() {
        let mut cache = SurfaceCache::new(2048, 1).expect("cache");
        let first = cache.allocate(16, 1000).expect("first");
        cache.claim(first, owner(3)).expect("claim");
        assert_eq!(cache.spot(owner(3)), Some(first));

        // Too big for what is left after the rover, wraps and evicts the first block
        let second = cache.allocate(16, 1500).expect("second");
        assert_eq!(second, first);
        assert_eq!(cache.spot(owner(3)), None);
        assert_eq!(cache.block(second).expect("block").owner, None);
    }

    #[test]
    fn flush_resets_to_one_free_block() {
        let mut cache = SurfaceCache::new(8192, 1).expect("cache");
        for surface in 0..4 {
            let id = cache.allocate(16, 256).expect("fits");
            cache.claim(id, owner(surface)).expect("claim");
        }

        cache.flush();

        let blocks: Vec<_> = cache.blocks().collect();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].1.size, cache.size());
        assert_eq!(blocks[0].1.owner, None);
        for surface in 0..4 {
            assert_eq!(cache.spot(owner(surface)), None);
        }
    }

    #[test]
    fn rejects_bad_requests() {
        let mut cache = SurfaceCache::new(4096, 1).expect("cache");
        assert!(matches!(cache.allocate(0, 10), Err(RenderError::BadCacheWidth(0))));
        assert!(matches!(cache.allocate(257, 10), Err(RenderError::BadCacheWidth(257))));
        assert!(matches!(cache.allocate(16, 0), Err(RenderError::BadCacheSize(0))));
        assert!(matches!(
            cache.allocate(16, 0x10001),
            Err(RenderError::BadCacheSize(_))
        ));
        assert!(matches!(
            cache.allocate(16, 8000),
            Err(RenderError::CacheTooSmall { .. })
        ));
    }

    #[test]
    fn corrupted_guard_is_fatal() {
        let mut cache = SurfaceCache::new(4096, 1).expect("cache");
        assert!(cache.check_guard().is_ok());

        let end = cache.size();
        cache.arena[end + 2] = 0xAA;

        assert!(matches!(cache.check_guard(), Err(RenderError::GuardCorrupted)));
        assert!(matches!(
            cache.allocate(16, 64),
            Err(RenderError::GuardCorrupted)
        ));
    }

    #[test]
    fn broken_links_are_errors() {
        let mut cache = SurfaceCache::new(4096, 1).expect("cache");
        assert!(matches!(
            cache.claim(BlockId(8), owner(0)),
            Err(RenderError::MissingBlock(8))
        ));
        assert_eq!(cache.spot(owner(0)), None);

        let a = cache.allocate(16, 256).expect("a");
        let b = cache.allocate(16, 256).expect("b");
        cache.blocks.remove(&b);

        // Growing the first block runs into the missing second one
        cache.rover = Some(a);
        assert!(matches!(
            cache.allocate(16, 600),
            Err(RenderError::MissingBlock(304))
        ));
    }

    #[test]
    fn sixteen_bit_blocks_are_twice_as_large() {
        let mut cache = SurfaceCache::new(8192, 2).expect("cache");
        let id = cache.allocate(16, 256).expect("fits");
        let block = cache.block(id).expect("block");
        assert_eq!(block.size, BLOCK_HEADER_SIZE + 512);
        assert_eq!(block.height, 16);
        assert_eq!(cache.data(id).len(), 512);
    }

    #[test]
    fn reclaiming_a_spot_releases_the_old_block() {
        let mut cache = SurfaceCache::new(8192, 1).expect("cache");
        let a = cache.allocate(16, 256).expect("a");
        cache.claim(a, owner(1)).expect("claim");
        let b = cache.allocate(16, 256).expect("b");
        cache.claim(b, owner(1)).expect("claim");

        assert_eq!(cache.block(a).expect("a").owner, None);
        assert_eq!(cache.spot(owner(1)), Some(b));
    }
}
