//! Generational entity identifiers and the registry that issues them.
//!
//! An [`Entity`] carries no data of its own. It is a `(index, generation)`
//! pair pointing into an [`EntityRegistry`] slot. When an entity is
//! destroyed the slot's generation is bumped, so a stale id never aliases
//! the entity that later reuses the slot.
//!
//! The registry is owned by the render engine and shared by every asset
//! loader bound to it, so allocation goes through an internal lock.

use std::hash::{Hash, Hasher};

use parking_lot::Mutex;

/// An opaque entity identifier.
///
/// Layout: `u32 index` + `u32 generation`. Hosts that need a single integer
/// can round-trip through [`to_bits`](Entity::to_bits) /
/// [`from_bits`](Entity::from_bits).
#[derive(Clone, Copy)]
pub struct Entity {
    index: u32,
    generation: u32,
}

impl Entity {
    pub(crate) fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Returns the slot index of this entity.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Returns the generation of the slot when this entity was created.
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// Packs the entity into a single `u64` (generation in the high bits).
    pub fn to_bits(&self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Rebuilds an entity from [`to_bits`](Self::to_bits) output.
    pub fn from_bits(bits: u64) -> Self {
        Self {
            index: bits as u32,
            generation: (bits >> 32) as u32,
        }
    }
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl Eq for Entity {}

impl Hash for Entity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl std::fmt::Debug for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}@{})", self.index, self.generation)
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Entity({}@{})", self.index, self.generation)
    }
}

/// Allocates and recycles entity slots with generation tracking.
///
/// When an entity is destroyed its slot goes onto a free list and its
/// generation is incremented; the next allocation reuses the slot under the
/// new generation, invalidating any old handle.
struct EntityAllocator {
    /// Current generation for each slot. Index = entity index.
    generations: Vec<u32>,
    /// Alive flag per slot.
    alive: Vec<bool>,
    /// Free list of recyclable indices (LIFO stack).
    free_list: Vec<u32>,
    /// Total number of currently alive entities.
    count: u32,
}

impl EntityAllocator {
    fn new() -> Self {
        Self {
            generations: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            count: 0,
        }
    }

    fn allocate(&mut self) -> Entity {
        self.count += 1;

        if let Some(index) = self.free_list.pop() {
            let idx = index as usize;
            self.alive[idx] = true;
            Entity::new(index, self.generations[idx])
        } else {
            let index = self.generations.len() as u32;
            self.generations.push(0);
            self.alive.push(true);
            Entity::new(index, 0)
        }
    }

    /// Allocates `count` entities at once, reusing recycled slots first.
    fn allocate_many(&mut self, count: usize) -> Vec<Entity> {
        let mut entities = Vec::with_capacity(count);

        while entities.len() < count {
            let Some(index) = self.free_list.pop() else {
                break;
            };
            let idx = index as usize;
            self.alive[idx] = true;
            entities.push(Entity::new(index, self.generations[idx]));
        }

        let fresh = count - entities.len();
        if fresh > 0 {
            let start = self.generations.len() as u32;
            self.generations.resize(self.generations.len() + fresh, 0);
            self.alive.resize(self.alive.len() + fresh, true);
            entities.extend((0..fresh as u32).map(|i| Entity::new(start + i, 0)));
        }

        self.count += count as u32;
        entities
    }

    /// Returns false if already dead or the generation does not match.
    fn deallocate(&mut self, entity: Entity) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let idx = entity.index as usize;
        self.alive[idx] = false;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_list.push(entity.index);
        self.count -= 1;
        true
    }

    fn is_alive(&self, entity: Entity) -> bool {
        let idx = entity.index as usize;
        idx < self.alive.len() && self.alive[idx] && self.generations[idx] == entity.generation
    }
}

/// Thread-safe entity registry.
///
/// Several [`AssetLoader`](crate::AssetLoader)s bound to one engine share a
/// single registry; allocation and destruction are serialized by an
/// internal mutex, so ids are unique across threads.
pub struct EntityRegistry {
    allocator: Mutex<EntityAllocator>,
}

impl EntityRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self {
            allocator: Mutex::new(EntityAllocator::new()),
        }
    }

    /// Creates a single entity.
    pub fn create(&self) -> Entity {
        self.allocator.lock().allocate()
    }

    /// Creates `count` entities under one lock acquisition.
    pub fn create_many(&self, count: usize) -> Vec<Entity> {
        self.allocator.lock().allocate_many(count)
    }

    /// Destroys an entity. Returns `false` if it was already destroyed.
    pub fn destroy(&self, entity: Entity) -> bool {
        self.allocator.lock().deallocate(entity)
    }

    /// Destroys every entity in `entities`, returning how many were alive.
    pub fn destroy_many(&self, entities: &[Entity]) -> usize {
        let mut allocator = self.allocator.lock();
        entities
            .iter()
            .filter(|&&entity| allocator.deallocate(entity))
            .count()
    }

    /// Returns whether the entity is currently alive.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.allocator.lock().is_alive(entity)
    }

    /// Returns the number of alive entities.
    pub fn alive_count(&self) -> usize {
        self.allocator.lock().count as usize
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}
