use std::sync::{
    Arc,
    Mutex,
    RwLock,
};

use obfstr::obfstr;
use raid_memory::{
    MemoryAccess,
    RemoteAddress,
};
use raid_offsets::OffsetTable;
use utils_identity::{
    IdentityCache,
    LockedSet,
};

use crate::{
    sync::{
        lock,
        read,
        write,
    },
    ActivitySet,
    CancellationToken,
    EntityKind,
    EntitySnapshot,
    LifeState,
    PlayerEntity,
    RadarSettings,
    ResolveContext,
    ResolveError,
    ResolveResult,
    Session,
    SessionBoundary,
    SessionBoundaryListener,
    Watchlist,
    Wishlist,
};

mod discovery;
pub use discovery::*;

mod realtime;

mod validation;
pub use validation::*;

mod scheduler;
pub use scheduler::*;


/// Live model of all players within the game world of the target process.
pub struct Radar {
    memory: Arc<dyn MemoryAccess>,
    table: Arc<OffsetTable>,
    settings: RadarSettings,
    watchlist: Watchlist,

    entities: IdentityCache<RemoteAddress, PlayerEntity>,
    rejected: LockedSet<RemoteAddress>,

    world: Mutex<Option<RemoteAddress>>,
    activity: RwLock<Arc<ActivitySet>>,
    alive: RwLock<Arc<Vec<Arc<PlayerEntity>>>>,

    session: Session,
    wishlist: RwLock<Wishlist>,
    listeners: RwLock<Vec<SessionBoundaryListener>>,

    /* discovery passes must not interleave */
    discovery_lock: Mutex<()>,
}

impl Radar {
    pub fn new(
        memory: Arc<dyn MemoryAccess>,
        table: Arc<OffsetTable>,
        settings: RadarSettings,
        watchlist: Watchlist,
    ) -> Self {
        Self {
            memory,
            table,
            settings,
            watchlist,

            entities: IdentityCache::new(),
            rejected: LockedSet::new(),

            world: Mutex::new(None),
            activity: RwLock::new(Default::default()),
            alive: RwLock::new(Default::default()),

            session: Session::new(),
            wishlist: RwLock::new(Wishlist::default()),
            listeners: RwLock::new(Vec::new()),

            discovery_lock: Mutex::new(()),
        }
    }

    fn context(&self) -> ResolveContext<'_> {
        ResolveContext::new(&*self.memory, &self.table)
    }

    pub fn memory(&self) -> &Arc<dyn MemoryAccess> {
        &self.memory
    }

    pub fn settings(&self) -> &RadarSettings {
        &self.settings
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn world(&self) -> Option<RemoteAddress> {
        *lock(&self.world)
    }

    pub fn activity(&self) -> Arc<ActivitySet> {
        read(&self.activity).clone()
    }

    pub fn entity(&self, address: RemoteAddress) -> Option<Arc<PlayerEntity>> {
        self.entities.get(&address)
    }

    /// Total amount of entities constructed since the radar has been created
    pub fn allocations(&self) -> usize {
        self.entities.allocations()
    }

    pub fn is_rejected(&self, address: RemoteAddress) -> bool {
        self.rejected.contains(&address)
    }

    /// Entities which have been alive as of the last discovery pass
    pub fn alive_entities(&self) -> Arc<Vec<Arc<PlayerEntity>>> {
        read(&self.alive).clone()
    }

    pub fn local_player(&self) -> Option<Arc<PlayerEntity>> {
        self.alive_entities()
            .iter()
            .find(|entity| entity.kind() == EntityKind::Local)
            .cloned()
    }

    pub fn subscribe_session_boundary(&self, listener: SessionBoundaryListener) {
        write(&self.listeners).push(listener);
    }

    fn enter_session(&self, previous_world: Option<RemoteAddress>, world: Option<RemoteAddress>) {
        log::info!(
            "{} ({:?} -> {:?})",
            obfstr!("Game world changed. Resetting session"),
            previous_world,
            world
        );

        self.entities.clear();
        self.rejected.clear();
        *write(&self.activity) = Default::default();
        *write(&self.alive) = Default::default();
        *write(&self.wishlist) = Wishlist::default();
        self.session.reset();

        let boundary = SessionBoundary {
            previous_world,
            world,
        };
        for listener in read(&self.listeners).iter() {
            listener(&boundary);
        }
    }

    /// Read the wishlist of the local player.
    /// Returns the amount of wished items.
    pub fn refresh_wishlist(&self, cancellation: &CancellationToken) -> ResolveResult<usize> {
        let local = self
            .local_player()
            .ok_or_else(|| ResolveError::implausible("local player", "not present"))?;

        let wishlist = Wishlist::refresh(&self.context(), local.address(), cancellation)?;
        let count = wishlist.len();
        *write(&self.wishlist) = wishlist;
        Ok(count)
    }

    pub fn is_wished(&self, template_id: &str) -> bool {
        read(&self.wishlist).contains(template_id)
    }

    /// Copy the current state of every entity known within this session.
    pub fn snapshot(&self) -> Vec<EntitySnapshot> {
        let wishlist = read(&self.wishlist);

        let mut entities = self.entities.values();
        entities.sort_by_key(|entity| entity.address());
        entities
            .iter()
            .map(|entity| EntitySnapshot::capture(entity, &self.settings, &self.session, &wishlist))
            .collect()
    }

    /// Amount of entities per life state (alive, dead, departed)
    pub fn population(&self) -> (usize, usize, usize) {
        self.entities
            .values()
            .iter()
            .fold((0, 0, 0), |(alive, dead, departed), entity| {
                match entity.life() {
                    LifeState::Alive => (alive + 1, dead, departed),
                    LifeState::Dead { .. } => (alive, dead + 1, departed),
                    LifeState::Departed => (alive, dead, departed + 1),
                }
            })
    }
}
