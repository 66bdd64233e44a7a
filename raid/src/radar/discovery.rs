use std::{
    cell::Cell,
    collections::HashSet,
    sync::Arc,
};

use raid_memory::{
    MemoryError,
    RemoteAddress,
    ScatterBatch,
};

use super::Radar;
use crate::{
    locate_world,
    sync::{
        lock,
        write,
    },
    ActivitySet,
    LifeState,
    PlayerEntity,
    ResolveError,
    ResolveResult,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryReport {
    /// Entities constructed within this pass
    pub allocated: usize,

    /// Life state changes of already known entities
    pub transitions: usize,

    /// Addresses which turned out not to be players
    pub rejected: usize,

    /// Addresses which could not be constructed and will be retried
    pub failed: usize,
}

impl Radar {
    /// Synchronize the entity population with the players registered in the game world.
    pub fn discovery_pass(&self) -> ResolveResult<DiscoveryReport> {
        let _guard = lock(&self.discovery_lock);
        let ctx = self.context();
        let mut report = DiscoveryReport::default();

        /* only a null locator means the world is gone, other failures leave the session intact */
        let world = match locate_world(&ctx) {
            Ok(world) => Some(world),
            Err(ResolveError::BrokenChain { source, .. })
                if matches!(source.source, MemoryError::NullPointer { .. }) =>
            {
                log::trace!("Game world not available");
                None
            }
            Err(err) => {
                log::debug!("Failed to locate the game world: {}", err);
                return Err(err);
            }
        };

        let previous_world = {
            let mut current = lock(&self.world);
            std::mem::replace(&mut *current, world)
        };
        if previous_world.is_some() && previous_world != world {
            self.enter_session(previous_world, world);
        }

        let world = match world {
            Some(world) => world,
            None => return Ok(report),
        };

        let activity = Arc::new(ActivitySet::read(&ctx, world)?);
        let known_alive = self
            .entities
            .values()
            .into_iter()
            .filter(|entity| entity.life() == LifeState::Alive)
            .collect::<Vec<_>>();

        let mut alive = Vec::with_capacity(activity.len());
        for address in activity.addresses().iter().copied() {
            if self.rejected.contains(&address) {
                continue;
            }

            let allocated = Cell::new(false);
            let entity = self.entities.get_or_allocate(address, |address| {
                allocated.set(true);
                PlayerEntity::resolve(
                    &ctx,
                    *address,
                    &self.settings,
                    &self.session,
                    &self.watchlist,
                )
            });

            match entity {
                Ok(entity) => {
                    if allocated.get() {
                        report.allocated += 1;
                    } else if entity.mark_alive() {
                        report.transitions += 1;
                    }

                    alive.push(entity);
                }
                Err(ResolveError::StructuralMismatch { address, found }) => {
                    log::warn!(
                        "Discarding {}: expected a player but found \"{}\"",
                        address,
                        found
                    );
                    self.rejected.insert(address);
                    report.rejected += 1;
                }
                Err(err) => {
                    log::warn!("Failed to resolve player {}: {}", address, err);
                    report.failed += 1;
                }
            }
        }

        report.transitions += self.classify_absent(&activity, &known_alive);
        self.refresh_gear(&alive);

        alive.sort_by_key(|entity| entity.address());
        *write(&self.activity) = activity;
        *write(&self.alive) = Arc::new(alive);

        log::trace!("Discovery: {:?}", report);
        Ok(report)
    }

    /// Decide whether previously alive entities died or left the world.
    /// Returns the amount of transitions.
    fn classify_absent(&self, activity: &ActivitySet, known_alive: &[Arc<PlayerEntity>]) -> usize {
        let absent = known_alive
            .iter()
            .filter(|entity| !activity.contains(entity.address()))
            .collect::<Vec<_>>();
        if absent.is_empty() {
            return 0;
        }

        let transitions = Cell::new(0);
        let mut batch = ScatterBatch::with_capacity(absent.len());
        for entity in absent.iter() {
            let transitions = &transitions;
            batch.prepare_read::<RemoteAddress>(entity.corpse_slot(), move |corpse| {
                let changed = match corpse {
                    Ok(corpse) if !corpse.is_null() => entity.mark_dead(corpse),
                    _ => entity.mark_departed(),
                };

                if changed {
                    transitions.set(transitions.get() + 1);
                }
                Ok(())
            });
        }

        batch.execute(&*self.memory);
        transitions.get()
    }

    fn refresh_gear(&self, alive: &[Arc<PlayerEntity>]) {
        if !self.settings.gear {
            return;
        }

        let ctx = self.context();
        let interval = self.settings.gear_refresh_interval();
        for entity in alive
            .iter()
            .filter(|entity| entity.gear_outdated(interval))
        {
            if let Err(err) = entity.refresh_gear(&ctx) {
                log::debug!("Failed to refresh gear of {}: {}", entity.address(), err);
            }
        }
    }

    /// Addresses of all entities currently considered alive
    pub fn alive_addresses(&self) -> HashSet<RemoteAddress> {
        self.alive_entities()
            .iter()
            .map(|entity| entity.address())
            .collect()
    }
}
