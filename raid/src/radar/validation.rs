use std::cell::Cell;

use raid_memory::{
    RemoteAddress,
    ScatterBatch,
};

use super::Radar;
use crate::{
    PlayerEntity,
    TransformSlot,
};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ValidationReport {
    /// Transforms which are still valid
    pub validated: usize,

    /// Transforms which have been resolved again
    pub reresolved: usize,

    /// Stale transforms which could not be resolved again
    pub failed: usize,

    /// Entities whose error flag has been cleared
    pub recovered: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Check {
    Pending,
    Valid,
    Stale,
    Broken,
}

struct Candidate<'a> {
    entity: &'a PlayerEntity,
    slot: &'a TransformSlot,
    hierarchy: RemoteAddress,
    hierarchy_slot: RemoteAddress,
    vertices: RemoteAddress,
    vertices_slot: RemoteAddress,
    check: Cell<Check>,
}

impl Radar {
    /// Verify that the cached transforms of all alive entities are still in place.
    ///
    /// The hierarchy pointers are read within one batch, the vertex buffer
    /// pointers of all unchanged hierarchies within a second one.
    /// Transforms which moved are resolved again and replaced.
    pub fn validation_pass(&self) -> ValidationReport {
        let entities = self.alive_entities();
        let mut report = ValidationReport::default();

        let candidates = entities
            .iter()
            .flat_map(|entity| {
                entity.skeleton().bones().iter().map(move |(_, slot)| {
                    let transform = slot.current();
                    Candidate {
                        entity: entity.as_ref(),
                        slot,
                        hierarchy: transform.hierarchy(),
                        hierarchy_slot: transform.hierarchy_slot(),
                        vertices: transform.vertices(),
                        vertices_slot: transform.vertices_slot(),
                        check: Cell::new(Check::Pending),
                    }
                })
            })
            .collect::<Vec<_>>();

        let mut batch = ScatterBatch::with_capacity(candidates.len());
        for candidate in candidates.iter() {
            batch.prepare_read::<RemoteAddress>(candidate.hierarchy_slot, move |hierarchy| {
                if hierarchy.map_or(true, |hierarchy| hierarchy != candidate.hierarchy) {
                    candidate.check.set(Check::Stale);
                }
                Ok(())
            });
        }
        batch.execute(&*self.memory);

        let mut batch = ScatterBatch::with_capacity(candidates.len());
        for candidate in candidates
            .iter()
            .filter(|candidate| candidate.check.get() == Check::Pending)
        {
            batch.prepare_read::<RemoteAddress>(candidate.vertices_slot, move |vertices| {
                candidate.check.set(match vertices {
                    Ok(vertices) if vertices == candidate.vertices => Check::Valid,
                    _ => Check::Stale,
                });
                Ok(())
            });
        }
        batch.execute(&*self.memory);

        let ctx = self.context();
        for candidate in candidates.iter() {
            if candidate.check.get() == Check::Valid {
                report.validated += 1;
                continue;
            }

            candidate.slot.mark_stale();
            match candidate.slot.resolve_again(&ctx) {
                Ok(()) => {
                    report.reresolved += 1;
                }
                Err(err) => {
                    log::debug!(
                        "Stale transform {} of {} can not be resolved: {}",
                        candidate.slot.managed(),
                        candidate.entity.address(),
                        err
                    );
                    candidate.entity.set_error();
                    candidate.check.set(Check::Broken);
                    report.failed += 1;
                }
            }
        }

        for entity in entities.iter() {
            let healthy = candidates
                .iter()
                .filter(|candidate| std::ptr::eq(candidate.entity, &**entity))
                .all(|candidate| candidate.check.get() != Check::Broken);

            if healthy && entity.has_error() {
                entity.clear_error();
                report.recovered += 1;
            }
        }

        log::trace!("Validation: {:?}", report);
        report
    }
}
