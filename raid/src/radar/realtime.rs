use raid_memory::{
    BatchReport,
    ScatterBatch,
};

use super::Radar;

impl Radar {
    /// Read rotation and pose of every alive entity within one round trip.
    ///
    /// Operates on the alive entities as of the start of the pass.
    /// Entities discovered meanwhile will be picked up by the next pass.
    pub fn realtime_pass(&self) -> BatchReport {
        let entities = self.alive_entities();

        let mut batch = ScatterBatch::with_capacity(entities.len() * 2);
        for entity in entities.iter() {
            entity.prepare_realtime(&mut batch);
        }

        let report = batch.execute(&*self.memory);
        if report.unreadable > 0 || report.rejected > 0 {
            log::trace!("Realtime: {:?}", report);
        }

        report
    }
}
