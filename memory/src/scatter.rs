use crate::{
    decode_array,
    MemoryAccess,
    MemoryResult,
    MemoryValue,
    RemoteAddress,
    ScatterRequest,
};

type Continuation<'a> = Box<dyn FnOnce(MemoryResult<&[u8]>) -> anyhow::Result<()> + 'a>;

struct ScatterOperation<'a> {
    address: RemoteAddress,
    length: usize,
    continuation: Continuation<'a>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    /// Total amount of executed operations
    pub operations: usize,

    /// Operations which could not be read
    pub unreadable: usize,

    /// Operations which have been read but rejected by their continuation
    pub rejected: usize,
}

/// A set of reads executed within one round trip.
///
/// Every read has a continuation which will be invoked after the round trip
/// with the result of that specific read. Continuations must not assume any
/// ordering relative to each other. The memory of the target process can only
/// signal that an address is unreadable, hence validating the read value is
/// up to the continuation. A continuation returning an error does not affect
/// any other continuation.
#[derive(Default)]
pub struct ScatterBatch<'a> {
    operations: Vec<ScatterOperation<'a>>,
}

impl<'a> ScatterBatch<'a> {
    pub fn new() -> Self {
        Self {
            operations: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            operations: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn prepare_read_bytes(
        &mut self,
        address: RemoteAddress,
        length: usize,
        continuation: impl FnOnce(MemoryResult<&[u8]>) -> anyhow::Result<()> + 'a,
    ) {
        self.operations.push(ScatterOperation {
            address,
            length,
            continuation: Box::new(continuation),
        });
    }

    pub fn prepare_read<T: MemoryValue>(
        &mut self,
        address: RemoteAddress,
        continuation: impl FnOnce(MemoryResult<T>) -> anyhow::Result<()> + 'a,
    ) {
        self.prepare_read_bytes(address, T::SIZE, move |result| {
            continuation(result.and_then(T::decode))
        });
    }

    pub fn prepare_read_array<T: MemoryValue>(
        &mut self,
        address: RemoteAddress,
        count: usize,
        continuation: impl FnOnce(MemoryResult<Vec<T>>) -> anyhow::Result<()> + 'a,
    ) {
        self.prepare_read_bytes(address, T::SIZE * count, move |result| {
            continuation(result.and_then(decode_array::<T>))
        });
    }

    /// Execute all prepared reads within one round trip and invoke every continuation.
    pub fn execute(self, memory: &dyn MemoryAccess) -> BatchReport {
        let mut report = BatchReport {
            operations: self.operations.len(),
            ..Default::default()
        };
        if self.operations.is_empty() {
            return report;
        }

        let (mut requests, continuations): (Vec<_>, Vec<_>) = self
            .operations
            .into_iter()
            .map(|operation| {
                (
                    ScatterRequest::new(operation.address, operation.length),
                    operation.continuation,
                )
            })
            .unzip();

        let round_trip = memory.read_scatter(&mut requests);
        if let Err(err) = &round_trip {
            log::debug!(
                "Scatter round trip with {} reads failed: {}",
                requests.len(),
                err
            );
        }

        for (request, continuation) in requests.iter().zip(continuations) {
            let result = match &round_trip {
                Ok(()) => request
                    .status
                    .clone()
                    .map(|_| request.buffer.as_slice()),
                Err(err) => Err(err.clone()),
            };

            let readable = result.is_ok();
            if !readable {
                report.unreadable += 1;
            }

            if let Err(err) = continuation(result) {
                if readable {
                    report.rejected += 1;
                }

                log::trace!("Read at {} not accepted: {:#}", request.address, err);
            }
        }

        report
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;

    use super::ScatterBatch;
    use crate::{
        MemoryAccess,
        MemoryImage,
        RemoteAddress,
    };

    #[test]
    fn failure_is_delivered_to_its_operation_only() {
        let memory = MemoryImage::new();
        memory.write_u32(RemoteAddress(0x1000), 1);
        memory.write_u32(RemoteAddress(0x2000), 2);
        memory.write_u32(RemoteAddress(0x3000), 3);
        memory.fail_address(RemoteAddress(0x2000));

        let results = RefCell::new(Vec::new());
        let mut batch = ScatterBatch::new();
        for address in [0x1000, 0x2000, 0x3000] {
            let results = &results;
            batch.prepare_read::<u32>(RemoteAddress(address), move |value| {
                results.borrow_mut().push((address, value.ok()));
                Ok(())
            });
        }

        let calls_before = memory.total_read_calls();
        let report = batch.execute(&memory);
        assert_eq!(memory.total_read_calls() - calls_before, 1);
        assert_eq!(report.operations, 3);
        assert_eq!(report.unreadable, 1);

        let mut results = results.into_inner();
        results.sort();
        assert_eq!(
            results,
            vec![(0x1000, Some(1)), (0x2000, None), (0x3000, Some(3))]
        );
    }

    #[test]
    fn rejected_continuation_does_not_affect_siblings() {
        let memory = MemoryImage::new();
        memory.write_f32_slice(RemoteAddress(0x1000), &[400.0, 10.0]);
        memory.write_f32_slice(RemoteAddress(0x2000), &[90.0, 10.0]);

        let accepted = RefCell::new(Vec::new());
        let mut batch = ScatterBatch::new();
        for address in [0x1000u64, 0x2000] {
            let accepted = &accepted;
            batch.prepare_read::<[f32; 2]>(RemoteAddress(address), move |value| {
                let value = value?;
                if value[0] > 360.0 {
                    anyhow::bail!("yaw out of range");
                }

                accepted.borrow_mut().push(address);
                Ok(())
            });
        }

        let report = batch.execute(&memory);
        assert_eq!(report.unreadable, 0);
        assert_eq!(report.rejected, 1);
        assert_eq!(accepted.into_inner(), vec![0x2000]);
    }

    #[test]
    fn failed_round_trip_reaches_every_operation() {
        let memory = MemoryImage::new();
        memory.write_u32(RemoteAddress(0x1000), 1);
        memory.set_fail_round_trips(true);

        let failures = RefCell::new(0);
        let mut batch = ScatterBatch::new();
        for _ in 0..2 {
            let failures = &failures;
            batch.prepare_read::<u32>(RemoteAddress(0x1000), move |value| {
                if value.is_err() {
                    *failures.borrow_mut() += 1;
                }
                Ok(())
            });
        }

        let report = batch.execute(&memory);
        assert_eq!(report.unreadable, 2);
        assert_eq!(failures.into_inner(), 2);
    }

    #[test]
    fn empty_batch_issues_no_round_trip() {
        let memory = MemoryImage::new();
        let report = ScatterBatch::new().execute(&memory);
        assert_eq!(report.operations, 0);
        assert_eq!(memory.total_read_calls(), 0);
    }
}
