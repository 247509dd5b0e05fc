use crate::diff::{ChangeRecord, DiffError};

/// Trait for streaming change records to a consumer.
pub trait DiffSink {
    /// Called once before any record is emitted.
    fn begin(&mut self) -> Result<(), DiffError> {
        Ok(())
    }

    fn emit(&mut self, record: ChangeRecord) -> Result<(), DiffError>;

    /// Called once after the last record, even when some sheet pairs failed.
    fn finish(&mut self) -> Result<(), DiffError> {
        Ok(())
    }
}

impl<S: DiffSink + ?Sized> DiffSink for &mut S {
    fn begin(&mut self) -> Result<(), DiffError> {
        (**self).begin()
    }

    fn emit(&mut self, record: ChangeRecord) -> Result<(), DiffError> {
        (**self).emit(record)
    }

    fn finish(&mut self) -> Result<(), DiffError> {
        (**self).finish()
    }
}

/// Collects records into a `Vec`.
#[derive(Debug, Default)]
pub struct VecSink {
    records: Vec<ChangeRecord>,
}

impl VecSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ChangeRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ChangeRecord> {
        self.records
    }
}

impl DiffSink for VecSink {
    fn emit(&mut self, record: ChangeRecord) -> Result<(), DiffError> {
        self.records.push(record);
        Ok(())
    }
}

/// Forwards each record to a callback.
pub struct CallbackSink<F: FnMut(ChangeRecord)> {
    f: F,
}

impl<F: FnMut(ChangeRecord)> CallbackSink<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F: FnMut(ChangeRecord)> DiffSink for CallbackSink<F> {
    fn emit(&mut self, record: ChangeRecord) -> Result<(), DiffError> {
        (self.f)(record);
        Ok(())
    }
}
