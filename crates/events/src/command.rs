use bank_core::AggregateId;

/// A command targets a specific aggregate.
///
/// Commands represent **intent** and are never persisted. An accepted command
/// turns into one or more events; a rejected one leaves no trace.
///
/// `target_aggregate_id()` lets a repository route the command to the stream
/// it must load before handling it.
pub trait Command: Clone + core::fmt::Debug + Send + Sync + 'static {
    fn target_aggregate_id(&self) -> AggregateId;
}
