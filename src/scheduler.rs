/// Identifier of a scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub u64);

/// The part of the event scheduler driving the partition that the
/// partition itself consults.
pub trait EventScheduler {
    /// The diffusion event currently executing, if any.
    fn active_diffusion_event(&self) -> Option<EventId>;
}

/// How a molecule created mid-run gets its first events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoleculeRouting {
    /// A diffusion event is running; it picks the molecule up before it
    /// finishes.
    JoinLiveEvent(EventId),
    /// No diffusion event is running; the molecule needs a standalone event.
    Standalone,
    /// The molecule neither diffuses nor reacts on its own.
    Unscheduled,
}
