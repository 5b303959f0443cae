// Logs module - component channels, rotation and disk maintenance

mod channel;
mod clock;
mod event;
pub(crate) mod guard;
mod maintenance;
mod provider;
mod registry;
mod relocate;
mod sink;
mod suppression;
mod verbosity;

pub use channel::{ComponentChannel, DEFAULT_CHANNEL_LEVEL};
pub use clock::{system_clock, Clock, ManualClock, SystemClock};
pub use event::{attrs, Attributes, Level, LogEvent, ATTRIBUTE_SEPARATOR};
pub use guard::{run_guarded, INTERNAL_TARGET};
pub use maintenance::{
    archive_old, expire_archives, prune_by_size, run_all, spawn_scheduler, MaintenancePolicy,
    MaintenanceReport,
};
pub use provider::{
    select_provider, ConsolidatedProvider, LoggerProvider, NoopProvider, PerComponentProvider,
    ProviderMode,
};
pub use registry::{get_logger, normalize_component, registry, LoggerRegistry};
pub use relocate::{is_lock_violation, native, NativeFs, Relocator};
pub use sink::{
    RotatingSink, RotationEvent, RotationOutcome, RotationPolicy, RotationTrigger, RotationUnit,
    DEFAULT_BACKUP_COUNT, MIN_ROTATION_AGE_SECS, MIN_ROTATION_BYTES,
};
pub use suppression::{
    SuppressionFilter, DEFAULT_PATTERN, DEFAULT_SOURCE, PASS_THROUGH_COUNT,
    SUMMARY_INTERVAL_SECS, SUPPRESSION_WINDOW_SECS,
};
pub use verbosity::{verbosity, VerbosityController, CONSOLE_TARGET};
