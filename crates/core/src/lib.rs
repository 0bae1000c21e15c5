pub mod checker;
pub mod config;
pub mod doctor;
pub mod model;
pub mod probe;
pub mod runner;
pub mod units;

pub use checker::{check, render_lines};
pub use config::{
    load_config, load_config_or_default, AppConfig, CheckerConfig, ExitPolicy, RunnerConfig,
    DEFAULT_PARTITIONS, DEFAULT_THRESHOLD_GB,
};
pub use doctor::{collect_doctor_info, DoctorInfo, DoctorPartition};
pub use model::{
    CheckMode, CheckReport, Finding, NormalizedSpace, PartitionReport, SpaceBackendKind,
    REPORT_VERSION,
};
pub use probe::{
    human_available, parse_df_output, source_for, DfSource, FixedSource, ProbeError, SpaceSource,
    SysinfoSource,
};
pub use runner::{JobStatus, PlaybookRunner, RunOutcome};
pub use units::{normalize, parse_available, SizeUnit, UnitError};
