//! chartkit renders chart markup from registered templates and themes, and keeps repeated renders
//! cheap by diffing each new data tree against the last one and patching the prior output.
//!
//! # Pipeline overview
//!
//! 1. **Register**: templates are parsed and compiled (partials inlined) when registered; themes
//!    are validated and flattened.
//! 2. **Theme**: the data tree receives the selected theme bundle under `theme`.
//! 3. **Diff**: the themed data is compared with the data of the last render for the same
//!    template/theme pair, producing impact-classified [`ChangeRecord`]s.
//! 4. **Patch**: changes become an optimized list of [`Operation`]s, scored by an
//!    [`EfficiencyPolicy`] that decides between patching and a full render.
//! 5. **Apply**: operations re-render only the template regions that read a changed path. A patch
//!    that cannot be applied falls back to a full render.
//!
//! [`ChartPipeline`] runs all of this behind one call, with an output cache and coalescing of
//! concurrent identical requests.
//!
//! The key design constraints:
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: equal inputs produce byte-identical markup and equal cache keys.
//! - **Patch equivalence**: an incremental result is always the markup a full render would give.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod diff;
mod foundation;
mod patch;
mod pipeline;
mod template;
mod theme;

pub use crate::foundation::error::{ChartkitError, ChartkitResult};
pub use crate::foundation::path::{DataPath, PathSeg};

pub use crate::theme::builtin::{DARK_THEME_ID, DEFAULT_THEME_ID};
pub use crate::theme::color::{ColorDef, parse_color};
pub use crate::theme::model::{REQUIRED_THEME_PATHS, Theme, ThemeVariables};
pub use crate::theme::registry::{ThemeRegistry, apply_theme};

pub use crate::template::model::{Template, TemplateConfig};
pub use crate::template::registry::{RegistryPolicy, TemplateRegistry};
pub use crate::template::validate::ValidationResult;

pub use crate::diff::change::{ChangeKind, ChangeRecord, Impact};
pub use crate::diff::engine::{DEFAULT_DIFF_MAX_DEPTH, DiffEngine, diff};
pub use crate::diff::impact::ImpactClassifier;

pub use crate::patch::apply::ApplyFailure;
pub use crate::patch::efficiency::{
    EfficiencyPolicy, PatchDecision, PatchEfficiency, complexity_score, estimate_size,
};
pub use crate::patch::plan::{AttributeChange, Operation, OperationKind, Patch, Target};

pub use crate::pipeline::fingerprint::{CacheKey, Fingerprint, fingerprint_value};
pub use crate::pipeline::history::SnapshotInfo;
pub use crate::pipeline::opts::PipelineOpts;
pub use crate::pipeline::orchestrator::{
    ChartMetadata, ChartOutput, ChartPipeline, GenerateOpts, PipelineStats, RenderPath,
    ThemeSelection,
};
