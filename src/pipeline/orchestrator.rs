use crate::diff::engine::DiffEngine;
use crate::diff::impact::ImpactClassifier;
use crate::foundation::error::{ChartkitError, ChartkitResult};
use crate::patch::apply::{ApplyFailure, apply_patch};
use crate::patch::builder::PatchBuilder;
use crate::patch::efficiency::PatchDecision;
use crate::patch::plan::Patch;
use crate::pipeline::cache::BoundedCache;
use crate::pipeline::coalesce::{Claim, InFlight};
use crate::pipeline::fingerprint::{CacheKey, fingerprint_value};
use crate::pipeline::history::{History, Snapshot, SnapshotInfo};
use crate::pipeline::opts::PipelineOpts;
use crate::pipeline::{lock, read, write};
use crate::template::compile::CompiledTemplate;
use crate::template::model::TemplateConfig;
use crate::template::registry::TemplateRegistry;
use crate::template::render::RenderTree;
use crate::template::validate::{ValidationResult, validate_data};
use crate::theme::model::{Theme, ThemeVariables};
use crate::theme::registry::{ThemeRegistry, apply_theme};
use rayon::prelude::*;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Instant;

/// Which theme a generation uses.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ThemeSelection {
    /// The registry's active theme.
    #[default]
    Active,
    /// A registered theme by id.
    Named(String),
    /// A one-off theme, validated like a registered one and keyed as `custom-<hash>`.
    Custom(Box<Theme>),
}

/// Per-call options for [`ChartPipeline::generate_chart`].
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateOpts {
    /// Template to render.
    pub template_id: String,
    /// Theme to apply.
    pub theme: ThemeSelection,
    /// Overrides the data's top-level `width`.
    pub width: Option<u32>,
    /// Overrides the data's top-level `height`.
    pub height: Option<u32>,
    /// Opaque quality hint for downstream encoders; reported back in the metadata.
    pub quality: Option<String>,
    /// Try patching the previous render for this template/theme pair.
    pub enable_incremental: bool,
    /// Serve and store results in the generation cache.
    pub enable_caching: bool,
}

impl Default for GenerateOpts {
    fn default() -> Self {
        Self {
            template_id: String::new(),
            theme: ThemeSelection::Active,
            width: None,
            height: None,
            quality: None,
            enable_incremental: true,
            enable_caching: true,
        }
    }
}

impl GenerateOpts {
    /// Defaults for `template_id`.
    pub fn new(template_id: impl Into<String>) -> Self {
        Self {
            template_id: template_id.into(),
            ..Self::default()
        }
    }

    /// Use a registered theme.
    pub fn with_theme(mut self, id: impl Into<String>) -> Self {
        self.theme = ThemeSelection::Named(id.into());
        self
    }

    /// Use a one-off theme.
    pub fn with_custom_theme(mut self, theme: Theme) -> Self {
        self.theme = ThemeSelection::Custom(Box::new(theme));
        self
    }

    /// Override the document size.
    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Terminal state a generation went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderPath {
    /// Served from the generation cache.
    CacheHit,
    /// Data equal to the last snapshot's; the snapshot output was reused.
    Unchanged,
    /// Prior output patched.
    Incremental,
    /// Rendered from scratch.
    Full,
}

/// Everything known about how an output was produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartMetadata {
    /// Key of the themed input.
    pub cache_key: CacheKey,
    /// Output came from the generation cache or an unchanged snapshot.
    pub cache_hit: bool,
    /// Output was produced by patching.
    pub was_incremental: bool,
    /// This caller waited on an identical in-flight request.
    pub coalesced: bool,
    /// Terminal state.
    pub render_path: RenderPath,
    /// Number of change records against the previous snapshot.
    pub changes: usize,
    /// Number of patch operations built.
    pub operations: usize,
    /// Id of the patch built for this request, if any.
    pub patch_id: Option<u64>,
    /// Operations that could not be applied (the request then fell back to a full render).
    pub apply_failures: Vec<ApplyFailure>,
    /// Declared template variables missing from the data.
    pub missing_variables: Vec<String>,
    /// Quality hint passed through from [`GenerateOpts::quality`].
    pub quality: Option<String>,
    /// Wall time in milliseconds.
    pub elapsed_ms: f64,
}

/// Rendered markup plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOutput {
    /// Rendered markup.
    pub output: Arc<str>,
    /// How it was produced.
    pub metadata: ChartMetadata,
}

/// Aggregate counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PipelineStats {
    /// Completed `generate_chart` calls (coalesced ones included).
    pub total_generations: u64,
    /// Calls served from cache or an unchanged snapshot.
    pub cache_hits: u64,
    /// Calls served by patching.
    pub incremental_updates: u64,
    /// Calls that rendered from scratch.
    pub full_rebuilds: u64,
    /// Calls that waited on an identical in-flight request.
    pub coalesced: u64,
    /// Patches abandoned because an operation could not be applied.
    pub patch_fallbacks: u64,
    /// Mean wall time per call.
    pub average_time_ms: f64,
}

#[derive(Debug, Default)]
struct StatsAccumulator {
    stats: PipelineStats,
    total_ms: f64,
}

impl StatsAccumulator {
    fn record(&mut self, meta: &ChartMetadata) {
        let s = &mut self.stats;
        s.total_generations += 1;
        if meta.coalesced {
            s.coalesced += 1;
        } else {
            match meta.render_path {
                RenderPath::CacheHit | RenderPath::Unchanged => s.cache_hits += 1,
                RenderPath::Incremental => s.incremental_updates += 1,
                RenderPath::Full => s.full_rebuilds += 1,
            }
            if !meta.apply_failures.is_empty() {
                s.patch_fallbacks += 1;
            }
        }
        self.total_ms += meta.elapsed_ms;
        s.average_time_ms = self.total_ms / s.total_generations as f64;
    }
}

/// Inputs resolved once per call before the state machine runs.
struct Prepared {
    key: CacheKey,
    compiled: Arc<CompiledTemplate>,
    data: Arc<Value>,
}

/// Partial metadata filled in by the state machine.
struct Outcome {
    output: Arc<str>,
    path: RenderPath,
    changes: usize,
    operations: usize,
    patch_id: Option<u64>,
    apply_failures: Vec<ApplyFailure>,
}

impl Outcome {
    fn new(output: Arc<str>, path: RenderPath) -> Self {
        Self {
            output,
            path,
            changes: 0,
            operations: 0,
            patch_id: None,
            apply_failures: Vec::new(),
        }
    }
}

/// Template/theme rendering with caching and incremental updates.
///
/// `generate_chart` runs: cache lookup, snapshot lookup, diff, patch build and evaluation, then
/// either patch application or a full render, then cache write. Concurrent calls for the same
/// cache key are coalesced so only one of them runs the pipeline.
///
/// Registries are owned per pipeline; independent pipelines never share state.
#[derive(Debug)]
pub struct ChartPipeline {
    opts: PipelineOpts,
    templates: RwLock<TemplateRegistry>,
    themes: RwLock<ThemeRegistry>,
    generation: Mutex<BoundedCache<CacheKey, Arc<str>>>,
    data: Mutex<BoundedCache<CacheKey, Arc<Value>>>,
    history: Mutex<History>,
    stats: Mutex<StatsAccumulator>,
    in_flight: InFlight<CacheKey, ChartOutput>,
    next_patch_id: AtomicU64,
    differ: DiffEngine,
    builder: PatchBuilder,
}

impl Default for ChartPipeline {
    fn default() -> Self {
        Self::new(PipelineOpts::default())
    }
}

impl ChartPipeline {
    /// Pipeline with no templates and the built-in themes.
    pub fn new(opts: PipelineOpts) -> Self {
        let templates = TemplateRegistry::with_policy(opts.templates);
        Self::with_registries(opts, templates, ThemeRegistry::with_builtin())
    }

    /// Pipeline over caller-provided registries.
    pub fn with_registries(
        opts: PipelineOpts,
        templates: TemplateRegistry,
        themes: ThemeRegistry,
    ) -> Self {
        Self {
            generation: Mutex::new(BoundedCache::new(opts.max_cache_entries)),
            data: Mutex::new(BoundedCache::new(opts.max_data_entries)),
            history: Mutex::new(History::new(opts.max_snapshots, opts.max_patches)),
            stats: Mutex::new(StatsAccumulator::default()),
            in_flight: InFlight::default(),
            next_patch_id: AtomicU64::new(1),
            differ: DiffEngine::new(ImpactClassifier::default(), opts.diff_max_depth),
            builder: PatchBuilder::new(opts.efficiency),
            templates: RwLock::new(templates),
            themes: RwLock::new(themes),
            opts,
        }
    }

    /// Options this pipeline was built with.
    pub fn opts(&self) -> &PipelineOpts {
        &self.opts
    }

    /// Register (compile) a template.
    pub fn register_template(
        &self,
        id: impl Into<String>,
        config: TemplateConfig,
    ) -> ChartkitResult<()> {
        write(&self.templates).register(id, config)
    }

    /// Register a partial shared by all templates.
    pub fn register_partial(
        &self,
        name: impl Into<String>,
        body: impl Into<String>,
    ) -> ChartkitResult<()> {
        write(&self.templates).register_partial(name, body)
    }

    /// Render a template against raw data: no theme, no caching.
    pub fn render(&self, template_id: &str, data: &Value) -> ChartkitResult<String> {
        read(&self.templates).render(template_id, data)
    }

    /// Check data against a template's declared variables.
    pub fn validate(&self, template_id: &str, data: &Value) -> ChartkitResult<ValidationResult> {
        read(&self.templates).validate(template_id, data)
    }

    /// Registered template ids, sorted.
    pub fn template_ids(&self) -> Vec<String> {
        read(&self.templates).ids()
    }

    /// Validate and register a theme.
    pub fn register_theme(&self, id: impl Into<String>, theme: Theme) -> ChartkitResult<()> {
        write(&self.themes).register(id, theme)
    }

    /// Switch the active theme.
    pub fn set_active_theme(&self, id: &str) -> ChartkitResult<()> {
        write(&self.themes).set_active(id)
    }

    /// Id of the active theme.
    pub fn active_theme(&self) -> Option<String> {
        read(&self.themes).active_id().map(str::to_owned)
    }

    /// Registered theme ids, sorted.
    pub fn theme_ids(&self) -> Vec<String> {
        read(&self.themes).ids()
    }

    /// Flattened variables of a registered theme.
    pub fn theme_variables(&self, id: &str) -> ChartkitResult<ThemeVariables> {
        read(&self.themes).variables(id)
    }

    /// Deep copy of `data` with the theme bundle injected as `theme`.
    pub fn apply_to_data(&self, data: &Value, theme_id: Option<&str>) -> ChartkitResult<Value> {
        read(&self.themes).apply_to_data(data, theme_id)
    }

    /// Render `data` with the template and theme selected by `opts`.
    #[tracing::instrument(skip(self, data, opts), fields(template = %opts.template_id))]
    pub fn generate_chart(&self, data: &Value, opts: &GenerateOpts) -> ChartkitResult<ChartOutput> {
        let start = Instant::now();
        let prepared = self.prepare(data, opts)?;
        let missing = validate_data(&prepared.compiled.contract, &prepared.data).missing;

        let (outcome, coalesced) = match self.in_flight.claim(&prepared.key) {
            Claim::Leader(guard) => {
                let outcome = self.run(&prepared, opts);
                let output = self.finish(&prepared, outcome, missing, opts, start, false);
                guard.complete(output.clone());
                return Ok(output);
            }
            Claim::Follower(slot) => match slot.wait() {
                Some(leader) => {
                    tracing::debug!(key = %prepared.key, "coalesced with in-flight request");
                    let outcome = Outcome {
                        output: leader.output,
                        path: leader.metadata.render_path,
                        changes: leader.metadata.changes,
                        operations: leader.metadata.operations,
                        patch_id: leader.metadata.patch_id,
                        apply_failures: leader.metadata.apply_failures,
                    };
                    (outcome, true)
                }
                None => (self.run(&prepared, opts), false),
            },
        };
        Ok(self.finish(&prepared, outcome, missing, opts, start, coalesced))
    }

    /// Generate many charts in parallel. Results are in request order.
    pub fn generate_batch(
        &self,
        requests: &[(Value, GenerateOpts)],
    ) -> Vec<ChartkitResult<ChartOutput>> {
        requests
            .par_iter()
            .map(|(data, opts)| self.generate_chart(data, opts))
            .collect()
    }

    /// Counters since construction.
    pub fn get_stats(&self) -> PipelineStats {
        lock(&self.stats).stats
    }

    /// Drop every cached output, data baseline, snapshot and patch. Counters are kept.
    pub fn clear_cache(&self) {
        let outputs = {
            let mut generation = lock(&self.generation);
            let n = generation.len();
            generation.clear();
            n
        };
        lock(&self.data).clear();
        lock(&self.history).clear();
        tracing::debug!(outputs, "cleared caches");
    }

    /// Retained patches, oldest first.
    pub fn patch_history(&self) -> Vec<Arc<Patch>> {
        lock(&self.history).patches()
    }

    /// Retained snapshots, oldest first.
    pub fn snapshots(&self) -> Vec<SnapshotInfo> {
        lock(&self.history).snapshot_infos()
    }

    fn resolve_theme(&self, selection: &ThemeSelection) -> ChartkitResult<Arc<Theme>> {
        match selection {
            ThemeSelection::Active => read(&self.themes).resolve(None),
            ThemeSelection::Named(id) => read(&self.themes).resolve(Some(id)),
            ThemeSelection::Custom(theme) => {
                let mut theme = (**theme).clone();
                theme.id.clear();
                let id = format!("custom-{}", fingerprint_value(&theme.to_bundle()));
                theme.validate().map_err(|violations| ChartkitError::InvalidTheme {
                    id: id.clone(),
                    violations,
                })?;
                theme.id = id;
                Ok(Arc::new(theme))
            }
        }
    }

    fn prepare(&self, data: &Value, opts: &GenerateOpts) -> ChartkitResult<Prepared> {
        let compiled = read(&self.templates).compile(&opts.template_id)?;
        let theme = self.resolve_theme(&opts.theme)?;

        let mut themed = apply_theme(data, &theme)?;
        if let Value::Object(map) = &mut themed {
            if let Some(w) = opts.width {
                map.insert("width".to_owned(), Value::from(w));
            }
            if let Some(h) = opts.height {
                map.insert("height".to_owned(), Value::from(h));
            }
        }

        Ok(Prepared {
            key: CacheKey::new(&opts.template_id, &theme.id, &themed)
                .with_template_rev(compiled.revision),
            compiled,
            data: Arc::new(themed),
        })
    }

    fn run(&self, p: &Prepared, opts: &GenerateOpts) -> Outcome {
        if opts.enable_caching
            && let Some(output) = lock(&self.generation).get(&p.key).cloned()
        {
            tracing::debug!(key = %p.key, "generation cache hit");
            return Outcome::new(output, RenderPath::CacheHit);
        }

        if !opts.enable_incremental {
            return self.full_render(p, opts, Vec::new());
        }
        let Some((snapshot, prior)) = self.baseline(&p.key) else {
            tracing::debug!(key = %p.key, "no snapshot, full render");
            return self.full_render(p, opts, Vec::new());
        };

        let changes = self.differ.diff(&prior, &p.data);
        if changes.is_empty() {
            tracing::debug!(key = %p.key, "data unchanged since snapshot");
            let output = Arc::clone(&snapshot.output);
            self.cache_write(p, &output, opts);
            return Outcome::new(output, RenderPath::Unchanged);
        }

        let id = self.next_patch_id.fetch_add(1, Ordering::Relaxed);
        let patch = Arc::new(
            self.builder
                .build_patch(id, p.key.clone(), changes, &snapshot),
        );
        lock(&self.history).store_patch(Arc::clone(&patch));

        if patch.efficiency.decision == PatchDecision::FullRebuild {
            tracing::debug!(
                patch = id,
                ratio = patch.efficiency.size_ratio,
                operations = patch.efficiency.operation_count,
                complexity = patch.efficiency.complexity,
                "patch rejected, full render"
            );
            let mut outcome = self.full_render(p, opts, Vec::new());
            outcome.changes = patch.changes.len();
            outcome.operations = patch.operations.len();
            outcome.patch_id = Some(id);
            return outcome;
        }

        let applied = apply_patch(&snapshot.tree, &p.data, &patch.operations);
        let mut outcome = if applied.failures.is_empty() {
            let output: Arc<str> = Arc::from(applied.tree.to_markup());
            lock(&self.history).store_snapshot(
                p.key.clone(),
                Arc::clone(&output),
                Arc::new(applied.tree),
            );
            self.cache_write(p, &output, opts);
            tracing::debug!(patch = id, applied = applied.applied, "patch applied");
            Outcome::new(output, RenderPath::Incremental)
        } else {
            tracing::warn!(
                patch = id,
                failures = applied.failures.len(),
                "patch could not be fully applied, falling back to full render"
            );
            self.full_render(p, opts, applied.failures)
        };
        outcome.changes = patch.changes.len();
        outcome.operations = patch.operations.len();
        outcome.patch_id = Some(id);
        outcome
    }

    /// Last snapshot for the key's template/theme pair and the data it was rendered from.
    fn baseline(&self, key: &CacheKey) -> Option<(Arc<Snapshot>, Arc<Value>)> {
        let snapshot = lock(&self.history).snapshot(&key.snapshot_key())?;
        let prior = lock(&self.data).get(&snapshot.cache_key).cloned()?;
        Some((snapshot, prior))
    }

    fn full_render(
        &self,
        p: &Prepared,
        opts: &GenerateOpts,
        apply_failures: Vec<ApplyFailure>,
    ) -> Outcome {
        let tree = RenderTree::build(&p.compiled, &p.data);
        let output: Arc<str> = Arc::from(tree.to_markup());
        lock(&self.history).store_snapshot(p.key.clone(), Arc::clone(&output), Arc::new(tree));
        self.cache_write(p, &output, opts);
        tracing::debug!(template = %p.compiled.id, key = %p.key, bytes = output.len(), "full render");
        let mut outcome = Outcome::new(output, RenderPath::Full);
        outcome.apply_failures = apply_failures;
        outcome
    }

    fn cache_write(&self, p: &Prepared, output: &Arc<str>, opts: &GenerateOpts) {
        lock(&self.data).insert(p.key.clone(), Arc::clone(&p.data));
        if opts.enable_caching {
            lock(&self.generation).insert(p.key.clone(), Arc::clone(output));
        }
    }

    fn finish(
        &self,
        p: &Prepared,
        outcome: Outcome,
        missing_variables: Vec<String>,
        opts: &GenerateOpts,
        start: Instant,
        coalesced: bool,
    ) -> ChartOutput {
        let metadata = ChartMetadata {
            cache_key: p.key.clone(),
            cache_hit: matches!(outcome.path, RenderPath::CacheHit | RenderPath::Unchanged),
            was_incremental: outcome.path == RenderPath::Incremental,
            coalesced,
            render_path: outcome.path,
            changes: outcome.changes,
            operations: outcome.operations,
            patch_id: outcome.patch_id,
            apply_failures: outcome.apply_failures,
            missing_variables,
            quality: opts.quality.clone(),
            elapsed_ms: start.elapsed().as_secs_f64() * 1000.0,
        };
        lock(&self.stats).record(&metadata);
        ChartOutput {
            output: outcome.output,
            metadata,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/orchestrator.rs"]
mod tests;
