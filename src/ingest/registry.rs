//! Validated templates, file routing, and the reloadable registry.
//!
//! A [`Catalogue`] is built from the two configuration documents and is
//! immutable once built. Construction validates everything up front and
//! reports every violation at once.
//!
//! Routing is an ordered list of [`Route`]s evaluated by one matcher; the first
//! route that matches wins:
//!
//! 1. explicit per-file overrides (exact normalized path)
//! 2. enabled path rules, in declaration order
//! 3. auto-detection rules (only when headers are known and detection is on)
//! 4. the default template
//!
//! [`SchemaRegistry`] holds the current catalogue behind an `Arc` and swaps it
//! atomically on reload. Readers keep whatever snapshot they already took.
//!
//! # Example
//!
//! ```
//! use mailsift::config::{FileMapping, RoutingCatalogue, TemplateCatalogue, TemplateConfig};
//! use mailsift::ingest::{Catalogue, MatchSource};
//!
//! let templates = TemplateCatalogue::new()
//!     .with_template("standard", TemplateConfig::new("Standard", ["Surname"]))
//!     .with_template("special", TemplateConfig::new("Special", ["Ref"]));
//! let routing = RoutingCatalogue::new()
//!     .with_rule(FileMapping::new("batch", "standard").with_input_pattern("data/*.csv"))
//!     .with_override("data/special.csv", "special");
//!
//! let catalogue = Catalogue::from_documents(&templates, &routing)?;
//!
//! assert_eq!(catalogue.resolve("data/a.csv")?.template_id, "standard");
//! let pinned = catalogue.resolve("data/special.csv")?;
//! assert_eq!(pinned.template_id, "special");
//! assert_eq!(pinned.source, MatchSource::Override);
//! assert!(catalogue.resolve("elsewhere/b.csv").is_err());
//! # Ok::<(), mailsift::MailsiftError>(())
//! ```

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::glob::{PathPattern, normalize_path};
use super::transform::{FieldKind, TransformRules};
use crate::config::{
    ColumnMappingConfig, IndexedPatternConfig, ProcessingOptions, ROUTING_FILE, RoutingCatalogue,
    TEMPLATES_FILE, TemplateCatalogue, TemplateConfig,
};
use crate::error::{MailsiftError, Result};

/// Placeholder for the index inside an indexed-group target.
pub const INDEX_PLACEHOLDER: &str = "{n}";

// =========================================================================
// Template
// =========================================================================

/// A family of numbered target columns such as `Child {n} Forename`.
#[derive(Debug, Clone)]
pub struct IndexedGroup {
    target: String,
    member: Regex,
    patterns: Vec<Regex>,
    max_index: usize,
}

impl IndexedGroup {
    fn compile(config: &IndexedPatternConfig, problems: &mut Vec<String>) -> Option<Self> {
        if !config.target.contains(INDEX_PLACEHOLDER) {
            problems.push(format!(
                "indexed pattern '{}' has no {INDEX_PLACEHOLDER} placeholder",
                config.target
            ));
            return None;
        }

        let member_source = config
            .target
            .split(INDEX_PLACEHOLDER)
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(r"(\d+)");
        let member = match Regex::new(&format!("^{member_source}$")) {
            Ok(re) => re,
            Err(e) => {
                problems.push(format!("indexed pattern '{}': {e}", config.target));
                return None;
            }
        };

        let mut patterns = Vec::new();
        for source in &config.patterns {
            match RegexBuilder::new(source).case_insensitive(true).build() {
                Ok(re) if re.captures_len() < 2 => problems.push(format!(
                    "indexed pattern '{}': pattern '{source}' captures no index",
                    config.target
                )),
                Ok(re) => patterns.push(re),
                Err(e) => problems.push(format!(
                    "indexed pattern '{}': invalid pattern '{source}': {e}",
                    config.target
                )),
            }
        }
        if config.patterns.is_empty() {
            problems.push(format!("indexed pattern '{}' has no patterns", config.target));
        }

        Some(Self {
            target: config.target.clone(),
            member,
            patterns,
            max_index: config.max_index,
        })
    }

    /// The target column template, e.g. `Child {n} Forename`.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Highest index that binds.
    pub fn max_index(&self) -> usize {
        self.max_index
    }

    /// The concrete column name for index `n`.
    pub fn column_for(&self, n: usize) -> String {
        self.target.replace(INDEX_PLACEHOLDER, &n.to_string())
    }

    /// The index a target column occupies in this group, if it belongs to it.
    pub fn slot_of(&self, column: &str) -> Option<usize> {
        self.member
            .captures(column)
            .and_then(|caps| caps[1].parse().ok())
    }

    /// The index a normalized source header carries, if any pattern finds
    /// one within `1..=max_index`.
    pub fn index_in(&self, normalized_header: &str) -> Option<usize> {
        self.patterns.iter().find_map(|re| {
            let caps = re.captures(normalized_header)?;
            let n: usize = caps.get(1)?.as_str().parse().ok()?;
            (1..=self.max_index).contains(&n).then_some(n)
        })
    }
}

/// A validated target template.
#[derive(Debug, Clone)]
pub struct Template {
    id: String,
    name: String,
    description: String,
    columns: Vec<String>,
    required_columns: Vec<String>,
    header_row: usize,
    sheet_name: Option<String>,
    use_first_row_as_headers: bool,
    output_suffix: String,
    kinds: Vec<FieldKind>,
    rules: TransformRules,
    aliases: BTreeMap<String, Vec<String>>,
    groups: Vec<IndexedGroup>,
}

impl Template {
    /// Builds one template on its own.
    pub fn from_config(
        id: &str,
        config: &TemplateConfig,
        mapping: Option<&ColumnMappingConfig>,
    ) -> Result<Self> {
        let mut violations = Vec::new();
        match Self::build(id, config, mapping, &mut violations) {
            Some(template) if violations.is_empty() => Ok(template),
            _ => Err(MailsiftError::config_validation(violations)),
        }
    }

    fn build(
        id: &str,
        config: &TemplateConfig,
        mapping: Option<&ColumnMappingConfig>,
        violations: &mut Vec<String>,
    ) -> Option<Self> {
        let mut problems = Vec::new();

        if config.columns.is_empty() {
            problems.push("has no columns".to_string());
        }
        let mut seen = HashSet::new();
        for column in &config.columns {
            if !seen.insert(column.as_str()) {
                problems.push(format!("lists column '{column}' more than once"));
            }
        }
        for column in &config.required_columns {
            if !seen.contains(column.as_str()) {
                problems.push(format!("requires unknown column '{column}'"));
            }
        }
        for column in config.field_types.keys() {
            if !seen.contains(column.as_str()) {
                problems.push(format!("types unknown column '{column}'"));
            }
        }

        let rules = match TransformRules::from_config(&config.data_transformations) {
            Ok(rules) => rules,
            Err(e) => {
                problems.push(e.to_string());
                TransformRules::none()
            }
        };

        let aliases = mapping.map(ColumnMappingConfig::flattened_aliases).unwrap_or_default();
        for target in aliases.keys() {
            if !seen.contains(target.as_str()) {
                problems.push(format!("has aliases for unknown column '{target}'"));
            }
        }

        let groups: Vec<IndexedGroup> = mapping
            .map(|m| m.indexed_patterns.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|g| IndexedGroup::compile(g, &mut problems))
            .collect();
        for group in &groups {
            if !config.columns.iter().any(|c| group.slot_of(c).is_some()) {
                warn!(template = id, group = group.target(), "indexed pattern matches no template column");
            }
        }

        let kinds = config
            .columns
            .iter()
            .map(|c| {
                config
                    .field_types
                    .get(c)
                    .copied()
                    .unwrap_or_else(|| FieldKind::infer(c))
            })
            .collect();

        violations.extend(problems.into_iter().map(|p| format!("template '{id}' {p}")));

        Some(Self {
            id: id.to_string(),
            name: if config.name.is_empty() { id.to_string() } else { config.name.clone() },
            description: config.description.clone(),
            columns: config.columns.clone(),
            required_columns: config.required_columns.clone(),
            header_row: config.header_row,
            sheet_name: config.sheet_name.clone(),
            use_first_row_as_headers: config.use_first_row_as_headers,
            output_suffix: config.output_suffix.clone(),
            kinds,
            rules,
            aliases,
            groups,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Display name (the id when none is configured).
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    /// Target columns in output order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn required_columns(&self) -> &[String] {
        &self.required_columns
    }

    pub fn header_row(&self) -> usize {
        self.header_row
    }

    pub fn sheet_name(&self) -> Option<&str> {
        self.sheet_name.as_deref()
    }

    pub fn use_first_row_as_headers(&self) -> bool {
        self.use_first_row_as_headers
    }

    pub fn output_suffix(&self) -> &str {
        &self.output_suffix
    }

    /// Semantic type per column, parallel to [`columns`](Self::columns).
    pub fn field_kinds(&self) -> &[FieldKind] {
        &self.kinds
    }

    pub fn rules(&self) -> &TransformRules {
        &self.rules
    }

    /// Configured aliases for one target column.
    pub fn aliases_for(&self, column: &str) -> &[String] {
        self.aliases.get(column).map_or(&[], Vec::as_slice)
    }

    pub fn groups(&self) -> &[IndexedGroup] {
        &self.groups
    }

    /// The group and index a target column belongs to.
    pub fn group_slot(&self, column: &str) -> Option<(&IndexedGroup, usize)> {
        self.groups
            .iter()
            .find_map(|g| g.slot_of(column).map(|n| (g, n)))
    }
}

// =========================================================================
// Routing
// =========================================================================

/// Which kind of route chose a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "rule", rename_all = "snake_case")]
pub enum MatchSource {
    Override,
    /// Named path rule
    Rule(String),
    Detected,
    Default,
}

/// The routing decision for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateMatch {
    pub template_id: String,
    pub source: MatchSource,
    /// Where output for this file belongs
    pub output_folder: String,
}

/// One entry of the ordered routing list.
#[derive(Debug, Clone)]
pub enum Route {
    Override {
        path: String,
        template: String,
    },
    Pattern {
        name: String,
        template: String,
        include: Vec<PathPattern>,
        exclude: Vec<PathPattern>,
        output_folder: Option<String>,
    },
    Detect {
        template: String,
        /// Lower-cased header fragments
        required: Vec<String>,
        column_count: (usize, usize),
    },
    Default {
        template: String,
    },
}

struct FileFacts<'a> {
    path: String,
    headers: Option<&'a [String]>,
}

impl Route {
    /// Template this route selects.
    pub fn template(&self) -> &str {
        match self {
            Route::Override { template, .. }
            | Route::Pattern { template, .. }
            | Route::Detect { template, .. }
            | Route::Default { template } => template,
        }
    }

    fn matches(&self, facts: &FileFacts<'_>) -> bool {
        match self {
            Route::Override { path, .. } => *path == facts.path,
            Route::Pattern {
                include, exclude, ..
            } => {
                include.iter().any(|p| p.matches(&facts.path))
                    && !exclude.iter().any(|p| p.matches(&facts.path))
            }
            Route::Detect {
                required,
                column_count,
                ..
            } => {
                let Some(headers) = facts.headers else {
                    return false;
                };
                let lowered: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
                let has_all = required
                    .iter()
                    .all(|req| lowered.iter().any(|h| h.contains(req.as_str())));
                let count = headers.len();
                has_all && column_count.0 <= count && count <= column_count.1
            }
            Route::Default { .. } => true,
        }
    }

    fn to_match(&self) -> TemplateMatch {
        let template_id = self.template().to_string();
        let (source, folder) = match self {
            Route::Override { .. } => (MatchSource::Override, None),
            Route::Pattern {
                name, output_folder, ..
            } => (MatchSource::Rule(name.clone()), output_folder.clone()),
            Route::Detect { .. } => (MatchSource::Detected, None),
            Route::Default { .. } => (MatchSource::Default, None),
        };
        TemplateMatch {
            output_folder: folder.unwrap_or_else(|| format!("output/{template_id}")),
            template_id,
            source,
        }
    }
}

// =========================================================================
// Catalogue
// =========================================================================

/// A validated, immutable set of templates and routes.
#[derive(Debug, Clone)]
pub struct Catalogue {
    templates: BTreeMap<String, Template>,
    routes: Vec<Route>,
    processing: ProcessingOptions,
}

impl Catalogue {
    /// Validates both documents and builds the catalogue.
    ///
    /// Fails with [`MailsiftError::ConfigValidation`] listing every problem.
    pub fn from_documents(templates: &TemplateCatalogue, routing: &RoutingCatalogue) -> Result<Self> {
        let mut violations = Vec::new();

        if templates.templates.is_empty() {
            violations.push("no templates defined".to_string());
        }

        let mut built = BTreeMap::new();
        for (id, config) in &templates.templates {
            let mapping = templates.column_mappings.get(id);
            if let Some(template) = Template::build(id, config, mapping, &mut violations) {
                built.insert(id.clone(), template);
            }
        }
        for id in templates.column_mappings.keys() {
            if !templates.templates.contains_key(id) {
                violations.push(format!("column mappings given for unknown template '{id}'"));
            }
        }

        let known = |id: &str| templates.templates.contains_key(id);
        let mut routes = Vec::new();

        for (path, template) in &routing.specific_file_overrides.overrides {
            if !known(template) {
                violations.push(format!(
                    "override for '{path}' references unknown template '{template}'"
                ));
            }
            routes.push(Route::Override {
                path: normalize_path(path),
                template: template.clone(),
            });
        }

        for (i, rule) in routing.file_mappings.iter().enumerate() {
            let label = if rule.name.is_empty() {
                format!("#{}", i + 1)
            } else {
                rule.name.clone()
            };
            if !known(&rule.template) {
                violations.push(format!(
                    "routing rule '{label}' references unknown template '{}'",
                    rule.template
                ));
            }
            if rule.input_patterns.is_empty() {
                violations.push(format!("routing rule '{label}' has no input patterns"));
            }
            let include = compile_patterns(&rule.input_patterns, &label, &mut violations);
            let exclude = compile_patterns(&rule.exclude_patterns, &label, &mut violations);
            if rule.enabled {
                routes.push(Route::Pattern {
                    name: label,
                    template: rule.template.clone(),
                    include,
                    exclude,
                    output_folder: rule.output_folder.clone(),
                });
            }
        }

        for rule in &routing.auto_detection.detection_rules {
            let (min, max) = rule.conditions.column_count_range;
            if !known(&rule.template) {
                violations.push(format!(
                    "detection rule references unknown template '{}'",
                    rule.template
                ));
            }
            if min > max {
                violations.push(format!(
                    "detection rule for '{}' has empty column count range [{min}, {max}]",
                    rule.template
                ));
            }
            if routing.auto_detection.enabled {
                routes.push(Route::Detect {
                    template: rule.template.clone(),
                    required: rule
                        .conditions
                        .required_columns
                        .iter()
                        .map(|c| c.to_lowercase())
                        .collect(),
                    column_count: (min, max),
                });
            }
        }

        if let Some(default) = &routing.default_template {
            if !known(default) {
                violations.push(format!("default template '{default}' is not defined"));
            }
            routes.push(Route::Default {
                template: default.clone(),
            });
        }

        if !violations.is_empty() {
            warn!(count = violations.len(), "configuration rejected");
            return Err(MailsiftError::config_validation(violations));
        }

        info!(
            templates = built.len(),
            routes = routes.len(),
            "configuration loaded"
        );
        Ok(Self {
            templates: built,
            routes,
            processing: routing.processing_options.clone(),
        })
    }

    /// Parses and validates both documents from JSON text.
    pub fn from_json_str(templates_json: &str, routing_json: &str) -> Result<Self> {
        let templates: TemplateCatalogue = serde_json::from_str(templates_json)?;
        let routing: RoutingCatalogue = serde_json::from_str(routing_json)?;
        Self::from_documents(&templates, &routing)
    }

    /// Loads `templates_config.json` and `file_mappings.json` from a directory.
    ///
    /// A missing routing file means no routes at all.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let templates_json = fs::read_to_string(dir.join(TEMPLATES_FILE))?;
        let templates: TemplateCatalogue = serde_json::from_str(&templates_json)?;

        let routing_path = dir.join(ROUTING_FILE);
        let routing: RoutingCatalogue = if routing_path.exists() {
            serde_json::from_str(&fs::read_to_string(&routing_path)?)?
        } else {
            warn!(path = %routing_path.display(), "no routing catalogue, every file needs an explicit template");
            RoutingCatalogue::default()
        };

        Self::from_documents(&templates, &routing)
    }

    /// Looks up a template.
    pub fn template(&self, id: &str) -> Result<&Template> {
        self.templates
            .get(id)
            .ok_or_else(|| MailsiftError::unknown_template(id))
    }

    /// Templates ordered by id.
    pub fn templates(&self) -> impl Iterator<Item = &Template> {
        self.templates.values()
    }

    pub fn template_count(&self) -> usize {
        self.templates.len()
    }

    /// The routing list in evaluation order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn processing_options(&self) -> &ProcessingOptions {
        &self.processing
    }

    /// Routes a file by path only (overrides, path rules, default).
    pub fn resolve(&self, path: &str) -> Result<TemplateMatch> {
        self.route(path, None)
    }

    /// Routes a file by path, falling back to header-based detection.
    pub fn resolve_with_headers(&self, path: &str, headers: &[String]) -> Result<TemplateMatch> {
        self.route(path, Some(headers))
    }

    fn route(&self, path: &str, headers: Option<&[String]>) -> Result<TemplateMatch> {
        let facts = FileFacts {
            path: normalize_path(path),
            headers,
        };
        match self.routes.iter().find(|route| route.matches(&facts)) {
            Some(route) => {
                let found = route.to_match();
                info!(path, template = %found.template_id, source = ?found.source, "resolved template");
                Ok(found)
            }
            None => {
                debug!(path, "no route matched");
                Err(MailsiftError::template_not_found(path))
            }
        }
    }
}

fn compile_patterns(sources: &[String], label: &str, violations: &mut Vec<String>) -> Vec<PathPattern> {
    sources
        .iter()
        .filter_map(|source| match PathPattern::compile(source) {
            Ok(p) => Some(p),
            Err(e) => {
                violations.push(format!("routing rule '{label}': {e}"));
                None
            }
        })
        .collect()
}

// =========================================================================
// SchemaRegistry
// =========================================================================

/// Process-wide holder of the current [`Catalogue`].
#[derive(Debug)]
pub struct SchemaRegistry {
    current: RwLock<Arc<Catalogue>>,
}

impl SchemaRegistry {
    /// Wraps an already-validated catalogue.
    pub fn new(catalogue: Catalogue) -> Self {
        Self {
            current: RwLock::new(Arc::new(catalogue)),
        }
    }

    /// Validates both JSON documents and wraps the result.
    pub fn load(templates_json: &str, routing_json: &str) -> Result<Self> {
        Catalogue::from_json_str(templates_json, routing_json).map(Self::new)
    }

    /// Loads a config directory.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Catalogue::from_dir(dir).map(Self::new)
    }

    /// The current catalogue. Holders are unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<Catalogue> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swaps in a new catalogue and returns the previous one.
    pub fn reload(&self, catalogue: Catalogue) -> Arc<Catalogue> {
        let next = Arc::new(catalogue);
        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        info!(templates = next.template_count(), "configuration reloaded");
        std::mem::replace(&mut *slot, next)
    }

    /// Re-reads a config directory. On any error the current catalogue stays.
    pub fn reload_from_dir(&self, dir: impl AsRef<Path>) -> Result<Arc<Catalogue>> {
        let catalogue = Catalogue::from_dir(dir)?;
        Ok(self.reload(catalogue))
    }

    /// Routes a file against the current snapshot.
    pub fn resolve_template_for_file(&self, path: &str) -> Result<TemplateMatch> {
        self.snapshot().resolve(path)
    }
}
