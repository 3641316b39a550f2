//! Configuration document types.
//!
//! Two JSON documents drive the ingestion side:
//!
//! - [`TemplateCatalogue`] (`templates_config.json`) - target templates, their
//!   transform rules and per-template column alias tables
//! - [`RoutingCatalogue`] (`file_mappings.json`) - which template applies to
//!   which input file
//!
//! These are plain serde shapes. They are turned into a validated
//! [`Catalogue`](crate::ingest::Catalogue) before anything resolves against them.
//!
//! # Example
//!
//! ```rust
//! use mailsift::config::{FileMapping, RoutingCatalogue, TemplateCatalogue, TemplateConfig};
//!
//! let templates = TemplateCatalogue::new()
//!     .with_template("standard", TemplateConfig::new("Standard", ["Reference", "Surname"]));
//!
//! let routing = RoutingCatalogue::new()
//!     .with_rule(FileMapping::new("batch", "standard").with_input_pattern("data/*.csv"))
//!     .with_default_template("standard");
//!
//! assert_eq!(templates.templates.len(), 1);
//! assert_eq!(routing.file_mappings[0].template, "standard");
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::ingest::transform::FieldKind;

/// File name of the template catalogue inside a config directory.
pub const TEMPLATES_FILE: &str = "templates_config.json";

/// File name of the routing catalogue inside a config directory.
pub const ROUTING_FILE: &str = "file_mappings.json";

fn yes() -> bool {
    true
}

fn default_max_index() -> usize {
    5
}

fn default_column_count_range() -> (usize, usize) {
    (0, 1000)
}

// =========================================================================
// Template catalogue
// =========================================================================

/// The template catalogue document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateCatalogue {
    #[serde(default)]
    pub version: String,

    /// Template id to definition
    #[serde(default)]
    pub templates: BTreeMap<String, TemplateConfig>,

    /// Template id to column alias rules
    #[serde(default)]
    pub column_mappings: BTreeMap<String, ColumnMappingConfig>,
}

impl TemplateCatalogue {
    /// Creates an empty catalogue.
    pub fn new() -> Self {
        Self {
            version: "1.0".to_string(),
            ..Self::default()
        }
    }

    /// Builder method to add a template.
    #[must_use]
    pub fn with_template(mut self, id: impl Into<String>, template: TemplateConfig) -> Self {
        self.templates.insert(id.into(), template);
        self
    }

    /// Builder method to add column alias rules for a template.
    #[must_use]
    pub fn with_column_mapping(mut self, id: impl Into<String>, mapping: ColumnMappingConfig) -> Self {
        self.column_mappings.insert(id.into(), mapping);
        self
    }
}

/// One target template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateConfig {
    /// Display name
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Target columns; their order is the output column order
    #[serde(default)]
    pub columns: Vec<String>,

    /// Columns whose empty values are reported per row
    #[serde(default)]
    pub required_columns: Vec<String>,

    /// Zero-based row holding the headers in the source file
    #[serde(default)]
    pub header_row: usize,

    /// Sheet to read from workbook sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_name: Option<String>,

    /// Take header names from the first data row
    #[serde(default)]
    pub use_first_row_as_headers: bool,

    /// Appended to output file stems
    #[serde(default)]
    pub output_suffix: String,

    /// Explicit semantic types; other columns are inferred from their names
    #[serde(default)]
    pub field_types: BTreeMap<String, FieldKind>,

    #[serde(default)]
    pub data_transformations: TransformConfig,
}

impl TemplateConfig {
    /// Creates a template with a display name and target columns.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Builder method to set required columns.
    #[must_use]
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to pin the semantic type of one column.
    #[must_use]
    pub fn with_field_type(mut self, column: impl Into<String>, kind: FieldKind) -> Self {
        self.field_types.insert(column.into(), kind);
        self
    }

    /// Builder method to set transform rules.
    #[must_use]
    pub fn with_transformations(mut self, transformations: TransformConfig) -> Self {
        self.data_transformations = transformations;
        self
    }

    /// Builder method to set the header row index.
    #[must_use]
    pub fn with_header_row(mut self, row: usize) -> Self {
        self.header_row = row;
        self
    }

    /// Builder method to enable first-row header promotion.
    #[must_use]
    pub fn with_first_row_as_headers(mut self, enabled: bool) -> Self {
        self.use_first_row_as_headers = enabled;
        self
    }
}

/// Letter-case rule for name and postcode values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseRule {
    Title,
    Upper,
    Lower,
}

/// Per-template value transformation rules.
///
/// A missing rule means values of that semantic type pass through unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// `DD/MM/YYYY`, `YYYY-MM-DD`, `MM/DD/YYYY` or a chrono strftime pattern
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,

    /// Upper-cased source value to standardized value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender_standardization: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_case: Option<CaseRule>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postcode_case: Option<CaseRule>,
}

impl TransformConfig {
    /// Rules used by the bundled templates: day-first UK dates, M/F table,
    /// title-case names, upper-case postcodes.
    pub fn standard() -> Self {
        let genders = [("M", "Male"), ("F", "Female"), ("MALE", "Male"), ("FEMALE", "Female")]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            date_format: Some("DD/MM/YYYY".to_string()),
            gender_standardization: Some(genders),
            name_case: Some(CaseRule::Title),
            postcode_case: Some(CaseRule::Upper),
        }
    }

    /// Builder method to set the output date format.
    #[must_use]
    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = Some(format.into());
        self
    }
}

/// Alias rules for one template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMappingConfig {
    /// Target column to acceptable source headers, optionally nested in
    /// named groups
    #[serde(default)]
    pub aliases: BTreeMap<String, AliasEntry>,

    /// Rules for numbered repeating groups
    #[serde(default)]
    pub indexed_patterns: Vec<IndexedPatternConfig>,
}

impl ColumnMappingConfig {
    /// Creates empty alias rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to add aliases for one target column.
    #[must_use]
    pub fn with_aliases<I, S>(mut self, target: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = aliases.into_iter().map(Into::into).collect();
        self.aliases.insert(target.into(), AliasEntry::List(list));
        self
    }

    /// Builder method to add an indexed pattern rule.
    #[must_use]
    pub fn with_indexed_pattern(mut self, rule: IndexedPatternConfig) -> Self {
        self.indexed_patterns.push(rule);
        self
    }

    /// Flattens nested alias groups into target column to alias list.
    ///
    /// ```
    /// use mailsift::config::ColumnMappingConfig;
    ///
    /// let json = r#"{"aliases": {"Surname": ["last_name"], "dependants": {"Forename": ["first_name"]}}}"#;
    /// let mapping: ColumnMappingConfig = serde_json::from_str(json).unwrap();
    /// let flat = mapping.flattened_aliases();
    ///
    /// assert_eq!(flat["Surname"], ["last_name"]);
    /// assert_eq!(flat["Forename"], ["first_name"]);
    /// ```
    pub fn flattened_aliases(&self) -> BTreeMap<String, Vec<String>> {
        fn walk(entries: &BTreeMap<String, AliasEntry>, out: &mut BTreeMap<String, Vec<String>>) {
            for (key, entry) in entries {
                match entry {
                    AliasEntry::List(list) => {
                        out.insert(key.clone(), list.clone());
                    }
                    AliasEntry::Group(group) => walk(group, out),
                }
            }
        }

        let mut out = BTreeMap::new();
        walk(&self.aliases, &mut out);
        out
    }
}

/// Either an alias list or a named group of further entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasEntry {
    List(Vec<String>),
    Group(BTreeMap<String, AliasEntry>),
}

/// A numbered repeating column group such as `Child {n} Forename`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedPatternConfig {
    /// Target column template; `{n}` stands for the index
    pub target: String,

    /// Regexes over normalized source headers; group 1 captures the index
    #[serde(default)]
    pub patterns: Vec<String>,

    /// Highest index bound; larger indices are ignored
    #[serde(default = "default_max_index")]
    pub max_index: usize,
}

impl IndexedPatternConfig {
    /// Creates a rule with the default cap of 5.
    pub fn new<I, S>(target: impl Into<String>, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target: target.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            max_index: default_max_index(),
        }
    }

    /// Builder method to set the index cap.
    #[must_use]
    pub fn with_max_index(mut self, max: usize) -> Self {
        self.max_index = max;
        self
    }
}

// =========================================================================
// Routing catalogue
// =========================================================================

/// The routing catalogue document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RoutingCatalogue {
    /// Template used when nothing else matches
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_template: Option<String>,

    /// Path rules in precedence order
    #[serde(default)]
    pub file_mappings: Vec<FileMapping>,

    #[serde(default)]
    pub specific_file_overrides: OverrideTable,

    #[serde(default)]
    pub auto_detection: AutoDetection,

    #[serde(default)]
    pub processing_options: ProcessingOptions,
}

impl RoutingCatalogue {
    /// Creates an empty routing catalogue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to append a path rule.
    #[must_use]
    pub fn with_rule(mut self, rule: FileMapping) -> Self {
        self.file_mappings.push(rule);
        self
    }

    /// Builder method to pin one path to a template.
    #[must_use]
    pub fn with_override(mut self, path: impl Into<String>, template: impl Into<String>) -> Self {
        self.specific_file_overrides
            .overrides
            .insert(path.into(), template.into());
        self
    }

    /// Builder method to append an auto-detection rule and enable detection.
    #[must_use]
    pub fn with_detection_rule(mut self, rule: DetectionRule) -> Self {
        self.auto_detection.enabled = true;
        self.auto_detection.detection_rules.push(rule);
        self
    }

    /// Builder method to set the fallback template.
    #[must_use]
    pub fn with_default_template(mut self, template: impl Into<String>) -> Self {
        self.default_template = Some(template.into());
        self
    }

    /// Builder method to set whether a batch keeps going after a failed file.
    #[must_use]
    pub fn with_continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.processing_options.continue_on_error = continue_on_error;
        self
    }
}

/// A path-based routing rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Target template id
    pub template: String,

    /// Glob patterns (or literal substrings) the path must match
    #[serde(default)]
    pub input_patterns: Vec<String>,

    /// Glob patterns that veto a match
    #[serde(default)]
    pub exclude_patterns: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_folder: Option<String>,

    #[serde(default = "yes")]
    pub enabled: bool,
}

impl FileMapping {
    /// Creates an enabled rule with no patterns.
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            template: template.into(),
            input_patterns: Vec::new(),
            exclude_patterns: Vec::new(),
            output_folder: None,
            enabled: true,
        }
    }

    /// Builder method to add an include pattern.
    #[must_use]
    pub fn with_input_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.input_patterns.push(pattern.into());
        self
    }

    /// Builder method to add an exclude pattern.
    #[must_use]
    pub fn with_exclude_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Builder method to set the output folder.
    #[must_use]
    pub fn with_output_folder(mut self, folder: impl Into<String>) -> Self {
        self.output_folder = Some(folder.into());
        self
    }

    /// Builder method to enable or disable the rule.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Explicit per-file template pins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideTable {
    /// Path to template id
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,
}

/// Structural template detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDetection {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub detection_rules: Vec<DetectionRule>,
}

/// Chooses a template from a file's headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionRule {
    pub template: String,

    #[serde(default)]
    pub conditions: DetectionConditions,
}

impl DetectionRule {
    /// Creates a rule with unconstrained conditions.
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
            conditions: DetectionConditions::default(),
        }
    }

    /// Builder method to require header fragments.
    #[must_use]
    pub fn with_required_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conditions.required_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Builder method to bound the header count (inclusive).
    #[must_use]
    pub fn with_column_count_range(mut self, min: usize, max: usize) -> Self {
        self.conditions.column_count_range = (min, max);
        self
    }
}

/// Conditions of a [`DetectionRule`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConditions {
    /// Each must occur (case-insensitively) inside some header
    #[serde(default)]
    pub required_columns: Vec<String>,

    /// Inclusive `[min, max]` header count
    #[serde(default = "default_column_count_range")]
    pub column_count_range: (usize, usize),
}

impl Default for DetectionConditions {
    fn default() -> Self {
        Self {
            required_columns: Vec::new(),
            column_count_range: default_column_count_range(),
        }
    }
}

/// Batch behavior switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingOptions {
    /// Keep going after a file fails
    #[serde(default = "yes")]
    pub continue_on_error: bool,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_config_defaults() {
        let config: TemplateConfig = serde_json::from_str(r#"{"columns": ["A"]}"#).unwrap();
        assert_eq!(config.columns, vec!["A"]);
        assert_eq!(config.header_row, 0);
        assert!(!config.use_first_row_as_headers);
        assert!(config.data_transformations.date_format.is_none());
        assert!(config.field_types.is_empty());
    }

    #[test]
    fn test_template_config_builder() {
        let config = TemplateConfig::new("Standard", ["Surname", "Dob"])
            .with_required_columns(["Surname"])
            .with_field_type("Dob", FieldKind::Date)
            .with_header_row(2)
            .with_first_row_as_headers(true)
            .with_transformations(TransformConfig::standard());

        assert_eq!(config.required_columns, vec!["Surname"]);
        assert_eq!(config.field_types["Dob"], FieldKind::Date);
        assert_eq!(config.header_row, 2);
        assert!(config.use_first_row_as_headers);
        assert_eq!(config.data_transformations.name_case, Some(CaseRule::Title));
    }

    #[test]
    fn test_transform_config_parse() {
        let json = r#"{"date_format": "YYYY-MM-DD", "gender_standardization": {"M": "Male"}, "postcode_case": "upper"}"#;
        let config: TransformConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.date_format.as_deref(), Some("YYYY-MM-DD"));
        assert_eq!(config.gender_standardization.unwrap()["M"], "Male");
        assert_eq!(config.postcode_case, Some(CaseRule::Upper));
        assert!(config.name_case.is_none());
    }

    #[test]
    fn test_nested_alias_groups_flatten() {
        let json = r#"{
            "aliases": {
                "Reference": ["Ref", "Policy Number"],
                "member": {"Surname": ["last_name"], "contact": {"Postcode": ["zip"]}}
            },
            "indexed_patterns": [{"target": "Child {n} Forename", "patterns": ["child\\s*(\\d+)\\s*forename"]}]
        }"#;
        let mapping: ColumnMappingConfig = serde_json::from_str(json).unwrap();
        let flat = mapping.flattened_aliases();

        assert_eq!(flat.len(), 3);
        assert_eq!(flat["Postcode"], vec!["zip"]);
        assert_eq!(mapping.indexed_patterns[0].max_index, 5);
    }

    #[test]
    fn test_routing_catalogue_parse() {
        let json = r#"{
            "default_template": "standard",
            "file_mappings": [
                {"name": "batch", "template": "standard", "input_patterns": ["data/*.csv"]},
                {"name": "off", "template": "other", "enabled": false}
            ],
            "specific_file_overrides": {"overrides": {"data/special.csv": "template_2"}},
            "auto_detection": {
                "enabled": true,
                "detection_rules": [{"template": "template_2", "conditions": {"required_columns": ["membership"], "column_count_range": [5, 200]}}]
            }
        }"#;
        let routing: RoutingCatalogue = serde_json::from_str(json).unwrap();

        assert_eq!(routing.default_template.as_deref(), Some("standard"));
        assert!(routing.file_mappings[0].enabled);
        assert!(!routing.file_mappings[1].enabled);
        assert_eq!(routing.specific_file_overrides.overrides["data/special.csv"], "template_2");
        assert_eq!(routing.auto_detection.detection_rules[0].conditions.column_count_range, (5, 200));
        assert!(routing.processing_options.continue_on_error);
    }

    #[test]
    fn test_detection_conditions_default_range() {
        let rule: DetectionRule = serde_json::from_str(r#"{"template": "t"}"#).unwrap();
        assert_eq!(rule.conditions.column_count_range, (0, 1000));
        assert!(rule.conditions.required_columns.is_empty());
    }

    #[test]
    fn test_routing_builder() {
        let routing = RoutingCatalogue::new()
            .with_rule(
                FileMapping::new("batch", "standard")
                    .with_input_pattern("data/*.csv")
                    .with_exclude_pattern("data/tmp_*")
                    .with_output_folder("out/batch"),
            )
            .with_override("data/special.csv", "template_2")
            .with_detection_rule(DetectionRule::new("template_2").with_column_count_range(1, 3));

        assert!(routing.auto_detection.enabled);
        assert_eq!(routing.file_mappings[0].output_folder.as_deref(), Some("out/batch"));
        assert_eq!(routing.specific_file_overrides.overrides.len(), 1);
    }
}
