use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::plugin_system::error::{PluginSystemError, Result};

/// Default entry symbol looked up inside a plugin library
pub const DEFAULT_ENTRY_SYMBOL: &str = "Plugin";

/// Manifest file names tried inside each plugin directory, in order.
pub fn manifest_file_names() -> Vec<&'static str> {
    let mut names = Vec::new();
    #[cfg(feature = "toml-manifest")]
    names.push("plugin.toml");
    names.push("plugin.json");
    #[cfg(feature = "yaml-manifest")]
    names.extend(["plugin.yaml", "plugin.yml"]);
    names
}

/// Supported structured-data formats for manifests and loader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-manifest" feature
    #[cfg(feature = "yaml-manifest")]
    Yaml,
    /// TOML format (.toml) - requires "toml-manifest" feature
    #[cfg(feature = "toml-manifest")]
    Toml,
}

impl ManifestFormat {
    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ManifestFormat::Json),
                #[cfg(feature = "yaml-manifest")]
                "yaml" | "yml" => Some(ManifestFormat::Yaml),
                #[cfg(feature = "toml-manifest")]
                "toml" => Some(ManifestFormat::Toml),
                _ => None,
            })
    }

    pub fn name(&self) -> &'static str {
        match self {
            ManifestFormat::Json => "JSON",
            #[cfg(feature = "yaml-manifest")]
            ManifestFormat::Yaml => "YAML",
            #[cfg(feature = "toml-manifest")]
            ManifestFormat::Toml => "TOML",
        }
    }

    /// Deserialize `content` in this format
    pub fn parse<T: DeserializeOwned>(
        &self,
        content: &str,
    ) -> std::result::Result<T, Box<dyn std::error::Error + Send + Sync>> {
        match self {
            ManifestFormat::Json => Ok(serde_json::from_str(content)?),
            #[cfg(feature = "yaml-manifest")]
            ManifestFormat::Yaml => Ok(serde_yaml::from_str(content)?),
            #[cfg(feature = "toml-manifest")]
            ManifestFormat::Toml => Ok(toml::from_str(content)?),
        }
    }
}

// --- Intermediate struct for deserialization ---

#[derive(Deserialize, Debug, Default)]
struct RawManifest {
    id: Option<String>,
    name: Option<String>,
    version: Option<String>,
    description: Option<String>,
    author: Option<String>,
    #[serde(default)]
    dependencies: Vec<String>,
    #[serde(alias = "main_file")]
    entry_file: Option<String>,
    #[serde(alias = "main_class")]
    entry_symbol: Option<String>,
    module_name: Option<String>,
    /// Manifests may nest fields under a `meta` table; those win over top-level ones
    meta: Option<Box<RawManifest>>,
}

impl RawManifest {
    /// Fold the `meta` table into the top level
    fn flatten(mut self) -> Self {
        let Some(meta) = self.meta.take() else {
            return self;
        };
        let meta = (*meta).flatten();
        Self {
            id: meta.id.or(self.id),
            name: meta.name.or(self.name),
            version: meta.version.or(self.version),
            description: meta.description.or(self.description),
            author: meta.author.or(self.author),
            dependencies: if meta.dependencies.is_empty() { self.dependencies } else { meta.dependencies },
            entry_file: meta.entry_file.or(self.entry_file),
            entry_symbol: meta.entry_symbol.or(self.entry_symbol),
            module_name: meta.module_name.or(self.module_name),
            meta: None,
        }
    }
}

/// Identity and load instructions for one plugin
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Manifest {
    /// Unique identifier for the plugin
    pub id: String,

    /// Human-readable name
    pub name: String,

    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,

    /// Plugin ids that must be loaded first, in declaration order
    pub dependencies: Vec<String>,

    /// Library file relative to `source_path`
    pub entry_file: String,

    /// Exported declaration to instantiate
    pub entry_symbol: String,

    /// Identifier handed to the code loader
    pub module_name: String,

    /// Directory the manifest was discovered in. Set by the loader.
    pub source_path: PathBuf,
}

impl Manifest {
    /// Create a manifest with defaults derived from `id`
    pub fn new(id: &str) -> Self {
        let module_name = module_identifier(id);
        Self {
            id: id.to_string(),
            name: id.to_string(),
            version: None,
            description: None,
            author: None,
            dependencies: Vec::new(),
            entry_file: default_entry_file(&module_name),
            entry_symbol: DEFAULT_ENTRY_SYMBOL.to_string(),
            module_name,
            source_path: PathBuf::new(),
        }
    }

    /// Locate the manifest file inside a plugin directory
    pub fn find_file(dir: &Path) -> Option<PathBuf> {
        manifest_file_names()
            .into_iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.is_file())
    }

    /// Read and parse the manifest of the plugin directory `dir`
    pub fn load_from_dir(dir: &Path) -> Result<Self> {
        let path = Self::find_file(dir).ok_or_else(|| PluginSystemError::ManifestParse {
            path: dir.to_path_buf(),
            message: format!("no manifest file found (looked for {})", manifest_file_names().join(", ")),
            source: None,
        })?;
        let mut manifest = Self::load_from_file(&path)?;
        manifest.source_path = dir.to_path_buf();
        Ok(manifest)
    }

    /// Parse a manifest file; `source_path` is set to the file's directory
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let format = ManifestFormat::from_path(path).ok_or_else(|| PluginSystemError::ManifestParse {
            path: path.to_path_buf(),
            message: "unsupported manifest format".to_string(),
            source: None,
        })?;
        let content = fs::read_to_string(path).map_err(|e| PluginSystemError::ManifestParse {
            path: path.to_path_buf(),
            message: format!("failed to read manifest: {}", e),
            source: Some(Box::new(e)),
        })?;
        let mut manifest = Self::parse(&content, format).map_err(|e| match e {
            PluginSystemError::ManifestParse { message, source, .. } => PluginSystemError::ManifestParse {
                path: path.to_path_buf(),
                message,
                source,
            },
            other => other,
        })?;
        manifest.source_path = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(manifest)
    }

    /// Parse manifest text. `source_path` is left empty.
    pub fn parse(content: &str, format: ManifestFormat) -> Result<Self> {
        let raw: RawManifest = format.parse(content).map_err(|e| PluginSystemError::ManifestParse {
            path: PathBuf::new(),
            message: format!("failed to parse {} manifest: {}", format.name(), e),
            source: Some(e),
        })?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawManifest) -> Result<Self> {
        let raw = raw.flatten();
        let id = raw.id.filter(|id| !id.trim().is_empty()).ok_or_else(|| PluginSystemError::ManifestParse {
            path: PathBuf::new(),
            message: "manifest is missing a non-empty 'id'".to_string(),
            source: None,
        })?;
        let module_name = raw.module_name.unwrap_or_else(|| module_identifier(&id));
        Ok(Self {
            name: raw.name.unwrap_or_else(|| id.clone()),
            version: raw.version,
            description: raw.description,
            author: raw.author,
            dependencies: raw.dependencies,
            entry_file: raw.entry_file.unwrap_or_else(|| default_entry_file(&module_name)),
            entry_symbol: raw.entry_symbol.unwrap_or_else(|| DEFAULT_ENTRY_SYMBOL.to_string()),
            module_name,
            source_path: PathBuf::new(),
            id,
        })
    }

    /// Absolute path of the library to load
    pub fn entry_path(&self) -> PathBuf {
        self.source_path.join(&self.entry_file)
    }

    /// Whether `entry_file` stays inside the plugin directory
    pub fn entry_file_is_contained(&self) -> bool {
        let entry = Path::new(&self.entry_file);
        !entry.is_absolute()
            && !entry
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
    }

    pub fn error_log_path(&self) -> PathBuf {
        self.source_path.join("error.log")
    }
}

/// `id` with every non-alphanumeric character replaced by `_`
pub fn module_identifier(id: &str) -> String {
    id.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}

/// Platform library file name for a module, e.g. `libfoo.so`
pub fn default_entry_file(module_name: &str) -> String {
    format!(
        "{}{}{}",
        std::env::consts::DLL_PREFIX,
        module_name,
        std::env::consts::DLL_SUFFIX
    )
}

/// Builder for creating a manifest
pub struct ManifestBuilder {
    manifest: Manifest,
}

impl ManifestBuilder {
    pub fn new(id: &str) -> Self {
        Self { manifest: Manifest::new(id) }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.manifest.name = name.to_string();
        self
    }

    pub fn version(mut self, version: &str) -> Self {
        self.manifest.version = Some(version.to_string());
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.manifest.description = Some(description.to_string());
        self
    }

    pub fn author(mut self, author: &str) -> Self {
        self.manifest.author = Some(author.to_string());
        self
    }

    pub fn dependency(mut self, id: &str) -> Self {
        self.manifest.dependencies.push(id.to_string());
        self
    }

    pub fn entry_file(mut self, entry_file: &str) -> Self {
        self.manifest.entry_file = entry_file.to_string();
        self
    }

    pub fn entry_symbol(mut self, entry_symbol: &str) -> Self {
        self.manifest.entry_symbol = entry_symbol.to_string();
        self
    }

    pub fn source_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.manifest.source_path = path.as_ref().to_path_buf();
        self
    }

    pub fn build(self) -> Manifest {
        self.manifest
    }
}
