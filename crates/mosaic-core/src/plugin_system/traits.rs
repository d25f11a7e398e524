use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::plugin_system::manifest::Manifest;

/// Version of the declaration layout a plugin library exports.
/// Bumped whenever [`PluginDeclaration`] or the [`Plugin`] vtable changes shape.
pub const ABI_VERSION: u32 = 1;

/// Leading word of every [`PluginDeclaration`]; distinguishes a declaration from
/// an unrelated symbol that happens to share the entry symbol's name.
pub const DECLARATION_MAGIC: u64 = 0x4d4f_5341_4943_0d0c;

/// Version of mosaic-core a declaration was compiled against.
pub const CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Capability name every plugin exported with [`export_plugin!`](crate::export_plugin) satisfies.
/// Loaders require it unless configured with a narrower host contract.
pub const BASE_CONTRACT: &str = "mosaic::Plugin";

/// Error type for plugin-side operations
#[derive(Debug, thiserror::Error)]
pub enum PluginError {
    #[error("Plugin initialization error: {0}")]
    InitError(String),
    #[error("Plugin enable error: {0}")]
    EnableError(String),
    #[error("Plugin disable error: {0}")]
    DisableError(String),
}

/// A lifecycle hook the host can run on a loaded plugin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hook {
    Enable,
    Disable,
}

impl Hook {
    pub fn as_str(&self) -> &'static str {
        match self {
            Hook::Enable => "enable",
            Hook::Disable => "disable",
        }
    }

    /// Run this hook on `plugin`
    pub fn run(self, plugin: &mut dyn Plugin) -> Result<(), PluginError> {
        match self {
            Hook::Enable => plugin.enable(),
            Hook::Disable => plugin.disable(),
        }
    }
}

impl fmt::Display for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Core trait that all plugins must implement
pub trait Plugin: Send {
    /// Build the plugin from its manifest and the host's pass-through arguments.
    fn new(manifest: &Manifest, args: &HostArgs) -> Result<Self, PluginError>
    where
        Self: Sized;

    /// Called when the host switches the plugin on. May run many times.
    fn enable(&mut self) -> Result<(), PluginError> {
        Ok(())
    }

    /// Called before the plugin is switched off or reloaded. May run many times.
    fn disable(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

/// A single opaque value handed from the host to every plugin constructor.
pub type HostArg = Arc<dyn Any + Send + Sync>;

/// Ordered pass-through arguments for plugin construction, typically handles
/// to host services.
///
/// Typed lookups compare `TypeId`s, which only match when host and plugin were
/// built from the same compilation of the argument's crate. Dynamically
/// loaded plugins should exchange types defined in mosaic-core or in a shared
/// interface crate.
#[derive(Clone, Default)]
pub struct HostArgs {
    args: Vec<HostArg>,
}

impl HostArgs {
    pub fn new() -> Self {
        Self { args: Vec::new() }
    }

    /// Append a value, builder style
    pub fn with<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.args.push(Arc::new(value));
        self
    }

    /// Append an already shared value
    pub fn push(&mut self, value: HostArg) -> &mut Self {
        self.args.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    /// The raw argument at `index`
    pub fn raw(&self, index: usize) -> Option<&HostArg> {
        self.args.get(index)
    }

    /// The argument at `index`, if it has type `T`
    pub fn get<T: Any>(&self, index: usize) -> Option<&T> {
        self.args.get(index).and_then(|arg| arg.downcast_ref::<T>())
    }

    /// The first argument of type `T`
    pub fn find<T: Any>(&self) -> Option<&T> {
        self.args.iter().find_map(|arg| arg.downcast_ref::<T>())
    }

    pub fn iter(&self) -> impl Iterator<Item = &HostArg> {
        self.args.iter()
    }
}

impl fmt::Debug for HostArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostArgs").field("len", &self.args.len()).finish()
    }
}

/// Builds a boxed plugin instance.
pub type PluginConstructor = fn(&Manifest, &HostArgs) -> Result<Box<dyn Plugin>, PluginError>;

/// What a plugin library exports under its entry symbol.
///
/// The loader inspects every field except `constructor` before anything is
/// constructed, so a library whose declaration does not match the host never
/// runs plugin code.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct PluginDeclaration {
    pub magic: u64,
    pub abi_version: u32,
    pub core_version: &'static str,
    /// Capability names the exported type satisfies
    pub contracts: &'static [&'static str],
    pub constructor: PluginConstructor,
}

impl PluginDeclaration {
    pub const fn new(contracts: &'static [&'static str], constructor: PluginConstructor) -> Self {
        Self {
            magic: DECLARATION_MAGIC,
            abi_version: ABI_VERSION,
            core_version: CORE_VERSION,
            contracts,
            constructor,
        }
    }

    /// Declaration for `T` satisfying only the base contract
    pub fn of<T: Plugin + 'static>() -> Self {
        Self::new(&[BASE_CONTRACT], construct::<T>)
    }

    pub fn satisfies(&self, contract: &str) -> bool {
        self.contracts.iter().any(|c| *c == contract)
    }
}

impl fmt::Debug for PluginDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDeclaration")
            .field("magic", &format_args!("{:#x}", self.magic))
            .field("abi_version", &self.abi_version)
            .field("core_version", &self.core_version)
            .field("contracts", &self.contracts)
            .finish_non_exhaustive()
    }
}

/// Generic constructor used by [`export_plugin!`](crate::export_plugin).
pub fn construct<T: Plugin + 'static>(manifest: &Manifest, args: &HostArgs) -> Result<Box<dyn Plugin>, PluginError> {
    T::new(manifest, args).map(|plugin| Box::new(plugin) as Box<dyn Plugin>)
}

/// Export a [`Plugin`] type from a `cdylib` so the dynamic loader can find it.
///
/// ```ignore
/// mosaic_core::export_plugin!(MyPlugin);
/// mosaic_core::export_plugin!(MyPlugin, symbol = Greeter);
/// mosaic_core::export_plugin!(MyPlugin, symbol = Plugin, contracts = [mosaic_core::BASE_CONTRACT, "host::Chat"]);
/// ```
///
/// The symbol name must match the manifest's `entry_symbol` (default `Plugin`).
#[macro_export]
macro_rules! export_plugin {
    ($plugin:ty) => {
        $crate::export_plugin!($plugin, symbol = Plugin);
    };
    ($plugin:ty, symbol = $symbol:ident) => {
        $crate::export_plugin!($plugin, symbol = $symbol, contracts = [$crate::BASE_CONTRACT]);
    };
    ($plugin:ty, symbol = $symbol:ident, contracts = [$($contract:expr),+ $(,)?]) => {
        #[unsafe(no_mangle)]
        #[allow(non_upper_case_globals)]
        pub static $symbol: $crate::plugin_system::traits::PluginDeclaration =
            $crate::plugin_system::traits::PluginDeclaration::new(
                &[$($contract),+],
                $crate::plugin_system::traits::construct::<$plugin>,
            );
    };
}
