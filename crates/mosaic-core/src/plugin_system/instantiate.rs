use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use semver::{Version, VersionReq};

use crate::plugin_system::error::{PluginSystemError, Result};
use crate::plugin_system::loader::LoadedUnit;
use crate::plugin_system::manifest::Manifest;
use crate::plugin_system::traits::{ABI_VERSION, CORE_VERSION, DECLARATION_MAGIC, HostArgs, Plugin, PluginDeclaration};

/// Look up the manifest's entry symbol in `unit`, check it against
/// `base_contract` and construct the plugin.
///
/// The declaration is fully validated before its constructor runs. Errors and
/// panics raised by the constructor come back as
/// [`PluginSystemError::Construction`].
pub fn instantiate(
    unit: &dyn LoadedUnit,
    manifest: &Manifest,
    base_contract: &str,
    args: &HostArgs,
) -> Result<Box<dyn Plugin>> {
    let declaration = unit
        .symbol(&manifest.entry_symbol)
        .ok_or_else(|| PluginSystemError::SymbolNotFound {
            plugin_id: manifest.id.clone(),
            symbol: manifest.entry_symbol.clone(),
        })?;

    verify_declaration(declaration, manifest, base_contract)?;

    let constructor = declaration.constructor;
    match panic::catch_unwind(AssertUnwindSafe(|| constructor(manifest, args))) {
        Ok(Ok(plugin)) => Ok(plugin),
        Ok(Err(e)) => Err(PluginSystemError::Construction {
            plugin_id: manifest.id.clone(),
            message: e.to_string(),
            source: Some(e),
        }),
        Err(panic_obj) => Err(PluginSystemError::Construction {
            plugin_id: manifest.id.clone(),
            message: format!("panic: {}", panic_message(panic_obj.as_ref())),
            source: None,
        }),
    }
}

/// Check that a declaration satisfies the host's base contract
pub fn verify_declaration(declaration: &PluginDeclaration, manifest: &Manifest, base_contract: &str) -> Result<()> {
    let invalid = |message: String| PluginSystemError::InvalidBaseclass {
        plugin_id: manifest.id.clone(),
        symbol: manifest.entry_symbol.clone(),
        message,
    };

    if declaration.magic != DECLARATION_MAGIC {
        return Err(invalid("symbol is not a plugin declaration".to_string()));
    }
    if declaration.abi_version != ABI_VERSION {
        return Err(invalid(format!(
            "declaration ABI version {} does not match host ABI version {}",
            declaration.abi_version, ABI_VERSION
        )));
    }
    if !core_version_compatible(declaration.core_version) {
        return Err(invalid(format!(
            "built against mosaic-core {} which is incompatible with host mosaic-core {}",
            declaration.core_version, CORE_VERSION
        )));
    }
    if !declaration.satisfies(base_contract) {
        return Err(invalid(format!(
            "declared contracts [{}] do not include '{}'",
            declaration.contracts.join(", "),
            base_contract
        )));
    }
    Ok(())
}

/// Whether a plugin built against mosaic-core `plugin_core` can run in this host,
/// using the caret rule from the plugin's side.
pub fn core_version_compatible(plugin_core: &str) -> bool {
    let (Ok(host), Ok(req)) = (Version::parse(CORE_VERSION), VersionReq::parse(&format!("^{}", plugin_core))) else {
        return false;
    };
    Version::parse(plugin_core).is_ok() && req.matches(&host)
}

pub(crate) fn panic_message(panic_obj: &(dyn Any + Send)) -> String {
    if let Some(s_ref) = panic_obj.downcast_ref::<&'static str>() {
        (*s_ref).to_string()
    } else if let Some(s_obj) = panic_obj.downcast_ref::<String>() {
        s_obj.clone()
    } else {
        "Unknown panic reason".to_string()
    }
}
