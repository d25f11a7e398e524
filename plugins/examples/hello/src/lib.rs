//! Minimal dynamically loaded plugin.
//!
//! Build with `cargo build -p hello-plugin`, then place the library next to
//! `plugin.toml` in a plugin directory and run `mosaic --plugin-dir <root> run`.
use mosaic_core::{HostArgs, Manifest, Plugin, PluginError};

pub struct HelloPlugin {
    name: String,
    greeting: String,
}

impl Plugin for HelloPlugin {
    fn new(manifest: &Manifest, args: &HostArgs) -> Result<Self, PluginError> {
        let greeting = args.find::<String>().cloned().unwrap_or_else(|| "Hello".to_string());
        Ok(Self {
            name: manifest.name.clone(),
            greeting,
        })
    }

    fn enable(&mut self) -> Result<(), PluginError> {
        println!("{}, from the {} plugin!", self.greeting, self.name);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), PluginError> {
        println!("{} plugin says goodbye.", self.name);
        Ok(())
    }
}

mosaic_core::export_plugin!(HelloPlugin);
