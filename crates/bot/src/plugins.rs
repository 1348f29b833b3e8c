use std::{collections::HashMap, sync::Arc};

use plugin_core::{Plugin, PluginRegistry, PluginSpec};
use tracing::{info, warn};

/// Built-ins compiled into the binary.
fn builtin_plugins(owner: Option<&str>) -> HashMap<&'static str, Arc<dyn Plugin>> {
    let plugins: [Arc<dyn Plugin>; 5] = [
        Arc::new(plugin_about::About::new(
            env!("CARGO_PKG_VERSION"),
            owner.map(str::to_owned),
        )),
        Arc::new(plugin_roll::Roll),
        Arc::new(plugin_help::Help),
        Arc::new(plugin_reload::Reload),
        Arc::new(plugin_ping::Ping),
    ];
    plugins.into_iter().map(|p| (p.id(), p)).collect()
}

/// Registers every enabled built-in. `configured` may add command aliases to
/// a plugin's defaults or disable it.
pub(crate) fn build_registry(
    configured: &[PluginSpec],
    owner: Option<&str>,
) -> Arc<PluginRegistry> {
    let plugins = builtin_plugins(owner);

    let mut specs = configured.to_vec();
    let mut ids: Vec<&&str> = plugins.keys().collect();
    ids.sort_unstable();
    for id in ids {
        if let Some(p) = plugins.get(*id) {
            merge_default_spec(&mut specs, p.spec());
        }
    }

    let mut registry = PluginRegistry::new();
    for spec in specs {
        let Some(plugin) = plugins.get(spec.id.as_str()) else {
            warn!("Unknown plugin ID: {}", spec.id);
            continue;
        };
        if !spec.enabled {
            info!(plugin = %spec.id, "Plugin disabled");
            continue;
        }
        registry.register(spec, Arc::clone(plugin));
    }
    Arc::new(registry)
}

fn merge_default_spec(specs: &mut Vec<PluginSpec>, default: PluginSpec) {
    if let Some(existing) = specs.iter_mut().find(|s| s.id == default.id) {
        for cmd in default.triggers.commands {
            if !existing
                .triggers
                .commands
                .iter()
                .any(|c| c.eq_ignore_ascii_case(&cmd))
            {
                existing.triggers.commands.push(cmd);
            }
        }
    } else {
        specs.push(default);
    }
}
