//! Plugin registries for the lumen LED video server.
//!
//! The original dynamic plugins directory is replaced by compile-time
//! registries: every built-in plugin registers an id, a descriptor with
//! its parameter schema, and a boxed factory. The control surface
//! validates ids and parameter values against the registry before any
//! clip state changes; the playback engine instantiates plugins through
//! the same factories.
//!
//! # Example
//!
//! ```rust
//! use lumen_registry::EffectRegistry;
//!
//! let registry = EffectRegistry::new();
//! for effect in registry.all() {
//!     println!("{}: {}", effect.id, effect.description);
//! }
//!
//! let mut brightness = registry.create("brightness").expect("built-in");
//! ```

use lumen_core::{Generator, ParamDescriptor, PixelEffect, Transition};
use lumen_effects::{
    Brightness, Colorize, Contrast, Dissolve, Fade, Gamma, Gradient, HueRotate, Invert, Mirror,
    Pixelate, Plasma, Saturation, Scan, Slide, Solid, Strobe, Wipe,
};

/// Describes a registered plugin.
#[derive(Debug, Clone, Copy)]
pub struct PluginDescriptor {
    /// Unique identifier (lowercase, no spaces).
    pub id: &'static str,
    /// Human-readable name.
    pub name: &'static str,
    /// Brief description.
    pub description: &'static str,
    /// Declared parameter schema.
    pub params: &'static [ParamDescriptor],
}

impl PluginDescriptor {
    /// Look up one of this plugin's parameter descriptors by name.
    pub fn param(&self, name: &str) -> Option<&'static ParamDescriptor> {
        self.params.iter().find(|d| d.name == name)
    }
}

struct EffectEntry {
    descriptor: PluginDescriptor,
    factory: fn() -> Box<dyn PixelEffect>,
}

/// Registry of pixel-effect plugins.
pub struct EffectRegistry {
    entries: Vec<EffectEntry>,
}

impl Default for EffectRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectRegistry {
    /// Create a registry with all built-in effects registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(10),
        };
        registry.register_builtins();
        registry
    }

    fn register_builtins(&mut self) {
        self.register(
            PluginDescriptor {
                id: "brightness",
                name: "Brightness",
                description: "Scales channel intensity",
                params: Brightness::PARAMS,
            },
            || Box::new(Brightness::new()),
        );
        self.register(
            PluginDescriptor {
                id: "contrast",
                name: "Contrast",
                description: "Stretches channel distance from mid-gray",
                params: Contrast::PARAMS,
            },
            || Box::new(Contrast::new()),
        );
        self.register(
            PluginDescriptor {
                id: "saturation",
                name: "Saturation",
                description: "Desaturates or oversaturates toward luma",
                params: Saturation::PARAMS,
            },
            || Box::new(Saturation::new()),
        );
        self.register(
            PluginDescriptor {
                id: "hue_rotate",
                name: "Hue Rotate",
                description: "Rotates hue by a fixed angle",
                params: HueRotate::PARAMS,
            },
            || Box::new(HueRotate::new()),
        );
        self.register(
            PluginDescriptor {
                id: "gamma",
                name: "Gamma",
                description: "Gamma correction with cached lookup table",
                params: Gamma::PARAMS,
            },
            || Box::new(Gamma::new()),
        );
        self.register(
            PluginDescriptor {
                id: "invert",
                name: "Invert",
                description: "Inverts channels, optionally partially",
                params: Invert::PARAMS,
            },
            || Box::new(Invert::new()),
        );
        self.register(
            PluginDescriptor {
                id: "colorize",
                name: "Colorize",
                description: "Luma-preserving tint",
                params: Colorize::PARAMS,
            },
            || Box::new(Colorize::new()),
        );
        self.register(
            PluginDescriptor {
                id: "strobe",
                name: "Strobe",
                description: "Duty-cycle blackout driven by the clip clock",
                params: Strobe::PARAMS,
            },
            || Box::new(Strobe::new()),
        );
        self.register(
            PluginDescriptor {
                id: "pixelate",
                name: "Pixelate",
                description: "Hard-edged block sampling",
                params: Pixelate::PARAMS,
            },
            || Box::new(Pixelate::new()),
        );
        self.register(
            PluginDescriptor {
                id: "mirror",
                name: "Mirror",
                description: "Reflects across one or both axes",
                params: Mirror::PARAMS,
            },
            || Box::new(Mirror::new()),
        );
    }

    fn register(&mut self, descriptor: PluginDescriptor, factory: fn() -> Box<dyn PixelEffect>) {
        debug_assert!(
            !self.contains(descriptor.id),
            "duplicate effect id {}",
            descriptor.id
        );
        self.entries.push(EffectEntry {
            descriptor,
            factory,
        });
    }

    /// All registered descriptors in registration order.
    pub fn all(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Descriptor for an id, if registered.
    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Instantiate the plugin for an id.
    pub fn create(&self, id: &str) -> Option<Box<dyn PixelEffect>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.factory)())
    }
}

struct GeneratorEntry {
    descriptor: PluginDescriptor,
    factory: fn() -> Box<dyn Generator>,
}

/// Registry of procedural generators.
pub struct GeneratorRegistry {
    entries: Vec<GeneratorEntry>,
}

impl Default for GeneratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl GeneratorRegistry {
    /// Create a registry with all built-in generators registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(4),
        };
        registry.register(
            PluginDescriptor {
                id: "solid",
                name: "Solid",
                description: "Single solid color",
                params: Solid::PARAMS,
            },
            || Box::new(Solid::new()),
        );
        registry.register(
            PluginDescriptor {
                id: "gradient",
                name: "Gradient",
                description: "Two-color linear gradient, optionally scrolling",
                params: Gradient::PARAMS,
            },
            || Box::new(Gradient::new()),
        );
        registry.register(
            PluginDescriptor {
                id: "plasma",
                name: "Plasma",
                description: "Animated sine-field plasma",
                params: Plasma::PARAMS,
            },
            || Box::new(Plasma::new()),
        );
        registry.register(
            PluginDescriptor {
                id: "scan",
                name: "Scan",
                description: "Sweeping bar",
                params: Scan::PARAMS,
            },
            || Box::new(Scan::new()),
        );
        registry
    }

    fn register(&mut self, descriptor: PluginDescriptor, factory: fn() -> Box<dyn Generator>) {
        self.entries.push(GeneratorEntry {
            descriptor,
            factory,
        });
    }

    /// All registered descriptors.
    pub fn all(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Descriptor for an id, if registered.
    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Instantiate the generator for an id.
    pub fn create(&self, id: &str) -> Option<Box<dyn Generator>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.factory)())
    }
}

struct TransitionEntry {
    descriptor: PluginDescriptor,
    factory: fn() -> Box<dyn Transition>,
}

/// Registry of transition plugins.
pub struct TransitionRegistry {
    entries: Vec<TransitionEntry>,
}

impl Default for TransitionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TransitionRegistry {
    /// Create a registry with all built-in transitions registered.
    pub fn new() -> Self {
        let mut registry = Self {
            entries: Vec::with_capacity(4),
        };
        registry.register(
            PluginDescriptor {
                id: "fade",
                name: "Fade",
                description: "Linear cross-fade",
                params: &[],
            },
            || Box::new(Fade),
        );
        registry.register(
            PluginDescriptor {
                id: "wipe",
                name: "Wipe",
                description: "Left-to-right reveal",
                params: &[],
            },
            || Box::new(Wipe),
        );
        registry.register(
            PluginDescriptor {
                id: "slide",
                name: "Slide",
                description: "Incoming frame pushes the outgoing one out",
                params: &[],
            },
            || Box::new(Slide),
        );
        registry.register(
            PluginDescriptor {
                id: "dissolve",
                name: "Dissolve",
                description: "Deterministic per-pixel dissolve",
                params: &[],
            },
            || Box::new(Dissolve),
        );
        registry
    }

    fn register(&mut self, descriptor: PluginDescriptor, factory: fn() -> Box<dyn Transition>) {
        self.entries.push(TransitionEntry {
            descriptor,
            factory,
        });
    }

    /// All registered descriptors.
    pub fn all(&self) -> impl Iterator<Item = &PluginDescriptor> {
        self.entries.iter().map(|e| &e.descriptor)
    }

    /// Descriptor for an id, if registered.
    pub fn get(&self, id: &str) -> Option<&PluginDescriptor> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| &e.descriptor)
    }

    /// Whether an id is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Instantiate the transition for an id.
    pub fn create(&self, id: &str) -> Option<Box<dyn Transition>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.id == id)
            .map(|e| (e.factory)())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lumen_core::{Frame, RenderContext, default_params};

    #[test]
    fn effect_ids_are_unique() {
        let registry = EffectRegistry::new();
        let ids: Vec<_> = registry.all().map(|d| d.id).collect();
        let mut deduped = ids.clone();
        deduped.sort_unstable();
        deduped.dedup();
        assert_eq!(ids.len(), deduped.len());
    }

    #[test]
    fn create_known_effect() {
        let registry = EffectRegistry::new();
        let mut effect = registry.create("brightness").unwrap();
        let mut frame = Frame::solid(1, 1, [10, 10, 10]);
        let params = default_params(registry.get("brightness").unwrap().params);
        effect
            .apply(&mut frame, &params, &RenderContext::start(30.0))
            .unwrap();
    }

    #[test]
    fn unknown_ids_fail() {
        assert!(EffectRegistry::new().create("nope").is_none());
        assert!(GeneratorRegistry::new().create("nope").is_none());
        assert!(TransitionRegistry::new().create("nope").is_none());
    }

    #[test]
    fn all_registries_have_builtins() {
        assert_eq!(EffectRegistry::new().all().count(), 10);
        assert_eq!(GeneratorRegistry::new().all().count(), 4);
        assert_eq!(TransitionRegistry::new().all().count(), 4);
    }

    #[test]
    fn descriptor_param_lookup() {
        let registry = EffectRegistry::new();
        let desc = registry.get("brightness").unwrap();
        assert!(desc.param("factor").is_some());
        assert!(desc.param("unknown").is_none());
    }

    #[test]
    fn transition_factories_blend() {
        let registry = TransitionRegistry::new();
        let fade = registry.create("fade").unwrap();
        let a = Frame::solid(2, 2, [255, 0, 0]);
        let b = Frame::solid(2, 2, [0, 255, 0]);
        assert_eq!(fade.blend(&a, &b, 1.0), b);
    }
}
