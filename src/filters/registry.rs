use std::collections::HashMap;

use image::RgbaImage;
use tracing::warn;

use crate::error::FilterError;
use crate::filters::builtin;
use crate::filters::spec::{FilterArgs, FilterSpec};

/// An image transform produced by resolving one filter spec
pub type FilterFn = Box<dyn Fn(&mut RgbaImage) + Send + Sync>;

/// Constructor that validates a spec's parameters and binds them into a
/// callable transform
pub type FilterConstructor =
    Box<dyn Fn(&FilterArgs<'_>) -> Result<FilterFn, FilterError> + Send + Sync>;

/// A resolved filter: the registered name plus its bound transform
pub struct BoundFilter {
    name: String,
    op: FilterFn,
}

impl BoundFilter {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn apply(&self, frame: &mut RgbaImage) {
        (self.op)(frame)
    }
}

impl std::fmt::Debug for BoundFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundFilter").field("name", &self.name).finish()
    }
}

/// Registry turning declarative filter specs into bound transforms.
///
/// Resolution is pure: constructors take only the spec's parameters, so
/// identical specs always resolve to equivalent transforms. Parameter
/// validation happens here, once, rather than on every frame: a filter
/// whose parameters do not match is dropped from the chain with a warning,
/// while an unknown filter name fails the whole resolution.
pub struct FilterRegistry {
    constructors: HashMap<String, FilterConstructor>,
}

impl FilterRegistry {
    /// Create a new registry with all built-in filters
    pub fn new() -> Self {
        let mut registry = Self {
            constructors: HashMap::new(),
        };
        builtin::register_all(&mut registry);
        registry
    }

    /// Register a custom filter constructor
    pub fn register<F>(&mut self, name: &str, constructor: F)
    where
        F: Fn(&FilterArgs<'_>) -> Result<FilterFn, FilterError> + Send + Sync + 'static,
    {
        self.constructors
            .insert(name.to_string(), Box::new(constructor));
    }

    /// Check if a filter is available
    pub fn has_filter(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Get all registered filter names
    pub fn available_filters(&self) -> Vec<String> {
        self.constructors.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    /// Resolve a list of specs into a callable chain.
    ///
    /// An unregistered name is a hard error. A registered filter with
    /// mismatched parameters is skipped (logged once here, not once per
    /// frame).
    pub fn resolve(&self, specs: &[FilterSpec]) -> Result<Vec<BoundFilter>, FilterError> {
        let mut chain = Vec::with_capacity(specs.len());

        for spec in specs {
            let name = spec.filter_name();
            let constructor =
                self.constructors
                    .get(name)
                    .ok_or_else(|| FilterError::Unknown {
                        name: name.to_string(),
                    })?;

            match constructor(&spec.args()) {
                Ok(op) => chain.push(BoundFilter {
                    name: name.to_string(),
                    op,
                }),
                Err(e) => warn!("Skipping filter: {}", e),
            }
        }

        Ok(chain)
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::spec::FilterSpec;

    fn test_frame() -> RgbaImage {
        RgbaImage::from_fn(8, 8, |x, y| {
            image::Rgba([(x * 30) as u8, (y * 30) as u8, 128, 255])
        })
    }

    fn specs(toml: &str) -> Vec<FilterSpec> {
        #[derive(serde::Deserialize)]
        struct Doc {
            filters: Vec<FilterSpec>,
        }
        let doc: Doc = toml::from_str(toml).unwrap();
        doc.filters
    }

    #[test]
    fn test_builtin_filters_available() {
        let registry = FilterRegistry::new();
        for name in [
            "grayscale",
            "invert",
            "sepia",
            "blur",
            "brightness",
            "contrast",
            "color_filter",
            "noise",
            "solid_color",
        ] {
            assert!(registry.has_filter(name), "missing builtin '{}'", name);
        }
    }

    #[test]
    fn test_unknown_filter_is_a_hard_error() {
        let registry = FilterRegistry::new();
        let result = registry.resolve(&specs(r#"filters = ["grayscale", "no_such_filter"]"#));
        assert!(matches!(
            result,
            Err(FilterError::Unknown { name }) if name == "no_such_filter"
        ));
    }

    #[test]
    fn test_bad_parameters_drop_only_that_filter() {
        let registry = FilterRegistry::new();
        // blur wants one numeric parameter; three is a mismatch
        let chain = registry
            .resolve(&specs(r#"filters = [["blur", [1, 2, 3]], "invert"]"#))
            .unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "invert");
    }

    #[test]
    fn test_resolution_is_referentially_transparent() {
        let registry = FilterRegistry::new();
        let spec_list = specs(r#"filters = [["brightness", [1.4]], "grayscale"]"#);

        let first = registry.resolve(&spec_list).unwrap();
        let second = registry.resolve(&spec_list).unwrap();

        let mut a = test_frame();
        let mut b = test_frame();
        for filter in &first {
            filter.apply(&mut a);
        }
        for filter in &second {
            filter.apply(&mut b);
        }
        assert_eq!(a.as_raw(), b.as_raw());
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = FilterRegistry::new();
        registry.register("nop", |_| Ok(Box::new(|_frame: &mut RgbaImage| {})));
        assert!(registry.has_filter("nop"));

        let chain = registry.resolve(&specs(r#"filters = ["nop"]"#)).unwrap();
        assert_eq!(chain.len(), 1);
    }
}
