//! Descriptor resolution
//!
//! Derives the descriptor for one type:
//!
//! 1. eligibility is checked again, independently of the filter;
//! 2. the packaging override attribute picks the packaging type: an explicit
//!    packaging type, the generic descriptor, or none at all;
//! 3. the group attribute supplies the group label, defaulting to a constant;
//! 4. the group label is stored in the descriptor's properties.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;

use super::error::{ResolutionError, ResolveResult};
use crate::config::DiscoveryConfig;
use crate::filter::CapabilityPredicate;
use crate::loader::{load_guarded, ModuleHandle, ModuleLoader};
use crate::logging::Logger;
use crate::packaging::{PackagedItem, PackagingDefinition, PackagingRegistry};
use crate::types::{ConstructorSig, Descriptor, PackagingSource, TypeInfo, GROUP_NAME_KEY};

/// Value of a type's packaging override attribute
///
/// Attribute arguments follow the usual toolbox attribute forms: a string names
/// the packaging type, `true` (or no argument) asks for the default packaging,
/// `false` opts the type out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackagingOverride {
    /// No attribute declared
    Absent,
    /// Use the generic descriptor
    UseDefault,
    /// The type opted out of packaging
    Excluded,
    /// Use the named packaging type
    Explicit(String),
}

impl PackagingOverride {
    /// Read the override declared on `ty` under `attribute`
    pub fn read(ty: &TypeInfo, attribute: &str) -> ResolveResult<Self> {
        let Some(data) = ty.attribute(attribute) else {
            return Ok(PackagingOverride::Absent);
        };

        match data.first_arg() {
            None | Some(Value::Bool(true)) => Ok(PackagingOverride::UseDefault),
            Some(Value::Bool(false)) => Ok(PackagingOverride::Excluded),
            Some(Value::String(name)) if !name.trim().is_empty() => {
                Ok(PackagingOverride::Explicit(name.trim().to_string()))
            }
            Some(other) => Err(ResolutionError::MalformedAttribute {
                tool_type: ty.full_name.clone(),
                attribute: attribute.to_string(),
                message: format!("unsupported argument {}", other),
            }),
        }
    }
}

/// Names the resolver reads from type metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverSettings {
    pub packaging_capability: String,
    pub packaging_attribute: String,
    pub group_attribute: String,
    pub default_group: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self::from(&DiscoveryConfig::default())
    }
}

impl From<&DiscoveryConfig> for ResolverSettings {
    fn from(config: &DiscoveryConfig) -> Self {
        Self {
            packaging_capability: config.packaging_capability.clone(),
            packaging_attribute: config.packaging_attribute.clone(),
            group_attribute: config.group_attribute.clone(),
            default_group: config.default_group.clone(),
        }
    }
}

/// Derives one descriptor per tool type
pub struct DescriptorResolver {
    eligibility: CapabilityPredicate,
    settings: ResolverSettings,
    packaging: Arc<PackagingRegistry>,
    dependency_loader: Option<Arc<dyn ModuleLoader>>,
    logger: Arc<dyn Logger>,
}

impl DescriptorResolver {
    pub fn new(
        eligibility: CapabilityPredicate,
        settings: ResolverSettings,
        packaging: Arc<PackagingRegistry>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            eligibility,
            settings,
            packaging,
            dependency_loader: None,
            logger,
        }
    }

    /// Build a resolver from discovery settings
    pub fn from_config(
        config: &DiscoveryConfig,
        packaging: Arc<PackagingRegistry>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self::new(
            CapabilityPredicate::from_config(config),
            ResolverSettings::from(config),
            packaging,
            logger,
        )
    }

    /// Search the modules a tool's module depends on, read with `loader`
    pub fn with_dependency_loader(mut self, loader: Arc<dyn ModuleLoader>) -> Self {
        self.dependency_loader = Some(loader);
        self
    }

    pub fn settings(&self) -> &ResolverSettings {
        &self.settings
    }

    pub fn packaging(&self) -> &PackagingRegistry {
        &self.packaging
    }

    /// Resolve `ty`, logging and swallowing failures
    ///
    /// `None` means no descriptor: either the type is not eligible or resolution
    /// failed.
    pub fn resolve(&self, ty: &TypeInfo, module: &ModuleHandle) -> Option<Descriptor> {
        match self.try_resolve(ty, module) {
            Ok(descriptor) => descriptor,
            Err(e) => {
                self.logger.warn(&format!(
                    "[DescriptorResolver] Skipping {} in {}: {}",
                    ty.full_name,
                    module.id(),
                    e
                ));
                None
            }
        }
    }

    /// Resolve `ty`, reporting failures
    ///
    /// `Ok(None)` is the normal outcome for ineligible types.
    pub fn try_resolve(
        &self,
        ty: &TypeInfo,
        module: &ModuleHandle,
    ) -> ResolveResult<Option<Descriptor>> {
        let packaged = if self.eligibility.is_eligible(ty) {
            match PackagingOverride::read(ty, &self.settings.packaging_attribute)? {
                PackagingOverride::Explicit(name) => self.construct_override(ty, &name, module)?,
                PackagingOverride::UseDefault => self.generic(ty),
                PackagingOverride::Excluded => None,
                PackagingOverride::Absent
                    if ty.implements(&self.settings.packaging_capability) =>
                {
                    Some(self.intrinsic(ty)?)
                }
                PackagingOverride::Absent => self.generic(ty),
            }
        } else if ty.implements(&self.settings.packaging_capability) {
            Some(self.intrinsic(ty)?)
        } else {
            None
        };

        match packaged {
            Some((item, source)) => self.finish(ty, module, item, source).map(Some),
            None => Ok(None),
        }
    }

    /// Generic descriptor wrapping `ty`; none for open generic types
    fn generic(&self, ty: &TypeInfo) -> Option<(PackagedItem, PackagingSource)> {
        if ty.contains_generic_parameters() {
            return None;
        }
        Some((PackagedItem::for_type(ty.full_name.clone(), ty), PackagingSource::Generic))
    }

    /// `ty` is a packaging type itself: instantiate it directly
    fn intrinsic(&self, ty: &TypeInfo) -> ResolveResult<(PackagedItem, PackagingSource)> {
        if ty.is_abstract {
            return Err(ResolutionError::not_instantiable(&ty.full_name, "abstract type"));
        }
        if !ty.has_constructor(&ConstructorSig::Parameterless) {
            return Err(ResolutionError::not_instantiable(
                &ty.full_name,
                "no parameterless constructor",
            ));
        }
        Ok((PackagedItem::for_type(ty.full_name.clone(), ty), PackagingSource::Intrinsic))
    }

    /// Packaging type declared in `module` or one of its direct dependencies
    fn find_declared(&self, packaging_type: &str, module: &ModuleHandle) -> Option<TypeInfo> {
        if let Some(found) = module.find_type(packaging_type) {
            return Some(found.clone());
        }
        let loader = self.dependency_loader.as_ref()?;
        module.dependencies().iter().find_map(|path| {
            match load_guarded(loader.as_ref(), path) {
                Ok(dependency) => dependency.find_type(packaging_type).cloned(),
                Err(e) => {
                    self.logger.debug(&format!(
                        "[DescriptorResolver] Cannot search dependency of {}: {}",
                        module.id(),
                        e
                    ));
                    None
                }
            }
        })
    }

    fn construct_override(
        &self,
        ty: &TypeInfo,
        packaging_type: &str,
        module: &ModuleHandle,
    ) -> ResolveResult<Option<(PackagedItem, PackagingSource)>> {
        let declared;
        let definition = match self.packaging.get(packaging_type) {
            Some(definition) => definition,
            None => {
                let packaging = self
                    .find_declared(packaging_type, module)
                    .ok_or_else(|| ResolutionError::PackagingTypeNotFound {
                        tool_type: ty.full_name.clone(),
                        packaging_type: packaging_type.to_string(),
                    })?;
                if packaging.is_abstract
                    || !packaging.implements(&self.settings.packaging_capability)
                {
                    return Err(ResolutionError::not_instantiable(
                        packaging_type,
                        "not a concrete packaging type",
                    ));
                }
                declared = PackagingDefinition::declared(&packaging);
                &declared
            }
        };

        let constructed = catch_unwind(AssertUnwindSafe(|| definition.construct(ty)))
            .map_err(|_| ResolutionError::ConstructorPanicked {
                packaging_type: packaging_type.to_string(),
                tool_type: ty.full_name.clone(),
            })??;

        match constructed {
            Some((item, constructor)) => {
                Ok(Some((item, PackagingSource::Override { constructor })))
            }
            None => {
                self.logger.debug(&format!(
                    "[DescriptorResolver] {} has no usable constructor for {}",
                    packaging_type, ty.full_name
                ));
                Ok(None)
            }
        }
    }

    /// Group label declared on `ty`, or the default
    pub fn group_name(&self, ty: &TypeInfo) -> String {
        ty.attribute(&self.settings.group_attribute)
            .and_then(|a| a.first_arg())
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.settings.default_group)
            .to_string()
    }

    fn finish(
        &self,
        ty: &TypeInfo,
        module: &ModuleHandle,
        item: PackagedItem,
        source: PackagingSource,
    ) -> ResolveResult<Descriptor> {
        if item.tool_type() != Some(ty.full_name.as_str()) {
            return Err(ResolutionError::Unbound {
                packaging_type: item.packaging_type().to_string(),
                tool_type: ty.full_name.clone(),
            });
        }

        let group = self.group_name(ty);
        let packaging_type = item.packaging_type().to_string();
        let display_name = item
            .display_name()
            .map(str::to_string)
            .unwrap_or_else(|| ty.name().to_string());

        let mut properties = item.into_properties();
        properties.insert(GROUP_NAME_KEY.to_string(), Value::String(group.clone()));

        Ok(Descriptor {
            tool_type: ty.full_name.clone(),
            packaging_type,
            display_name,
            module: module.id().clone(),
            group,
            source,
            properties,
        })
    }
}

impl std::fmt::Debug for DescriptorResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DescriptorResolver")
            .field("eligibility", &self.eligibility)
            .field("settings", &self.settings)
            .field("packaging", &self.packaging.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use crate::types::{ModuleId, OverrideConstructor, Visibility};
    use serde_json::json;

    fn resolver_with(packaging: PackagingRegistry) -> DescriptorResolver {
        DescriptorResolver::from_config(
            &DiscoveryConfig::default(),
            Arc::new(packaging),
            Arc::new(NoOpLogger::new()),
        )
    }

    fn resolver() -> DescriptorResolver {
        resolver_with(PackagingRegistry::new())
    }

    fn module(types: Vec<TypeInfo>) -> ModuleHandle {
        ModuleHandle::new(ModuleId::new("Acme.Controls", "/mods/Acme.Controls.tmod"), types)
    }

    fn component(name: &str) -> TypeInfo {
        TypeInfo::new(name)
            .implementing("component")
            .with_constructor(ConstructorSig::Parameterless)
    }

    fn resolve_one(
        resolver: &DescriptorResolver,
        ty: &TypeInfo,
        others: Vec<TypeInfo>,
    ) -> ResolveResult<Option<Descriptor>> {
        let mut types = vec![ty.clone()];
        types.extend(others);
        resolver.try_resolve(ty, &module(types))
    }

    #[test]
    fn test_plain_component_gets_generic_descriptor() {
        let ty = component("Acme.Controls.Label");
        let d = resolve_one(&resolver(), &ty, vec![]).unwrap().unwrap();

        assert_eq!(d.tool_type, "Acme.Controls.Label");
        assert_eq!(d.packaging_type, "Acme.Controls.Label");
        assert_eq!(d.display_name, "Label");
        assert_eq!(d.source, PackagingSource::Generic);
        assert_eq!(d.module.name, "Acme.Controls");
        assert_eq!(d.group, "General");
        assert_eq!(d.property(GROUP_NAME_KEY), Some(&json!("General")));
    }

    #[test]
    fn test_packaging_capable_type_wraps_itself() {
        let ty = component("Acme.Controls.SmartItem").implementing("toolbox-item");
        let d = resolve_one(&resolver(), &ty, vec![]).unwrap().unwrap();

        assert_eq!(d.source, PackagingSource::Intrinsic);
        assert_eq!(d.packaging_type, "Acme.Controls.SmartItem");
    }

    #[test]
    fn test_packaging_type_outside_capability_is_instantiated() {
        let ty = TypeInfo::new("Acme.Controls.CustomItem")
            .with_visibility(Visibility::NonPublic)
            .implementing("toolbox-item")
            .with_constructor(ConstructorSig::Parameterless);
        let d = resolve_one(&resolver(), &ty, vec![]).unwrap().unwrap();
        assert_eq!(d.source, PackagingSource::Intrinsic);
        assert_eq!(d.group, "General");

        let abstract_item = TypeInfo::new("Acme.Controls.ItemBase")
            .abstract_type()
            .implementing("toolbox-item");
        let err = resolve_one(&resolver(), &abstract_item, vec![]).unwrap_err();
        assert!(matches!(err, ResolutionError::NotInstantiable { .. }));
    }

    #[test]
    fn test_registered_override_prefers_type_constructor() {
        let packaging = PackagingRegistry::new().with(
            PackagingDefinition::new("Acme.Design.GridItem", "grid packaging")
                .with_parameterless_constructor(|| Ok(PackagedItem::new("Acme.Design.GridItem")))
                .with_type_constructor(|tool: &TypeInfo| {
                    Ok(PackagedItem::for_type("Acme.Design.GridItem", tool)
                        .with_display_name(format!("{} (grid)", tool.name())))
                }),
        );
        let ty = component("Acme.Controls.Grid")
            .with_attribute("ToolboxItem", vec![json!("Acme.Design.GridItem")]);

        let d = resolve_one(&resolver_with(packaging), &ty, vec![]).unwrap().unwrap();
        assert_eq!(d.packaging_type, "Acme.Design.GridItem");
        assert_eq!(d.display_name, "Grid (grid)");
        assert_eq!(
            d.source,
            PackagingSource::Override { constructor: OverrideConstructor::TypeIdentity }
        );
        assert!(d.is_overridden());
    }

    #[test]
    fn test_override_declared_in_module_parameterless() {
        let ty = component("Acme.Controls.Chart")
            .with_attribute("ToolboxItem", vec![json!("Acme.Controls.ChartItem")]);
        let item_type = TypeInfo::new("Acme.Controls.ChartItem")
            .implementing("toolbox-item")
            .with_constructor(ConstructorSig::Parameterless);

        let d = resolve_one(&resolver(), &ty, vec![item_type]).unwrap().unwrap();
        assert_eq!(d.packaging_type, "Acme.Controls.ChartItem");
        assert_eq!(
            d.source,
            PackagingSource::Override { constructor: OverrideConstructor::Parameterless }
        );
    }

    #[test]
    fn test_override_without_constructor_yields_nothing() {
        let ty = component("Acme.Controls.Chart")
            .with_attribute("ToolboxItem", vec![json!("Acme.Controls.ChartItem")]);
        let item_type = TypeInfo::new("Acme.Controls.ChartItem")
            .implementing("toolbox-item")
            .with_constructor(ConstructorSig::Container);

        assert!(resolve_one(&resolver(), &ty, vec![item_type]).unwrap().is_none());
    }

    struct CatalogLoader {
        modules: Vec<ModuleHandle>,
    }

    impl ModuleLoader for CatalogLoader {
        fn name(&self) -> &str {
            "catalog"
        }

        fn load(&self, path: &std::path::Path) -> crate::loader::LoadResult<ModuleHandle> {
            self.modules
                .iter()
                .find(|m| m.id().path() == path)
                .cloned()
                .ok_or_else(|| crate::loader::ModuleLoadError::corrupt(path, "unknown module"))
        }
    }

    #[test]
    fn test_override_declared_in_dependency() {
        let design = ModuleHandle::new(
            ModuleId::new("Acme.Design", "/mods/Acme.Design.tmod"),
            vec![TypeInfo::new("Acme.Design.GridItem")
                .implementing("toolbox-item")
                .with_constructor(ConstructorSig::TypeIdentity)],
        );
        let loader: Arc<dyn ModuleLoader> = Arc::new(CatalogLoader {
            modules: vec![design],
        });

        let ty = component("Acme.Grid")
            .with_attribute("ToolboxItem", vec![json!("Acme.Design.GridItem")]);
        let grid = ModuleHandle::new(
            ModuleId::new("Acme.Grid", "/mods/Acme.Grid.tmod"),
            vec![ty.clone()],
        )
        .with_dependencies(vec![
            "/mods/Missing.tmod".into(),
            "/mods/Acme.Design.tmod".into(),
        ]);

        // Without a loader only the tool's own module is searched
        assert!(matches!(
            resolver().try_resolve(&ty, &grid).unwrap_err(),
            ResolutionError::PackagingTypeNotFound { .. }
        ));

        let resolver = resolver().with_dependency_loader(loader);
        let d = resolver.try_resolve(&ty, &grid).unwrap().unwrap();
        assert_eq!(d.packaging_type, "Acme.Design.GridItem");
        assert_eq!(d.module.name, "Acme.Grid");
        assert_eq!(
            d.source,
            PackagingSource::Override { constructor: OverrideConstructor::TypeIdentity }
        );
    }

    #[test]
    fn test_override_errors() {
        let missing = component("Acme.Controls.Chart")
            .with_attribute("ToolboxItem", vec![json!("Acme.Nowhere")]);
        assert!(matches!(
            resolve_one(&resolver(), &missing, vec![]).unwrap_err(),
            ResolutionError::PackagingTypeNotFound { .. }
        ));

        let not_packaging = component("Acme.Controls.Chart")
            .with_attribute("ToolboxItem", vec![json!("Acme.Controls.Helper")]);
        let helper =
            TypeInfo::new("Acme.Controls.Helper").with_constructor(ConstructorSig::Parameterless);
        assert!(matches!(
            resolve_one(&resolver(), &not_packaging, vec![helper]).unwrap_err(),
            ResolutionError::NotInstantiable { .. }
        ));

        let malformed =
            component("Acme.Controls.Chart").with_attribute("ToolboxItem", vec![json!(3)]);
        assert!(matches!(
            resolve_one(&resolver(), &malformed, vec![]).unwrap_err(),
            ResolutionError::MalformedAttribute { .. }
        ));
    }

    #[test]
    fn test_panicking_constructor_is_contained() {
        let packaging = PackagingRegistry::new().with(
            PackagingDefinition::new("Acme.Design.Broken", "panics")
                .with_type_constructor(|_tool: &TypeInfo| panic!("constructor blew up")),
        );
        let resolver = resolver_with(packaging);
        let ty = component("Acme.Controls.Grid")
            .with_attribute("ToolboxItem", vec![json!("Acme.Design.Broken")]);

        let err = resolve_one(&resolver, &ty, vec![]).unwrap_err();
        assert!(matches!(err, ResolutionError::ConstructorPanicked { .. }));
        assert!(resolver.resolve(&ty, &module(vec![ty.clone()])).is_none());
    }

    #[test]
    fn test_unbound_item_is_rejected() {
        let packaging = PackagingRegistry::new().with(
            PackagingDefinition::new("Acme.Design.Lazy", "forgets to bind")
                .with_type_constructor(|_tool: &TypeInfo| {
                    Ok(PackagedItem::new("Acme.Design.Lazy"))
                }),
        );
        let ty = component("Acme.Controls.Grid")
            .with_attribute("ToolboxItem", vec![json!("Acme.Design.Lazy")]);

        assert!(matches!(
            resolve_one(&resolver_with(packaging), &ty, vec![]).unwrap_err(),
            ResolutionError::Unbound { .. }
        ));
    }

    #[test]
    fn test_use_default_sentinel_and_generics() {
        let ty = component("Acme.Controls.Grid").with_attribute("ToolboxItem", vec![json!(true)]);
        let d = resolve_one(&resolver(), &ty, vec![]).unwrap().unwrap();
        assert_eq!(d.source, PackagingSource::Generic);

        let no_args = component("Acme.Controls.Grid").with_attribute("ToolboxItem", vec![]);
        assert!(resolve_one(&resolver(), &no_args, vec![]).unwrap().is_some());

        let open = component("Acme.Controls.Repeater`1")
            .with_generic_parameter("T")
            .with_attribute("ToolboxItem", vec![json!(true)]);
        assert!(resolve_one(&resolver(), &open, vec![]).unwrap().is_none());

        let open_absent = component("Acme.Controls.List`1").with_generic_parameter("T");
        assert!(resolve_one(&resolver(), &open_absent, vec![]).unwrap().is_none());
    }

    #[test]
    fn test_excluded_sentinel() {
        let ty = component("Acme.Controls.Internal")
            .with_attribute("ToolboxItem", vec![json!(false)]);
        assert!(resolve_one(&resolver(), &ty, vec![]).unwrap().is_none());
    }

    #[test]
    fn test_ineligible_types() {
        let hidden = component("Acme.Controls.Hidden").with_visibility(Visibility::NonPublic);
        assert!(resolve_one(&resolver(), &hidden, vec![]).unwrap().is_none());

        let abstract_base = component("Acme.Controls.Base").abstract_type();
        assert!(resolve_one(&resolver(), &abstract_base, vec![]).unwrap().is_none());

        let plain = TypeInfo::new("Acme.Controls.Util");
        assert!(resolve_one(&resolver(), &plain, vec![]).unwrap().is_none());
    }

    #[test]
    fn test_group_name() {
        let resolver = resolver();

        let tagged = component("Acme.Controls.Grid")
            .with_attribute("ToolboxTabName", vec![json!("Editors")]);
        let d = resolve_one(&resolver, &tagged, vec![]).unwrap().unwrap();
        assert_eq!(d.group, "Editors");
        assert_eq!(d.group_label(), "Editors");

        let untagged = component("Acme.Controls.Grid");
        assert_eq!(resolver.group_name(&untagged), "General");

        let empty =
            component("Acme.Controls.Grid").with_attribute("ToolboxTabName", vec![json!("")]);
        assert_eq!(resolver.group_name(&empty), "General");

        let numeric =
            component("Acme.Controls.Grid").with_attribute("ToolboxTabName", vec![json!(5)]);
        assert_eq!(resolver.group_name(&numeric), "General");
    }

    #[test]
    fn test_custom_settings() {
        let config = DiscoveryConfig {
            default_group: "Acme".to_string(),
            group_attribute: "Acme.Utils.ToolboxTabNameAttribute".to_string(),
            ..DiscoveryConfig::default()
        };
        let resolver = DescriptorResolver::from_config(
            &config,
            Arc::new(PackagingRegistry::new()),
            Arc::new(NoOpLogger::new()),
        );

        let tagged = component("Acme.Controls.Grid")
            .with_attribute("Acme.Utils.ToolboxTabNameAttribute", vec![json!("Acme: Data")]);
        assert_eq!(resolver.group_name(&tagged), "Acme: Data");
        assert_eq!(resolver.group_name(&component("Acme.Controls.Label")), "Acme");
        assert_eq!(resolver.settings().default_group, "Acme");
    }
}
