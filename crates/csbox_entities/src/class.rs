// class.rs - Entity class descriptors
//
// A descriptor is what the scripting layer knows about one entity class before
// it is handed to the engine's factory: classname, native base, networking and
// the editor (FGD) metadata.

use crate::FieldSchema;
use std::fmt;

/// Editor class type of an FGD entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ClassType {
    PointClass,
    SolidClass,
    FilterClass,
    NpcClass,
    KeyFrameClass,
    MoveClass,
}

impl ClassType {
    pub fn as_str(self) -> &'static str {
        match self {
            ClassType::PointClass => "@PointClass",
            ClassType::SolidClass => "@SolidClass",
            ClassType::FilterClass => "@FilterClass",
            ClassType::NpcClass => "@NPCClass",
            ClassType::KeyFrameClass => "@KeyFrameClass",
            ClassType::MoveClass => "@MoveClass",
        }
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const POINT_FGD_BASE: &[&str] = &["Targetname", "Origin"];
const FILTER_FGD_BASE: &[&str] = &["BaseFilter"];
const BRUSH_FGD_BASE: &[&str] = &[
    "Targetname",
    "Parentname",
    "Origin",
    "RenderFields",
    "Global",
    "Inputfilter",
    "EnableDisable",
    "Shadow",
];

/// Native engine classes script entities can derive from.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum NativeClass {
    BaseEntity,
    BaseAnimating,
    BaseAnimatingOverlay,
    BaseFlex,
    BaseCombatCharacter,
    BaseGrenade,
    BasePlayer,
    PointEntity,
    ServerOnlyEntity,
    ServerOnlyPointEntity,
    LogicalEntity,
    FuncBrush,
    BaseToggle,
    BaseTrigger,
    BaseCombatWeapon,
    BaseFilter,
}

impl NativeClass {
    pub fn native_name(self) -> &'static str {
        match self {
            NativeClass::BaseEntity => "CBaseEntity",
            NativeClass::BaseAnimating => "CBaseAnimating",
            NativeClass::BaseAnimatingOverlay => "CBaseAnimatingOverlay",
            NativeClass::BaseFlex => "CBaseFlex",
            NativeClass::BaseCombatCharacter => "CBaseCombatCharacter",
            NativeClass::BaseGrenade => "CBaseGrenade",
            NativeClass::BasePlayer => "CBasePlayer",
            NativeClass::PointEntity => "CPointEntity",
            NativeClass::ServerOnlyEntity => "CServerOnlyEntity",
            NativeClass::ServerOnlyPointEntity => "CServerOnlyPointEntity",
            NativeClass::LogicalEntity => "CLogicalEntity",
            NativeClass::FuncBrush => "CFuncBrush",
            NativeClass::BaseToggle => "CBaseToggle",
            NativeClass::BaseTrigger => "CBaseTrigger",
            NativeClass::BaseCombatWeapon => "CBaseCombatWeapon",
            NativeClass::BaseFilter => "CBaseFilter",
        }
    }

    pub fn parent(self) -> Option<NativeClass> {
        use NativeClass::*;
        match self {
            BaseEntity => None,
            BaseAnimating | PointEntity | ServerOnlyEntity | FuncBrush | BaseToggle => {
                Some(BaseEntity)
            }
            BaseAnimatingOverlay | BaseGrenade | BaseCombatWeapon => Some(BaseAnimating),
            BaseFlex => Some(BaseAnimatingOverlay),
            BaseCombatCharacter => Some(BaseFlex),
            BasePlayer => Some(BaseCombatCharacter),
            ServerOnlyPointEntity | LogicalEntity => Some(ServerOnlyEntity),
            BaseTrigger => Some(BaseToggle),
            BaseFilter => Some(LogicalEntity),
        }
    }

    /// FGD defaults declared directly on this class (not inherited).
    fn fgd_defaults(self) -> Option<(ClassType, &'static [&'static str])> {
        match self {
            NativeClass::BaseEntity => Some((ClassType::PointClass, POINT_FGD_BASE)),
            NativeClass::FuncBrush | NativeClass::BaseTrigger => {
                Some((ClassType::SolidClass, BRUSH_FGD_BASE))
            }
            NativeClass::BaseFilter => Some((ClassType::FilterClass, FILTER_FGD_BASE)),
            _ => None,
        }
    }

    /// Walk up the native hierarchy to the closest class with FGD defaults.
    pub fn infer_fgd(self) -> Option<(ClassType, &'static [&'static str])> {
        let mut current = Some(self);
        while let Some(class) = current {
            if let Some(defaults) = class.fgd_defaults() {
                return Some(defaults);
            }
            current = class.parent();
        }
        None
    }
}

/// Everything declared about an entity class at definition time.
#[derive(Clone, Debug, PartialEq)]
pub struct EntityClassDescriptor {
    classname: String,
    native: NativeClass,
    networked: bool,
    helpstring: String,
    clstype: Option<ClassType>,
    fgd_base: Vec<String>,
    studio: String,
    iconsprite: String,
    cylinder: Vec<String>,
    color: String,
    size: String,
    extra_properties: String,
    cpp_properties: String,
    no_fgd_entry: bool,
    schema: FieldSchema,
}

impl EntityClassDescriptor {
    pub fn new(classname: impl Into<String>, native: NativeClass) -> Self {
        Self {
            classname: classname.into(),
            native,
            networked: false,
            helpstring: String::new(),
            clstype: None,
            fgd_base: Vec::new(),
            studio: String::new(),
            iconsprite: String::new(),
            cylinder: Vec::new(),
            color: String::new(),
            size: String::new(),
            extra_properties: String::new(),
            cpp_properties: String::new(),
            no_fgd_entry: false,
            schema: FieldSchema::new(),
        }
    }

    pub fn networked(mut self) -> Self {
        self.networked = true;
        self
    }

    pub fn helpstring(mut self, helpstring: impl Into<String>) -> Self {
        self.helpstring = helpstring.into();
        self
    }

    /// Override the FGD class type otherwise inferred from the native base.
    pub fn clstype(mut self, clstype: ClassType) -> Self {
        self.clstype = Some(clstype);
        self
    }

    pub fn fgd_base<I, S>(mut self, base: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fgd_base = base.into_iter().map(Into::into).collect();
        self
    }

    pub fn studio(mut self, model: impl Into<String>) -> Self {
        self.studio = model.into();
        self
    }

    pub fn iconsprite(mut self, sprite: impl Into<String>) -> Self {
        self.iconsprite = sprite.into();
        self
    }

    pub fn cylinder<I, S>(mut self, cylinder: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cylinder = cylinder.into_iter().map(Into::into).collect();
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn size(mut self, size: impl Into<String>) -> Self {
        self.size = size.into();
        self
    }

    pub fn extra_properties(mut self, properties: impl Into<String>) -> Self {
        self.extra_properties = properties.into();
        self
    }

    pub fn cpp_properties(mut self, properties: impl Into<String>) -> Self {
        self.cpp_properties = properties.into();
        self
    }

    /// Keep this class out of the generated FGD.
    pub fn no_fgd_entry(mut self) -> Self {
        self.no_fgd_entry = true;
        self
    }

    pub fn schema(mut self, schema: FieldSchema) -> Self {
        self.schema = schema;
        self
    }

    pub fn classname(&self) -> &str {
        &self.classname
    }

    pub fn native(&self) -> NativeClass {
        self.native
    }

    pub fn is_networked(&self) -> bool {
        self.networked
    }

    pub fn help(&self) -> &str {
        &self.helpstring
    }

    pub fn class_type(&self) -> Option<ClassType> {
        self.clstype
    }

    pub fn fgd_base_classes(&self) -> &[String] {
        &self.fgd_base
    }

    pub fn studio_model(&self) -> &str {
        &self.studio
    }

    pub fn icon_sprite(&self) -> &str {
        &self.iconsprite
    }

    pub fn cylinder_spec(&self) -> &[String] {
        &self.cylinder
    }

    pub fn editor_color(&self) -> &str {
        &self.color
    }

    pub fn editor_size(&self) -> &str {
        &self.size
    }

    pub fn extra_property_text(&self) -> &str {
        &self.extra_properties
    }

    pub fn cpp_property_text(&self) -> &str {
        &self.cpp_properties
    }

    pub fn has_fgd_entry(&self) -> bool {
        !self.no_fgd_entry
    }

    pub fn field_schema(&self) -> &FieldSchema {
        &self.schema
    }

    /// Fill in the FGD class type and base list from the native hierarchy
    /// where they were not given explicitly.
    pub(crate) fn resolve_fgd(&mut self) {
        if self.clstype.is_some() {
            return;
        }
        if let Some((clstype, base)) = self.native.infer_fgd() {
            self.clstype = Some(clstype);
            if self.fgd_base.is_empty() {
                self.fgd_base = base.iter().map(|name| name.to_string()).collect();
            }
        }
    }
}

/// A script type that can be registered as an entity class.
///
/// # Example
/// ```ignore
/// struct EntExample;
///
/// impl EntityClass for EntExample {
///     fn describe() -> EntityClassDescriptor {
///         EntityClassDescriptor::new("ent_example", NativeClass::BaseEntity)
///     }
/// }
///
/// registry.register::<EntExample>()?;
/// ```
pub trait EntityClass: 'static {
    fn describe() -> EntityClassDescriptor;
}
