//! Example entity classes shipped with the runtime

use anyhow::Context;
use csbox_entities::{
    ClassHandle, EntityClass, EntityClassDescriptor, EntityClassRegistry, EntityFields, FieldError,
    FieldMeta, FieldSchema, FieldValue, NativeClass, OutputConnection, RegistrationError,
};

/// Bare entity with no fields.
pub struct EntExample;

impl EntityClass for EntExample {
    fn describe() -> EntityClassDescriptor {
        EntityClassDescriptor::new("ent_example", NativeClass::BaseEntity)
            .helpstring("Stripped down example entity")
    }
}

/// Counts `Tick` inputs and fires `OnThreshold` when the count reaches the
/// threshold keyvalue.
pub struct MyLogicalEntity;

impl EntityClass for MyLogicalEntity {
    fn describe() -> EntityClassDescriptor {
        EntityClassDescriptor::new("my_logical_entity", NativeClass::LogicalEntity).schema(
            FieldSchema::new()
                .field(FieldMeta::integer("counter"))
                .field(FieldMeta::integer("threshold").keyname("threshold"))
                .field(FieldMeta::output("onthreshold").keyname("OnThreshold"))
                .input("Tick", "input_tick"),
        )
    }
}

impl MyLogicalEntity {
    /// Returns the connections to deliver when the threshold was reached.
    pub fn input_tick(fields: &mut EntityFields) -> Result<Vec<OutputConnection>, FieldError> {
        let counter = integer(fields, "counter") + 1;
        if counter >= integer(fields, "threshold") {
            fields.set("counter", 0)?;
            return fields.fire_output("onthreshold");
        }

        fields.set("counter", counter)?;
        Ok(Vec::new())
    }
}

pub struct MyModelEntity;

impl MyModelEntity {
    pub const MODEL: &'static str = "models/gibs/airboat_broken_engine.mdl";

    /// Flip between moving and idle. Returns the new state.
    pub fn input_toggle(fields: &mut EntityFields, curtime: f32) -> Result<bool, FieldError> {
        let active = !fields
            .get("active")
            .and_then(FieldValue::as_bool)
            .unwrap_or(false);
        if active {
            // Pick a new direction on the next think.
            fields.set("nextchangetime", curtime)?;
        }
        fields.set("active", active)?;
        Ok(active)
    }
}

impl EntityClass for MyModelEntity {
    fn describe() -> EntityClassDescriptor {
        EntityClassDescriptor::new("my_model_entity", NativeClass::BaseAnimating)
            .studio(Self::MODEL)
            .schema(
                FieldSchema::new()
                    .field(FieldMeta::boolean("active"))
                    .field(FieldMeta::float("nextchangetime"))
                    .input("Toggle", "input_toggle"),
            )
    }
}

pub struct MyBrushEntity;

impl EntityClass for MyBrushEntity {
    fn describe() -> EntityClassDescriptor {
        EntityClassDescriptor::new("my_brush_entity", NativeClass::BaseTrigger)
    }
}

/// Always transmitted; both fields replicate to the client.
pub struct NetEntExample;

impl EntityClass for NetEntExample {
    fn describe() -> EntityClassDescriptor {
        EntityClassDescriptor::new("netent_example", NativeClass::BaseEntity)
            .networked()
            .schema(
                FieldSchema::new()
                    .field(
                        FieldMeta::integer("netvalue")
                            .networked()
                            .on_change("OnNetValueChanged"),
                    )
                    .field(FieldMeta::dict("netdict").networked().on_change("OnNetDictChanged")),
            )
    }
}

/// What the engine passes along with an input.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputData {
    pub curtime: f32,
}

pub type InputHandler =
    fn(&mut EntityFields, &InputData) -> Result<Vec<OutputConnection>, FieldError>;

/// Handlers by the name an entity schema declares for its inputs.
const INPUT_HANDLERS: &[(&str, InputHandler)] = &[
    ("input_tick", |fields, _| MyLogicalEntity::input_tick(fields)),
    ("input_toggle", |fields, data| {
        MyModelEntity::input_toggle(fields, data.curtime).map(|_| Vec::new())
    }),
];

/// Deliver `input` to an entity: resolve it through the schema (case
/// insensitive), run the named handler and return the outputs it fired.
pub fn fire_input(
    fields: &mut EntityFields,
    input: &str,
    data: &InputData,
) -> anyhow::Result<Vec<OutputConnection>> {
    let handler = fields
        .schema()
        .resolve_input(input)
        .map(|meta| meta.handler().to_string())
        .with_context(|| format!("entity has no input '{input}'"))?;
    let (_, run) = INPUT_HANDLERS
        .iter()
        .find(|(name, _)| *name == handler)
        .with_context(|| format!("no handler named '{handler}'"))?;
    Ok((*run)(fields, data)?)
}

pub fn register_examples(
    registry: &mut EntityClassRegistry,
) -> Result<Vec<ClassHandle>, RegistrationError> {
    Ok(vec![
        registry.register::<EntExample>()?,
        registry.register::<MyLogicalEntity>()?,
        registry.register::<MyModelEntity>()?,
        registry.register::<MyBrushEntity>()?,
        registry.register::<NetEntExample>()?,
    ])
}

fn integer(fields: &EntityFields, name: &str) -> i64 {
    fields
        .get(name)
        .and_then(FieldValue::as_integer)
        .unwrap_or_default()
}
