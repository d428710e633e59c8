use crate::{
    AggregateRoot, AggregateState, EsError, Event, Result,
    datacenter::{DeviceTemplate, Function, HardwareModel},
    events::v1,
    store::AggregateStore,
};

const DEFAULT_VARIANT: &str = "default";

/// State of the device-template aggregate.
#[derive(Debug, Default)]
pub struct DeviceTemplateState {
    pub template: DeviceTemplate,
}

impl AggregateState for DeviceTemplateState {
    const TYPE: &'static str = "deviceTemplate";

    fn when(&mut self, event: &Event) -> Result<()> {
        match event.event_type.as_str() {
            v1::DEVICE_TEMPLATE_CREATED => self.on_created(event),
            other => Err(EsError::InvalidEventType(other.to_string())),
        }
    }
}

impl DeviceTemplateState {
    fn on_created(&mut self, event: &Event) -> Result<()> {
        let data: v1::DeviceTemplateCreatedEvent = event.get_json_data()?;

        self.template.variant = data.variant;
        self.template.categories = data.categories;
        self.template.hostname_template = data.hostname_template;
        self.template.alias = data.alias;
        self.template.function = data.function;
        self.template.model = HardwareModel {
            id: data.model_id,
            form_factor: data.form_factor,
            ..Default::default()
        };
        Ok(())
    }
}

pub type DeviceTemplateAggregate = AggregateRoot<DeviceTemplateState>;

impl AggregateRoot<DeviceTemplateState> {
    /// Records the creation of the template. An empty variant falls back to
    /// `default`; empty categories fall back to `x` for the default variant
    /// and to the variant name otherwise.
    pub fn create_device_template(
        &mut self,
        model_id: &str,
        form_factor: usize,
        variant: &str,
        categories: Vec<String>,
        hostname_template: &str,
        alias: &str,
        function: &str,
    ) -> Result<()> {
        if model_id.is_empty() {
            return Err(self.validation_error("modelId not provided"));
        }
        if form_factor == 0 {
            return Err(self.validation_error("model form factor not provided"));
        }

        let variant = if variant.is_empty() {
            DEFAULT_VARIANT.to_string()
        } else {
            variant.to_lowercase()
        };

        let categories = if categories.is_empty() {
            if variant == DEFAULT_VARIANT {
                vec!["x".to_string()]
            } else {
                vec![variant.clone()]
            }
        } else {
            categories.into_iter().map(|c| c.to_lowercase()).collect()
        };

        let alias = alias.to_lowercase();

        let parsed_function = if function.is_empty() {
            Function::Unspecified
        } else {
            let parsed = Function::parse(function);
            if parsed == Function::Unspecified {
                return Err(
                    self.validation_error(format!("invalid function specified: {function}"))
                );
            }
            parsed
        };

        let event = v1::new_device_template_created_event(
            self,
            v1::DeviceTemplateCreatedEvent {
                model_id: model_id.to_string(),
                form_factor,
                variant,
                categories,
                hostname_template: hostname_template.to_string(),
                alias,
                function: parsed_function,
            },
        )?;
        self.apply(event)
    }
}

/// Loads the device-template aggregate for the given entity id, replaying
/// its stream.
pub async fn load_device_template_aggregate(
    store: &impl AggregateStore,
    aggregate_id: &str,
) -> Result<DeviceTemplateAggregate> {
    let mut template = DeviceTemplateAggregate::new(aggregate_id);
    store.load(&mut template).await?;
    Ok(template)
}
