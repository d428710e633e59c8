use std::collections::HashMap;

use tracing::debug;

use crate::{
    Command, EsError, Result,
    aggregates::{
        DatacenterAggregate, DeviceAggregate, DeviceSpec, DeviceTemplateAggregate, PodAggregate,
        RackAggregate, load_datacenter_aggregate, load_device_template_aggregate,
        load_pod_aggregate, load_rack_aggregate,
    },
    store::AggregateStore,
};

/// Fails with [`EsError::AlreadyExists`] when a stream is already persisted
/// for the stream id, distinguishing the create path from the update path.
async fn ensure_new(store: &impl AggregateStore, stream_id: &str) -> Result<()> {
    match store.exists(stream_id).await {
        Ok(()) => Err(EsError::AlreadyExists),
        Err(EsError::AggregateNotFound) => Ok(()),
        Err(err) => Err(err),
    }
}

#[derive(Clone, Debug)]
pub struct InitDatacenterCommand {
    pub aggregate_id: String,
    pub site: String,
    pub building: String,
    pub room: String,
    pub providers: HashMap<String, String>,
}

impl Command for InitDatacenterCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct InitDatacenterHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> InitDatacenterHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: InitDatacenterCommand) -> Result<()> {
        let mut datacenter = DatacenterAggregate::new(&cmd.aggregate_id);
        ensure_new(&self.store, datacenter.id()).await?;

        datacenter.create_datacenter(&cmd.site, &cmd.building, &cmd.room, cmd.providers)?;

        debug!(stream_id = datacenter.id(), site = cmd.site, "initializing datacenter");
        self.store.save(&mut datacenter).await
    }
}

#[derive(Clone, Debug)]
pub struct CreateRackCommand {
    pub aggregate_id: String,
    pub name: String,
    pub size: usize,
    pub datacenter_id: String,
}

impl Command for CreateRackCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct CreateRackHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> CreateRackHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateRackCommand) -> Result<()> {
        let mut rack = RackAggregate::new(&cmd.aggregate_id);
        ensure_new(&self.store, rack.id()).await?;

        rack.create_rack(&cmd.name, cmd.size, &cmd.datacenter_id)?;

        debug!(stream_id = rack.id(), name = cmd.name, "creating rack");
        self.store.save(&mut rack).await
    }
}

#[derive(Clone, Debug)]
pub struct DatacenterAddRackCommand {
    pub aggregate_id: String,
    pub rack_id: String,
}

impl Command for DatacenterAddRackCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct DatacenterAddRackHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> DatacenterAddRackHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: DatacenterAddRackCommand) -> Result<()> {
        let mut datacenter = load_datacenter_aggregate(&self.store, &cmd.aggregate_id).await?;

        datacenter.add_rack(&cmd.rack_id)?;

        debug!(
            stream_id = datacenter.id(),
            rack_id = cmd.rack_id,
            "registering rack with datacenter"
        );
        self.store.save(&mut datacenter).await
    }
}

#[derive(Clone, Debug)]
pub struct CreatePodCommand {
    pub aggregate_id: String,
    pub function: String,
    pub datacenter_id: String,
}

impl Command for CreatePodCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct CreatePodHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> CreatePodHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    /// The datacenter aggregate is replayed alongside the new pod so the
    /// pod's instance number reflects the datacenter's per-function counter.
    pub async fn handle(&self, cmd: CreatePodCommand) -> Result<()> {
        let mut pod = PodAggregate::new(&cmd.aggregate_id);
        ensure_new(&self.store, pod.id()).await?;

        let datacenter = load_datacenter_aggregate(&self.store, &cmd.datacenter_id).await?;
        pod.create_pod(&cmd.function, &datacenter.state().datacenter)?;

        debug!(stream_id = pod.id(), function = cmd.function, "creating pod");
        self.store.save(&mut pod).await
    }
}

#[derive(Clone, Debug)]
pub struct DatacenterAddPodCommand {
    pub aggregate_id: String,
    pub pod_id: String,
}

impl Command for DatacenterAddPodCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct DatacenterAddPodHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> DatacenterAddPodHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    /// Replays the pod aggregate to learn its function, which the
    /// datacenter's per-function instance counter needs.
    pub async fn handle(&self, cmd: DatacenterAddPodCommand) -> Result<()> {
        let mut datacenter = load_datacenter_aggregate(&self.store, &cmd.aggregate_id).await?;
        let pod = load_pod_aggregate(&self.store, &cmd.pod_id).await?;

        datacenter.add_pod(&cmd.pod_id, pod.state().pod.function)?;

        debug!(
            stream_id = datacenter.id(),
            pod_id = cmd.pod_id,
            "registering pod with datacenter"
        );
        self.store.save(&mut datacenter).await
    }
}

#[derive(Clone, Debug)]
pub struct RackAddDeviceCommand {
    pub aggregate_id: String,
    pub device_id: String,
    /// Zero places the device at the next available elevation, top-down.
    pub elevation: usize,
    pub form_factor: usize,
}

impl Command for RackAddDeviceCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct RackAddDeviceHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> RackAddDeviceHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: RackAddDeviceCommand) -> Result<()> {
        let mut rack = load_rack_aggregate(&self.store, &cmd.aggregate_id).await?;

        rack.add_device(&cmd.device_id, cmd.elevation, cmd.form_factor)?;

        debug!(
            stream_id = rack.id(),
            device_id = cmd.device_id,
            "placing device in rack"
        );
        self.store.save(&mut rack).await
    }
}

#[derive(Clone, Debug)]
pub struct CreateDeviceTemplateCommand {
    pub aggregate_id: String,
    pub model_id: String,
    /// Slot footprint of the model, in rack units.
    pub form_factor: usize,
    pub variant: String,
    pub categories: Vec<String>,
    pub hostname_template: String,
    pub alias: String,
    pub function: String,
}

impl Command for CreateDeviceTemplateCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct CreateDeviceTemplateHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> CreateDeviceTemplateHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    pub async fn handle(&self, cmd: CreateDeviceTemplateCommand) -> Result<()> {
        let mut template = DeviceTemplateAggregate::new(&cmd.aggregate_id);
        ensure_new(&self.store, template.id()).await?;

        template.create_device_template(
            &cmd.model_id,
            cmd.form_factor,
            &cmd.variant,
            cmd.categories,
            &cmd.hostname_template,
            &cmd.alias,
            &cmd.function,
        )?;

        debug!(
            stream_id = template.id(),
            model_id = cmd.model_id,
            "creating device template"
        );
        self.store.save(&mut template).await
    }
}

#[derive(Clone, Debug)]
pub struct CreateDeviceCommand {
    pub aggregate_id: String,
    pub template_id: String,
    pub rack_id: String,
    /// Empty for devices that belong to no pod.
    pub pod_id: String,
    pub hostname: String,
    /// Zero places the device at the next available elevation, top-down.
    pub elevation: usize,
    pub cluster: usize,
    pub designation: String,
    pub instance: usize,
}

impl Command for CreateDeviceCommand {
    fn aggregate_id(&self) -> &str {
        &self.aggregate_id
    }
}

pub struct CreateDeviceHandler<ST: AggregateStore> {
    store: ST,
}

impl<ST: AggregateStore> CreateDeviceHandler<ST> {
    pub fn new(store: ST) -> Self {
        Self { store }
    }

    /// Replays the template, rack, and (when given) pod aggregates to
    /// validate the placement. Only the device stream is written; racking
    /// the device is a separate [`RackAddDeviceCommand`].
    pub async fn handle(&self, cmd: CreateDeviceCommand) -> Result<()> {
        let mut device = DeviceAggregate::new(&cmd.aggregate_id);
        ensure_new(&self.store, device.id()).await?;

        let template = load_device_template_aggregate(&self.store, &cmd.template_id).await?;
        let rack = load_rack_aggregate(&self.store, &cmd.rack_id).await?;
        let pod = if cmd.pod_id.is_empty() {
            None
        } else {
            Some(load_pod_aggregate(&self.store, &cmd.pod_id).await?)
        };

        device.create_device(DeviceSpec {
            template: &template.state().template,
            rack: &rack.state().rack,
            pod: pod.as_ref().map(|p| &p.state().pod),
            hostname: &cmd.hostname,
            elevation: cmd.elevation,
            cluster: cmd.cluster,
            designation: &cmd.designation,
            instance: cmd.instance,
        })?;

        debug!(
            stream_id = device.id(),
            hostname = cmd.hostname,
            rack_id = cmd.rack_id,
            "creating device"
        );
        self.store.save(&mut device).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregates::load_device_aggregate,
        datacenter::{Designation, Function},
        store::InMemoryStore,
    };

    async fn seed_datacenter(store: &InMemoryStore) {
        InitDatacenterHandler::new(store.clone())
            .handle(InitDatacenterCommand {
                aggregate_id: "dc1".to_string(),
                site: "ASH".to_string(),
                building: "b2".to_string(),
                room: "r7".to_string(),
                providers: HashMap::new(),
            })
            .await
            .unwrap();
    }

    async fn seed_rack(store: &InMemoryStore, id: &str) {
        CreateRackHandler::new(store.clone())
            .handle(CreateRackCommand {
                aggregate_id: id.to_string(),
                name: id.to_string(),
                size: 0,
                datacenter_id: "dc1".to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn init_datacenter_persists_and_rejects_duplicates() {
        let store = InMemoryStore::new();
        seed_datacenter(&store).await;

        let datacenter = load_datacenter_aggregate(&store, "dc1").await.unwrap();
        assert_eq!(datacenter.version(), 1);
        assert_eq!(datacenter.state().datacenter.site, "ash");

        let err = InitDatacenterHandler::new(store.clone())
            .handle(InitDatacenterCommand {
                aggregate_id: "dc1".to_string(),
                site: "den".to_string(),
                building: String::new(),
                room: String::new(),
                providers: HashMap::new(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EsError::AlreadyExists));
    }

    #[tokio::test]
    async fn pod_instances_count_per_function() {
        let store = InMemoryStore::new();
        seed_datacenter(&store).await;

        let pods = CreatePodHandler::new(store.clone());
        let registry = DatacenterAddPodHandler::new(store.clone());

        for id in ["p1", "p2"] {
            pods.handle(CreatePodCommand {
                aggregate_id: id.to_string(),
                function: "svc".to_string(),
                datacenter_id: "dc1".to_string(),
            })
            .await
            .unwrap();
            registry
                .handle(DatacenterAddPodCommand {
                    aggregate_id: "dc1".to_string(),
                    pod_id: id.to_string(),
                })
                .await
                .unwrap();
        }

        let first = load_pod_aggregate(&store, "p1").await.unwrap();
        assert_eq!(first.state().pod.name, "service1");
        let second = load_pod_aggregate(&store, "p2").await.unwrap();
        assert_eq!(second.state().pod.name, "service2");
        assert_eq!(second.state().pod.instance, 2);

        let datacenter = load_datacenter_aggregate(&store, "dc1").await.unwrap();
        assert_eq!(
            datacenter.state().datacenter.num_pod_instances(Function::Service),
            2
        );
    }

    #[tokio::test]
    async fn create_pod_requires_existing_datacenter() {
        let store = InMemoryStore::new();
        let err = CreatePodHandler::new(store.clone())
            .handle(CreatePodCommand {
                aggregate_id: "p1".to_string(),
                function: "svc".to_string(),
                datacenter_id: "dc1".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EsError::AggregateNotFound));
    }

    async fn seed_template(store: &InMemoryStore, id: &str, form_factor: usize, function: &str) {
        CreateDeviceTemplateHandler::new(store.clone())
            .handle(CreateDeviceTemplateCommand {
                aggregate_id: id.to_string(),
                model_id: "m1".to_string(),
                form_factor,
                variant: String::new(),
                categories: Vec::new(),
                hostname_template: String::new(),
                alias: String::new(),
                function: function.to_string(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rack_placement_flow() {
        let store = InMemoryStore::new();
        seed_datacenter(&store).await;
        seed_rack(&store, "r1").await;

        DatacenterAddRackHandler::new(store.clone())
            .handle(DatacenterAddRackCommand {
                aggregate_id: "dc1".to_string(),
                rack_id: "r1".to_string(),
            })
            .await
            .unwrap();

        RackAddDeviceHandler::new(store.clone())
            .handle(RackAddDeviceCommand {
                aggregate_id: "r1".to_string(),
                device_id: "d1".to_string(),
                elevation: 0,
                form_factor: 2,
            })
            .await
            .unwrap();

        let rack = load_rack_aggregate(&store, "r1").await.unwrap();
        assert_eq!(rack.state().rack.devices().len(), 1);
        assert_eq!(rack.state().rack.devices()[0].elevation, 44);

        // a second device with a fixed elevation that collides
        let err = RackAddDeviceHandler::new(store.clone())
            .handle(RackAddDeviceCommand {
                aggregate_id: "r1".to_string(),
                device_id: "d2".to_string(),
                elevation: 44,
                form_factor: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EsError::UnableToFitDevice { .. }));

        let datacenter = load_datacenter_aggregate(&store, "dc1").await.unwrap();
        assert_eq!(datacenter.state().datacenter.racks.len(), 1);
    }

    #[tokio::test]
    async fn create_device_end_to_end() {
        let store = InMemoryStore::new();
        seed_datacenter(&store).await;
        seed_rack(&store, "r1").await;
        seed_template(&store, "t1", 2, "svc").await;

        CreatePodHandler::new(store.clone())
            .handle(CreatePodCommand {
                aggregate_id: "p1".to_string(),
                function: "svc".to_string(),
                datacenter_id: "dc1".to_string(),
            })
            .await
            .unwrap();

        CreateDeviceHandler::new(store.clone())
            .handle(CreateDeviceCommand {
                aggregate_id: "d1".to_string(),
                template_id: "t1".to_string(),
                rack_id: "r1".to_string(),
                pod_id: "p1".to_string(),
                hostname: "ash-svc1-d1".to_string(),
                elevation: 0,
                cluster: 0,
                designation: "a".to_string(),
                instance: 1,
            })
            .await
            .unwrap();

        let device = load_device_aggregate(&store, "d1").await.unwrap();
        let state = &device.state().device;
        assert_eq!(state.hostname, "ash-svc1-d1");
        assert_eq!(state.elevation, 44);
        assert_eq!(state.pod_id, "p1");
        assert_eq!(state.rack_id, "r1");
        assert_eq!(state.model.id, "m1");
        assert_eq!(state.designation, Designation::Primary);
    }

    #[tokio::test]
    async fn create_device_rejects_pod_function_conflict() {
        let store = InMemoryStore::new();
        seed_datacenter(&store).await;
        seed_rack(&store, "r1").await;
        seed_template(&store, "t1", 2, "storage").await;

        CreatePodHandler::new(store.clone())
            .handle(CreatePodCommand {
                aggregate_id: "p1".to_string(),
                function: "compute".to_string(),
                datacenter_id: "dc1".to_string(),
            })
            .await
            .unwrap();

        let err = CreateDeviceHandler::new(store.clone())
            .handle(CreateDeviceCommand {
                aggregate_id: "d1".to_string(),
                template_id: "t1".to_string(),
                rack_id: "r1".to_string(),
                pod_id: "p1".to_string(),
                hostname: "ash-stg1-d1".to_string(),
                elevation: 0,
                cluster: 0,
                designation: String::new(),
                instance: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, EsError::CommandValidation { .. }));

        // nothing was written to the device stream
        let missing = load_device_aggregate(&store, "d1").await.unwrap_err();
        assert!(matches!(missing, EsError::AggregateNotFound));
    }
}
