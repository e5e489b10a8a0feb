//! Standard simulation events.

// BROKER EVENTS ///////////////////////////////////////////////////////////////////////////////////

pub mod broker {
    use serde::Serialize;

    /// Starts the broker workflow using the specified datacenters in the given order.
    #[derive(Serialize, Clone)]
    pub struct BrokerStart {
        pub datacenters: Vec<u32>,
    }
}

// DATACENTER EVENTS ///////////////////////////////////////////////////////////////////////////////

pub mod datacenter {
    use serde::Serialize;

    use crate::core::characteristics::DatacenterCharacteristics;

    #[derive(Serialize, Clone)]
    pub struct CharacteristicsRequest {}

    #[derive(Serialize, Clone)]
    pub struct CharacteristicsReply {
        pub characteristics: DatacenterCharacteristics,
        pub host_count: u32,
        pub pe_count: u32,
        pub total_mips: f64,
    }

    #[derive(Serialize, Clone)]
    pub struct UpdateProcessing {}
}

// VM LIFECYCLE EVENTS /////////////////////////////////////////////////////////////////////////////

pub mod vm {
    use serde::Serialize;

    use crate::core::vm::Vm;

    #[derive(Serialize, Clone)]
    pub struct VmCreateRequest {
        pub vm: Vm,
        pub ack: bool,
    }

    /// Result of VM creation, `host_id` is `None` if the VM was not created.
    #[derive(Serialize, Clone)]
    pub struct VmCreateAck {
        pub vm_id: u32,
        pub owner_id: u32,
        pub host_id: Option<u32>,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyRequest {
        pub vm_id: u32,
        pub owner_id: u32,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct VmDestroyAck {
        pub vm_id: u32,
        pub owner_id: u32,
    }
}

// CLOUDLET EVENTS /////////////////////////////////////////////////////////////////////////////////

pub mod cloudlet {
    use serde::Serialize;

    use crate::core::cloudlet::Cloudlet;

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmit {
        pub cloudlet: Cloudlet,
        pub ack: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletSubmitAck {
        pub cloudlet_id: u32,
        pub vm_id: Option<u32>,
        pub accepted: bool,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletCancel {
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub owner_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletPause {
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub owner_id: u32,
    }

    #[derive(Serialize, Clone)]
    pub struct CloudletResume {
        pub cloudlet_id: u32,
        pub vm_id: u32,
        pub owner_id: u32,
    }

    /// Cloudlet in a terminal status sent back to its owner.
    #[derive(Serialize, Clone)]
    pub struct CloudletReturn {
        pub cloudlet: Cloudlet,
    }
}
