#[allow(non_snake_case)]
pub mod Comms {
    pub mod Wire {
        pub mod header;
        pub mod location;
        pub mod schema;
        pub use header::{cyclic_age, to_cyclic_round, Header, MAX_PRIORITY, ROUND_CYCLE};
        pub use location::Location;
    }
    pub mod Structs {
        pub mod Message_Structs;
        pub use Message_Structs::*;
    }
    pub mod Region {
        pub mod layout;
        pub mod Region;
        pub mod Region_impl;
        pub use layout::{ChannelLayout, DEFAULT_HEADER_SLOTS, DEFAULT_SHARED_LEN, MAX_REGION_LEN};
        pub use Region::{MapSymmetry, RegionTracker};
    }
    pub mod builder;
    pub mod communicator;
    pub mod reader;
    pub mod sender;

    pub use builder::ChannelBuilder;
    pub use communicator::Communicator;
    pub use reader::{ChannelReader, MessageHandler, Responder};
    pub use sender::{DrainReport, SendScheduler};
}
#[allow(non_snake_case)]
pub mod Core {
    pub mod context;
    pub mod engine;
    pub mod view;
    pub mod SharedArray;
    pub use SharedArray::{attach_shared_array, create_shared_array, HeapSharedArray, RawHandle, SharedArrayBackend};
}
#[allow(non_snake_case)]
pub mod Debug {
    pub mod StructDebug;
}
pub mod error;

pub use error::{CommsError, Result};
