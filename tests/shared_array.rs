// Named /dev/shm arrays and builder validation.
//
// Tests that create files under /dev/shm run serially and remove what they create.

mod common;

use std::sync::Arc;

use common::*;
use serial_test::serial;
use swarmcast::Comms::ChannelBuilder;
use swarmcast::Core::RawHandle;
use swarmcast::CommsError;

#[test]
fn geometry_is_validated() {
    for (shared_len, header_slots) in [(66, 1), (4, 1), (21, 0), (3, 5)] {
        let builder = ChannelBuilder::new()
            .with_shared_len(shared_len)
            .with_header_slots(header_slots);
        assert!(
            matches!(builder.build_layout(), Err(CommsError::InvalidConfig(_))),
            "N={} K={} accepted",
            shared_len,
            header_slots
        );
        assert!(builder.build_shared().is_err());
        assert!(builder.build_communicator().is_err());
    }

    let layout = ChannelBuilder::new()
        .with_shared_len(32)
        .with_header_slots(2)
        .build_layout()
        .unwrap();
    assert_eq!(layout.region_len(), 30);
    assert_eq!(layout.header_index(), 30);
}

#[test]
fn context_must_match_the_array() {
    let (_, shared) = heap_channel(32);
    let builder = ChannelBuilder::new();
    assert!(matches!(
        builder.build_context(Arc::clone(&shared), 0, 0),
        Err(CommsError::InvalidConfig(_))
    ));
    assert!(builder.build_engine(shared).is_err());
}

#[test]
fn shm_needs_a_name() {
    let builder = ChannelBuilder::new();
    assert!(matches!(builder.build_shared_in_shm(), Err(CommsError::InvalidConfig(_))));
    assert!(matches!(builder.attach_shared_in_shm(), Err(CommsError::InvalidConfig(_))));
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn attached_array_sees_the_same_channel() {
    init_logging();
    let name = format!("swarmcast_test_{}", std::process::id());
    let builder = ChannelBuilder::new().with_shm_name(name.clone());

    let created = builder.build_shared_in_shm().unwrap();
    let attached = builder.attach_shared_in_shm().unwrap();
    assert!(matches!(created.raw_handle(), RawHandle::Fd(_)));
    assert_eq!(attached.len(), 64);

    let mut writer = TestAgent::new(&builder, &created, 0);
    let mut reader = TestAgent::new(&builder, &attached, 1);
    writer.begin(0);
    writer.send(&[raw(42)]);
    reader.begin(0);
    let inbox = reader.read();
    assert_eq!(inbox.len(), 1);
    assert_eq!(raw_tag(&inbox[0].message), Some(42));
    assert_eq!(created.words(), attached.words());

    drop(writer);
    drop(reader);
    drop(created);
    drop(attached);
    std::fs::remove_file(format!("/dev/shm/{}", name)).unwrap();
}

#[cfg(target_os = "linux")]
#[test]
#[serial]
fn attaching_a_missing_array_fails() {
    let builder = ChannelBuilder::new().with_shm_name("swarmcast_test_missing");
    match builder.attach_shared_in_shm() {
        Err(CommsError::Io(err)) => assert_eq!(err.kind(), std::io::ErrorKind::NotFound),
        other => panic!("expected NotFound, got {:?}", other.map(|_| ())),
    }
}
