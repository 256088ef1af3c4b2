//! End-to-end tests against a scripted module on the far side of a pipe

use std::time::Duration;

use as608::{ChunkSize, Device, EnrollOptions, Error, Status};
use as608_core::{constants::image::PACKED_SIZE, Address, Frame, FrameType};
use as608_transport::codec;
use pretty_assertions::assert_eq;
use tokio::io::{duplex, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

/// One expected command and every frame the module answers it with
type Exchange = (Vec<u8>, Vec<Frame>);

fn ack(payload: &[u8]) -> Frame {
    Frame::new(Address::BROADCAST, FrameType::Ack, payload.to_vec())
}

/// Split a payload into `Data` frames closed by an `End` frame
fn fragments(payload: &[u8], chunk: usize) -> Vec<Frame> {
    let chunks: Vec<_> = payload.chunks(chunk).collect();
    let last = chunks.len() - 1;

    chunks
        .into_iter()
        .enumerate()
        .map(|(i, part)| {
            let ty = if i == last { FrameType::End } else { FrameType::Data };
            Frame::new(Address::BROADCAST, ty, part.to_vec())
        })
        .collect()
}

fn spawn_module(mut stream: DuplexStream, script: Vec<Exchange>) -> JoinHandle<DuplexStream> {
    tokio::spawn(async move {
        for (expected, replies) in script {
            let command = codec::read_frame(&mut stream).await.unwrap();
            assert_eq!(command.frame_type, FrameType::Command);
            assert_eq!(command.payload.to_vec(), expected);

            for frame in replies {
                stream.write_all(&frame.encode().unwrap()).await.unwrap();
            }
        }
        stream
    })
}

fn setup(script: Vec<Exchange>) -> (Device, JoinHandle<DuplexStream>) {
    let (host, module) = duplex(256 * 1024);
    let device = Device::open(host).with_poll_interval(Duration::from_millis(10));

    (device, spawn_module(module, script))
}

fn info_block() -> Vec<u8> {
    let mut block = vec![0u8; 128];
    block[4..6].copy_from_slice(&300u16.to_be_bytes());
    block[6..8].copy_from_slice(&3u16.to_be_bytes());
    block[52..60].copy_from_slice(b"AS608\0\0\0");
    block[126..128].copy_from_slice(&[0x12, 0x34]);
    block
}

#[tokio::test]
async fn test_device_info_over_fragments() {
    let (device, module) = setup(vec![(
        vec![0x16],
        [vec![ack(&[0x00])], fragments(&info_block(), 32)].concat(),
    )]);

    let info = device.device_info().await.unwrap();

    assert_eq!(info.database_size, 300);
    assert_eq!(info.security_level, 3);
    assert_eq!(info.sensor_name, "AS608");
    module.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_capture_polls_without_finger() {
    let (host, module) = duplex(4096);
    let device = Device::open(host);
    let module = spawn_module(
        module,
        vec![
            (vec![0x01], vec![ack(&[0x02])]),
            (vec![0x01], vec![ack(&[0x02])]),
            (vec![0x01], vec![ack(&[0x00])]),
        ],
    );

    let started = tokio::time::Instant::now();
    device.capture_image().await.unwrap();

    // Two no-finger replies, one default poll interval each
    assert!(started.elapsed() >= Duration::from_secs(2));
    module.await.unwrap();
}

#[tokio::test]
async fn test_upload_image() {
    let mut packed = vec![0x88u8; PACKED_SIZE];
    packed[0] = 0x1F;

    let (device, module) = setup(vec![
        (vec![0x01], vec![ack(&[0x00])]),
        (vec![0x0A], [vec![ack(&[0x00])], fragments(&packed, 128)].concat()),
    ]);

    let raster = device.upload_image().await.unwrap();

    assert_eq!(raster.samples().len(), 256 * 288);
    assert_eq!(raster.pixel(0, 0), Some(0x10));
    assert_eq!(raster.pixel(1, 0), Some(0xF0));
    assert_eq!(raster.pixel(2, 0), Some(0x80));
    module.await.unwrap();
}

#[tokio::test]
async fn test_search_and_enroll() {
    let mut page0 = vec![0x00, 0b0000_0111];
    page0.resize(33, 0);
    let page1 = vec![0x00; 33];

    let (device, module) = setup(vec![
        (
            vec![0x32, 0x03, 0xFF, 0xFF, 0x00, 0x00],
            vec![
                ack(&[0x00, 0x00]),
                ack(&[0x00, 0x01]),
                ack(&[0x09, 0x05, 0xFF, 0xFF, 0x00, 0x00]),
            ],
        ),
        (vec![0x1F, 0x00], vec![ack(&page0)]),
        (vec![0x1F, 0x01], vec![ack(&page1)]),
        (
            vec![0x31, 0x00, 0x03, 0x02, 0x00, 0x10],
            vec![
                ack(&[0x00, 0x00, 0x00]),
                ack(&[0x00, 0x01, 0x01]),
                ack(&[0x00, 0x02, 0x01]),
                ack(&[0x00, 0x03, 0x01]),
                ack(&[0x00, 0x01, 0x02]),
                ack(&[0x00, 0x02, 0x02]),
                ack(&[0x00, 0x04, 0xF0]),
                ack(&[0x00, 0x05, 0xF1]),
                ack(&[0x00, 0x06, 0xF2]),
            ],
        ),
    ]);

    let result = device.search().await.unwrap();
    assert!(!result.is_found());

    let mut steps = Vec::new();
    let index = device
        .enroll_with(EnrollOptions::default(), |event| steps.push(event.step))
        .await
        .unwrap();

    assert_eq!(index, 3);
    assert_eq!(steps.len(), 9);
    module.await.unwrap();
}

#[tokio::test]
async fn test_clones_do_not_interleave() {
    let (device, module) = setup(vec![
        (vec![0x1D], vec![ack(&[0x00, 0x00, 0x05])]),
        (vec![0x34], vec![ack(&[0x00, 0xCA, 0xFE])]),
    ]);

    let counter = device.clone();
    let count = tokio::spawn(async move { counter.template_count().await });
    // Let the count conversation take the lock first
    while device.session().state() == as608::SessionState::Open {
        tokio::task::yield_now().await;
    }
    let serial = device.serial_number().await.unwrap();

    assert_eq!(count.await.unwrap().unwrap(), 5);
    assert_eq!(serial, "CAFE");
    module.await.unwrap();
}

#[tokio::test]
async fn test_reply_timeout() {
    let (host, _module) = duplex(4096);
    let device = Device::open(host).with_timeout(Duration::from_millis(50));

    let err = device.template_count().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(as608_transport::Error::Timeout(_))
    ));
    assert!(err.is_recoverable());
}

#[tokio::test(start_paused = true)]
async fn test_late_reply_after_timeout() {
    let (host, mut module) = duplex(4096);
    let device = Device::open(host).with_timeout(Duration::from_millis(50));
    let module = tokio::spawn(async move {
        let count = codec::read_frame(&mut module).await.unwrap();
        assert_eq!(count.payload.to_vec(), vec![0x1D]);
        tokio::time::sleep(Duration::from_millis(80)).await;
        module
            .write_all(&ack(&[0x00, 0x00, 0x05]).encode().unwrap())
            .await
            .unwrap();

        let serial = codec::read_frame(&mut module).await.unwrap();
        assert_eq!(serial.payload.to_vec(), vec![0x34]);
        module
            .write_all(&ack(&[0x00, 0xCA, 0xFE]).encode().unwrap())
            .await
            .unwrap();
        module
    });

    let err = device.template_count().await.unwrap_err();
    assert!(matches!(
        err,
        Error::Transport(as608_transport::Error::Timeout(_))
    ));
    assert!(err.is_recoverable());

    // The count reply lands after the timeout and must not answer this
    assert_eq!(device.serial_number().await.unwrap(), "CAFE");
    module.await.unwrap();
}

#[tokio::test]
async fn test_device_error_reply() {
    let (device, module) = setup(vec![(vec![0x0D], vec![ack(&[0x11])])]);

    let err = device.clear_database().await.unwrap_err();

    assert_eq!(err.status(), Some(Status::ClearFailed));
    module.await.unwrap();
}

#[tokio::test]
async fn test_corrupted_reply() {
    let mut bad = ack(&[0x00, 0x00, 0x05]).encode().unwrap().to_vec();
    let last = bad.len() - 1;
    bad[last] ^= 0xFF;

    let (host, mut module) = duplex(4096);
    let device = Device::open(host);
    let reply = tokio::spawn(async move {
        codec::read_frame(&mut module).await.unwrap();
        module.write_all(&bad).await.unwrap();
        module
    });

    let err = device.template_count().await.unwrap_err();

    assert!(matches!(
        err,
        Error::Transport(as608_transport::Error::Frame(
            as608_core::Error::ChecksumMismatch { .. }
        ))
    ));
    reply.await.unwrap();
}

#[tokio::test]
async fn test_close() {
    let (device, _module) = setup(Vec::new());
    let device = device.with_chunk_size(ChunkSize::B128);

    device.close().await.unwrap();

    assert!(device.is_closed());
    assert!(device.template_count().await.unwrap_err().is_closed());
}
