//! High-level device interface

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info, trace, warn};

use as608_core::{
    constants::{index_table::PAGES, CAPTURE_POLL_INTERVAL},
    Address, ChunkSize, Command, Packet, Session,
};
use as608_transport::{Multiplexer, Transport};
use as608_types::{DeviceInfo, IndexTable, Raster, SearchMatch};

use crate::enroll::{self, EnrollEvent, EnrollOptions, Progress};
use crate::error::{Error, Result};
use crate::search::{self, SearchPhase};

/// AS608 fingerprint module
///
/// Cheap to clone; clones share the transport, the session and the
/// conversation lock, so operations from different tasks run one after
/// the other instead of interleaving on the wire.
///
/// # Examples
///
/// ```no_run
/// use as608::Device;
/// use tokio::net::TcpStream;
///
/// #[tokio::main]
/// async fn main() -> as608::Result<()> {
///     let stream = TcpStream::connect("192.168.1.50:8899").await.unwrap();
///     let device = Device::open(stream);
///
///     let info = device.device_info().await?;
///     println!("Device: {}", info);
///
///     device.close().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Device {
    transport: Arc<dyn Transport>,
    session: Session,
    conversation: Arc<Mutex<()>>,
    timeout: Option<Duration>,
    poll_interval: Duration,
}

impl Device {
    /// Open a device over a duplex byte stream (serial port, TCP bridge, ...)
    pub fn open<S>(stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        Self::with_transport(Arc::new(Multiplexer::new(stream, ChunkSize::default())))
    }

    /// Create a device over an existing transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        let session = Session::new(Address::BROADCAST, transport.chunk_size());

        Self {
            transport,
            session,
            conversation: Arc::new(Mutex::new(())),
            timeout: None,
            poll_interval: CAPTURE_POLL_INTERVAL,
        }
    }

    /// Set module address (default: broadcast)
    pub fn with_address(mut self, address: impl Into<Address>) -> Self {
        self.session = Session::new(address.into(), self.session.chunk_size());
        self
    }

    /// Set outbound chunk size (default: 64 bytes)
    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.transport.set_chunk_size(chunk_size);
        self.session = Session::new(self.session.address(), chunk_size);
        self
    }

    /// Bound every reply wait (default: wait indefinitely)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set delay between capture attempts while no finger is present
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Session shared by all clones
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Module address
    pub fn address(&self) -> Address {
        self.session.address()
    }

    /// Check if closed
    pub fn is_closed(&self) -> bool {
        self.session.is_closed() || self.transport.is_closed()
    }

    /// Close the device
    ///
    /// Waits for the running operation, if any, then closes the transport.
    /// Every clone observes the closed session.
    pub async fn close(&self) -> Result<()> {
        let _conversation = self.conversation.lock().await;

        if !self.session.close() {
            return Ok(());
        }

        info!(address = %self.address(), "Closing device");
        self.transport.close().await?;

        Ok(())
    }

    /// Capture a fingerprint image into the image buffer
    ///
    /// Polls until a finger is placed on the sensor.
    pub async fn capture_image(&self) -> Result<()> {
        let _conversation = self.begin().await?;
        self.capture().await
    }

    /// Capture a fingerprint and upload the image
    pub async fn upload_image(&self) -> Result<Raster> {
        let _conversation = self.begin().await?;

        self.capture().await?;

        let ack = self.transact(Command::UploadImage, &[]).await?;
        match status_of(&ack, Command::UploadImage)? {
            0x00 => {}
            code @ (0x01 | 0x0F) => return Err(Error::from_status(code)),
            code => return Err(Error::UnknownStatus(code)),
        }

        let image = self.receive_reply().await?;
        debug!("Image upload: {} bytes", image.payload.len());

        let raster = Raster::from_packed(&image.payload)?;
        info!("Uploaded {}x{} image", raster.width(), raster.height());

        Ok(raster)
    }

    /// Wait for a finger and search the template library
    ///
    /// A result whose `id` is `0xFFFF` means nothing matched.
    pub async fn search(&self) -> Result<SearchMatch> {
        let _conversation = self.begin().await?;

        self.send_command(Command::AutoSearch, &search::ARGS).await?;

        loop {
            let reply = self.receive_reply().await?;

            if let SearchPhase::Finished(result) = SearchPhase::parse(&reply.payload)? {
                info!("Search finished: {}", result);
                return Ok(result);
            }
        }
    }

    /// Read the occupied template indices
    pub async fn read_index_table(&self) -> Result<IndexTable> {
        let _conversation = self.begin().await?;
        self.index_table().await
    }

    /// Smallest unused template index
    pub async fn next_free_index(&self) -> Result<u16> {
        let _conversation = self.begin().await?;
        self.free_index().await
    }

    /// Enroll a finger at the next free index with default options
    pub async fn enroll(&self) -> Result<u16> {
        self.enroll_with(EnrollOptions::default(), |_| {}).await
    }

    /// Enroll a finger, reporting every accepted step to `progress`
    ///
    /// Returns the index the template was stored at.
    pub async fn enroll_with<F>(&self, options: EnrollOptions, mut progress: F) -> Result<u16>
    where
        F: FnMut(&EnrollEvent) + Send,
    {
        let _conversation = self.begin().await?;

        let index = self.free_index().await?;
        info!(index, captures = options.captures, "Enrolling");

        self.send_command(Command::AutoEnroll, &options.args(index))
            .await?;

        loop {
            let reply = self.receive_reply().await?;

            match enroll::advance(&reply.payload)? {
                Progress::Continue(event) => progress(&event),
                Progress::Done(event) => {
                    progress(&event);
                    info!(index, "Template stored");
                    return Ok(index);
                }
            }
        }
    }

    /// Read the device info block
    pub async fn device_info(&self) -> Result<DeviceInfo> {
        let _conversation = self.begin().await?;

        let ack = self.transact(Command::ReadInfoPage, &[]).await?;
        match status_of(&ack, Command::ReadInfoPage)? {
            0x00 => {}
            code @ (0x01 | 0x0D) => return Err(Error::from_status(code)),
            code => return Err(Error::UnknownStatus(code)),
        }

        let block = self.receive_reply().await?;
        let info = DeviceInfo::parse(&block.payload)?;
        debug!("Device info: {}", info);

        Ok(info)
    }

    /// Read the chip serial number as upper-case hex
    pub async fn serial_number(&self) -> Result<String> {
        let _conversation = self.begin().await?;

        let reply = self.checked(Command::ReadSerial, &[]).await?;
        Ok(hex::encode_upper(reply.body()))
    }

    /// Number of stored templates
    pub async fn template_count(&self) -> Result<u16> {
        let _conversation = self.begin().await?;

        let reply = self.checked(Command::TemplateCount, &[]).await?;
        match reply.body() {
            [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
            body => Err(Error::ProtocolViolation(format!(
                "template count reply carries {} bytes",
                body.len()
            ))),
        }
    }

    /// Delete every stored template
    pub async fn clear_database(&self) -> Result<()> {
        let _conversation = self.begin().await?;

        self.checked(Command::ClearLibrary, &[]).await?;
        warn!("Template library cleared");
        Ok(())
    }

    /// Cancel an automatic enroll or search running on the module
    pub async fn cancel(&self) -> Result<()> {
        let _conversation = self.begin().await?;

        self.checked(Command::Cancel, &[]).await?;
        Ok(())
    }

    /// Put the module to sleep
    pub async fn sleep(&self) -> Result<()> {
        let _conversation = self.begin().await?;

        self.checked(Command::Sleep, &[]).await?;
        info!("Module asleep");
        Ok(())
    }

    // Helper methods

    /// Take the conversation lock and mark the session active
    async fn begin(&self) -> Result<MutexGuard<'_, ()>> {
        self.session.ensure_usable()?;
        let guard = self.conversation.lock().await;

        if self.session.activate()? {
            info!(address = %self.address(), chunk = %self.session.chunk_size(), "Session active");
        }

        Ok(guard)
    }

    async fn capture(&self) -> Result<()> {
        loop {
            let reply = self.transact(Command::GetImage, &[]).await?;

            match status_of(&reply, Command::GetImage)? {
                0x00 => {
                    debug!("Image captured");
                    return Ok(());
                }
                0x02 => {
                    trace!("No finger, retrying in {:?}", self.poll_interval);
                    tokio::time::sleep(self.poll_interval).await;
                }
                code @ (0x01 | 0x03) => return Err(Error::from_status(code)),
                code => {
                    return Err(Error::ProtocolViolation(format!(
                        "unexpected capture status 0x{:02X}",
                        code
                    )))
                }
            }
        }
    }

    async fn index_table(&self) -> Result<IndexTable> {
        let mut table = IndexTable::new();

        for page in 0..PAGES {
            let reply = self.checked(Command::ReadIndexTable, &[page]).await?;
            table.push_page(page, reply.body())?;
        }

        debug!("Index table: {} templates", table.len());
        Ok(table)
    }

    async fn free_index(&self) -> Result<u16> {
        self.index_table().await?.next_free().ok_or(Error::DatabaseFull)
    }

    /// Single exchange whose reply must report success
    async fn checked(&self, command: Command, args: &[u8]) -> Result<Packet> {
        let reply = self.transact(command, args).await?;

        match status_of(&reply, command)? {
            0x00 => Ok(reply),
            code => {
                let err = Error::from_status(code);
                warn!("{} rejected: {}", command, err);
                Err(err)
            }
        }
    }

    async fn transact(&self, command: Command, args: &[u8]) -> Result<Packet> {
        self.send_command(command, args).await?;
        self.receive_reply().await
    }

    async fn send_command(&self, command: Command, args: &[u8]) -> Result<()> {
        debug!(multi_reply = command.is_multi_reply(), "Sending {}", command);

        let packet = Packet::command(self.address(), command, args);
        self.transport.send(&packet).await?;

        Ok(())
    }

    async fn receive_reply(&self) -> Result<Packet> {
        let reply = match self.timeout {
            Some(timeout) => self.transport.receive_timeout(timeout).await?,
            None => self.transport.receive().await?,
        };

        trace!("Reply: {:?}", reply);
        Ok(reply)
    }
}

fn status_of(reply: &Packet, command: Command) -> Result<u8> {
    reply.status().ok_or_else(|| {
        Error::ProtocolViolation(format!("{} reply carries no status byte", command))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    use as608_core::{FrameType, SessionState, Status};
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    /// Transport that records sends and replays canned replies
    #[derive(Default)]
    struct Scripted {
        sent: parking_lot::Mutex<Vec<Vec<u8>>>,
        replies: parking_lot::Mutex<VecDeque<Vec<u8>>>,
        closed: std::sync::atomic::AtomicBool,
    }

    impl Scripted {
        fn new(replies: &[&[u8]]) -> Arc<Self> {
            Arc::new(Self {
                replies: parking_lot::Mutex::new(replies.iter().map(|r| r.to_vec()).collect()),
                ..Default::default()
            })
        }

        fn sent(&self) -> Vec<Vec<u8>> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for Scripted {
        async fn send(&self, packet: &Packet) -> as608_transport::Result<()> {
            self.sent.lock().push(packet.payload.to_vec());
            Ok(())
        }

        async fn receive(&self) -> as608_transport::Result<Packet> {
            let reply = self.replies.lock().pop_front();
            match reply {
                Some(payload) => {
                    Ok(Packet::with_payload(Address::BROADCAST, FrameType::Ack, payload))
                }
                None => Err(as608_transport::Error::Closed),
            }
        }

        async fn receive_timeout(&self, _timeout: Duration) -> as608_transport::Result<Packet> {
            self.receive().await
        }

        async fn close(&self) -> as608_transport::Result<()> {
            self.closed.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok(())
        }

        fn is_closed(&self) -> bool {
            self.closed.load(std::sync::atomic::Ordering::SeqCst)
        }

        fn chunk_size(&self) -> ChunkSize {
            ChunkSize::B64
        }

        fn set_chunk_size(&self, _chunk_size: ChunkSize) {}
    }

    fn device(script: &Arc<Scripted>) -> Device {
        Device::with_transport(script.clone()).with_poll_interval(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_device_create() {
        let script = Scripted::new(&[]);
        let device = device(&script).with_address(0x0000_0001u32);

        assert_eq!(device.address(), Address([0, 0, 0, 1]));
        assert_eq!(device.session().state(), SessionState::Open);
        assert!(!device.is_closed());
        assert!(script.sent().is_empty());
    }

    #[tokio::test]
    async fn test_session_activates_on_first_exchange() {
        let script = Scripted::new(&[&[0x00]]);
        let device = device(&script);

        device.cancel().await.unwrap();

        assert_eq!(device.session().state(), SessionState::Active);
        assert_eq!(script.sent(), vec![vec![0x30]]);
    }

    #[tokio::test]
    async fn test_capture_polls_until_finger() {
        let script = Scripted::new(&[&[0x02], &[0x02], &[0x00]]);
        let device = device(&script);

        device.capture_image().await.unwrap();

        assert_eq!(script.sent(), vec![vec![0x01]; 3]);
    }

    #[tokio::test]
    async fn test_capture_failure() {
        let script = Scripted::new(&[&[0x03]]);
        let err = device(&script).capture_image().await.unwrap_err();

        assert!(matches!(err, Error::DeviceStatus(Status::ImageFailed)));
    }

    #[tokio::test]
    async fn test_capture_unexpected_status() {
        let script = Scripted::new(&[&[0x15]]);
        let err = device(&script).capture_image().await.unwrap_err();

        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn test_empty_reply_is_violation() {
        let script = Scripted::new(&[&[]]);
        let err = device(&script).clear_database().await.unwrap_err();

        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[tokio::test]
    async fn test_upload_image() {
        let mut image = vec![0x12u8; as608_core::constants::image::PACKED_SIZE];
        image[0] = 0xF0;
        let script = Scripted::new(&[&[0x00], &[0x00], &image]);

        let raster = device(&script).upload_image().await.unwrap();

        assert_eq!(script.sent(), vec![vec![0x01], vec![0x0A]]);
        assert_eq!(raster.pixel(0, 0), Some(0xF0));
        assert_eq!(raster.pixel(1, 0), Some(0x00));
        assert_eq!(raster.pixel(2, 0), Some(0x10));
        assert_eq!(raster.pixel(3, 0), Some(0x20));
    }

    #[tokio::test]
    async fn test_upload_image_ack_codes() {
        let script = Scripted::new(&[&[0x00], &[0x0F]]);
        let err = device(&script).upload_image().await.unwrap_err();
        assert!(matches!(err, Error::DeviceStatus(Status::UploadImageFailed)));

        let script = Scripted::new(&[&[0x00], &[0x09]]);
        let err = device(&script).upload_image().await.unwrap_err();
        assert!(matches!(err, Error::UnknownStatus(0x09)));
    }

    #[tokio::test]
    async fn test_upload_image_wrong_size() {
        let script = Scripted::new(&[&[0x00], &[0x00], &[0x11; 100]]);
        let err = device(&script).upload_image().await.unwrap_err();

        assert!(matches!(err, Error::Types(as608_types::Error::Validation(_))));
    }

    #[tokio::test]
    async fn test_search() {
        let script = Scripted::new(&[
            &[0x00, 0x00],
            &[0x00, 0x01],
            &[0x00, 0x05, 0x00, 0x07, 0x00, 0x64],
        ]);

        let result = device(&script).search().await.unwrap();

        assert_eq!(result, SearchMatch { id: 7, score: 100 });
        assert_eq!(script.sent(), vec![vec![0x32, 0x03, 0xFF, 0xFF, 0x00, 0x00]]);
    }

    #[tokio::test]
    async fn test_read_index_table() {
        let mut page0 = vec![0x00, 0b0000_0101];
        page0.extend_from_slice(&[0u8; 31]);
        let mut page1 = vec![0x00, 0x00, 0b1000_0000];
        page1.extend_from_slice(&[0u8; 30]);
        let script = Scripted::new(&[&page0, &page1]);

        let table = device(&script).read_index_table().await.unwrap();

        assert_eq!(table.occupied(), vec![0, 2, 271]);
        assert_eq!(script.sent(), vec![vec![0x1F, 0x00], vec![0x1F, 0x01]]);
    }

    #[tokio::test]
    async fn test_read_index_table_rejected() {
        let script = Scripted::new(&[&[0x01]]);
        let err = device(&script).read_index_table().await.unwrap_err();

        assert!(matches!(err, Error::DeviceStatus(Status::ReceiveError)));
    }

    #[tokio::test]
    async fn test_next_free_index_full() {
        let full_page = [&[0x00][..], &[0xFF; 32]].concat();
        let script = Scripted::new(&[&full_page[..], &full_page[..]]);
        let err = device(&script).next_free_index().await.unwrap_err();

        assert!(matches!(err, Error::DatabaseFull));
    }

    #[tokio::test]
    async fn test_enroll_reports_progress() {
        let script = Scripted::new(&[
            &[0x00, 0b0000_1011],
            &[0x00],
            &[0x00, 0x00, 0x00],
            &[0x07, 0x01, 0x01],
            &[0x00, 0x01, 0x01],
            &[0x00, 0x02, 0x01],
            &[0x00, 0x03, 0x01],
            &[0x00, 0x01, 0x02],
            &[0x00, 0x02, 0x02],
            &[0x00, 0x04, 0xF0],
            &[0x00, 0x05, 0xF1],
            &[0x00, 0x06, 0xF2],
        ]);

        let mut events = Vec::new();
        let index = device(&script)
            .enroll_with(EnrollOptions::default(), |event| events.push(*event))
            .await
            .unwrap();

        assert_eq!(index, 2);
        assert_eq!(events.len(), 10);
        assert!(events[1].is_retrying());
        assert_eq!(events.last().map(|e| e.step), Some(enroll::EnrollStep::Stored));
        assert_eq!(script.sent()[2], vec![0x31, 0x00, 0x02, 0x02, 0x00, 0x10]);
    }

    #[tokio::test]
    async fn test_enroll_duplicate() {
        let script = Scripted::new(&[
            &[0x00],
            &[0x00],
            &[0x00, 0x00, 0x00],
            &[0x00, 0x04, 0xF0],
            &[0x27, 0x05, 0xF1],
        ]);

        let err = device(&script).enroll().await.unwrap_err();
        assert!(matches!(err, Error::DeviceStatus(Status::AlreadyEnrolled)));
    }

    #[tokio::test]
    async fn test_enroll_timeout() {
        let script = Scripted::new(&[&[0x00], &[0x00], &[0x26, 0x01, 0x01]]);

        let err = device(&script).enroll().await.unwrap_err();
        assert!(matches!(err, Error::EnrollTimeout));
    }

    #[tokio::test]
    async fn test_device_info() {
        let mut block = vec![0u8; 128];
        block[4..6].copy_from_slice(&300u16.to_be_bytes());
        block[126..128].copy_from_slice(&[0x12, 0x34]);
        let script = Scripted::new(&[&[0x00], &block]);

        let info = device(&script).device_info().await.unwrap();

        assert_eq!(info.database_size, 300);
        assert_eq!(script.sent(), vec![vec![0x16]]);
    }

    #[tokio::test]
    async fn test_device_info_ack_codes() {
        let script = Scripted::new(&[&[0x0D]]);
        let err = device(&script).device_info().await.unwrap_err();
        assert!(matches!(err, Error::DeviceStatus(Status::UploadFeatureFailed)));

        let script = Scripted::new(&[&[0x42]]);
        let err = device(&script).device_info().await.unwrap_err();
        assert!(matches!(err, Error::UnknownStatus(0x42)));
    }

    #[tokio::test]
    async fn test_serial_number() {
        let script = Scripted::new(&[&[0x00, 0xDE, 0xAD, 0x01]]);

        assert_eq!(device(&script).serial_number().await.unwrap(), "DEAD01");
    }

    #[tokio::test]
    async fn test_template_count() {
        let script = Scripted::new(&[&[0x00, 0x01, 0x2C]]);

        assert_eq!(device(&script).template_count().await.unwrap(), 300);
    }

    #[tokio::test]
    async fn test_clear_database_rejected() {
        let script = Scripted::new(&[&[0x11]]);
        let err = device(&script).clear_database().await.unwrap_err();

        assert!(matches!(err, Error::DeviceStatus(Status::ClearFailed)));
        assert!(err.is_recoverable());
    }

    #[tokio::test]
    async fn test_sleep() {
        let script = Scripted::new(&[&[0x00]]);
        device(&script).sleep().await.unwrap();

        assert_eq!(script.sent(), vec![vec![0x33]]);
    }

    #[tokio::test]
    async fn test_closed_device_rejects_operations() {
        let script = Scripted::new(&[]);
        let device = device(&script);
        let clone = device.clone();

        device.close().await.unwrap();
        device.close().await.unwrap();

        assert!(clone.is_closed());
        let err = clone.template_count().await.unwrap_err();
        assert!(err.is_closed());
        assert!(script.sent().is_empty());
    }
}
