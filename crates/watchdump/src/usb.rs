//! libusb transport for the watch.
//!
//! `UsbRuntime` is the one libusb context for the process. It is created
//! explicitly at startup, passed to whoever opens devices, and shut down
//! explicitly at exit.
//!
//! `UsbWatch` owns an opened device. Whatever it changed while opening
//! (kernel driver detached, interface claimed) is undone exactly once when it
//! is dropped, including when opening fails half way.

use std::time::Duration;

use anyhow::{Context, Result};
use rusb::{DeviceHandle, UsbContext};

use watchdump_core::transport::{Transport, TransportError};

/// Process-wide libusb context.
pub struct UsbRuntime {
    context: rusb::Context,
}

impl UsbRuntime {
    pub fn init() -> Result<Self> {
        let mut context = rusb::Context::new().context("failed to initialise libusb")?;
        context.set_log_level(rusb::LogLevel::Warning);
        Ok(Self { context })
    }

    /// Release the libusb context. Every `UsbWatch` must be dropped first.
    pub fn shutdown(self) {
        drop(self.context);
        tracing::debug!("libusb context released");
    }
}

/// An opened, claimed watch.
pub struct UsbWatch {
    handle: DeviceHandle<rusb::Context>,
    interface: u8,
    reattach_driver: bool,
    release_interface: bool,
}

impl UsbWatch {
    /// Open the first device matching `vendor_id:product_id` and claim `interface`.
    pub fn open(usb: &UsbRuntime, vendor_id: u16, product_id: u16, interface: u8) -> Result<Self> {
        let handle = usb
            .context
            .open_device_with_vid_pid(vendor_id, product_id)
            .with_context(|| format!("no device {vendor_id:04X}:{product_id:04X} found"))?;

        let mut watch = Self {
            handle,
            interface,
            reattach_driver: false,
            release_interface: false,
        };

        if matches!(watch.handle.kernel_driver_active(interface), Ok(true)) {
            watch
                .handle
                .detach_kernel_driver(interface)
                .context("failed to detach the kernel driver")?;
            watch.reattach_driver = true;
        }
        watch
            .handle
            .claim_interface(interface)
            .with_context(|| format!("failed to claim interface {interface}"))?;
        watch.release_interface = true;

        tracing::info!(
            vendor_id = format_args!("{vendor_id:04X}"),
            product_id = format_args!("{product_id:04X}"),
            interface,
            "watch opened"
        );
        Ok(watch)
    }

    /// Product string (descriptor index 2).
    pub fn product(&self) -> Option<String> {
        self.handle.read_string_descriptor_ascii(2).ok()
    }

    /// Serial number string (descriptor index 3).
    pub fn serial_number(&self) -> Option<String> {
        self.handle.read_string_descriptor_ascii(3).ok()
    }
}

impl Drop for UsbWatch {
    fn drop(&mut self) {
        if self.release_interface {
            if let Err(e) = self.handle.release_interface(self.interface) {
                tracing::warn!(error = %e, "failed to release the interface");
            }
        }
        if self.reattach_driver {
            if let Err(e) = self.handle.attach_kernel_driver(self.interface) {
                tracing::warn!(error = %e, "failed to reattach the kernel driver");
            }
        }
    }
}

impl Transport for UsbWatch {
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration)
        -> Result<usize, TransportError> {
        self.handle
            .write_interrupt(endpoint, data, timeout)
            .map_err(transport_error)
    }

    fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> Result<usize, TransportError> {
        self.handle
            .read_interrupt(endpoint, buf, timeout)
            .map_err(transport_error)
    }
}

fn transport_error(e: rusb::Error) -> TransportError {
    match e {
        rusb::Error::Timeout => TransportError::Timeout,
        rusb::Error::NoDevice => TransportError::Disconnected,
        other => TransportError::Io(other.to_string()),
    }
}
