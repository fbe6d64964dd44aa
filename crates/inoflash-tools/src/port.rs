//! Serial port enumeration and board detection

use serialport::SerialPortType;

use crate::error::{Result, ToolError};

/// Description fragments of common ESP32 USB-UART bridges
const KNOWN_BRIDGES: &[&str] = &["CP210", "CH340", "USB-SERIAL", "Silicon", "JTAG"];

/// A serial port seen on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    /// Device name (`COM5`, `/dev/ttyUSB0`)
    pub device: String,
    /// Human readable description
    pub description: String,
}

/// Source of available serial ports
pub trait PortEnumerator {
    /// List ports currently present
    fn ports(&self) -> Result<Vec<PortInfo>>;
}

/// Enumerates ports through the `serialport` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemPorts;

fn describe(port_type: &SerialPortType) -> String {
    match port_type {
        SerialPortType::UsbPort(usb) => {
            let mut parts = Vec::new();
            if let Some(manufacturer) = &usb.manufacturer {
                parts.push(manufacturer.clone());
            }
            if let Some(product) = &usb.product {
                parts.push(product.clone());
            }
            parts.push(format!("({:04x}:{:04x})", usb.vid, usb.pid));
            parts.join(" ")
        }
        SerialPortType::PciPort => "PCI serial port".to_string(),
        SerialPortType::BluetoothPort => "Bluetooth serial port".to_string(),
        SerialPortType::Unknown => "n/a".to_string(),
    }
}

impl PortEnumerator for SystemPorts {
    fn ports(&self) -> Result<Vec<PortInfo>> {
        let ports = serialport::available_ports()?;
        Ok(ports
            .into_iter()
            .map(|port| PortInfo {
                description: describe(&port.port_type),
                device: port.port_name,
            })
            .collect())
    }
}

/// Pick the port a board is most likely attached to
///
/// A port whose description names a known USB-UART bridge wins; otherwise
/// the first port is used.
pub fn detect_port(ports: &dyn PortEnumerator) -> Result<String> {
    let ports = ports.ports()?;

    for port in &ports {
        log::debug!("Port {}: {}", port.device, port.description);
    }

    if let Some(port) = ports.iter().find(|port| {
        KNOWN_BRIDGES
            .iter()
            .any(|bridge| port.description.contains(bridge))
    }) {
        log::info!("ESP detected: {} ({})", port.device, port.description);
        return Ok(port.device.clone());
    }

    match ports.into_iter().next() {
        Some(port) => {
            log::warn!("No typical USB-UART bridge found, using {}", port.device);
            Ok(port.device)
        }
        None => Err(ToolError::NoSerialPort),
    }
}
