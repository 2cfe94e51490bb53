use crate::core::Transport;
use crate::utils::error::{RoverError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio_serial::{SerialPortBuilderExt, SerialStream};

/// Serial link to the ESP32 driver board (USB UART, 8N1).
pub struct SerialTransport {
    stream: Option<SerialStream>,
    port: String,
    read_idle: Duration,
}

impl SerialTransport {
    pub fn open(port: &str, baud_rate: u32, read_idle: Duration) -> Result<Self> {
        let stream = tokio_serial::new(port, baud_rate).open_native_async()?;
        tracing::info!("🔌 Opened serial port {} at {} baud", port, baud_rate);
        Ok(Self::from_stream(stream, port, read_idle))
    }

    pub fn from_stream(stream: SerialStream, port: &str, read_idle: Duration) -> Self {
        Self {
            stream: Some(stream),
            port: port.to_string(),
            read_idle,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    fn stream(&mut self) -> Result<&mut SerialStream> {
        self.stream.as_mut().ok_or(RoverError::ConnectionClosed)
    }
}

#[async_trait]
impl Transport for SerialTransport {
    async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        let stream = self.stream()?;
        stream.write_all(data).await?;
        stream.flush().await?;
        Ok(())
    }

    async fn read_available(&mut self) -> Result<Vec<u8>> {
        let idle = self.read_idle;
        let stream = self.stream()?;
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 512];

        loop {
            match tokio::time::timeout(idle, stream.read(&mut chunk)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => buffer.extend_from_slice(&chunk[..n]),
                Ok(Err(e)) => return Err(e.into()),
                // Nothing more within the idle gap.
                Err(_) => break,
            }
        }

        Ok(buffer)
    }

    async fn close(&mut self) -> Result<()> {
        if let Some(mut stream) = self.stream.take() {
            stream.flush().await?;
            tracing::info!("Closed serial port {}", self.port);
        }
        Ok(())
    }
}
