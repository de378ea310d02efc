use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio_modbus::prelude::*;
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

use crate::error::{GripperError, TransportError};

/// Raw register primitives over one serial link.
///
/// Implementations do not queue: a call is a single request/response round trip bounded by
/// `timeout`. Callers sharing a transport must serialize access themselves.
pub trait Transport: Send {
    /// Function code `0x06`, write single register.
    fn write_register(
        &mut self,
        slave: u8,
        offset: u16,
        value: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<(), GripperError>> + Send;

    /// Function code `0x03`, read `count` holding registers starting at `offset`.
    fn read_registers(
        &mut self,
        slave: u8,
        offset: u16,
        count: u16,
        timeout: Duration,
    ) -> impl Future<Output = Result<Vec<u16>, GripperError>> + Send;

    /// Release the link. Calling it twice is a no-op.
    fn close(&mut self) -> impl Future<Output = Result<(), GripperError>> + Send;
}

/// When the serial port is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStrategy {
    /// Open once, reuse for every transaction until [`Transport::close`].
    #[default]
    Persistent,
    /// Open before and close after every transaction. Slow, but survives adapters that
    /// drop off the bus between commands.
    ReconnectPerCall,
}

/// Serial endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Platform device path, e.g. `/dev/ttyUSB0` or `COM9`.
    pub port: String,
    pub baud_rate: u32,
    /// Per-transaction timeout.
    pub timeout_ms: u64,
    pub strategy: ConnectionStrategy,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            timeout_ms: 1000,
            strategy: ConnectionStrategy::Persistent,
        }
    }
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Await `fut`, mapping an elapsed deadline to [`TransportError::Timeout`].
pub async fn with_timeout<T, F>(timeout: Duration, fut: F) -> Result<T, GripperError>
where
    F: Future<Output = Result<T, GripperError>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(res) => res,
        Err(_) => Err(TransportError::Timeout(timeout).into()),
    }
}

/// Builds a Modbus client context for a [`SerialConfig`].
pub type Connector =
    Box<dyn Fn(&SerialConfig) -> Result<client::Context, GripperError> + Send + Sync>;

/// Open the configured serial port as an RTU client.
pub fn connect_serial(config: &SerialConfig) -> Result<client::Context, GripperError> {
    let port = tokio_serial::new(config.port.as_str(), config.baud_rate)
        .data_bits(tokio_serial::DataBits::Eight)
        .stop_bits(tokio_serial::StopBits::One)
        .parity(tokio_serial::Parity::None)
        .timeout(config.timeout())
        .open_native_async()
        .map_err(|err| TransportError::ConnectFailed(err.into()))?;

    // The slave id is switched per request.
    Ok(rtu::attach_slave(port, Slave(0)))
}

/// Modbus RTU session on a real serial port.
pub struct ModbusSession {
    config: SerialConfig,
    connector: Connector,
    ctx: Option<client::Context>,
    closed: bool,
}

impl ModbusSession {
    /// Open the endpoint. With [`ConnectionStrategy::ReconnectPerCall`] the port is only
    /// checked here, then released and reopened for each transaction.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(config: SerialConfig) -> Result<Self, GripperError> {
        Self::open_with(config, connect_serial)
    }

    /// Like [`open`](Self::open), with `connector` producing the RTU context instead of the
    /// serial port, e.g. an RTU-over-TCP bridge.
    pub fn open_with<F>(config: SerialConfig, connector: F) -> Result<Self, GripperError>
    where
        F: Fn(&SerialConfig) -> Result<client::Context, GripperError> + Send + Sync + 'static,
    {
        let ctx = connector(&config)?;
        info!(port = %config.port, baud_rate = config.baud_rate, strategy = ?config.strategy, "serial session opened");
        let ctx = match config.strategy {
            ConnectionStrategy::Persistent => Some(ctx),
            ConnectionStrategy::ReconnectPerCall => None,
        };
        Ok(Self {
            config,
            connector: Box::new(connector),
            ctx,
            closed: false,
        })
    }

    pub fn config(&self) -> &SerialConfig {
        &self.config
    }

    /// Context for the next transaction, connecting first when reconnecting per call.
    fn context(&mut self) -> Result<&mut client::Context, GripperError> {
        if self.closed {
            return Err(TransportError::Closed.into());
        }
        if self.ctx.is_none() {
            debug!(port = %self.config.port, "connecting");
            self.ctx = Some((self.connector)(&self.config)?);
        }
        self.ctx.as_mut().ok_or_else(|| TransportError::Closed.into())
    }

    async fn finish_call(&mut self) {
        if self.config.strategy == ConnectionStrategy::ReconnectPerCall {
            if let Some(mut ctx) = self.ctx.take() {
                if let Err(err) = ctx.disconnect().await {
                    warn!(?err, "failed to release serial port after call");
                }
            }
        }
    }
}

/// Words arrive decoded big-endian; only the length needs checking.
fn check_len(words: Vec<u16>, count: u16) -> Result<Vec<u16>, GripperError> {
    if words.len() != usize::from(count) {
        return Err(TransportError::ShortResponse {
            expected: usize::from(count),
            actual: words.len(),
        }
        .into());
    }
    Ok(words)
}

impl Transport for ModbusSession {
    async fn write_register(
        &mut self,
        slave: u8,
        offset: u16,
        value: u16,
        timeout: Duration,
    ) -> Result<(), GripperError> {
        let ctx = self.context()?;
        ctx.set_slave(Slave(slave));
        let res = with_timeout(timeout, async {
            Ok::<_, GripperError>(ctx.write_single_register(offset, value).await??)
        })
        .await;
        debug!(slave, offset, value, ok = res.is_ok(), "write register");
        self.finish_call().await;
        res
    }

    async fn read_registers(
        &mut self,
        slave: u8,
        offset: u16,
        count: u16,
        timeout: Duration,
    ) -> Result<Vec<u16>, GripperError> {
        let ctx = self.context()?;
        ctx.set_slave(Slave(slave));
        let res = with_timeout(timeout, async {
            Ok::<_, GripperError>(ctx.read_holding_registers(offset, count).await??)
        })
        .await
        .and_then(|words| check_len(words, count));
        debug!(slave, offset, count, ok = res.is_ok(), "read registers");
        self.finish_call().await;
        res
    }

    async fn close(&mut self) -> Result<(), GripperError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        if let Some(mut ctx) = self.ctx.take() {
            if let Err(err) = ctx.disconnect().await {
                warn!(?err, "error while closing serial session");
            }
        }
        info!(port = %self.config.port, "serial session closed");
        Ok(())
    }
}
