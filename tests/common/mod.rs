//! In-memory stand-in for the serial link.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use dual_gripper_rs::{Exception, GripperConfig, GripperError, Transport, TransportError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Call {
    Write { slave: u8, offset: u16, value: u16 },
    Read { slave: u8, offset: u16, count: u16 },
}

impl Call {
    pub fn slave(&self) -> u8 {
        match self {
            Call::Write { slave, .. } | Call::Read { slave, .. } => *slave,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Fault {
    Timeout,
    IllegalAddress,
}

impl Fault {
    fn into_error(self) -> GripperError {
        match self {
            Fault::Timeout => TransportError::Timeout(Duration::from_millis(1)).into(),
            Fault::IllegalAddress => Exception::IllegalDataAddress.into(),
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<Call>,
    registers: HashMap<(u8, u16), u16>,
    /// Faults consumed one per transaction on `(slave, offset)`.
    scripted: HashMap<(u8, u16), VecDeque<Fault>>,
    /// Slaves that never answer.
    dead: HashSet<u8>,
    /// `(slave, offset)` pairs that always fail.
    broken: HashSet<(u8, u16)>,
    closed: bool,
}

/// Records every transaction and answers from an in-memory register file.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next `times` transactions on `(slave, offset)`.
    pub fn fail_next(&self, slave: u8, offset: u16, times: usize, fault: Fault) {
        let mut state = self.state.lock().unwrap();
        let queue = state.scripted.entry((slave, offset)).or_default();
        queue.extend(std::iter::repeat(fault).take(times));
    }

    pub fn kill(&self, slave: u8) {
        self.state.lock().unwrap().dead.insert(slave);
    }

    pub fn break_register(&self, slave: u8, offset: u16) {
        self.state.lock().unwrap().broken.insert((slave, offset));
    }

    pub fn preset(&self, slave: u8, offset: u16, value: u16) {
        self.state
            .lock()
            .unwrap()
            .registers
            .insert((slave, offset), value);
    }

    pub fn value(&self, slave: u8, offset: u16) -> Option<u16> {
        self.state
            .lock()
            .unwrap()
            .registers
            .get(&(slave, offset))
            .copied()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| matches!(call, Call::Write { .. }))
            .collect()
    }

    pub fn calls_to(&self, slave: u8) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.slave() == slave)
            .count()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap().closed
    }

    fn begin(&self) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
    }

    fn end(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check(&self, state: &mut State, slave: u8, offset: u16) -> Result<(), GripperError> {
        if state.closed {
            return Err(TransportError::Closed.into());
        }
        if state.dead.contains(&slave) {
            return Err(Fault::Timeout.into_error());
        }
        if state.broken.contains(&(slave, offset)) {
            return Err(Fault::IllegalAddress.into_error());
        }
        if let Some(fault) = state
            .scripted
            .get_mut(&(slave, offset))
            .and_then(|queue| queue.pop_front())
        {
            return Err(fault.into_error());
        }
        Ok(())
    }
}

impl Transport for ScriptedTransport {
    async fn write_register(
        &mut self,
        slave: u8,
        offset: u16,
        value: u16,
        _timeout: Duration,
    ) -> Result<(), GripperError> {
        self.begin();
        // give other tasks a chance to overlap if the caller forgot to lock
        tokio::task::yield_now().await;
        let res = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Write {
                slave,
                offset,
                value,
            });
            let res = self.check(&mut state, slave, offset);
            if res.is_ok() {
                state.registers.insert((slave, offset), value);
            }
            res
        };
        self.end();
        res
    }

    async fn read_registers(
        &mut self,
        slave: u8,
        offset: u16,
        count: u16,
        _timeout: Duration,
    ) -> Result<Vec<u16>, GripperError> {
        self.begin();
        tokio::task::yield_now().await;
        let res = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(Call::Read {
                slave,
                offset,
                count,
            });
            self.check(&mut state, slave, offset).map(|()| {
                (offset..offset + count)
                    .map(|o| state.registers.get(&(slave, o)).copied().unwrap_or(0))
                    .collect()
            })
        };
        self.end();
        res
    }

    async fn close(&mut self) -> Result<(), GripperError> {
        self.state.lock().unwrap().closed = true;
        Ok(())
    }
}

/// Config with the given slave ids, no inter-command delay.
pub fn config(left: u8, right: u8) -> GripperConfig {
    let mut config = GripperConfig::default();
    config.addresses.left = left;
    config.addresses.right = right;
    config.inter_command_delay_ms = 0;
    config
}
