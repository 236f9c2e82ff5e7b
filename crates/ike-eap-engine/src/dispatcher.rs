//! Timeout-guarded EAP message dispatch
//!
//! [`EapDispatcher::process_message`] hands one inbound message to a
//! [`MessageProcessor`] on a blocking worker and returns at once. A control
//! task races the worker against a fixed deadline and reports the outcome to
//! the [`EapCallback`]:
//!
//! ```text
//! Idle --process_message--> Processing --+-- worker result --> Delivered
//!                                        +-- deadline -------> Delivered (Timeout)
//! ```
//!
//! Exactly one callback fires per accepted message. A worker that finishes
//! after the deadline has its result dropped, and a panic inside the worker
//! is reported as [`ErrorCause::Internal`].
//!
//! Workers of one dispatcher hold a per-session slot while calling the
//! processor, so a timed-out worker still running when the next message
//! arrives finishes before the next worker starts. The waiting time counts
//! against the next message's deadline.

use ike_eap_proto::{EapMethodInfo, EapResult, ErrorCause, ProtocolLogger};
use parking_lot::Mutex;
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Default processing deadline
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_millis(7000);

const LOG_PREFIX: &str = "EapDispatcher";

/// Computes the result for one inbound EAP message
///
/// Runs on a blocking worker thread; implementations may do CPU-bound work.
pub trait MessageProcessor: Send + Sync {
    fn process(&self, message: &[u8]) -> EapResult;
}

/// Receives the outcome of a processed message
pub trait EapCallback: Send + Sync {
    fn on_success(&self, msk: &[u8], emsk: &[u8], info: Option<EapMethodInfo>);

    fn on_fail(&self);

    fn on_response(&self, packet: Vec<u8>, flags: u32);

    fn on_error(&self, cause: ErrorCause);
}

/// Dispatch errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("A message is already being processed")]
    Busy,

    #[error("No Tokio runtime is available")]
    NoRuntime,
}

/// How processing of a message ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The worker's result was delivered
    Completed,
    /// The deadline passed first and a timeout error was delivered
    TimedOut,
}

/// Write-once delivery slot
///
/// Forwards the first result to the callback and drops every later one.
struct DeliveryGuard {
    delivered: AtomicBool,
    callback: Arc<dyn EapCallback>,
}

impl DeliveryGuard {
    fn new(callback: Arc<dyn EapCallback>) -> Self {
        DeliveryGuard {
            delivered: AtomicBool::new(false),
            callback,
        }
    }

    /// Returns false if a result was already delivered
    fn deliver(&self, result: EapResult) -> bool {
        if self.delivered.swap(true, Ordering::AcqRel) {
            debug!(kind = result.kind(), "Dropping result for already completed message");
            return false;
        }

        match result {
            EapResult::Success { msk, emsk, info } => self.callback.on_success(&msk, &emsk, info),
            EapResult::Failure => self.callback.on_fail(),
            EapResult::Response { packet, flags } => self.callback.on_response(packet, flags),
            EapResult::Error(cause) => self.callback.on_error(cause),
        }
        true
    }
}

/// Single-flight dispatcher for one EAP session
pub struct EapDispatcher {
    processor: Arc<dyn MessageProcessor>,
    callback: Arc<dyn EapCallback>,
    timeout: Duration,
    in_flight: Arc<AtomicBool>,
    /// Held by the worker for the whole `process` call
    worker_slot: Arc<Mutex<()>>,
    runtime: Handle,
    logger: ProtocolLogger,
}

impl EapDispatcher {
    /// Create a dispatcher bound to the current Tokio runtime
    pub fn new(
        processor: Arc<dyn MessageProcessor>,
        callback: Arc<dyn EapCallback>,
    ) -> Result<Self, DispatchError> {
        let runtime = Handle::try_current().map_err(|_| DispatchError::NoRuntime)?;
        Ok(Self::with_handle(processor, callback, runtime))
    }

    pub fn with_handle(
        processor: Arc<dyn MessageProcessor>,
        callback: Arc<dyn EapCallback>,
        runtime: Handle,
    ) -> Self {
        EapDispatcher {
            processor,
            callback,
            timeout: DEFAULT_DISPATCH_TIMEOUT,
            in_flight: Arc::new(AtomicBool::new(false)),
            worker_slot: Arc::new(Mutex::new(())),
            runtime,
            logger: ProtocolLogger::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_logger(mut self, logger: ProtocolLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Whether a message is currently being processed
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Start processing `message`
    ///
    /// Returns immediately. The returned handle resolves once the callback
    /// has been invoked; dropping it does not cancel processing. The callback
    /// may submit the next message.
    pub fn process_message(
        &self,
        message: Vec<u8>,
    ) -> Result<JoinHandle<DispatchOutcome>, DispatchError> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.logger
                .warn(LOG_PREFIX, "Rejecting message while another is in flight");
            return Err(DispatchError::Busy);
        }

        self.logger.debug(
            LOG_PREFIX,
            &format!("Processing message of {} bytes", message.len()),
        );

        let (tx, rx) = oneshot::channel();
        let processor = Arc::clone(&self.processor);
        let worker_slot = Arc::clone(&self.worker_slot);
        self.runtime.spawn_blocking(move || {
            let _slot = worker_slot.lock();
            let result = catch_unwind(AssertUnwindSafe(|| processor.process(&message)))
                .unwrap_or_else(|panic| {
                    EapResult::Error(ErrorCause::Internal(panic_message(panic.as_ref())))
                });
            if tx.send(result).is_err() {
                debug!("Worker finished after the deadline; result discarded");
            }
        });

        let guard = DeliveryGuard::new(Arc::clone(&self.callback));
        let in_flight = Arc::clone(&self.in_flight);
        let timeout = self.timeout;
        let logger = self.logger.clone();

        let handle = self.runtime.spawn(async move {
            let (result, outcome) = tokio::select! {
                received = rx => match received {
                    Ok(result) => (result, DispatchOutcome::Completed),
                    Err(_) => (
                        EapResult::Error(ErrorCause::Internal(
                            "worker exited without a result".to_string(),
                        )),
                        DispatchOutcome::Completed,
                    ),
                },
                _ = tokio::time::sleep(timeout) => {
                    warn!(timeout_ms = timeout.as_millis() as u64, "EAP message processing timed out");
                    (EapResult::Error(ErrorCause::Timeout(timeout)), DispatchOutcome::TimedOut)
                }
            };

            if let EapResult::Error(ref cause @ ErrorCause::Internal(_)) = result {
                logger.error(LOG_PREFIX, "Message processing failed", Some(cause));
            }
            logger.debug(LOG_PREFIX, &format!("Delivering {} result", result.kind()));

            in_flight.store(false, Ordering::Release);
            guard.deliver(result);
            outcome
        });

        Ok(handle)
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panic: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panic: {}", message)
    } else {
        "panic while processing message".to_string()
    }
}
