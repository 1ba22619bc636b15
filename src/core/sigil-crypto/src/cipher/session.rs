//! The `init` → `update`* → `finalize` state machine.

use tracing::debug;

use super::spec::{AlgorithmParameters, AlgorithmSpec, Direction, Transformation};
use super::{resolve, CipherCore};
use crate::error::CryptoError;
use crate::keys::KeyMaterial;

/// Lifecycle state of a [`CipherSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No key bound yet.
    Uninitialized,
    /// Bound to a key and spec, no input yet.
    Initialized,
    /// At least one `update` call has been made.
    Accumulating,
    /// Output has been flushed; only `init` is accepted.
    Finalized,
}

/// A stateful encryption or decryption session.
///
/// Sessions model sequential accumulation and are not meant to be shared
/// between threads without external synchronization. Buffered input is wiped
/// when the session is finalized, re-initialized or dropped.
pub struct CipherSession {
    state: SessionState,
    direction: Option<Direction>,
    transformation: Option<Transformation>,
    parameters: Option<AlgorithmParameters>,
    core: Option<Box<dyn CipherCore>>,
}

impl CipherSession {
    /// Creates an uninitialized session.
    pub fn new() -> Self {
        Self {
            state: SessionState::Uninitialized,
            direction: None,
            transformation: None,
            parameters: None,
            core: None,
        }
    }

    /// Binds `key` and `spec` to this session.
    ///
    /// Allowed from any state; re-initializing discards whatever was buffered.
    /// On failure the session is left `Uninitialized`.
    ///
    /// # Errors
    ///
    /// - `KeyAlgorithmMismatch` if the key does not fit the transformation
    /// - `InvalidParameters` if an IV is missing or has the wrong size
    pub fn init(
        &mut self,
        direction: Direction,
        key: &KeyMaterial,
        spec: &AlgorithmSpec,
    ) -> Result<(), CryptoError> {
        self.reset();

        let direction = direction.cipher_direction()?;
        let factory = resolve(&spec.transformation);
        let (core, parameters) = factory.create(direction, key, spec.parameters.as_ref())?;

        debug!(
            transformation = %spec.transformation,
            ?direction,
            generated_iv = spec.parameters.is_none() && parameters.is_some(),
            "cipher session initialized"
        );

        self.state = SessionState::Initialized;
        self.direction = Some(direction);
        self.transformation = Some(spec.transformation);
        self.parameters = parameters;
        self.core = Some(core);
        Ok(())
    }

    /// Feeds a chunk and returns whatever output is ready.
    ///
    /// Block ciphers buffer partial blocks, so the output may be shorter than
    /// the input or empty.
    pub fn update(&mut self, chunk: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let core = self.active_core("update")?;
        let output = core.update(chunk)?;
        self.state = SessionState::Accumulating;
        Ok(output)
    }

    /// Flushes buffered input, applying or removing padding.
    ///
    /// The session is `Finalized` afterwards whether or not this succeeds.
    ///
    /// # Errors
    ///
    /// - `PaddingValidationError` if decrypted padding is malformed
    /// - `InvalidInput` if unpadded input is not block aligned
    pub fn finalize(&mut self) -> Result<Vec<u8>, CryptoError> {
        let result = self.active_core("finalize")?.finalize();
        self.core = None;
        self.state = SessionState::Finalized;

        debug!(ok = result.is_ok(), "cipher session finalized");
        result
    }

    /// Parameters in effect, including an IV generated during `init`.
    pub fn parameters(&self) -> Option<&AlgorithmParameters> {
        self.parameters.as_ref()
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Direction bound at `init`.
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Transformation bound at `init`.
    pub fn transformation(&self) -> Option<&Transformation> {
        self.transformation.as_ref()
    }

    fn active_core(&mut self, operation: &str) -> Result<&mut Box<dyn CipherCore>, CryptoError> {
        match (self.state, self.core.as_mut()) {
            (SessionState::Initialized | SessionState::Accumulating, Some(core)) => Ok(core),
            (state, _) => Err(CryptoError::SessionStateError(format!(
                "cannot {operation} a session in state {state:?}"
            ))),
        }
    }

    fn reset(&mut self) {
        self.state = SessionState::Uninitialized;
        self.direction = None;
        self.transformation = None;
        self.parameters = None;
        self.core = None;
    }
}

impl Default for CipherSession {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CipherSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CipherSession")
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("transformation", &self.transformation)
            .field("parameters", &self.parameters)
            .finish()
    }
}
