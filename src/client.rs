//! User-client sessions: the external-method boundary of the key store
//!
//! One [`UserClient`] models one user-space connection. The privilege level
//! is captured from the caller's credentials when the session opens and is
//! fixed for its lifetime; closing the session only prevents future
//! transactions. Every transaction is a single critical section on the
//! attached store.

use crate::error::{IoReturn, Result, SmcError, IO_RETURN_SUCCESS};
use crate::protocol::{Request, SmcKeyData, KERNEL_INDEX_SMC};
use crate::store::KeyStore;
use log::debug;
use std::sync::Arc;

/// Privilege level captured at session-open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// May issue mutating commands (WriteBytes).
    Administrator,
    /// Read-only command set.
    Standard,
}

/// One user-client session bound to a key store.
#[derive(Debug)]
pub struct UserClient {
    store: Option<Arc<KeyStore>>,
    privilege: Privilege,
    active: bool,
}

impl UserClient {
    /// Open a session on a store with the caller's privilege level.
    ///
    /// The store reference is typed; there is no runtime provider check to
    /// fail here, so an open session is attached by construction.
    pub fn open(store: Arc<KeyStore>, privilege: Privilege) -> Self {
        UserClient {
            store: Some(store),
            privilege,
            active: true,
        }
    }

    /// Close the session. Every subsequent call reports `NotAttached`.
    pub fn close(&mut self) {
        self.active = false;
        self.store = None;
    }

    /// Whether the session can still issue transactions.
    pub fn is_active(&self) -> bool {
        self.active && self.store.is_some()
    }

    /// Session privilege level.
    pub fn privilege(&self) -> Privilege {
        self.privilege
    }

    /// The external-method entry point: one transaction per call.
    ///
    /// Returns the IOKit-style numeric status existing callers expect;
    /// `output` is only meaningful on success.
    pub fn external_method(
        &self,
        selector: u32,
        input: &SmcKeyData,
        output: &mut SmcKeyData,
    ) -> IoReturn {
        match self.dispatch(selector, input, output) {
            Ok(()) => IO_RETURN_SUCCESS,
            Err(err) => {
                debug!("transaction failed: {}", err);
                err.io_return()
            }
        }
    }

    fn dispatch(&self, selector: u32, input: &SmcKeyData, output: &mut SmcKeyData) -> Result<()> {
        // Precondition, checked before the lock is taken.
        let store = match (&self.store, self.active) {
            (Some(store), true) => store,
            _ => return Err(SmcError::NotAttached),
        };

        // The remainder of the transaction is one critical section.
        let mut table = store.lock();

        if selector != KERNEL_INDEX_SMC {
            return Err(SmcError::BadArgument(format!("selector {}", selector)));
        }

        match Request::decode(input)? {
            Request::ReadIndex(index) => {
                let key = table
                    .key_at(index as usize)
                    .ok_or_else(|| SmcError::NotFound(format!("index {}", index)))?;
                output.key = key.name().pack();
            }
            Request::ReadKeyInfo(name) => {
                let key = table
                    .key(name)
                    .ok_or_else(|| SmcError::NotFound(name.to_string()))?;
                output.key_info.data_size = key.size() as u32;
                output.key_info.data_type = key.data_type().pack();
            }
            Request::ReadBytes(name) => {
                let key = table
                    .key(name)
                    .ok_or_else(|| SmcError::NotFound(name.to_string()))?;
                output.bytes[..key.size()].copy_from_slice(key.value());
            }
            Request::WriteBytes {
                key,
                data_type,
                size,
                bytes,
            } => {
                if self.privilege != Privilege::Administrator {
                    return Err(SmcError::NotPermitted);
                }
                match table.key_mut(key) {
                    Some(existing) => existing.set_value(&bytes[..size])?,
                    None => table.add_key_with_value(key, data_type, size, &bytes[..size])?,
                }
                debug!("wrote {} bytes to key {}", size, key);
            }
        }

        Ok(())
    }
}
