/*
 * Executable units: the inner atomic pipeline of calls run by the execution
 * context and the outer workflow submitted to the protocol
 */

mod builder;
mod clipboard;

pub use builder::{BuildParams, PipelineBuilder};
pub use clipboard::{Clipboard, ClipboardRef};

use ethers::types::{Address, Bytes, U256};
use std::collections::HashMap;
use tracing::debug;
use crate::abi::protocol;
use crate::models::{Result, SwapError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FromMode {
    External = 0,
    Internal = 1,
    ExternalInternal = 2,
    InternalTolerant = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ToMode {
    External = 0,
    Internal = 1,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipeCall {
    pub target: Address,
    pub call_data: Bytes,
    pub clipboard: Bytes,
}

#[derive(Debug, Clone)]
pub struct PipeStep {
    pub name: String,
    pub call: PipeCall,
    /// Expected output used by estimates; the chain value may differ.
    pub amount_out: U256,
    pub tag: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    steps: Vec<PipeStep>,
    tags: HashMap<String, usize>,
}

impl Pipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: PipeStep) -> usize {
        let index = self.steps.len();
        if let Some(tag) = &step.tag {
            self.tags.insert(tag.clone(), index);
        }
        debug!("pipeline step {}: {}", index, step.name);
        self.steps.push(step);
        index
    }

    #[must_use]
    pub fn find_tag(&self, tag: &str) -> Option<usize> {
        self.tags.get(tag).copied()
    }

    #[must_use]
    pub fn clipboard_for(&self, reference: &ClipboardRef) -> Clipboard {
        match self.find_tag(&reference.source_tag) {
            Some(index) => reference.resolve(index),
            None => {
                debug!("clipboard tag '{}' not found; using empty clipboard", reference.source_tag);
                Clipboard::Empty
            }
        }
    }

    #[must_use]
    pub fn steps(&self) -> &[PipeStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn calls(&self) -> Vec<PipeCall> {
        self.steps.iter().map(|s| s.call.clone()).collect()
    }

    #[must_use]
    pub fn amount_out(&self) -> Option<U256> {
        self.steps.last().map(|s| s.amount_out)
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        protocol::encode_advanced_pipe(&self.calls(), U256::zero())
    }
}

#[derive(Debug, Clone)]
pub enum FarmCall {
    TransferToken {
        token: Address,
        recipient: Address,
        amount: U256,
        from_mode: FromMode,
        to_mode: ToMode,
    },
    WrapNative {
        amount: U256,
        to_mode: ToMode,
    },
    UnwrapNative {
        amount: U256,
        from_mode: FromMode,
    },
    InternalBalance {
        account: Address,
        token: Address,
    },
    Pipe(Pipeline),
}

#[derive(Debug, Clone)]
pub struct FarmStep {
    pub name: String,
    pub call: FarmCall,
    pub amount_out: U256,
    pub clipboard: Clipboard,
}

impl FarmStep {
    #[must_use]
    pub fn call_data(&self) -> Bytes {
        match &self.call {
            FarmCall::TransferToken {
                token,
                recipient,
                amount,
                from_mode,
                to_mode,
            } => protocol::encode_transfer_token(*token, *recipient, *amount, *from_mode, *to_mode),
            FarmCall::WrapNative { amount, to_mode } => protocol::encode_wrap_eth(*amount, *to_mode),
            FarmCall::UnwrapNative { amount, from_mode } => {
                protocol::encode_unwrap_eth(*amount, *from_mode)
            }
            FarmCall::InternalBalance { account, token } => {
                protocol::encode_get_internal_balance(*account, *token)
            }
            FarmCall::Pipe(pipeline) => pipeline.encode(),
        }
    }

    #[must_use]
    pub fn value(&self) -> U256 {
        match &self.call {
            FarmCall::WrapNative { amount, .. } => *amount,
            _ => U256::zero(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Workflow {
    pub name: String,
    pub protocol: Address,
    steps: Vec<FarmStep>,
}

impl Workflow {
    #[must_use]
    pub fn new(name: impl Into<String>, protocol: Address) -> Self {
        Self {
            name: name.into(),
            protocol,
            steps: Vec::new(),
        }
    }

    pub fn push(&mut self, step: FarmStep) -> usize {
        let index = self.steps.len();
        debug!("workflow {} step {}: {}", self.name, index, step.name);
        self.steps.push(step);
        index
    }

    #[must_use]
    pub fn steps(&self) -> &[FarmStep] {
        &self.steps
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    #[must_use]
    pub fn pipeline(&self) -> Option<&Pipeline> {
        self.steps.iter().find_map(|s| match &s.call {
            FarmCall::Pipe(p) => Some(p),
            _ => None,
        })
    }

    #[must_use]
    pub fn value(&self) -> U256 {
        self.steps.iter().fold(U256::zero(), |acc, s| acc + s.value())
    }

    pub fn estimate(&self) -> Result<U256> {
        self.steps
            .last()
            .map(|s| s.amount_out)
            .ok_or_else(|| SwapError::Precondition(format!("workflow {} has no steps", self.name)))
    }

    #[must_use]
    pub fn encode(&self) -> Bytes {
        let calls: Vec<(Bytes, Bytes)> = self
            .steps
            .iter()
            .map(|s| (s.call_data(), s.clipboard.encode()))
            .collect();
        protocol::encode_advanced_farm(&calls)
    }
}
