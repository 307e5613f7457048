/*
 * Compiles an ordered leg list into an outer workflow and, when any leg
 * trades, an inner pipeline run by the execution context
 */

use ethers::types::Address;
use std::sync::Arc;
use tracing::{info, warn};
use crate::abi::{erc20, protocol};
use crate::context::SwapContext;
use crate::legs::{SwapLeg, UnwrapLeg};
use crate::models::{Result, SwapError};
use crate::pipeline::{
    Clipboard, ClipboardRef, FarmCall, FarmStep, FromMode, PipeCall, PipeStep, Pipeline, ToMode, Workflow,
};

#[derive(Debug, Clone, Copy)]
pub struct BuildParams {
    pub from_mode: FromMode,
    pub to_mode: ToMode,
    pub caller: Address,
    pub recipient: Address,
}

pub struct PipelineBuilder {
    ctx: Arc<SwapContext>,
}

fn placement_error(leg: &SwapLeg, reason: &str) -> SwapError {
    SwapError::validation(leg.name(), "position", reason)
}

impl PipelineBuilder {
    #[must_use]
    pub fn new(ctx: Arc<SwapContext>) -> Self {
        Self { ctx }
    }

    pub fn validate_order(legs: &[SwapLeg]) -> Result<()> {
        let last = legs.len().saturating_sub(1);
        for (i, leg) in legs.iter().enumerate() {
            match leg {
                SwapLeg::Wrap(_) if i != 0 => {
                    return Err(placement_error(leg, "wrap must be the first leg"));
                }
                SwapLeg::Unwrap(_) if i != last => {
                    return Err(placement_error(leg, "unwrap must be the last leg"));
                }
                SwapLeg::Transfer(_) if legs.len() != 1 => {
                    return Err(placement_error(leg, "transfer must be the only leg"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    pub fn build(&self, legs: &[SwapLeg], params: &BuildParams) -> Result<Workflow> {
        let (Some(first), Some(last)) = (legs.first(), legs.last()) else {
            return Err(SwapError::Precondition("no legs to compile".to_string()));
        };
        Self::validate_order(legs)?;
        for leg in legs {
            leg.validate()?;
        }

        let route = format!("{} -> {}", first.sell().symbol, last.buy().symbol);
        let mut workflow = Workflow::new(format!("advancedFarm {route}"), self.ctx.contracts.protocol);

        if legs.len() == 1 {
            match first {
                SwapLeg::Wrap(l) => {
                    workflow.push(l.build_step(params.to_mode)?);
                    return Ok(workflow);
                }
                SwapLeg::Unwrap(l) => {
                    workflow.push(l.build_step(params.from_mode)?);
                    return Ok(workflow);
                }
                SwapLeg::Transfer(l) => {
                    workflow.push(l.build_step(params.recipient, params.from_mode, params.to_mode)?);
                    return Ok(workflow);
                }
                SwapLeg::Pool(_) | SwapLeg::Aggregator(_) => {}
            }
        }

        let mut from_mode = params.from_mode;
        let mut pipeline = Pipeline::new();
        let max_index = legs.len() - 1;

        for (i, leg) in legs.iter().enumerate() {
            if i == 0 {
                if let SwapLeg::Wrap(wrap) = leg {
                    workflow.push(wrap.build_step(ToMode::Internal)?);
                    from_mode = FromMode::InternalTolerant;
                }
                self.load_pipeline(&mut workflow, leg, params.caller, from_mode)?;
            }

            let copy_slot = if i == 0 { None } else { legs[i - 1].amount_out_copy_slot() };
            match leg {
                SwapLeg::Pool(pool) => {
                    pipeline.push(pool.approve_step()?);
                    let step = pool.build_step(&self.ctx, &pipeline, copy_slot)?;
                    pipeline.push(step);
                }
                SwapLeg::Aggregator(aggregator) => {
                    pipeline.push(aggregator.approve_step()?);
                    for step in aggregator.build_steps(&self.ctx)? {
                        pipeline.push(step);
                    }
                }
                SwapLeg::Wrap(_) | SwapLeg::Unwrap(_) => {}
                SwapLeg::Transfer(_) => {
                    return Err(placement_error(leg, "transfer must be the only leg"));
                }
            }

            if i == max_index {
                self.offload_pipeline(&mut pipeline, legs, i, params)?;
                let output = match leg {
                    SwapLeg::Unwrap(_) => &legs[i - 1],
                    _ => leg,
                };
                let amount_out = output.min_buy_amount()?.to_u256()?;
                workflow.push(FarmStep {
                    name: format!("advancedPipe {route}"),
                    call: FarmCall::Pipe(pipeline.clone()),
                    amount_out,
                    clipboard: Clipboard::Empty,
                });

                if let SwapLeg::Unwrap(unwrap) = leg {
                    self.unwrap_internal_balance(&mut workflow, unwrap, params.caller)?;
                }
            }
        }

        info!(
            "Compiled {}: {} workflow steps, {} pipeline calls",
            workflow.name,
            workflow.len(),
            pipeline.len()
        );
        Ok(workflow)
    }

    fn load_pipeline(
        &self,
        workflow: &mut Workflow,
        leg: &SwapLeg,
        caller: Address,
        from_mode: FromMode,
    ) -> Result<()> {
        let pipeline = self.ctx.contracts.pipeline;
        if caller == pipeline {
            return Ok(());
        }
        let (asset, amount) = match leg {
            SwapLeg::Wrap(_) => (leg.buy(), leg.buy_amount()?),
            _ => (leg.sell(), leg.sell_amount()?),
        };
        let amount = amount.to_u256()?;
        workflow.push(FarmStep {
            name: format!("load {} into pipeline", asset.symbol),
            call: FarmCall::TransferToken {
                token: asset.require_address(&leg.name())?,
                recipient: pipeline,
                amount,
                from_mode,
                to_mode: ToMode::External,
            },
            amount_out: amount,
            clipboard: Clipboard::Empty,
        });
        Ok(())
    }

    /// The pipeline's real output lands in the caller's internal balance,
    /// which is read back and pasted over the quoted unwrap amount so any
    /// surplus above the floor is unwrapped too.
    fn unwrap_internal_balance(
        &self,
        workflow: &mut Workflow,
        unwrap: &UnwrapLeg,
        caller: Address,
    ) -> Result<()> {
        let wrapped = &unwrap.state.sell;
        let floor = unwrap.state.require_sell_amount(&unwrap.name())?.to_u256()?;
        let read = workflow.push(FarmStep {
            name: format!("read {} internal balance", wrapped.symbol),
            call: FarmCall::InternalBalance {
                account: caller,
                token: wrapped.require_address(&unwrap.name())?,
            },
            amount_out: floor,
            clipboard: Clipboard::Empty,
        });

        let mut step = unwrap.build_step(FromMode::InternalTolerant)?;
        step.clipboard =
            ClipboardRef::from_slots(wrapped.symbol.clone(), 0, protocol::UNWRAP_ETH_AMOUNT_SLOT)
                .resolve(read);
        workflow.push(step);
        Ok(())
    }

    fn offload_pipeline(
        &self,
        pipeline: &mut Pipeline,
        legs: &[SwapLeg],
        i: usize,
        params: &BuildParams,
    ) -> Result<()> {
        let leg = &legs[i];
        let contracts = self.ctx.contracts;

        let (source, recipient, to_mode) = match leg {
            SwapLeg::Unwrap(_) => {
                let prev = i
                    .checked_sub(1)
                    .and_then(|p| legs.get(p))
                    .ok_or_else(|| placement_error(leg, "unwrap needs a preceding swap"))?;
                if params.recipient != params.caller {
                    warn!("Native output is paid to the caller; recipient {:?} ignored", params.recipient);
                }
                (prev, params.caller, ToMode::Internal)
            }
            _ => {
                if params.recipient == contracts.pipeline {
                    return Ok(());
                }
                (leg, params.recipient, params.to_mode)
            }
        };

        let copy_slot = source.amount_out_copy_slot().ok_or_else(|| {
            SwapError::validation(source.name(), "copySlot", "cannot determine output slot")
        })?;
        let token = source.buy();
        let token_address = token.require_address(&source.name())?;
        let amount = source.min_buy_amount()?.to_u256()?;
        let tag = source.tag();

        let approve_clip = pipeline.clipboard_for(&ClipboardRef::from_slots(
            tag.clone(),
            copy_slot,
            erc20::APPROVE_AMOUNT_SLOT,
        ));
        pipeline.push(PipeStep {
            name: format!("approve {} for protocol", token.symbol),
            call: PipeCall {
                target: token_address,
                call_data: erc20::encode_approve(contracts.protocol, amount),
                clipboard: approve_clip.encode(),
            },
            amount_out: amount,
            tag: None,
        });

        let transfer_clip = pipeline.clipboard_for(&ClipboardRef::from_slots(
            tag,
            copy_slot,
            protocol::TRANSFER_TOKEN_AMOUNT_SLOT,
        ));
        pipeline.push(PipeStep {
            name: format!("transfer {} to {:?}", token.symbol, recipient),
            call: PipeCall {
                target: contracts.protocol,
                call_data: protocol::encode_transfer_token(
                    token_address,
                    recipient,
                    amount,
                    FromMode::External,
                    to_mode,
                ),
                clipboard: transfer_clip.encode(),
            },
            amount_out: amount,
            tag: None,
        });
        Ok(())
    }
}
