mod common;

use common::{caller, pipeline_address, Fixture};
use ethers::types::U256;
use pipeswap::legs::{PoolSwapLeg, SwapLeg, UnwrapLeg, WrapLeg};
use pipeswap::pipeline::{BuildParams, Clipboard, FarmCall, FromMode, PipelineBuilder, ToMode};
use pipeswap::SwapError;
use rust_decimal::Decimal;
use tokio_test::assert_ok;

fn params(recipient: ethers::types::Address) -> BuildParams {
    BuildParams {
        from_mode: FromMode::External,
        to_mode: ToMode::External,
        caller: caller(),
        recipient,
    }
}

fn slippage() -> Decimal {
    Decimal::new(1, 2)
}

#[tokio::test]
async fn direct_sell_into_the_pipeline_is_approve_plus_swap() {
    let fx = Fixture::new(false);
    let quoter = fx.quoter();
    let legs = assert_ok!(
        quoter
            .get_quote(&fx.bean, &fx.weth, fx.bean.from_human("100").unwrap(), slippage())
            .await
    );

    let builder = PipelineBuilder::new(fx.ctx.clone());
    let workflow = assert_ok!(builder.build(&legs, &params(pipeline_address())));

    assert_eq!(workflow.len(), 2);
    assert!(matches!(
        workflow.steps()[0].call,
        FarmCall::TransferToken { recipient, to_mode: ToMode::External, .. } if recipient == pipeline_address()
    ));
    let pipeline = workflow.pipeline().unwrap();
    assert_eq!(pipeline.len(), 2);
    assert_eq!(pipeline.steps()[0].call.target, fx.bean.address().unwrap());
    assert_eq!(pipeline.steps()[1].call.target, fx.ctx.pools[0].address);
    assert_eq!(
        Clipboard::decode(&pipeline.steps()[1].call.clipboard),
        Some(Clipboard::Empty)
    );
    assert_eq!(
        assert_ok!(workflow.estimate()),
        assert_ok!(legs[0].min_buy_amount().unwrap().to_u256())
    );
    assert_eq!(workflow.value(), U256::zero());
}

#[tokio::test]
async fn caller_pipeline_skips_loading() {
    let fx = Fixture::new(false);
    let quoter = fx.quoter();
    let legs = assert_ok!(
        quoter
            .get_quote(&fx.bean, &fx.weth, fx.bean.from_human("100").unwrap(), slippage())
            .await
    );

    let mut p = params(pipeline_address());
    p.caller = pipeline_address();
    let workflow = assert_ok!(PipelineBuilder::new(fx.ctx.clone()).build(&legs, &p));
    assert_eq!(workflow.len(), 1);
}

#[tokio::test]
async fn relay_legs_paste_real_outputs() {
    let fx = Fixture::new(true);
    let quoter = fx.quoter();
    let legs = assert_ok!(
        quoter
            .get_quote(&fx.usdc, &fx.bean, fx.usdc.from_human("1000").unwrap(), slippage())
            .await
    );

    let workflow = assert_ok!(PipelineBuilder::new(fx.ctx.clone()).build(&legs, &params(caller())));
    let pipeline = workflow.pipeline().unwrap();
    let names: Vec<&str> = pipeline.steps().iter().map(|s| s.name.as_str()).collect();
    assert_eq!(pipeline.len(), 7, "{names:?}");

    // approve, swap, balanceOf, approve, swapFrom, approve, transferToken
    let swap_from = &pipeline.steps()[4];
    assert_eq!(
        Clipboard::decode(&swap_from.call.clipboard),
        Some(Clipboard::Paste {
            return_data_index: 2,
            copy_byte_offset: 32,
            paste_byte_offset: 36 + 2 * 32,
        })
    );
    let approve = &pipeline.steps()[5];
    assert_eq!(
        Clipboard::decode(&approve.call.clipboard),
        Some(Clipboard::Paste {
            return_data_index: 4,
            copy_byte_offset: 32,
            paste_byte_offset: 36 + 32,
        })
    );
    let transfer = &pipeline.steps()[6];
    assert_eq!(transfer.call.target, fx.ctx.contracts.protocol);
    assert_eq!(
        Clipboard::decode(&transfer.call.clipboard),
        Some(Clipboard::Paste {
            return_data_index: 4,
            copy_byte_offset: 32,
            paste_byte_offset: 36 + 2 * 32,
        })
    );
}

#[tokio::test]
async fn native_input_wraps_before_loading() {
    let fx = Fixture::new(false);
    let quoter = fx.quoter();
    let amount = fx.eth.from_human("1").unwrap();
    let legs = assert_ok!(quoter.get_quote(&fx.eth, &fx.bean, amount.clone(), slippage()).await);

    let workflow = assert_ok!(PipelineBuilder::new(fx.ctx.clone()).build(&legs, &params(caller())));
    let steps = workflow.steps();
    assert_eq!(steps.len(), 3);
    assert!(matches!(steps[0].call, FarmCall::WrapNative { to_mode: ToMode::Internal, .. }));
    assert!(matches!(
        steps[1].call,
        FarmCall::TransferToken { from_mode: FromMode::InternalTolerant, .. }
    ));
    assert!(matches!(steps[2].call, FarmCall::Pipe(_)));
    assert_eq!(workflow.value(), assert_ok!(amount.to_u256()));
}

#[tokio::test]
async fn native_output_unwraps_from_internal_balance() {
    let fx = Fixture::new(false);
    let quoter = fx.quoter();
    let legs = assert_ok!(
        quoter
            .get_quote(&fx.bean, &fx.eth, fx.bean.from_human("100").unwrap(), slippage())
            .await
    );

    let workflow = assert_ok!(PipelineBuilder::new(fx.ctx.clone()).build(&legs, &params(caller())));
    let steps = workflow.steps();
    assert_eq!(steps.len(), 4);
    assert!(matches!(steps[1].call, FarmCall::Pipe(_)));
    assert!(matches!(
        steps[2].call,
        FarmCall::InternalBalance { account, token } if account == caller() && token == fx.weth.address().unwrap()
    ));
    assert!(matches!(
        steps[3].call,
        FarmCall::UnwrapNative { from_mode: FromMode::InternalTolerant, .. }
    ));
    // The real balance overwrites the quoted floor, so surplus is unwrapped too.
    assert_eq!(
        steps[3].clipboard,
        Clipboard::Paste {
            return_data_index: 2,
            copy_byte_offset: 32,
            paste_byte_offset: 36,
        }
    );
    assert_eq!(steps[1].clipboard, Clipboard::Empty);
    assert_eq!(
        assert_ok!(workflow.estimate()),
        assert_ok!(legs[0].min_buy_amount().unwrap().to_u256())
    );

    let pipeline = workflow.pipeline().unwrap();
    let last = pipeline.steps().last().unwrap();
    assert_eq!(last.call.target, fx.ctx.contracts.protocol);
    assert!(matches!(
        Clipboard::decode(&last.call.clipboard),
        Some(Clipboard::Paste { return_data_index: 1, .. })
    ));
}

#[tokio::test]
async fn single_wrap_compiles_to_one_step() {
    let fx = Fixture::new(false);
    let mut wrap = WrapLeg::new(fx.eth.clone(), fx.weth.clone());
    wrap.quote_forward(fx.eth.from_human("2").unwrap()).unwrap();

    let workflow = assert_ok!(PipelineBuilder::new(fx.ctx.clone()).build(&[wrap.into()], &params(caller())));
    assert_eq!(workflow.len(), 1);
    assert!(workflow.pipeline().is_none());
}

#[test]
fn misplaced_native_legs_are_rejected() {
    let fx = Fixture::new(false);
    let mut wrap = WrapLeg::new(fx.eth.clone(), fx.weth.clone());
    wrap.quote_forward(fx.eth.from_human("1").unwrap()).unwrap();
    let mut unwrap = UnwrapLeg::new(fx.weth.clone(), fx.eth.clone());
    unwrap.quote_forward(fx.weth.from_human("1").unwrap()).unwrap();
    let pool = PoolSwapLeg::new(fx.ctx.pools[0].clone(), fx.bean.clone(), fx.weth.clone()).unwrap();

    let late_wrap: Vec<SwapLeg> = vec![pool.clone().into(), wrap.into()];
    assert!(matches!(
        PipelineBuilder::validate_order(&late_wrap),
        Err(SwapError::Validation { field: "position", .. })
    ));

    let early_unwrap: Vec<SwapLeg> = vec![unwrap.into(), pool.into()];
    assert!(matches!(
        PipelineBuilder::validate_order(&early_unwrap),
        Err(SwapError::Validation { field: "position", .. })
    ));
}

#[test]
fn empty_leg_list_is_a_precondition_failure() {
    let fx = Fixture::new(false);
    let result = PipelineBuilder::new(fx.ctx.clone()).build(&[], &params(caller()));
    assert!(matches!(result, Err(SwapError::Precondition(_))));
}
