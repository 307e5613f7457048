/*
 * Assets and fixed-point amounts
 */

mod amount;
mod asset;

pub use amount::Amount;
pub use asset::{Asset, AssetKind, NATIVE_DECIMALS};
