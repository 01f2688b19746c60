//! Uniswap V3 quoter/router, ERC-20 and WETH bindings.

use alloy_primitives::{address, aliases::U160, Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall};

use crate::chain::ChainError;
use crate::domain::swap::FeeTier;

pub const QUOTER_V2: Address = address!("0x61fFE014bA17989E743c5F6cB21bF9697530B21e");
pub const SWAP_ROUTER_02: Address = address!("0x68b3465833fb72A70ecDF485E0e4C7bD8665Fc45");
/// SwapRouter02 pays out to `msg.sender` when given this recipient.
pub const ROUTER_MSG_SENDER: Address = address!("0x0000000000000000000000000000000000000001");

sol! {
    interface IQuoterV2 {
        struct QuoteExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint256 amountIn;
            uint24 fee;
            uint160 sqrtPriceLimitX96;
        }

        function quoteExactInputSingle(QuoteExactInputSingleParams memory params)
            external
            returns (
                uint256 amountOut,
                uint160 sqrtPriceX96After,
                uint32 initializedTicksCrossed,
                uint256 gasEstimate
            );

        function quoteExactInput(bytes memory path, uint256 amountIn)
            external
            returns (
                uint256 amountOut,
                uint160[] memory sqrtPriceX96AfterList,
                uint32[] memory initializedTicksCrossedList,
                uint256 gasEstimate
            );
    }

    interface ISwapRouter02 {
        struct ExactInputSingleParams {
            address tokenIn;
            address tokenOut;
            uint24 fee;
            address recipient;
            uint256 amountIn;
            uint256 amountOutMinimum;
            uint160 sqrtPriceLimitX96;
        }

        function exactInputSingle(ExactInputSingleParams calldata params)
            external
            payable
            returns (uint256 amountOut);

        function multicall(uint256 deadline, bytes[] calldata data)
            external
            payable
            returns (bytes[] memory results);
    }

    interface IERC20 {
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 value) external returns (bool);
    }

    interface IWETH9 {
        function deposit() external payable;
    }
}

pub fn quote_exact_input_single(
    token_in: Address,
    token_out: Address,
    fee: FeeTier,
    amount_in: U256,
) -> Bytes {
    IQuoterV2::quoteExactInputSingleCall {
        params: IQuoterV2::QuoteExactInputSingleParams {
            tokenIn: token_in,
            tokenOut: token_out,
            amountIn: amount_in,
            fee: fee.as_u24(),
            sqrtPriceLimitX96: U160::ZERO,
        },
    }
    .abi_encode()
    .into()
}

pub fn quote_exact_input(path: Bytes, amount_in: U256) -> Bytes {
    IQuoterV2::quoteExactInputCall { path, amountIn: amount_in }.abi_encode().into()
}

/// Single-pool V3 path: `token_in ‖ fee (3 bytes) ‖ token_out`.
pub fn single_pool_path(token_in: Address, fee: FeeTier, token_out: Address) -> Bytes {
    let mut path = Vec::with_capacity(43);
    path.extend_from_slice(token_in.as_slice());
    path.extend_from_slice(&fee.pips().to_be_bytes()[1..]);
    path.extend_from_slice(token_out.as_slice());
    path.into()
}

pub fn decode_quote_exact_input_single(data: &[u8]) -> Result<U256, ChainError> {
    IQuoterV2::quoteExactInputSingleCall::abi_decode_returns(data)
        .map(|ret| ret.amountOut)
        .map_err(|error| ChainError::Decode(error.to_string()))
}

pub fn decode_quote_exact_input(data: &[u8]) -> Result<U256, ChainError> {
    IQuoterV2::quoteExactInputCall::abi_decode_returns(data)
        .map(|ret| ret.amountOut)
        .map_err(|error| ChainError::Decode(error.to_string()))
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExactInputSingle {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: FeeTier,
    pub recipient: Address,
    pub amount_in: U256,
    pub amount_out_minimum: U256,
}

/// `multicall(deadline, [exactInputSingle(..)])`, so the router itself rejects late execution.
pub fn swap_exact_input_single(params: ExactInputSingle, deadline: U256) -> Bytes {
    let inner = ISwapRouter02::exactInputSingleCall {
        params: ISwapRouter02::ExactInputSingleParams {
            tokenIn: params.token_in,
            tokenOut: params.token_out,
            fee: params.fee.as_u24(),
            recipient: params.recipient,
            amountIn: params.amount_in,
            amountOutMinimum: params.amount_out_minimum,
            sqrtPriceLimitX96: U160::ZERO,
        },
    }
    .abi_encode();

    ISwapRouter02::multicallCall { deadline, data: vec![inner.into()] }.abi_encode().into()
}

pub fn erc20_balance_of(account: Address) -> Bytes {
    IERC20::balanceOfCall { account }.abi_encode().into()
}

pub fn erc20_allowance(owner: Address, spender: Address) -> Bytes {
    IERC20::allowanceCall { owner, spender }.abi_encode().into()
}

pub fn erc20_approve(spender: Address, value: U256) -> Bytes {
    IERC20::approveCall { spender, value }.abi_encode().into()
}

pub fn weth_deposit() -> Bytes {
    IWETH9::depositCall {}.abi_encode().into()
}

pub fn decode_uint256(data: &[u8]) -> Result<U256, ChainError> {
    IERC20::balanceOfCall::abi_decode_returns(data)
        .map_err(|error| ChainError::Decode(error.to_string()))
}
