//! Solidity interfaces of the contracts the SDK calls.

use alloy_sol_types::sol;

sol! {
    /// Crab V2 OTC settlement contract.
    interface ICrabOtc {
        /// Whether `nonce` has been consumed by `owner`.
        function nonces(address owner, uint256 nonce) external view returns (bool);
    }

    /// ERC-20 subset used for allowance management.
    interface IERC20 {
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
        function decimals() external view returns (uint8);
    }
}
