//! Pool interface as declared on chain

#![allow(clippy::too_many_arguments)]

use alloy_sol_types::sol;

sol! {
    /// Main pool: one ABI word per argument
    interface IPool {
        function supply(
            address asset,
            uint256 amount,
            address onBehalfOf,
            uint16 referralCode
        ) external;

        function borrow(
            address asset,
            uint256 amount,
            uint256 interestRateMode,
            uint16 referralCode,
            address onBehalfOf
        ) external;

        function repay(
            address asset,
            uint256 amount,
            uint256 interestRateMode,
            address onBehalfOf
        ) external returns (uint256);

        function withdraw(
            address asset,
            uint256 amount,
            address to
        ) external returns (uint256);

        function liquidationCall(
            address collateralAsset,
            address debtAsset,
            address user,
            uint256 debtToCover,
            bool receiveAToken
        ) external;

        function flashLoan(
            address receiverAddress,
            address[] calldata assets,
            uint256[] calldata amounts,
            uint256[] calldata interestRateModes,
            address onBehalfOf,
            bytes calldata params,
            uint16 referralCode
        ) external;

        function flashLoanSimple(
            address receiverAddress,
            address asset,
            uint256 amount,
            bytes calldata params,
            uint16 referralCode
        ) external;

        /// Realised amounts of a liquidation
        event LiquidationCall(
            address indexed collateralAsset,
            address indexed debtAsset,
            address indexed user,
            uint256 debtToCover,
            uint256 liquidatedCollateralAmount,
            address liquidator,
            bool receiveAToken
        );
    }
}

sol! {
    /// L2 pool: arguments bit-packed into bytes32 words, acting for the caller
    interface IL2Pool {
        function supply(bytes32 args) external;
        function borrow(bytes32 args) external;
        function repay(bytes32 args) external returns (uint256);
        function withdraw(bytes32 args) external returns (uint256);
        function liquidationCall(bytes32 args1, bytes32 args2) external;
    }
}
